use crate::provider::Provider;
use anyhow::Result;

/// Print the full schema as pretty JSON on stdout.
/// # Errors
/// Returns an error if the schema cannot be serialized.
pub fn execute() -> Result<()> {
    let json = serde_json::to_string_pretty(&Provider::schema())?;
    println!("{json}");
    Ok(())
}
