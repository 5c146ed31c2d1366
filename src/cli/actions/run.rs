use crate::cli::actions::{lifecycle, schema, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Schema => schema::execute(),
        Action::Lifecycle(args) => lifecycle::execute(args).await,
    }
}
