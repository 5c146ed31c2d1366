use crate::provider::{LifecycleRequest, LifecycleResponse, Provider, ProviderConfig};
use anyhow::{anyhow, Context, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, error};

#[derive(Debug)]
pub struct Args {
    pub config: ProviderConfig,
    /// Request file path, `-` for stdin.
    pub input: String,
}

async fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("failed to read request from stdin")?;
        Ok(buffer)
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("failed to read request from {input}"))
    }
}

/// Run one lifecycle request and print the response on stdout.
///
/// The response is printed even when it carries error diagnostics; the
/// action then fails so the process exits non-zero.
/// # Errors
/// Returns an error if the request cannot be read or parsed, the provider
/// cannot be built, or the response carries error diagnostics.
pub async fn execute(args: Args) -> Result<()> {
    let raw = read_input(&args.input).await?;
    let request: LifecycleRequest =
        serde_json::from_str(&raw).context("invalid lifecycle request")?;

    debug!(
        "lifecycle request: {} {}",
        request.operation, request.type_name
    );

    let provider = Provider::new(&args.config)?;
    let response = provider.handle(request).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    fail_on_errors(&response)
}

fn fail_on_errors(response: &LifecycleResponse) -> Result<()> {
    let errors: Vec<&str> = response
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.is_error())
        .map(|diagnostic| diagnostic.summary.as_str())
        .collect();

    if errors.is_empty() {
        return Ok(());
    }

    for summary in &errors {
        error!("{}", summary);
    }

    Err(anyhow!(errors.join("; ")))
}
