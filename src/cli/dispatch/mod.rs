use crate::{
    cli::{
        actions::{lifecycle, Action},
        commands::{self, duo},
    },
    provider::ProviderConfig,
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if the subcommand is unknown or credentials are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::CMD_SCHEMA, _)) => Ok(Action::Schema),
        Some((commands::CMD_LIFECYCLE, sub)) => {
            let config = provider_config(sub)?;
            let input = sub
                .get_one::<String>(commands::ARG_INPUT)
                .cloned()
                .unwrap_or_else(|| "-".to_string());

            Ok(Action::Lifecycle(lifecycle::Args { config, input }))
        }
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

fn provider_config(matches: &clap::ArgMatches) -> Result<ProviderConfig> {
    let integration_key = matches
        .get_one::<String>(duo::ARG_INTEGRATION_KEY)
        .cloned()
        .context("missing required argument: --integration-key")?;
    let secret_key = matches
        .get_one::<String>(duo::ARG_SECRET_KEY)
        .cloned()
        .context("missing required argument: --secret-key")?;
    let api_hostname = matches
        .get_one::<String>(duo::ARG_API_HOSTNAME)
        .cloned()
        .context("missing required argument: --api-hostname")?;

    Ok(ProviderConfig::new(
        integration_key,
        SecretString::from(secret_key),
        api_hostname,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::config::{ENV_API_HOSTNAME, ENV_INTEGRATION_KEY, ENV_SECRET_KEY};

    #[test]
    fn schema_needs_no_credentials() {
        temp_env::with_vars_unset([ENV_INTEGRATION_KEY, ENV_SECRET_KEY, ENV_API_HOSTNAME], || {
            let matches = commands::new().get_matches_from(vec!["terraform-provider-duo", "schema"]);
            assert!(matches!(handler(&matches), Ok(Action::Schema)));
        });
    }

    #[test]
    fn lifecycle_requires_credentials() {
        temp_env::with_vars_unset([ENV_INTEGRATION_KEY, ENV_SECRET_KEY, ENV_API_HOSTNAME], || {
            let matches = commands::new().get_matches_from(vec![
                "terraform-provider-duo",
                "lifecycle",
                "--integration-key",
                "DIXXXXXXXXXXXXXXXXXX",
                "--secret-key",
                "secret",
            ]);
            let err = handler(&matches).err().map(|e| e.to_string());
            assert_eq!(
                err.as_deref(),
                Some("missing required argument: --api-hostname")
            );
        });
    }

    #[test]
    fn lifecycle_from_env() {
        temp_env::with_vars(
            [
                (ENV_INTEGRATION_KEY, Some("DIXXXXXXXXXXXXXXXXXX")),
                (ENV_SECRET_KEY, Some("secret")),
                (ENV_API_HOSTNAME, Some("api-xxxxxxxx.duosecurity.com")),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "terraform-provider-duo",
                    "lifecycle",
                    "-i",
                    "request.json",
                ]);
                match handler(&matches) {
                    Ok(Action::Lifecycle(args)) => {
                        assert_eq!(args.input, "request.json");
                        assert_eq!(args.config.api_hostname, "api-xxxxxxxx.duosecurity.com");
                    }
                    other => panic!("unexpected action: {other:?}"),
                }
            },
        );
    }
}
