use super::ProviderError;
use secrecy::SecretString;
use serde_json::Value;
use std::env;

pub const ATTR_INTEGRATION_KEY: &str = "integration_key";
pub const ATTR_SECRET_KEY: &str = "secret_key";
pub const ATTR_API_HOSTNAME: &str = "api_hostname";

pub const ENV_INTEGRATION_KEY: &str = "DUO_INTEGRATION_KEY";
pub const ENV_SECRET_KEY: &str = "DUO_SECRET_KEY";
pub const ENV_API_HOSTNAME: &str = "DUO_API_HOSTNAME";

/// Admin API credentials.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub integration_key: String,
    pub secret_key: SecretString,
    pub api_hostname: String,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(
        integration_key: impl Into<String>,
        secret_key: SecretString,
        api_hostname: impl Into<String>,
    ) -> Self {
        Self {
            integration_key: integration_key.into(),
            secret_key,
            api_hostname: api_hostname.into(),
        }
    }

    /// Read credentials from a provider configuration block, falling back to
    /// `DUO_INTEGRATION_KEY`, `DUO_SECRET_KEY` and `DUO_API_HOSTNAME`.
    ///
    /// # Errors
    /// Returns an error naming the first credential found in neither place.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        let integration_key = lookup(config, ATTR_INTEGRATION_KEY, ENV_INTEGRATION_KEY)?;
        let secret_key = lookup(config, ATTR_SECRET_KEY, ENV_SECRET_KEY)?;
        let api_hostname = lookup(config, ATTR_API_HOSTNAME, ENV_API_HOSTNAME)?;

        Ok(Self::new(
            integration_key,
            SecretString::from(secret_key),
            api_hostname,
        ))
    }
}

fn lookup(config: &Value, attribute: &'static str, env_var: &str) -> Result<String, ProviderError> {
    config
        .get(attribute)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| env::var(env_var).ok().filter(|value| !value.is_empty()))
        .ok_or(ProviderError::MissingConfig(attribute))
}
