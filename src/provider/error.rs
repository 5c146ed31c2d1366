use thiserror::Error;

/// Errors surfaced by provider operations.
///
/// Every variant maps to one host diagnostic, see [`super::Diagnostic`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing provider configuration: {0}")]
    MissingConfig(&'static str),
    #[error("invalid api_hostname {hostname:?}: {reason}")]
    InvalidHostname { hostname: String, reason: String },
    #[error("{attribute}: {message}")]
    Validation { attribute: String, message: String },
    #[error("An error has occurred: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("An error has occurred: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("An error has occurred: response has no payload")]
    MissingResponse,
    #[error("unable to sign request: {0}")]
    Signing(String),
    #[error("Unable to {operation}: {subject}, error: {message}")]
    Remote {
        operation: &'static str,
        subject: String,
        message: String,
    },
    #[error("{type_name} has no identifier")]
    MissingId { type_name: &'static str },
    #[error("invalid identifier {id:?}: {reason}")]
    InvalidId { id: String, reason: &'static str },
    #[error("{type_name} cannot be updated in place, every attribute forces replacement")]
    ReplaceRequired { type_name: &'static str },
    #[error("unknown {kind} type: {type_name}")]
    UnknownType {
        kind: &'static str,
        type_name: String,
    },
}

impl ProviderError {
    #[must_use]
    pub fn validation(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Attribute the error points at, if any.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::Validation { attribute, .. } => Some(attribute.as_str()),
            Self::MissingConfig(key) => Some(*key),
            _ => None,
        }
    }
}
