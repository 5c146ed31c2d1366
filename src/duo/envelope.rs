use crate::provider::ProviderError;
use serde::Deserialize;

const STAT_OK: &str = "OK";
const NOT_FOUND_MESSAGE: &str = "Resource not found";

/// JSON envelope returned by every Admin API call.
///
/// ```json
/// {"stat": "OK", "response": {...}}
/// {"stat": "FAIL", "code": 40401, "message": "Resource not found", "message_detail": "..."}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResult<T> {
    pub stat: String,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub message_detail: Option<String>,
    pub response: Option<T>,
}

impl<T> ApiResult<T> {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.stat == STAT_OK
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        !self.is_ok() && self.message() == NOT_FOUND_MESSAGE
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// Turn a failed envelope into `Unable to <operation>: <subject>, error: <message>`.
    #[must_use]
    pub fn into_error(self, operation: &'static str, subject: impl Into<String>) -> ProviderError {
        ProviderError::Remote {
            operation,
            subject: subject.into(),
            message: self.message.unwrap_or_default(),
        }
    }

    /// # Errors
    /// Returns an error if the envelope carries no `response` payload.
    pub fn into_response(self) -> Result<T, ProviderError> {
        self.response.ok_or(ProviderError::MissingResponse)
    }
}
