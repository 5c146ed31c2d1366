//! JSON documents exchanged with the host for one lifecycle call.

use super::{Diagnostic, ProviderError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    #[default]
    Resource,
    DataSource,
}

impl Kind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::DataSource => "data source",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
        };
        f.write_str(name)
    }
}

/// One lifecycle call.
///
/// ```json
/// {"type_name": "duo_user", "operation": "update",
///  "prior_state": {"id": "DU1", "username": "jane"},
///  "planned_state": {"id": "DU1", "username": "jane", "notes": "hi"}}
/// ```
///
/// Data sources take their configuration in `planned_state`; imports take `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRequest {
    #[serde(default)]
    pub kind: Kind,
    pub type_name: String,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// New state (absent after delete) plus diagnostics.
///
/// A resource that vanished remotely comes back with `"id": null`, which
/// tells the host to drop it from state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleResponse {
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl LifecycleResponse {
    #[must_use]
    pub fn state(state: Value) -> Self {
        Self {
            state: Some(state),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            state: None,
            diagnostics,
        }
    }

    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Identifier of the returned state, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.state
            .as_ref()
            .and_then(|state| state.get(super::schema::ID_ATTRIBUTE))
            .and_then(Value::as_str)
    }
}

impl From<ProviderError> for LifecycleResponse {
    fn from(err: ProviderError) -> Self {
        Self::failed(vec![Diagnostic::from(err)])
    }
}
