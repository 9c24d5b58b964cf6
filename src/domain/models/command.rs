use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A store command produced from one inbound HTTP request.
///
/// `name` is always upper-case and never empty; the translator refuses to
/// build a request without a command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Query parameters accepted by the command execution endpoint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ExecQuery {
    /// Prefix prepended to the generated keys of `JSON.INGEST`
    #[serde(default)]
    pub key_prefix: Option<String>,
}

/// Successful command execution, rendered the way the store's own CLI would.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExecResponse {
    pub data: String,
}
