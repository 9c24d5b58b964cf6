use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::models::CommandRequest;
use crate::domain::services::CommandBlocklist;

/// Path prefix under which commands are executed, e.g. `/shell/exec/get`.
pub const EXEC_PATH_PREFIX: &str = "/shell/exec/";

/// The only command that accepts the `key_prefix` query parameter.
pub const JSON_INGEST: &str = "JSON.INGEST";

const KEYS: &str = "keys";
const VALUES: &str = "values";
const MEMBERS: &str = "members";
const KEY_VALUES: &str = "key_values";
const FLAG_VALUE: &str = "true";

/// Object fields drained first, in this order, so that primary operands
/// always precede flags regardless of how the client ordered the object.
pub const PRIORITY_KEYS: [&str; 14] = [
    "key",
    KEYS,
    "field",
    "path",
    "value",
    VALUES,
    "seconds",
    "user",
    "password",
    KEY_VALUES,
    "query",
    "offset",
    "member",
    MEMBERS,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("invalid command")]
    InvalidCommand,

    #[error("ERR unknown command '{0}'")]
    Blocked(String),

    #[error("empty JSON object")]
    EmptyObject,

    #[error("invalid input")]
    InvalidInput,

    #[error("malformed JSON body: {0}")]
    MalformedJson(String),

    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

pub fn is_exec_path(path: &str) -> bool {
    path.starts_with(EXEC_PATH_PREFIX)
}

/// Turns `POST /shell/exec/{command}` requests into [`CommandRequest`]s.
#[derive(Debug, Clone)]
pub struct RequestTranslator {
    blocklist: CommandBlocklist,
}

impl RequestTranslator {
    pub fn new(blocklist: CommandBlocklist) -> Self {
        Self { blocklist }
    }

    /// Upper-cased command token following [`EXEC_PATH_PREFIX`].
    pub fn command_name(&self, path: &str) -> Result<String, TranslationError> {
        let name = path
            .strip_prefix(EXEC_PATH_PREFIX)
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();

        if name.is_empty() {
            return Err(TranslationError::InvalidCommand);
        }
        Ok(name)
    }

    /// Builds the command for a request path, optional `key_prefix` query
    /// parameter and raw JSON body.
    ///
    /// The blocklist is consulted before the body is looked at, so a blocked
    /// command is reported as such even when its body is malformed.
    pub fn translate(
        &self,
        path: &str,
        key_prefix: Option<&str>,
        body: &[u8],
    ) -> Result<CommandRequest, TranslationError> {
        let name = self.command_name(path)?;
        if self.blocklist.is_blocked(&name) {
            return Err(TranslationError::Blocked(name));
        }

        let mut args = Vec::new();
        if name == JSON_INGEST {
            if let Some(prefix) = key_prefix.filter(|p| !p.is_empty()) {
                args.push(prefix.to_string());
            }
        }
        args.extend(body_arguments(body)?);

        Ok(CommandRequest::new(name, args))
    }
}

impl Default for RequestTranslator {
    fn default() -> Self {
        Self::new(CommandBlocklist::default())
    }
}

fn body_arguments(body: &[u8]) -> Result<Vec<String>, TranslationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| TranslationError::MalformedJson(e.to_string()))?;

    match value {
        Value::Array(items) => array_arguments(items),
        Value::Object(fields) => object_arguments(&fields),
        _ => Err(TranslationError::InvalidInput),
    }
}

fn array_arguments(items: Vec<Value>) -> Result<Vec<String>, TranslationError> {
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            _ => Err(TranslationError::InvalidInput),
        })
        .collect()
}

fn object_arguments(fields: &Map<String, Value>) -> Result<Vec<String>, TranslationError> {
    if fields.is_empty() {
        return Err(TranslationError::EmptyObject);
    }

    let mut args = Vec::new();

    for key in PRIORITY_KEYS {
        let Some(value) = fields.get(key) else {
            continue;
        };

        match key {
            KEYS | VALUES | MEMBERS => match value {
                Value::Array(items) => args.extend(items.iter().map(token)),
                other => args.push(token(other)),
            },
            KEY_VALUES => {
                let Value::Object(pairs) = value else {
                    return Err(TranslationError::InvalidField {
                        field: KEY_VALUES.to_string(),
                        expected: "an object",
                    });
                };
                for (k, v) in pairs {
                    args.push(k.clone());
                    args.push(token(v));
                }
            },
            _ => args.push(token(value)),
        }
    }

    for (name, value) in fields {
        if PRIORITY_KEYS.contains(&name.as_str()) {
            continue;
        }

        match value {
            Value::Object(_) | Value::Array(_) => args.push(value.to_string()),
            _ => {
                // A value of "true" marks a presence-only flag such as NX.
                args.push(name.clone());
                let value = token(value);
                if !value.eq_ignore_ascii_case(FLAG_VALUE) {
                    args.push(value);
                }
            },
        }
    }

    Ok(args)
}

fn token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
