//! String-keyed configuration map carried by value into each block task.
//!
//! A mapping from string keys to string values with no hidden global
//! state: keep a string-keyed configuration at the boundary, but
//! materialize a typed, validated struct once inside the scheduler — see
//! [`crate::scheduler::Config`] for the typed side of that split. This
//! plays the same "loosely-typed input, validated before use" role that a
//! CLI's own parsed-args struct plays for its command-line surface.

use std::collections::HashMap;
use std::fmt;

/// Recognised configuration keys ("Encoder configuration" table).
pub mod keys {
    pub const BLOCK_SIZE: &str = "blockSize";
    pub const JOBS: &str = "jobs";
    pub const CODEC: &str = "codec";
    pub const TRANSFORM: &str = "transform";
    pub const CHECKSUM: &str = "checksum";
    pub const SKIP_BLOCKS: &str = "skipBlocks";
    pub const FILE_SIZE: &str = "fileSize";
    pub const EXTRA: &str = "extra";
}

/// Error returned when a [`Context`] value cannot be parsed as the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextValueError {
    pub key: String,
    pub value: String,
}

impl fmt::Display for ContextValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value {:?} for context key {:?}", self.value, self.key)
    }
}
impl std::error::Error for ContextValueError {}

/// A plain string-to-string map passed by value into every block task.
///
/// Cloning a `Context` is a shallow `HashMap` clone (each task gets its own
/// copy; mutations inside a task are never observable by its siblings or by
/// the caller).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    values: HashMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Context { values: HashMap::new() }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>, ContextValueError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(v) => v
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ContextValueError { key: key.to_string(), value: v.clone() }),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ContextValueError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(v) => match v.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(Some(true)),
                "FALSE" => Ok(Some(false)),
                _ => Err(ContextValueError { key: key.to_string(), value: v.clone() }),
            },
        }
    }
}
