use std::{fmt, io};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum LinkGenError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Emission error: {0}")]
    Emit(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("Schema error on '{symbol}': {message}")]
    Schema { symbol: String, message: String },
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl LinkGenError {
    pub fn schema(symbol: impl Into<String>, message: impl Into<String>) -> Self {
        LinkGenError::Schema {
            symbol: symbol.into(),
            message: message.into(),
        }
    }

    /// Whether the error aborts the whole generation pass rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkGenError::Schema { .. } | LinkGenError::Emit(_))
    }
}

impl From<toml::de::Error> for LinkGenError {
    fn from(src: toml::de::Error) -> LinkGenError {
        LinkGenError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for LinkGenError {
    fn from(src: toml::ser::Error) -> LinkGenError {
        LinkGenError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for LinkGenError {
    fn from(src: JsonError) -> LinkGenError {
        LinkGenError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for LinkGenError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => LinkGenError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => LinkGenError::PermissionDenied,
            _ => LinkGenError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for LinkGenError {
    fn from(x: fmt::Error) -> Self {
        LinkGenError::Emit(format!("{x}"))
    }
}

impl From<walkdir::Error> for LinkGenError {
    fn from(x: walkdir::Error) -> Self {
        match x.io_error() {
            Some(io_err) if io_err.kind() == io::ErrorKind::NotFound => {
                LinkGenError::NotFound(format!("{x}"))
            }
            _ => LinkGenError::Io(format!("Directory walk failed: {x}")),
        }
    }
}
