use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::NetworkError;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("command failed: {0}")]
    Command(CommandError),

    #[error("write concern not satisfied: {0}")]
    WriteConcern(WriteConcernError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid server response: {0}")]
    InvalidResponse(String),

    #[error("lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Top-level error body of an `ok: 0` reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: i32,
    #[serde(rename = "codeName", default)]
    pub code_name: String,
    #[serde(rename = "errmsg", default)]
    pub message: String,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.code_name, self.message)
    }
}

/// `writeConcernError` sub-document of an otherwise successful reply.
///
/// The write itself applied; the requested acknowledgment guarantee was not
/// met. Classified independently of the top-level result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteConcernError {
    pub code: i32,
    #[serde(rename = "codeName", default)]
    pub code_name: String,
    #[serde(rename = "errmsg", default)]
    pub message: String,
    #[serde(rename = "errInfo", default, skip_serializing_if = "Option::is_none")]
    pub err_info: Option<serde_json::Value>,
}

impl std::fmt::Display for WriteConcernError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.code_name, self.message)
    }
}

impl<T> From<std::sync::PoisonError<T>> for DriverError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl DriverError {
    /// Numeric server error code, if this error carries one.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Command(e) => Some(e.code),
            Self::WriteConcern(e) => Some(e.code),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
