//! Command and reply shapes exchanged with a server.
//!
//! One `Command` is one outbound round-trip; the transaction id travels with
//! the command so a server can recognize a retried attempt and replay the
//! recorded result instead of applying the write twice.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::{CommandError, WriteConcernError};

/// One outbound write or read command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Wire command name: "insert", "update", "delete" or "find".
    pub name: String,
    pub collection: String,
    /// Command-specific body (document to insert, filter/update pair, ...).
    pub body: Value,
    /// Idempotency token. Identical on both attempts of a retried write;
    /// `None` for reads, which carry no idempotency semantics.
    #[serde(rename = "txnId")]
    pub txn_id: Option<Uuid>,
}

/// Decoded server reply.
///
/// `ok: 1` replies carry the operation payload and may still carry a
/// `writeConcernError` sub-document; `ok: 0` replies carry the top-level
/// error fields instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reply {
    pub ok: i32,

    /// Number of documents matched/inserted/deleted by the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u64>,

    #[serde(rename = "nModified", default, skip_serializing_if = "Option::is_none")]
    pub n_modified: Option<u64>,

    #[serde(rename = "insertedId", default, skip_serializing_if = "Option::is_none")]
    pub inserted_id: Option<Value>,

    /// Documents returned by a "find" command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,

    #[serde(rename = "codeName", default, skip_serializing_if = "Option::is_none")]
    pub code_name: Option<String>,

    #[serde(rename = "errmsg", default, skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,

    #[serde(
        rename = "writeConcernError",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub write_concern_error: Option<WriteConcernError>,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.ok == 1
    }

    /// Top-level error body of an `ok: 0` reply.
    pub fn command_error(&self) -> Option<CommandError> {
        if self.is_ok() {
            return None;
        }
        Some(CommandError {
            code: self.code.unwrap_or(0),
            code_name: self.code_name.clone().unwrap_or_default(),
            message: self.errmsg.clone().unwrap_or_default(),
        })
    }

    pub(crate) fn success() -> Self {
        Self {
            ok: 1,
            ..Default::default()
        }
    }

    pub(crate) fn failure(code: i32, code_name: &str, message: &str) -> Self {
        Self {
            ok: 0,
            code: Some(code),
            code_name: Some(code_name.to_string()),
            errmsg: Some(message.to_string()),
            ..Default::default()
        }
    }
}
