//! In-memory reference server.
//!
//! Implements the command contract against plain JSON collections so the
//! driver can be exercised without a network. Supports per-command fail
//! points (a bounded fault injected on matching commands) and idempotent
//! replay of writes by transaction id.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{NetworkError, Transport};
use crate::core::WriteConcernError;
use crate::protocol::{Command, Reply};

/// Fault injected on matching commands a bounded number of times.
#[derive(Debug, Clone)]
pub struct FailPoint {
    /// Wire command names the fault applies to (exact match).
    pub commands: Vec<String>,
    /// How many matching commands fail before the fail point goes inert.
    pub times: u32,
    pub action: FailAction,
}

#[derive(Debug, Clone)]
pub enum FailAction {
    /// Drop the connection before the command executes.
    CloseConnection,
    /// Reply `ok: 0` with this code instead of executing.
    ErrorCode(i32),
    /// Execute the command, then attach this sub-document to the reply.
    WriteConcernError(WriteConcernError),
}

impl FailPoint {
    pub fn new(command: &str, times: u32, action: FailAction) -> Self {
        Self {
            commands: vec![command.to_string()],
            times,
            action,
        }
    }
}

#[derive(Default)]
struct ServerState {
    collections: HashMap<String, Vec<Value>>,
    /// Base reply recorded per executed write, keyed by transaction id.
    /// A retried write replays this instead of reapplying.
    journal: HashMap<Uuid, Reply>,
    fail_point: Option<FailPoint>,
}

/// In-memory server speaking the driver's command contract.
pub struct MemoryServer {
    state: Mutex<ServerState>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState::default()),
        }
    }

    /// Replace collection contents, creating the collection if needed.
    pub async fn seed(&self, collection: &str, documents: Vec<Value>) {
        let mut state = self.state.lock().await;
        state.collections.insert(collection.to_string(), documents);
    }

    /// Arm a fail point. Replaces any previously armed one.
    pub async fn configure_fail_point(&self, fail_point: FailPoint) {
        let mut state = self.state.lock().await;
        state.fail_point = Some(fail_point);
    }

    /// Disarm the current fail point, returning how many triggers were left.
    pub async fn disable_fail_point(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.fail_point.take().map(|fp| fp.times).unwrap_or(0)
    }

    /// Take the armed fail point's action for this command, if it fires.
    fn trigger_fail_point(state: &mut ServerState, command_name: &str) -> Option<FailAction> {
        let fp = state.fail_point.as_mut()?;
        if fp.times == 0 || !fp.commands.iter().any(|c| c == command_name) {
            return None;
        }
        fp.times -= 1;
        let action = fp.action.clone();
        warn!(
            command = command_name,
            remaining = fp.times,
            "fail point triggered"
        );
        Some(action)
    }

    fn execute(state: &mut ServerState, command: &Command) -> Reply {
        match command.name.as_str() {
            "insert" => Self::execute_insert(state, command),
            "update" => Self::execute_update(state, command),
            "delete" => Self::execute_delete(state, command),
            "find" => Self::execute_find(state, command),
            other => Reply::failure(59, "CommandNotFound", &format!("no such command: {other}")),
        }
    }

    fn execute_insert(state: &mut ServerState, command: &Command) -> Reply {
        let Some(document) = command.body.get("document").cloned() else {
            return Reply::failure(9, "FailedToParse", "insert requires a document");
        };

        let docs = state
            .collections
            .entry(command.collection.clone())
            .or_default();

        if let Some(id) = document.get("_id") {
            if docs.iter().any(|d| d.get("_id") == Some(id)) {
                return Reply::failure(11000, "DuplicateKey", &format!("duplicate _id: {id}"));
            }
        }

        let inserted_id = document.get("_id").cloned();
        docs.push(document);

        Reply {
            ok: 1,
            n: Some(1),
            inserted_id,
            ..Default::default()
        }
    }

    fn execute_update(state: &mut ServerState, command: &Command) -> Reply {
        let filter = command.body.get("filter").cloned().unwrap_or(Value::Null);
        let Some(update) = command.body.get("update") else {
            return Reply::failure(9, "FailedToParse", "update requires an update document");
        };

        let docs = state
            .collections
            .entry(command.collection.clone())
            .or_default();

        let Some(target) = docs.iter_mut().find(|d| matches_filter(d, &filter)) else {
            return Reply {
                ok: 1,
                n: Some(0),
                n_modified: Some(0),
                ..Default::default()
            };
        };

        let modified = apply_update(target, update);
        Reply {
            ok: 1,
            n: Some(1),
            n_modified: Some(u64::from(modified)),
            ..Default::default()
        }
    }

    fn execute_delete(state: &mut ServerState, command: &Command) -> Reply {
        let filter = command.body.get("filter").cloned().unwrap_or(Value::Null);
        let docs = state
            .collections
            .entry(command.collection.clone())
            .or_default();

        let deleted = match docs.iter().position(|d| matches_filter(d, &filter)) {
            Some(idx) => {
                docs.remove(idx);
                1
            }
            None => 0,
        };

        Reply {
            ok: 1,
            n: Some(deleted),
            ..Default::default()
        }
    }

    fn execute_find(state: &mut ServerState, command: &Command) -> Reply {
        let filter = command.body.get("filter").cloned().unwrap_or(Value::Null);
        let docs = state
            .collections
            .get(&command.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches_filter(d, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Reply {
            ok: 1,
            documents: Some(docs),
            ..Default::default()
        }
    }
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryServer {
    async fn send(&self, command: Command) -> std::result::Result<Reply, NetworkError> {
        let mut state = self.state.lock().await;

        // Faults fire on retried commands too: a rearmed/multi-shot fail
        // point hits both attempts of one logical write.
        let mut pending_wce = None;
        match Self::trigger_fail_point(&mut state, &command.name) {
            Some(FailAction::CloseConnection) => return Err(NetworkError::ConnectionClosed),
            Some(FailAction::ErrorCode(code)) => {
                return Ok(Reply::failure(code, code_name(code), "injected server error"));
            }
            Some(FailAction::WriteConcernError(wce)) => pending_wce = Some(wce),
            None => {}
        }

        let mut reply = match command.txn_id {
            Some(txn_id) => {
                if let Some(recorded) = state.journal.get(&txn_id) {
                    debug!(%txn_id, command = %command.name, "replaying recorded reply");
                    recorded.clone()
                } else {
                    let reply = Self::execute(&mut state, &command);
                    state.journal.insert(txn_id, reply.clone());
                    reply
                }
            }
            None => Self::execute(&mut state, &command),
        };

        if let Some(wce) = pending_wce {
            reply.write_concern_error = Some(wce);
        }
        Ok(reply)
    }
}

/// Equality match on every field of the filter object. `Null` or empty
/// filters match everything.
fn matches_filter(document: &Value, filter: &Value) -> bool {
    match filter.as_object() {
        Some(fields) => fields.iter().all(|(k, v)| document.get(k) == Some(v)),
        None => true,
    }
}

/// `$set`-style field merge; a plain object replaces everything but `_id`.
/// Returns whether the document changed.
fn apply_update(document: &mut Value, update: &Value) -> bool {
    let before = document.clone();
    match update.get("$set").and_then(Value::as_object) {
        Some(set) => {
            if let Some(target) = document.as_object_mut() {
                for (k, v) in set {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
        None => {
            if let (Some(target), Some(replacement)) =
                (document.as_object_mut(), update.as_object())
            {
                let id = target.get("_id").cloned();
                target.clear();
                if let Some(id) = id {
                    target.insert("_id".to_string(), id);
                }
                for (k, v) in replacement {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
    }
    *document != before
}

fn code_name(code: i32) -> &'static str {
    match code {
        6 => "HostUnreachable",
        7 => "HostNotFound",
        64 => "WriteConcernFailed",
        89 => "NetworkTimeout",
        91 => "ShutdownInProgress",
        189 => "PrimarySteppedDown",
        9001 => "SocketException",
        10107 => "NotWritablePrimary",
        11000 => "DuplicateKey",
        11600 => "InterruptedAtShutdown",
        11601 => "Interrupted",
        11602 => "InterruptedDueToReplStateChange",
        13435 => "NotPrimaryNoSecondaryOk",
        13436 => "NotPrimaryOrSecondary",
        _ => "UnknownError",
    }
}
