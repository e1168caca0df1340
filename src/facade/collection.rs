use std::sync::Arc;

use serde_json::{json, Value};

use crate::core::{DriverError, Result};
use crate::operation::{DeleteResult, InsertOneResult, UpdateResult, WriteOperation};
use crate::protocol::Command;
use crate::retry::execute_write;
use crate::transport::Transport;

/// Handle to a named collection.
///
/// Each write call builds one `WriteOperation` and runs it through the retry
/// executor; already-persisted documents are never touched beyond the single
/// write being attempted. Handles are cheap to clone and independent calls
/// share no retry state.
#[derive(Clone)]
pub struct Collection {
    name: String,
    transport: Arc<dyn Transport>,
    retry_writes: bool,
}

impl Collection {
    pub(crate) fn new(name: &str, transport: Arc<dyn Transport>, retry_writes: bool) -> Self {
        Self {
            name: name.to_string(),
            transport,
            retry_writes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a single document, returning its id.
    pub async fn insert_one(&self, document: Value) -> Result<InsertOneResult> {
        if !document.is_object() {
            return Err(DriverError::InvalidArgument(
                "document must be a JSON object".to_string(),
            ));
        }
        let op = WriteOperation::insert_one(&self.name, document);
        let reply = execute_write(self.transport.as_ref(), &op, self.retry_writes).await?;
        InsertOneResult::from_reply(&reply)
    }

    /// Update the first document matching the filter.
    pub async fn update_one(&self, filter: Value, update: Value) -> Result<UpdateResult> {
        let op = WriteOperation::update_one(&self.name, filter, update);
        let reply = execute_write(self.transport.as_ref(), &op, self.retry_writes).await?;
        UpdateResult::from_reply(&reply)
    }

    /// Delete the first document matching the filter.
    pub async fn delete_one(&self, filter: Value) -> Result<DeleteResult> {
        let op = WriteOperation::delete_one(&self.name, filter);
        let reply = execute_write(self.transport.as_ref(), &op, self.retry_writes).await?;
        DeleteResult::from_reply(&reply)
    }

    /// All documents in the collection, in insertion order. Reads carry no
    /// idempotency token and are never retried.
    pub async fn find_all(&self) -> Result<Vec<Value>> {
        let reply = self
            .transport
            .send(Command {
                name: "find".to_string(),
                collection: self.name.clone(),
                body: json!({}),
                txn_id: None,
            })
            .await?;
        if let Some(error) = reply.command_error() {
            return Err(DriverError::Command(error));
        }
        reply
            .documents
            .ok_or_else(|| DriverError::InvalidResponse("find reply has no documents".into()))
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.find_all().await?.len())
    }
}
