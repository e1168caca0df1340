//! Write operations and their result shapes.
//!
//! One `WriteOperation` is created per application call. Its transaction id
//! is assigned at construction and never changes, so a retried attempt is
//! recognizable server-side as the same logical write.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::{DriverError, Result};
use crate::protocol::{Command, Reply};

/// The write variants the driver dispatches.
#[derive(Debug, Clone)]
pub enum WriteCommand {
    InsertOne { document: Value },
    UpdateOne { filter: Value, update: Value },
    DeleteOne { filter: Value },
}

impl WriteCommand {
    /// Wire command name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InsertOne { .. } => "insert",
            Self::UpdateOne { .. } => "update",
            Self::DeleteOne { .. } => "delete",
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::InsertOne { document } => json!({ "document": document }),
            Self::UpdateOne { filter, update } => json!({ "filter": filter, "update": update }),
            Self::DeleteOne { filter } => json!({ "filter": filter }),
        }
    }
}

/// One logical write: immutable after creation, destroyed when the call
/// returns. Both attempts of a retried write are built from the same
/// operation and therefore carry the same transaction id.
#[derive(Debug, Clone)]
pub struct WriteOperation {
    collection: String,
    command: WriteCommand,
    txn_id: Uuid,
}

impl WriteOperation {
    pub fn new(collection: &str, command: WriteCommand) -> Self {
        Self {
            collection: collection.to_string(),
            command,
            txn_id: Uuid::new_v4(),
        }
    }

    /// Insert operation. A missing `_id` is filled in here, before the
    /// operation exists, so both attempts insert the identical document.
    pub fn insert_one(collection: &str, mut document: Value) -> Self {
        if let Some(fields) = document.as_object_mut() {
            fields
                .entry("_id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        }
        Self::new(collection, WriteCommand::InsertOne { document })
    }

    pub fn update_one(collection: &str, filter: Value, update: Value) -> Self {
        Self::new(collection, WriteCommand::UpdateOne { filter, update })
    }

    pub fn delete_one(collection: &str, filter: Value) -> Self {
        Self::new(collection, WriteCommand::DeleteOne { filter })
    }

    pub fn txn_id(&self) -> Uuid {
        self.txn_id
    }

    pub fn command_name(&self) -> &'static str {
        self.command.name()
    }

    /// Build the outbound command. Called once per attempt; every field,
    /// including the transaction id, is identical across attempts.
    pub fn command(&self) -> Command {
        Command {
            name: self.command.name().to_string(),
            collection: self.collection.clone(),
            body: self.command.body(),
            txn_id: Some(self.txn_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    pub inserted_id: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

impl InsertOneResult {
    pub(crate) fn from_reply(reply: &Reply) -> Result<Self> {
        let inserted_id = reply
            .inserted_id
            .clone()
            .ok_or_else(|| DriverError::InvalidResponse("insert reply has no insertedId".into()))?;
        Ok(Self { inserted_id })
    }
}

impl UpdateResult {
    pub(crate) fn from_reply(reply: &Reply) -> Result<Self> {
        Ok(Self {
            matched_count: reply
                .n
                .ok_or_else(|| DriverError::InvalidResponse("update reply has no n".into()))?,
            modified_count: reply.n_modified.unwrap_or(0),
        })
    }
}

impl DeleteResult {
    pub(crate) fn from_reply(reply: &Reply) -> Result<Self> {
        Ok(Self {
            deleted_count: reply
                .n
                .ok_or_else(|| DriverError::InvalidResponse("delete reply has no n".into()))?,
        })
    }
}
