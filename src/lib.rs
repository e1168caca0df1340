// ============================================================================
// RustDocDB Driver Library
// ============================================================================

pub mod core;
pub mod protocol;
pub mod transport;
pub mod operation;
pub mod connection;
pub mod facade;
pub mod retry;

// Re-export main types for convenience
pub use self::core::{CommandError, DriverError, Result, WriteConcernError};
pub use facade::Collection;
pub use operation::{DeleteResult, InsertOneResult, UpdateResult, WriteOperation};
pub use retry::{ErrorVerdict, RETRYABLE_WRITE_CODES};

// Re-export connection API
pub use connection::config::ConnectionConfig;
pub use transport::{
    memory::{FailAction, FailPoint, MemoryServer},
    NetworkError, Transport,
};

use std::sync::Arc;

/// Database client with automatic retryable writes
///
/// Every write issued through a client carries a per-operation transaction
/// identifier and is retried at most once when it fails for a retryable
/// reason (connection drop, primary step-down, retryable write concern
/// error). Non-retryable failures, and any failure of the retry attempt
/// itself, surface unchanged.
///
/// # Examples
///
/// ```
/// use rustdocdb::Client;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let (client, _server) = Client::memory();
/// let people = client.collection("people");
///
/// let result = people.insert_one(json!({ "_id": 1, "name": "Alice" })).await?;
/// assert_eq!(result.inserted_id, json!(1));
/// assert_eq!(people.count().await?, 1);
/// # Ok::<(), rustdocdb::DriverError>(())
/// # }).unwrap();
/// ```
pub struct Client {
    transport: Arc<dyn Transport>,
    config: ConnectionConfig,
}

impl Client {
    /// Create a client over an existing transport
    ///
    /// The transport owns connection handling; the client layers retryable
    /// write semantics on top of it.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        config: ConnectionConfig,
    ) -> Result<Self> {
        config.validate().map_err(DriverError::InvalidArgument)?;
        Ok(Self { transport, config })
    }

    /// Create a client backed by a fresh in-memory server
    ///
    /// Returns the server handle too, so callers can seed collections and
    /// arm fail points.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustdocdb::{Client, FailAction, FailPoint};
    ///
    /// # tokio_test::block_on(async {
    /// let (client, server) = Client::memory();
    /// server
    ///     .configure_fail_point(FailPoint::new("insert", 1, FailAction::CloseConnection))
    ///     .await;
    ///
    /// // The one injected fault is absorbed by the retry.
    /// let result = client
    ///     .collection("people")
    ///     .insert_one(serde_json::json!({ "_id": 1 }))
    ///     .await;
    /// assert!(result.is_ok());
    /// # });
    /// ```
    pub fn memory() -> (Self, Arc<MemoryServer>) {
        let server = Arc::new(MemoryServer::new());
        let client = Self {
            transport: server.clone(),
            config: ConnectionConfig::default(),
        };
        (client, server)
    }

    /// Get a handle to a named collection
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(name, Arc::clone(&self.transport), self.config.retry_writes)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}
