pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{Command, Reply};

/// Connection-level failure: the command may or may not have executed
/// server-side. A timed-out or cancelled attempt is indistinguishable from a
/// dropped connection, so it is modeled the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("connection reset by peer")]
    ConnectionReset,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out waiting for server reply")]
    Timeout,
}

/// Sends one encoded command to a server and returns the decoded reply.
///
/// Implementations own whatever locking their connection handling needs;
/// callers issue independent commands concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, command: Command) -> std::result::Result<Reply, NetworkError>;
}
