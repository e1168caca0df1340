//! Maps a raw attempt outcome to a semantic verdict.
//!
//! Two independent classifications feed one verdict: the top-level result of
//! the reply, and the `writeConcernError` sub-document it may carry. A reply
//! can be `ok: 1` and still signal a retryable condition through its write
//! concern error; the two paths must not be conflated.

use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::core::WriteConcernError;
use crate::protocol::Reply;
use crate::transport::NetworkError;

lazy_static! {
    /// Server error codes a write may be retried on, top-level or inside a
    /// `writeConcernError`. 11601 (Interrupted) and 64 (WriteConcernFailed)
    /// are deliberately absent.
    pub static ref RETRYABLE_WRITE_CODES: HashSet<i32> = {
        let mut codes = HashSet::new();
        codes.insert(6); // HostUnreachable
        codes.insert(7); // HostNotFound
        codes.insert(89); // NetworkTimeout
        codes.insert(91); // ShutdownInProgress
        codes.insert(189); // PrimarySteppedDown
        codes.insert(9001); // SocketException
        codes.insert(10107); // NotWritablePrimary
        codes.insert(11600); // InterruptedAtShutdown
        codes.insert(11602); // InterruptedDueToReplStateChange
        codes.insert(13435); // NotPrimaryNoSecondaryOk
        codes.insert(13436); // NotPrimaryOrSecondary
        codes
    };
}

/// Semantic classification of one attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorVerdict {
    Success,
    RetryableNetworkError,
    RetryableServerError,
    WriteConcernErrorRetryable,
    WriteConcernErrorNonRetryable,
    NonRetryable,
}

impl ErrorVerdict {
    /// Whether the Retry Executor may absorb this verdict for a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RetryableNetworkError
                | Self::RetryableServerError
                | Self::WriteConcernErrorRetryable
        )
    }
}

/// Raw outcome of one transport round-trip.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Reply(Reply),
    Network(NetworkError),
}

/// Whether an error message belongs to a retryable family even when its code
/// is not in the retryable set (pre-code-era server responses).
fn message_is_retryable(message: &str) -> bool {
    message.contains("not master") || message.contains("node is shutting down")
}

/// Classify the top-level result of a reply, ignoring any write concern
/// error it carries.
pub fn classify_top_level(reply: &Reply) -> ErrorVerdict {
    if reply.is_ok() {
        return ErrorVerdict::Success;
    }
    let retryable = reply
        .code
        .is_some_and(|code| RETRYABLE_WRITE_CODES.contains(&code))
        || reply.errmsg.as_deref().is_some_and(message_is_retryable);
    if retryable {
        ErrorVerdict::RetryableServerError
    } else {
        ErrorVerdict::NonRetryable
    }
}

/// Classify a `writeConcernError` sub-document, independently of the
/// top-level result of the reply carrying it.
pub fn classify_write_concern(wce: &WriteConcernError) -> ErrorVerdict {
    if RETRYABLE_WRITE_CODES.contains(&wce.code) || message_is_retryable(&wce.message) {
        ErrorVerdict::WriteConcernErrorRetryable
    } else {
        ErrorVerdict::WriteConcernErrorNonRetryable
    }
}

/// Compose the classifications of a full attempt outcome.
///
/// Transport failures are always retryable: the command may have executed
/// server-side, and the transaction id makes the replay safe.
pub fn classify_attempt(outcome: &AttemptOutcome) -> ErrorVerdict {
    match outcome {
        AttemptOutcome::Network(_) => ErrorVerdict::RetryableNetworkError,
        AttemptOutcome::Reply(reply) => match classify_top_level(reply) {
            ErrorVerdict::Success => match &reply.write_concern_error {
                Some(wce) => classify_write_concern(wce),
                None => ErrorVerdict::Success,
            },
            verdict => verdict,
        },
    }
}
