//! Orchestrates at most one retry per logical write operation.

use tracing::{debug, warn};

use super::classify::{classify_attempt, AttemptOutcome};
use crate::core::{DriverError, Result};
use crate::operation::WriteOperation;
use crate::protocol::Reply;
use crate::transport::Transport;

/// One transport round-trip for a write operation.
#[derive(Debug)]
pub struct Attempt {
    /// 0 = first try, 1 = retry.
    pub index: u8,
    pub outcome: AttemptOutcome,
}

/// Lifecycle of one write execution. The retry budget is encoded in the
/// transitions: `Retrying` can only be entered from `FirstAttemptInFlight`,
/// and whatever the retry produces goes straight to `Done`.
enum RetryState {
    NotStarted,
    FirstAttemptInFlight,
    Retrying,
    Done(AttemptOutcome),
}

/// Execute a write, retrying once on a retryable verdict.
///
/// Both attempts carry the operation's transaction id, so a write that
/// actually applied server-side before a network failure is not duplicated
/// by the retry. The retry attempt's outcome is final whatever its
/// classification; a second retryable failure surfaces as a hard error.
pub async fn execute_write<T: Transport + ?Sized>(
    transport: &T,
    operation: &WriteOperation,
    retry_enabled: bool,
) -> Result<Reply> {
    let mut state = RetryState::NotStarted;
    loop {
        state = match state {
            RetryState::NotStarted => RetryState::FirstAttemptInFlight,

            RetryState::FirstAttemptInFlight => {
                let attempt = run_attempt(transport, operation, 0).await;
                let verdict = classify_attempt(&attempt.outcome);
                if retry_enabled && verdict.is_retryable() {
                    warn!(
                        txn_id = %operation.txn_id(),
                        command = operation.command_name(),
                        attempt = attempt.index,
                        ?verdict,
                        "write attempt failed, retrying once"
                    );
                    RetryState::Retrying
                } else {
                    RetryState::Done(attempt.outcome)
                }
            }

            RetryState::Retrying => {
                let attempt = run_attempt(transport, operation, 1).await;
                // Final regardless of verdict: the retry budget is spent.
                RetryState::Done(attempt.outcome)
            }

            RetryState::Done(outcome) => return surface(outcome),
        };
    }
}

async fn run_attempt<T: Transport + ?Sized>(
    transport: &T,
    operation: &WriteOperation,
    index: u8,
) -> Attempt {
    debug!(
        txn_id = %operation.txn_id(),
        command = operation.command_name(),
        attempt = index,
        "dispatching write attempt"
    );
    let outcome = match transport.send(operation.command()).await {
        Ok(reply) => AttemptOutcome::Reply(reply),
        Err(err) => AttemptOutcome::Network(err),
    };
    Attempt { index, outcome }
}

/// Convert the final attempt outcome into the caller-visible result,
/// unchanged: no downgrade of an error to success, no partial application.
fn surface(outcome: AttemptOutcome) -> Result<Reply> {
    match outcome {
        AttemptOutcome::Network(err) => Err(err.into()),
        AttemptOutcome::Reply(reply) => {
            if let Some(error) = reply.command_error() {
                return Err(DriverError::Command(error));
            }
            if let Some(wce) = reply.write_concern_error.clone() {
                return Err(DriverError::WriteConcern(wce));
            }
            Ok(reply)
        }
    }
}
