mod classify;
mod executor;

pub use classify::{
    classify_attempt, classify_top_level, classify_write_concern, AttemptOutcome, ErrorVerdict,
    RETRYABLE_WRITE_CODES,
};
pub use executor::{execute_write, Attempt};
