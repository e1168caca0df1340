mod error;

pub use error::{CommandError, DriverError, Result, WriteConcernError};
