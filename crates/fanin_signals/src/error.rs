use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("Signal not set within timeout. timeout: {timeout:?}")]
    TimedOut { timeout: Duration },
}
