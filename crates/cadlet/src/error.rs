//! Dispatch error taxonomy.
//!
//! Every failure a caller can observe maps to exactly one variant here, and
//! every variant maps to a stable `code` in the failure envelope so transports
//! can distinguish "no answer yet" (timeout) from "answer was an error".

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The router has no bridge registered under this name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Parameters failed schema validation or typed parsing.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The host executor did not complete the work within the call's budget.
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The command ran on the host executor and reported a failure.
    #[error("{0}")]
    Domain(String),

    /// The work item could not be queued at all. Fatal to this call only.
    #[error("could not schedule work on the host executor: {0}")]
    Dispatch(String),

    /// The caller gave up on the request before it completed.
    #[error("request canceled")]
    Canceled,
}

impl DispatchError {
    /// Stable machine-readable code for the failure envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCommand(_) => "unknown_command",
            Self::InvalidParameters(_) => "invalid_parameters",
            Self::Timeout { .. } => "timeout",
            Self::Domain(_) => "domain_failure",
            Self::Dispatch(_) => "dispatch_failure",
            Self::Canceled => "canceled",
        }
    }
}
