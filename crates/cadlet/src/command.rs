//! The execution-context-adapter contract.
//!
//! A [`HostCommand`] is the only code allowed to touch host-owned state, and
//! it runs exclusively on the host executor thread. The bridge ships its
//! parameters over and converts whatever it returns into the result envelope.

use std::time::Duration;

use serde_json::Value;

use crate::error::DispatchError;
use crate::host::HostSession;

pub trait HostCommand: Send + Sync + 'static {
    /// Protocol name the router registers this command under.
    fn name(&self) -> &'static str;

    /// Wait budget the router grants each invocation of this command.
    fn timeout(&self) -> Duration;

    /// JSON schema for the parameter object, checked before dispatch.
    fn parameter_schema(&self) -> Option<Value> {
        None
    }

    /// Perform the operation against host state.
    ///
    /// Runs on the host executor thread, never concurrently with another
    /// command. Errors must be returned, not panicked: a returned error
    /// becomes a failure envelope, while a panic is contained by the executor
    /// and reported as a generic failure.
    fn run(&self, parameters: Value, host: &mut HostSession) -> Result<Value, CommandError>;
}

/// Failure produced by a command while parsing parameters or operating on
/// host state.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidParameters(err.to_string())
    }
}

impl From<CommandError> for DispatchError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::InvalidParameters(message) => Self::InvalidParameters(message),
            CommandError::Failed(message) => Self::Domain(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_errors_become_invalid_parameters() {
        let err = serde_json::from_value::<u32>(serde_json::json!("nope")).unwrap_err();
        let command_err = CommandError::from(err);
        assert!(matches!(command_err, CommandError::InvalidParameters(_)));

        let dispatch_err = DispatchError::from(command_err);
        assert_eq!(dispatch_err.code(), "invalid_parameters");
    }

    #[test]
    fn failures_become_domain_errors() {
        let err = DispatchError::from(CommandError::failed("no active view"));
        assert_eq!(err.code(), "domain_failure");
        assert_eq!(err.to_string(), "no active view");
    }
}
