//! The synchronous cross-thread dispatch bridge.
//!
//! Adapts the host's enqueue-only scheduling primitive into a call contract a
//! request task can await with a bounded timeout. Every invocation gets a
//! fresh completion channel, so a work item that runs late — after its caller
//! timed out or canceled — signals into a dropped receiver and can never
//! reach a later call's result slot. The executor side wraps the command in a
//! [`CompletionGuard`] that signals exactly once on every exit path,
//! including unwinding; a caller can therefore never wait past the point the
//! work actually ran.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;

use crate::command::{CommandError, HostCommand};
use crate::error::DispatchError;
use crate::executor::{SerialExecutor, WorkItem};
use crate::protocol::InvocationId;
use crate::validation::ParameterSchema;

type Completion = Result<Value, CommandError>;

/// Per-command adapter between request tasks and the host executor.
pub struct DispatchBridge {
    command: Arc<dyn HostCommand>,
    executor: Arc<dyn SerialExecutor>,
    schema: Option<ParameterSchema>,
    /// One invocation in flight per bridge; later calls wait here.
    serial: Mutex<()>,
}

impl DispatchBridge {
    pub(crate) fn new(
        command: Arc<dyn HostCommand>,
        executor: Arc<dyn SerialExecutor>,
        schema: Option<ParameterSchema>,
    ) -> Self {
        Self {
            command,
            executor,
            schema,
            serial: Mutex::new(()),
        }
    }

    pub fn command_name(&self) -> &'static str {
        self.command.name()
    }

    pub fn command_timeout(&self) -> Duration {
        self.command.timeout()
    }

    /// Queue the command on the host executor and wait for its result, for at
    /// most `timeout`.
    ///
    /// Returns `Timeout` when the executor did not answer in time, `Canceled`
    /// when `cancel` fired first; in either case the work item may still run
    /// later, and its result is discarded.
    pub async fn invoke(
        &self,
        parameters: Value,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Value, DispatchError> {
        // Transports deliver "no parameters" as null; commands parse objects.
        let parameters = match parameters {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };

        if let Some(schema) = &self.schema {
            schema.check(&parameters)?;
        }

        let _serial = self.serial.lock().await;

        let invocation = InvocationId::new();
        let name = self.command.name();
        let (tx, rx) = oneshot::channel::<Completion>();

        let command = Arc::clone(&self.command);
        let work: WorkItem = Box::new(move |session| {
            let completion = CompletionGuard::new(invocation, name, tx);
            let result = command.run(parameters, session);
            completion.finish(result);
        });

        self.executor
            .enqueue(work)
            .map_err(|err| DispatchError::Dispatch(err.to_string()))?;
        tracing::trace!(command = name, %invocation, "work item queued");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(command = name, %invocation, "invocation canceled by caller");
                Err(DispatchError::Canceled)
            }
            outcome = tokio::time::timeout(timeout, rx) => match outcome {
                Err(_) => {
                    tracing::warn!(command = name, %invocation, ?timeout, "invocation timed out");
                    Err(DispatchError::Timeout {
                        command: name.to_string(),
                        timeout,
                    })
                }
                // The executor dropped the work item without running it
                // (e.g. it shut down with the item still queued).
                Ok(Err(_)) => Err(DispatchError::Dispatch(
                    "host executor dropped the invocation".to_string(),
                )),
                Ok(Ok(Ok(value))) => Ok(value),
                Ok(Ok(Err(err))) => Err(err.into()),
            },
        }
    }
}

/// Signals the pending invocation exactly once, on every exit path out of the
/// work item — normal return, domain error, or unwind.
struct CompletionGuard {
    invocation: InvocationId,
    command: &'static str,
    tx: Option<oneshot::Sender<Completion>>,
}

impl CompletionGuard {
    fn new(invocation: InvocationId, command: &'static str, tx: oneshot::Sender<Completion>) -> Self {
        Self {
            invocation,
            command,
            tx: Some(tx),
        }
    }

    fn finish(mut self, result: Completion) {
        if let Some(tx) = self.tx.take() {
            Self::send(self.invocation, self.command, tx, result);
        }
    }

    fn send(
        invocation: InvocationId,
        command: &'static str,
        tx: oneshot::Sender<Completion>,
        result: Completion,
    ) {
        if tx.send(result).is_err() {
            // The caller stopped waiting (timeout or cancel). Nothing to
            // deliver to; the fresh-channel-per-call design makes this safe.
            tracing::debug!(command, %invocation, "discarding completion for abandoned invocation");
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let message = if std::thread::panicking() {
                "command panicked on the host executor"
            } else {
                "command finished without signaling completion"
            };
            Self::send(
                self.invocation,
                self.command,
                tx,
                Err(CommandError::failed(message)),
            );
        }
    }
}
