//! Request routing and in-flight tracking.
//!
//! The router is the single place a transport talks to: it resolves the
//! command, drives the bridge, and wraps every outcome — including its own
//! lookup failures — in the uniform envelope. Each in-flight request carries
//! a cancellation token so a supervisor (or the transport, on client
//! disconnect) can abandon the wait by request id.

use dashmap::DashMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::envelope::ResultEnvelope;
use crate::error::DispatchError;
use crate::protocol::{CommandRequest, CommandResponse};
use crate::registry::CommandRegistry;

pub struct Router {
    registry: CommandRegistry,
    in_flight: DashMap<String, CancellationToken>,
}

impl Router {
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry,
            in_flight: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Resolve and run one request, always producing a response envelope.
    pub async fn dispatch(&self, request: CommandRequest) -> CommandResponse {
        let request_id = if request.request_id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            request.request_id
        };

        let envelope = self
            .execute(&request.command_name, request.parameters, &request_id)
            .await;

        CommandResponse {
            request_id,
            result: envelope.into_value(),
        }
    }

    async fn execute(
        &self,
        command: &str,
        parameters: Value,
        request_id: &str,
    ) -> ResultEnvelope {
        let Some(bridge) = self.registry.bridge(command) else {
            tracing::warn!(command, request_id, "unknown command");
            return ResultEnvelope::failure(&DispatchError::UnknownCommand(command.to_string()));
        };

        tracing::debug!(command, request_id, "dispatching command");
        let cancel = CancellationToken::new();
        let _guard = InFlightGuard::register(&self.in_flight, request_id, cancel.clone());

        let timeout = bridge.command_timeout();
        match bridge.invoke(parameters, timeout, cancel).await {
            Ok(payload) => ResultEnvelope::success(payload),
            Err(err) => {
                tracing::warn!(
                    command,
                    request_id,
                    code = err.code(),
                    error = %err,
                    "command failed"
                );
                ResultEnvelope::failure(&err)
            }
        }
    }

    /// Signal the cancellation token of an in-flight request. Returns false
    /// when no such request is waiting.
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.in_flight.get(request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Removes the in-flight entry even when the dispatch future is dropped
/// mid-wait (client disconnect).
struct InFlightGuard<'a> {
    map: &'a DashMap<String, CancellationToken>,
    request_id: String,
}

impl<'a> InFlightGuard<'a> {
    fn register(
        map: &'a DashMap<String, CancellationToken>,
        request_id: &str,
        token: CancellationToken,
    ) -> Self {
        map.insert(request_id.to_string(), token);
        Self {
            map,
            request_id: request_id.to_string(),
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.request_id);
    }
}
