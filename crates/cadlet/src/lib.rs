//! cadlet: command execution bridge for driving a single-threaded CAD host.
//!
//! Request tasks never touch host state directly. Every command is marshaled
//! onto the host's serial execution context through a dispatch bridge,
//! awaited with a bounded timeout, and answered with a uniform JSON envelope.
//!
//! Architecture:
//! - [`router`]: maps command names to bridges, tracks in-flight requests
//! - [`bridge`]: the cross-thread request/response bridge
//! - [`executor`]: the host's single-threaded execution context
//! - [`commands`]: the built-in access command set
//! - [`transport`]: framed-JSON TCP server for external clients

pub mod bridge;
pub mod codec;
pub mod command;
pub mod commands;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod host;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod transport;
pub mod validation;

pub use bridge::DispatchBridge;
pub use command::{CommandError, HostCommand};
pub use commands::{
    ElementSearchCommand, GetWarningsCommand, HideIsolateCommand, standard_registry,
};
pub use envelope::ResultEnvelope;
pub use error::DispatchError;
pub use executor::{EnqueueError, HostExecutor, SerialExecutor, WorkItem};
pub use host::HostSession;
pub use host::document::Document;
pub use protocol::{CommandRequest, CommandResponse, InvocationId};
pub use registry::{CommandRegistry, RegistryError};
pub use router::Router;

pub const CADLET_VERSION: &str = env!("CARGO_PKG_VERSION");
