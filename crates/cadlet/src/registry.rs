//! Command registration.
//!
//! Commands are registered once at startup into an immutable registry that
//! the router holds by value — there is no ambient global table. Each entry
//! pairs the command with a compiled parameter validator and a bridge bound
//! to the host executor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bridge::DispatchBridge;
use crate::command::HostCommand;
use crate::executor::SerialExecutor;
use crate::validation::{ParameterSchema, SchemaError};

pub struct CommandRegistry {
    bridges: HashMap<&'static str, Arc<DispatchBridge>>,
}

impl CommandRegistry {
    pub fn builder(executor: Arc<dyn SerialExecutor>) -> CommandRegistryBuilder {
        CommandRegistryBuilder {
            executor,
            bridges: HashMap::new(),
        }
    }

    pub fn bridge(&self, name: &str) -> Option<&Arc<DispatchBridge>> {
        self.bridges.get(name)
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.bridges.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}

pub struct CommandRegistryBuilder {
    executor: Arc<dyn SerialExecutor>,
    bridges: HashMap<&'static str, Arc<DispatchBridge>>,
}

impl std::fmt::Debug for CommandRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistryBuilder")
            .field("commands", &self.bridges.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CommandRegistryBuilder {
    pub fn register(&mut self, command: impl HostCommand) -> Result<&mut Self, RegistryError> {
        let command: Arc<dyn HostCommand> = Arc::new(command);
        let name = command.name();
        if self.bridges.contains_key(name) {
            return Err(RegistryError::DuplicateCommand(name));
        }

        let schema = match command.parameter_schema() {
            Some(schema) => Some(
                ParameterSchema::compile(&schema)
                    .map_err(|source| RegistryError::Schema { command: name, source })?,
            ),
            None => None,
        };

        self.bridges.insert(
            name,
            Arc::new(DispatchBridge::new(
                command,
                Arc::clone(&self.executor),
                schema,
            )),
        );
        Ok(self)
    }

    pub fn build(self) -> CommandRegistry {
        CommandRegistry {
            bridges: self.bridges,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("command `{0}` is already registered")]
    DuplicateCommand(&'static str),

    #[error("command `{command}` has an invalid parameter schema: {source}")]
    Schema {
        command: &'static str,
        #[source]
        source: SchemaError,
    },
}
