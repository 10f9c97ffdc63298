//! The built-in access command set.
//!
//! Each command is a [`crate::command::HostCommand`] mirroring one operation
//! of the host plugin protocol, registered under its wire name.

mod element_search;
mod visibility;
mod warnings;

pub use element_search::ElementSearchCommand;
pub use visibility::HideIsolateCommand;
pub use warnings::GetWarningsCommand;

use std::sync::Arc;

use crate::executor::SerialExecutor;
use crate::registry::{CommandRegistry, RegistryError};

/// Build a registry with every built-in command registered.
pub fn standard_registry(
    executor: Arc<dyn SerialExecutor>,
) -> Result<CommandRegistry, RegistryError> {
    let mut builder = CommandRegistry::builder(executor);
    builder.register(ElementSearchCommand)?;
    builder.register(GetWarningsCommand)?;
    builder.register(HideIsolateCommand)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{EnqueueError, WorkItem};

    struct NoopExecutor;

    impl SerialExecutor for NoopExecutor {
        fn enqueue(&self, _work: WorkItem) -> Result<(), EnqueueError> {
            Ok(())
        }
    }

    #[test]
    fn registers_the_full_command_set() {
        let registry = standard_registry(Arc::new(NoopExecutor)).unwrap();
        assert_eq!(
            registry.command_names(),
            vec!["get_element_id", "get_warnings", "hide_isolate_elements"]
        );
    }

    #[test]
    fn command_timeouts_match_their_budgets() {
        use crate::command::HostCommand;
        use std::time::Duration;

        assert_eq!(ElementSearchCommand.timeout(), Duration::from_secs(15));
        assert_eq!(GetWarningsCommand.timeout(), Duration::from_secs(10));
        assert_eq!(HideIsolateCommand.timeout(), Duration::from_secs(60));
    }
}
