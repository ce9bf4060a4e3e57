use crate::error::CommandError;
use crate::invocation::Invocation;

use super::{ExecutionCoordinator, ExecutionHandle};

/// Runs the handler on the calling thread before returning.
///
/// The returned handle is always finished.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateCoordinator;

impl<S: 'static> ExecutionCoordinator<S> for ImmediateCoordinator {
    fn coordinate(&self, invocation: Invocation<S>) -> ExecutionHandle {
        let result = invocation.run().map_err(CommandError::Handler);
        if let Err(err) = &result {
            tracing::warn!(
                command = %invocation.command().syntax(),
                error = %err,
                "Command failed"
            );
        }
        ExecutionHandle::ready(result)
    }
}
