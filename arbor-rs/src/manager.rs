//! The command manager: the façade host code talks to.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::command::{Command, CommandBuilder};
use crate::coordinator::{
    ExecutionCoordinator, ExecutionHandle, ImmediateCoordinator, ScheduledCoordinator,
};
use crate::error::{CoordinatorError, RegistrationError, ResolveError};
use crate::invocation::Invocation;
use crate::parser::{ArgumentParser, ParserConfig, ParserRegistry, TypeTag};
use crate::permission::{PermissionChecker, PermissionPolicy};
use crate::settings::{CoordinatorSettings, ManagerSettings};
use crate::suggest::suggest;
use crate::syntax::help_line;
use crate::tokenize::{tokenize, tokenize_partial};
use crate::tree::{Access, CommandTree};

/// Owns the command tree, the parser registry, the host permission check and
/// the execution coordinator.
///
/// Registration is serialized; resolution works on an immutable snapshot of
/// the tree, so any number of senders can resolve concurrently without
/// blocking each other or a registration in progress.
pub struct CommandManager<S> {
    tree: RwLock<Arc<CommandTree<S>>>,
    writer: Mutex<()>,
    parsers: RwLock<ParserRegistry>,
    permissions: Arc<dyn PermissionChecker<S>>,
    coordinator: Arc<dyn ExecutionCoordinator<S>>,
    settings: ManagerSettings,
}

impl<S: Send + Sync + 'static> CommandManager<S> {
    pub fn builder() -> CommandManagerBuilder<S> {
        CommandManagerBuilder::new()
    }

    /// Manager with default settings, standard parsers and an immediate
    /// coordinator.
    pub fn new(permissions: impl PermissionChecker<S> + 'static) -> Self {
        Self::from_parts(
            Arc::new(permissions),
            Arc::new(ImmediateCoordinator),
            ParserRegistry::with_defaults(),
            ManagerSettings::default(),
        )
    }

    fn from_parts(
        permissions: Arc<dyn PermissionChecker<S>>,
        coordinator: Arc<dyn ExecutionCoordinator<S>>,
        parsers: ParserRegistry,
        settings: ManagerSettings,
    ) -> Self {
        Self {
            tree: RwLock::new(Arc::new(CommandTree::new())),
            writer: Mutex::new(()),
            parsers: RwLock::new(parsers),
            permissions,
            coordinator,
            settings,
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    pub fn command_builder(&self, name: impl Into<String>) -> CommandBuilder<S> {
        CommandBuilder::new(name)
    }

    /// Insert a command into the tree.
    ///
    /// Fails without touching the tree if the command is misconfigured or
    /// would make resolution ambiguous.
    pub fn register_command(&self, command: Command<S>) -> Result<Arc<Command<S>>, RegistrationError> {
        let command = Arc::new(command);
        let _writer = self.writer.lock();

        let mut next: CommandTree<S> = (*self.tree()).clone();
        let result = next.insert(Arc::clone(&command), &self.parsers.read());

        match result {
            Ok(()) => {
                *self.tree.write() = Arc::new(next);
                tracing::info!(
                    command = %command.syntax(),
                    namespace = command.namespace(),
                    "Command registered"
                );
                Ok(command)
            }
            Err(err) => {
                tracing::warn!(
                    command = %command.syntax(),
                    error = %err,
                    "Command registration rejected"
                );
                Err(err)
            }
        }
    }

    /// Register a parser factory; later registrations for a tag win.
    ///
    /// Only affects commands registered afterwards.
    pub fn register_parser<F, P>(&self, tag: impl Into<TypeTag>, factory: F)
    where
        F: Fn(&ParserConfig) -> P + Send + Sync + 'static,
        P: ArgumentParser + 'static,
    {
        self.parsers.write().register_parser(tag, factory);
    }

    pub fn has_parser(&self, tag: &TypeTag) -> bool {
        self.parsers.read().contains(tag)
    }

    /// Current tree snapshot.
    pub fn tree(&self) -> Arc<CommandTree<S>> {
        self.tree.read().clone()
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    /// Ask the host whether `sender` holds `permission`.
    pub fn has_permission(&self, sender: &S, permission: &str) -> bool {
        self.permissions.has_permission(sender, permission)
    }

    fn check<'a>(&'a self, sender: &'a S) -> impl Fn(&str) -> bool + 'a {
        move |permission: &str| self.permissions.has_permission(sender, permission)
    }

    // ========================================================================
    // Resolution and Execution
    // ========================================================================

    /// Resolve input without running anything.
    pub fn resolve(&self, sender: S, input: &str) -> Result<Invocation<S>, ResolveError> {
        let tokens = tokenize(input);
        let tree = self.tree();
        let resolved = tree
            .resolve(
                &sender,
                &tokens,
                self.permissions.as_ref(),
                self.settings.permission_policy,
            )
            .inspect_err(|err| tracing::debug!(input, error = %err, "Resolution failed"))?;
        Ok(Invocation::new(sender, resolved.command, resolved.values, input))
    }

    /// Resolve input and hand the invocation to the coordinator.
    ///
    /// Resolution failures come back through the handle like handler failures.
    pub fn execute_command(&self, sender: S, input: &str) -> ExecutionHandle {
        match self.resolve(sender, input) {
            Ok(invocation) => self.coordinator.coordinate(invocation),
            Err(err) => ExecutionHandle::ready(Err(err.into())),
        }
    }

    /// Completion candidates for the last, possibly empty, token of `input`.
    pub fn suggest(&self, sender: &S, input: &str) -> Vec<String> {
        let tokens = tokenize_partial(input);
        let check = self.check(sender);
        let access = Access {
            check: &check,
            policy: self.settings.permission_policy,
        };
        suggest(&self.tree(), &tokens, access, self.settings.max_suggestions)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Registered commands in registration order.
    pub fn commands(&self) -> Vec<Arc<Command<S>>> {
        self.tree().commands().to_vec()
    }

    /// Commands that are not hidden and whose permissions `sender` holds.
    pub fn visible_commands(&self, sender: &S) -> Vec<Arc<Command<S>>> {
        let check = self.check(sender);
        self.tree()
            .commands()
            .iter()
            .filter(|command| !command.meta().hidden)
            .filter(|command| command.required_permission().test(&check))
            .cloned()
            .collect()
    }

    /// `syntax - description` lines for the sender's visible commands, sorted.
    pub fn help(&self, sender: &S) -> Vec<String> {
        let mut lines: Vec<String> = self
            .visible_commands(sender)
            .iter()
            .map(|command| help_line(&command.syntax(), command.meta().description.as_deref()))
            .collect();
        lines.sort();
        lines
    }

    /// Syntax of the visible commands below the point where `error` stopped.
    pub fn syntax_hints(&self, sender: &S, error: &ResolveError) -> Vec<String> {
        let check = self.check(sender);
        let mut hints: Vec<String> = self
            .tree()
            .commands_under(error.path())
            .iter()
            .filter(|command| !command.meta().hidden)
            .filter(|command| command.required_permission().test(&check))
            .map(|command| command.syntax())
            .collect();
        hints.sort();
        hints
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`CommandManager`].
///
/// Without [`permissions`](Self::permissions) every permission check passes.
/// Without [`coordinator`](Self::coordinator) the coordinator is created from
/// the settings.
pub struct CommandManagerBuilder<S> {
    permissions: Option<Arc<dyn PermissionChecker<S>>>,
    coordinator: Option<Arc<dyn ExecutionCoordinator<S>>>,
    parsers: Option<ParserRegistry>,
    settings: ManagerSettings,
}

impl<S: Send + Sync + 'static> CommandManagerBuilder<S> {
    pub fn new() -> Self {
        Self {
            permissions: None,
            coordinator: None,
            parsers: None,
            settings: ManagerSettings::default(),
        }
    }

    pub fn permissions(mut self, permissions: impl PermissionChecker<S> + 'static) -> Self {
        self.permissions = Some(Arc::new(permissions));
        self
    }

    pub fn shared_permissions(mut self, permissions: Arc<dyn PermissionChecker<S>>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn coordinator(mut self, coordinator: impl ExecutionCoordinator<S> + 'static) -> Self {
        self.coordinator = Some(Arc::new(coordinator));
        self
    }

    pub fn shared_coordinator(mut self, coordinator: Arc<dyn ExecutionCoordinator<S>>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Replace the standard parser registry.
    pub fn parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = Some(parsers);
        self
    }

    pub fn settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn permission_policy(mut self, policy: PermissionPolicy) -> Self {
        self.settings.permission_policy = policy;
        self
    }

    /// Fails when a scheduled coordinator is configured without a tokio
    /// runtime or with zero workers.
    pub fn build(self) -> Result<CommandManager<S>, CoordinatorError> {
        let coordinator: Arc<dyn ExecutionCoordinator<S>> = match self.coordinator {
            Some(coordinator) => coordinator,
            None => match self.settings.coordinator {
                CoordinatorSettings::Immediate => Arc::new(ImmediateCoordinator),
                CoordinatorSettings::Scheduled { workers } => {
                    Arc::new(ScheduledCoordinator::new(workers)?)
                }
            },
        };
        let permissions: Arc<dyn PermissionChecker<S>> = match self.permissions {
            Some(permissions) => permissions,
            None => Arc::new(|_: &S, _: &str| true),
        };
        let parsers = self.parsers.unwrap_or_else(ParserRegistry::with_defaults);

        Ok(CommandManager::from_parts(
            permissions,
            coordinator,
            parsers,
            self.settings,
        ))
    }
}

impl<S: Send + Sync + 'static> Default for CommandManagerBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder_allows_everything() {
        let manager = CommandManager::<String>::builder().build().unwrap();
        assert!(manager.has_permission(&"anyone".to_string(), "admin.everything"));
        assert!(manager.has_parser(&TypeTag::INTEGER));
    }

    #[test]
    fn test_scheduled_settings_require_runtime() {
        let result = CommandManager::<String>::builder()
            .settings(ManagerSettings::scheduled(2))
            .build();
        assert!(matches!(result, Err(CoordinatorError::NoRuntime)));
    }

    #[test]
    fn test_register_parser_after_construction() {
        let manager = CommandManager::new(|_: &(), _: &str| true);
        assert!(!manager.has_parser(&TypeTag::new("world")));
        manager.register_parser("world", |_: &ParserConfig| {
            crate::parser::StringParser::new(crate::parser::StringMode::Single)
        });
        assert!(manager.has_parser(&TypeTag::new("world")));
    }
}
