//! A command manager bound to one host platform.

use std::sync::Arc;

use arbor::{
    ArgumentParser, Command, CommandBuilder, CommandManager, CommandManagerBuilder, CommandMeta,
    CoordinatorError, ExecutionCoordinator, ExecutionHandle, ManagerSettings, ParserConfig,
    ParserRegistry, PermissionChecker, RegistrationError, TypeTag,
};

use crate::adapter::{NativePermissions, NativeSender, SenderMapper};

/// Wraps a [`CommandManager`] so a platform can talk in its native sender
/// type `N` while the engine works with `S`.
///
/// # Example
///
/// ```rust
/// use arbor_host::{NativeSender, PlatformManager, SenderMapper};
///
/// #[derive(Clone)]
/// struct Console;
///
/// impl NativeSender for Console {
///     fn has_permission(&self, _permission: &str) -> bool {
///         true
///     }
/// }
///
/// let platform = PlatformManager::builder("console", SenderMapper::<Console, Console>::identity())
///     .build()
///     .unwrap();
///
/// let ping = platform
///     .command_builder("ping")
///     .handler(|_: &arbor::Invocation<Console>| "pong")
///     .build()
///     .unwrap();
/// platform.register_command(ping).unwrap();
///
/// let mut handle = platform.execute_native(Console, "ping");
/// assert_eq!(handle.try_take().unwrap().unwrap().to_string(), "pong");
/// ```
pub struct PlatformManager<N, S> {
    platform: String,
    manager: CommandManager<S>,
    mapper: SenderMapper<N, S>,
    default_meta: CommandMeta,
}

impl<N: 'static, S: Send + Sync + 'static> PlatformManager<N, S> {
    pub fn builder(
        platform: impl Into<String>,
        mapper: SenderMapper<N, S>,
    ) -> PlatformManagerBuilder<N, S> {
        PlatformManagerBuilder::new(platform, mapper)
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn manager(&self) -> &CommandManager<S> {
        &self.manager
    }

    pub fn mapper(&self) -> &SenderMapper<N, S> {
        &self.mapper
    }

    /// Metadata every command from [`command_builder`](Self::command_builder)
    /// starts with.
    pub fn default_meta(&self) -> &CommandMeta {
        &self.default_meta
    }

    pub fn command_builder(&self, name: impl Into<String>) -> CommandBuilder<S> {
        self.manager
            .command_builder(name)
            .meta(self.default_meta.clone())
    }

    pub fn register_command(
        &self,
        command: Command<S>,
    ) -> Result<Arc<Command<S>>, RegistrationError> {
        self.manager.register_command(command)
    }

    /// Map the native sender in and execute `input`.
    pub fn execute_native(&self, native: N, input: &str) -> ExecutionHandle {
        tracing::debug!(platform = %self.platform, input, "Executing native input");
        self.manager
            .execute_command(self.mapper.map_in(native), input)
    }

    pub fn suggest_native(&self, native: N, input: &str) -> Vec<String> {
        self.manager.suggest(&self.mapper.map_in(native), input)
    }

    /// Help lines for a native sender.
    pub fn help_native(&self, native: N) -> Vec<String> {
        self.manager.help(&self.mapper.map_in(native))
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`PlatformManager`].
///
/// Permission checks go to the native sender unless
/// [`permissions`](Self::permissions) overrides them.
pub struct PlatformManagerBuilder<N, S> {
    platform: String,
    mapper: SenderMapper<N, S>,
    parsers: ParserRegistry,
    default_meta: CommandMeta,
    permissions: Option<Arc<dyn PermissionChecker<S>>>,
    manager: CommandManagerBuilder<S>,
}

impl<N: 'static, S: Send + Sync + 'static> PlatformManagerBuilder<N, S> {
    pub fn new(platform: impl Into<String>, mapper: SenderMapper<N, S>) -> Self {
        Self {
            platform: platform.into(),
            mapper,
            parsers: ParserRegistry::with_defaults(),
            default_meta: CommandMeta::default(),
            permissions: None,
            manager: CommandManager::builder(),
        }
    }

    /// Register a platform parser on top of the standard ones.
    pub fn parser<F, P>(mut self, tag: impl Into<TypeTag>, factory: F) -> Self
    where
        F: Fn(&ParserConfig) -> P + Send + Sync + 'static,
        P: ArgumentParser + 'static,
    {
        self.parsers.register_parser(tag, factory);
        self
    }

    pub fn default_meta(mut self, meta: CommandMeta) -> Self {
        self.default_meta = meta;
        self
    }

    pub fn permissions(mut self, permissions: impl PermissionChecker<S> + 'static) -> Self {
        self.permissions = Some(Arc::new(permissions));
        self
    }

    pub fn settings(mut self, settings: ManagerSettings) -> Self {
        self.manager = self.manager.settings(settings);
        self
    }

    pub fn coordinator(mut self, coordinator: impl ExecutionCoordinator<S> + 'static) -> Self {
        self.manager = self.manager.coordinator(coordinator);
        self
    }
}

impl<N: NativeSender + 'static, S: Send + Sync + 'static> PlatformManagerBuilder<N, S> {
    pub fn build(self) -> Result<PlatformManager<N, S>, CoordinatorError> {
        let permissions: Arc<dyn PermissionChecker<S>> = match self.permissions {
            Some(permissions) => permissions,
            None => Arc::new(NativePermissions::new(self.mapper.clone())),
        };
        let manager = self
            .manager
            .parsers(self.parsers)
            .shared_permissions(permissions)
            .build()?;

        tracing::info!(platform = %self.platform, "Platform command manager ready");
        Ok(PlatformManager {
            platform: self.platform,
            manager,
            mapper: self.mapper,
            default_meta: self.default_meta,
        })
    }
}
