//! Commands: the unit of registration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::argument::{ArgumentKind, ArgumentSpec, FlagSpec};
use crate::error::ConfigurationError;
use crate::invocation::Invocation;
use crate::parser::TypeTag;
use crate::permission::Permission;
use crate::{CommandResult, IntoOutcome, Output};

// ============================================================================
// Handler Trait
// ============================================================================

/// Runs a resolved invocation.
///
/// Implemented for any `Fn(&Invocation<S>) -> R` where `R: IntoOutcome`, so
/// handlers can return `()`, `String`, `Output` or `CommandResult<T>`.
pub trait CommandHandler<S>: Send + Sync + 'static {
    fn handle(&self, invocation: &Invocation<S>) -> CommandResult<Output>;
}

impl<S, F, R> CommandHandler<S> for F
where
    F: Fn(&Invocation<S>) -> R + Send + Sync + 'static,
    R: IntoOutcome,
{
    fn handle(&self, invocation: &Invocation<S>) -> CommandResult<Output> {
        self(invocation).into_outcome()
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Platform-opaque command metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandMeta {
    pub description: Option<String>,
    /// Hidden commands still resolve but are left out of help and listings.
    pub hidden: bool,
    pub extra: BTreeMap<String, String>,
}

impl CommandMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

// ============================================================================
// Command
// ============================================================================

/// Immutable command: argument descriptors, handler, permission and metadata.
pub struct Command<S> {
    arguments: Vec<ArgumentSpec>,
    handler: Arc<dyn CommandHandler<S>>,
    permission: Permission,
    meta: CommandMeta,
}

impl<S> Command<S> {
    /// Start building a command in namespace `name`.
    pub fn builder(name: impl Into<String>) -> CommandBuilder<S> {
        CommandBuilder::new(name)
    }

    pub fn arguments(&self) -> &[ArgumentSpec] {
        &self.arguments
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler<S>> {
        &self.handler
    }

    /// The command's own permission.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    pub fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    /// First literal of the command.
    pub fn namespace(&self) -> &str {
        self.arguments
            .first()
            .map(ArgumentSpec::name)
            .unwrap_or_default()
    }

    /// Conjunction of every argument's node permission and the command's own.
    pub fn required_permission(&self) -> Permission {
        self.arguments
            .iter()
            .map(|argument| argument.permission_ref().clone())
            .fold(Permission::Empty, Permission::and)
            .and(self.permission.clone())
    }

    /// Rendered syntax, e.g. `give <player> <item> [amount] [--silent]`.
    pub fn syntax(&self) -> String {
        crate::syntax::command_syntax(&self.arguments)
    }
}

impl<S> fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("syntax", &self.syntax())
            .field("permission", &self.permission)
            .field("meta", &self.meta)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent assembly of a [`Command`].
///
/// # Example
///
/// ```rust
/// use arbor::{Command, FlagSpec, Invocation, TypeTag};
///
/// let command = Command::<String>::builder("team")
///     .literal("create")
///     .required("name", TypeTag::STRING)
///     .flag(FlagSpec::presence("private").short('p'))
///     .permission("team.create")
///     .description("Create a team")
///     .handler(|inv: &Invocation<String>| format!("created {}", inv.require::<String>("name").unwrap()))
///     .build()
///     .unwrap();
///
/// assert_eq!(command.syntax(), "team create <name> [--private]");
/// assert_eq!(command.namespace(), "team");
/// ```
pub struct CommandBuilder<S> {
    arguments: Vec<ArgumentSpec>,
    handler: Option<Arc<dyn CommandHandler<S>>>,
    permission: Permission,
    meta: CommandMeta,
}

impl<S> CommandBuilder<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            arguments: vec![ArgumentSpec::literal(name)],
            handler: None,
            permission: Permission::Empty,
            meta: CommandMeta::default(),
        }
    }

    pub fn literal(self, text: impl Into<String>) -> Self {
        self.argument(ArgumentSpec::literal(text))
    }

    pub fn literal_with_aliases<I, T>(self, text: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let literal = aliases
            .into_iter()
            .fold(ArgumentSpec::literal(text), |literal, alias| literal.alias(alias));
        self.argument(literal)
    }

    pub fn required(self, name: impl Into<String>, type_tag: impl Into<TypeTag>) -> Self {
        self.argument(ArgumentSpec::required(name, type_tag))
    }

    pub fn optional(self, name: impl Into<String>, type_tag: impl Into<TypeTag>) -> Self {
        self.argument(ArgumentSpec::optional(name, type_tag))
    }

    /// Optional argument whose default is parsed from `default` at registration.
    pub fn optional_with_default(
        self,
        name: impl Into<String>,
        type_tag: impl Into<TypeTag>,
        default: impl Into<String>,
    ) -> Self {
        self.argument(ArgumentSpec::optional(name, type_tag).default_input(default))
    }

    pub fn argument(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Add a flag to the trailing flag group, creating it if needed.
    pub fn flag(mut self, flag: FlagSpec) -> Self {
        match self.arguments.last_mut() {
            Some(group) if group.kind() == ArgumentKind::Flag => {
                group.flags_mut().push(flag);
            }
            _ => self.arguments.push(ArgumentSpec::flags("flags").flag(flag)),
        }
        self
    }

    /// The command's own permission, checked after resolution.
    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permission = permission.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.meta.hidden = true;
        self
    }

    pub fn meta(mut self, meta: CommandMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn handler<F, R>(mut self, handler: F) -> Self
    where
        F: Fn(&Invocation<S>) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Use a handler type implementing [`CommandHandler`] directly.
    pub fn handler_impl(mut self, handler: impl CommandHandler<S>) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Command<S>, ConfigurationError> {
        let handler = self.handler.ok_or_else(|| ConfigurationError::MissingHandler {
            command: crate::syntax::command_syntax(&self.arguments),
        })?;
        Ok(Command {
            arguments: self.arguments,
            handler,
            permission: self.permission,
            meta: self.meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::ArgumentValues;

    #[test]
    fn test_builder_appends_to_single_flag_group() {
        let command = Command::<()>::builder("give")
            .required("player", TypeTag::STRING)
            .flag(FlagSpec::presence("silent"))
            .flag(FlagSpec::valued("note", TypeTag::STRING))
            .handler(|_: &Invocation<()>| ())
            .build()
            .unwrap();

        assert_eq!(command.arguments().len(), 3);
        assert_eq!(command.arguments()[2].flag_specs().len(), 2);
        assert_eq!(command.syntax(), "give <player> [--silent] [--note <string>]");
    }

    #[test]
    fn test_missing_handler() {
        let err = Command::<()>::builder("give").build().unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingHandler {
                command: "give".into()
            }
        );
    }

    #[test]
    fn test_required_permission_aggregates_nodes() {
        let command = Command::<()>::builder("team")
            .argument(ArgumentSpec::literal("delete").permission("team.admin"))
            .permission("team.delete")
            .handler(|_: &Invocation<()>| ())
            .build()
            .unwrap();

        assert_eq!(
            command.required_permission().to_string(),
            "(team.admin & team.delete)"
        );
    }

    #[test]
    fn test_closure_handler_outcome() {
        let command = Command::<()>::builder("ping")
            .handler(|_: &Invocation<()>| "pong")
            .build()
            .unwrap();
        let command = Arc::new(command);
        let invocation = Invocation::new((), Arc::clone(&command), ArgumentValues::new(), "ping");
        let output = command.handler().handle(&invocation).unwrap();
        assert_eq!(output, Output::text("pong"));
    }

    #[test]
    fn test_meta_extra() {
        let meta = CommandMeta::new().description("d").with("category", "admin");
        assert_eq!(meta.get("category"), Some("admin"));
        assert!(!meta.hidden);
    }
}
