//! Error taxonomy for registration, resolution and execution.
//!
//! Registration errors are returned synchronously from
//! [`CommandManager::register_command`](crate::CommandManager::register_command).
//! Resolution and handler failures always travel through the execution handle
//! as a [`CommandError`], whichever coordinator runs the command.

use thiserror::Error;

use crate::parser::{NoParserRegistered, ParseFailure};
use crate::HandlerError;

fn join(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(" ")
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// A command could not be registered. The tree is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Ambiguous(#[from] AmbiguousNodeError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Inserting the command would make the tree non-deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ambiguous command at '{}': {conflict}", join(.path))]
pub struct AmbiguousNodeError {
    /// Node labels from the root to the conflicting position.
    pub path: Vec<String>,
    pub conflict: Conflict,
}

/// What made an insertion ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("literal '{literal}' collides with an existing sibling")]
    LiteralCollision { literal: String },

    #[error("value argument {incoming} cannot share a position with {existing}")]
    ValueSibling { existing: String, incoming: String },

    #[error("a flag group already exists at this position")]
    DuplicateFlagGroup,

    #[error("a flag group and an optional argument cannot be siblings")]
    CompletionSibling,

    #[error("node {node} is already registered with a different permission")]
    PermissionMismatch { node: String },

    #[error("command '{existing}' is already registered here")]
    DuplicateCommand { existing: String },

    #[error("command would be indistinguishable from '{existing}'")]
    ShadowedCommand { existing: String },
}

/// The command's own declaration is unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("argument '{argument}': {source}")]
    NoParser {
        argument: String,
        source: NoParserRegistered,
    },

    #[error("command has no arguments")]
    EmptyCommand,

    #[error("first argument '{name}' must be a literal")]
    NamespaceNotLiteral { name: String },

    #[error("'{literal}' is not a valid literal")]
    InvalidLiteral { literal: String },

    #[error("'{flag}' is not a valid flag name")]
    InvalidFlagName { flag: String },

    #[error("mandatory argument '{argument}' follows optional argument '{optional}'")]
    RequiredAfterOptional { argument: String, optional: String },

    #[error("flag group '{group}' must be the last argument")]
    FlagGroupNotLast { group: String },

    #[error("flag group '{group}' declares no flags")]
    EmptyFlagGroup { group: String },

    #[error("argument name '{argument}' is used more than once")]
    DuplicateArgument { argument: String },

    #[error("flag '{flag}' is declared more than once")]
    DuplicateFlag { flag: String },

    #[error("argument '{argument}' has no value type")]
    MissingType { argument: String },

    #[error("argument '{argument}' cannot declare a default")]
    UnexpectedDefault { argument: String },

    #[error("default for '{argument}' does not parse: {source}")]
    InvalidDefault {
        argument: String,
        source: ParseFailure,
    },

    #[error("command '{command}' has no handler")]
    MissingHandler { command: String },
}

// ============================================================================
// Resolution Errors
// ============================================================================

/// Input did not resolve to a command.
///
/// Every variant carries the labels of the nodes reached before the failure
/// so help layers can render what was expected from there.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("unknown command '{name}'")]
    NoSuchCommand { name: String },

    #[error("unknown argument '{token}' after '{}', expected one of: {}", join(.path), .expected.join(", "))]
    UnknownLiteral {
        path: Vec<String>,
        token: String,
        expected: Vec<String>,
    },

    #[error("incomplete command '{}', expected: {}", join(.path), .expected.join(" | "))]
    Incomplete {
        path: Vec<String>,
        expected: Vec<String>,
    },

    #[error("too many arguments after '{}': {}", join(.path), .extra.join(" "))]
    TooManyArguments { path: Vec<String>, extra: Vec<String> },

    #[error("invalid value for '{argument}': {source}")]
    ArgumentParse {
        path: Vec<String>,
        argument: String,
        source: ParseFailure,
    },

    #[error("you do not have permission to perform this command")]
    NoPermission { path: Vec<String> },
}

impl ResolveError {
    /// Labels of the nodes reached before the failure.
    pub fn path(&self) -> &[String] {
        match self {
            ResolveError::NoSuchCommand { .. } => &[],
            ResolveError::UnknownLiteral { path, .. }
            | ResolveError::Incomplete { path, .. }
            | ResolveError::TooManyArguments { path, .. }
            | ResolveError::ArgumentParse { path, .. }
            | ResolveError::NoPermission { path } => path,
        }
    }
}

// ============================================================================
// Execution Errors
// ============================================================================

/// Failure delivered through an [`ExecutionHandle`](crate::ExecutionHandle).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("command was cancelled before it started")]
    Cancelled,

    #[error("execution coordinator is closed")]
    CoordinatorClosed,
}

impl CommandError {
    /// Exit code following the handler convention (1 user, 101 system).
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Resolve(_) | CommandError::Cancelled => 1,
            CommandError::Handler(err) => err.exit_code(),
            CommandError::CoordinatorClosed => 101,
        }
    }
}

/// A coordinator could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("scheduled coordinator requires a running tokio runtime")]
    NoRuntime,

    #[error("scheduled coordinator needs at least one worker")]
    ZeroWorkers,
}
