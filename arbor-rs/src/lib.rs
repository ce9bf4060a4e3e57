//! # arbor: platform-agnostic command tree engine
//!
//! Commands are registered as a shared prefix tree of argument nodes. Raw
//! input from any sender is tokenized, walked down the tree, parsed into typed
//! values, checked against the sender's permissions and finally handed to an
//! execution coordinator.
//!
//! ## Core Principles
//!
//! - **Unambiguous by construction**: conflicting commands are rejected at
//!   registration, never at parse time
//! - **Pluggable parsers**: value types are keyed by a registrant-chosen tag
//! - **Sender agnostic**: the engine is generic over the sender type and only
//!   asks the host one question, `has_permission(sender, node)`
//! - **Uniform outcomes**: resolution and handler failures travel through the
//!   same handle, whichever coordinator runs the command
//!
//! ## Quick Start
//!
//! ```rust
//! use arbor::{CommandManager, Invocation, TypeTag};
//!
//! #[derive(Clone)]
//! struct Player {
//!     name: String,
//! }
//!
//! let manager = CommandManager::builder()
//!     .permissions(|_: &Player, _: &str| true)
//!     .build()
//!     .unwrap();
//!
//! let give = manager
//!     .command_builder("give")
//!     .required("player", TypeTag::STRING)
//!     .required("item", TypeTag::STRING)
//!     .optional_with_default("amount", TypeTag::INTEGER, "1")
//!     .handler(|inv: &Invocation<Player>| -> arbor::CommandResult<String> {
//!         let amount: i64 = inv.get_or("amount", 1);
//!         let item = inv.require::<String>("item")?;
//!         Ok(format!("{} gave {} x{}", inv.sender().name, item, amount))
//!     })
//!     .build()
//!     .unwrap();
//! manager.register_command(give).unwrap();
//!
//! let mut handle = manager.execute_command(Player { name: "Alice".into() }, "give Bob sword 3");
//! let output = handle.try_take().unwrap().unwrap();
//! assert_eq!(output.to_string(), "Alice gave sword x3");
//! ```

// Lets the derive macro's `::arbor` paths resolve inside this crate too.
extern crate self as arbor;

// Re-export the derive macro
pub use arbor_macros::FromInvocation;

pub mod argument;
pub mod command;
pub mod coordinator;
pub mod error;
pub mod invocation;
pub mod manager;
pub mod node;
pub mod parser;
pub mod permission;
pub mod settings;
pub mod syntax;
pub mod tokenize;
pub mod tracing_support;
pub mod tree;

mod suggest;

// Re-export tracing itself (required for #[instrument] macro)
#[cfg(feature = "tracing")]
pub use tracing_support::tracing;

#[cfg(feature = "tracing")]
pub use tracing_support::{
    debug, error, info, init_subscriber, init_subscriber_with_config, instrument, trace,
    try_init_subscriber, warn, TracingConfig, TracingFormat,
};

pub use argument::{ArgumentKind, ArgumentSpec, DefaultValue, FlagSpec};
pub use command::{Command, CommandBuilder, CommandHandler, CommandMeta};
pub use coordinator::{
    ExecutionCoordinator, ExecutionHandle, HandleState, ImmediateCoordinator,
    ScheduledCoordinator,
};
pub use error::{
    AmbiguousNodeError, CommandError, ConfigurationError, Conflict, CoordinatorError,
    RegistrationError, ResolveError,
};
pub use invocation::{ArgumentValues, FromInvocation, Invocation};
pub use manager::{CommandManager, CommandManagerBuilder};
pub use node::ArgumentNode;
pub use parser::{
    ArgValue, ArgumentParser, NoParserRegistered, ParseFailure, Parsed, ParserConfig,
    ParserFactory, ParserRegistry, TypeTag,
};
pub use permission::{Permission, PermissionChecker, PermissionPolicy};
pub use settings::{CoordinatorSettings, ManagerSettings};
pub use tree::{CommandTree, Resolved};

/// Handler result type.
///
/// Handlers may return `CommandResult<T>` for any `T` implementing `IntoOutcome`.
pub type CommandResult<T> = Result<T, HandlerError>;

// ============================================================================
// Handler Error Types
// ============================================================================

/// Error reported by a command handler.
///
/// Distinguishes between user-fixable errors (exit code 1) and system failures (exit code 101).
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// User-fixable errors (exit code 1).
    ///
    /// These should include actionable hints for users.
    #[error(transparent)]
    User(UserError),

    /// System-level failures (exit code 101).
    ///
    /// These indicate bugs or environmental issues that users can't fix.
    #[error(transparent)]
    System(SystemError),
}

impl HandlerError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            HandlerError::User(_) => 1,
            HandlerError::System(_) => 101,
        }
    }

    /// Convenience constructor for user errors.
    pub fn user(message: impl Into<String>) -> Self {
        HandlerError::User(UserError::Generic(message.into()))
    }

    /// A check the sender can satisfy before retrying.
    pub fn prerequisite(check: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        HandlerError::User(UserError::PrerequisiteNotMet {
            check: check.into(),
            fix_hint: fix_hint.into(),
        })
    }

    /// Convenience constructor for system errors.
    pub fn system(message: impl Into<String>) -> Self {
        HandlerError::System(SystemError::Internal(message.into()))
    }
}

/// User-fixable errors (exit code 1).
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// Generic user error with a message.
    #[error("Error: {0}")]
    Generic(String),

    /// Argument present but stored as another type.
    #[error("Error: Invalid argument '{arg}'\n\n{reason}")]
    InvalidArgument { arg: String, reason: String },

    /// Argument absent from the invocation.
    #[error("Error: Missing argument '{arg}'")]
    MissingArgument { arg: String },

    /// Prerequisite not met.
    #[error("Error: Prerequisite not met: {check}\n\nHint: {fix_hint}")]
    PrerequisiteNotMet { check: String, fix_hint: String },
}

/// System-level failures (exit code 101).
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Generic internal error.
    #[error("Internal Error: {0}\n\nThis is likely a bug.")]
    Internal(String),

    /// I/O error.
    #[error("Internal Error: I/O operation failed\n\n{0:?}\n\nThis is likely a bug.")]
    Io(std::io::Error),

    /// The handler panicked; the payload message is preserved.
    #[error("Internal Error: handler panicked: {0}")]
    Panicked(String),
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        HandlerError::System(SystemError::Io(e))
    }
}

impl From<UserError> for HandlerError {
    fn from(e: UserError) -> Self {
        HandlerError::User(e)
    }
}

// ============================================================================
// Output Types
// ============================================================================

/// Value produced by a successful handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// No output.
    Silent,

    /// Text output for the sender.
    Text(String),

    /// JSON output (for machine-readable responses).
    Json(String),
}

impl Output {
    /// Create a text output.
    pub fn text(content: impl Into<String>) -> Self {
        Output::Text(content.into())
    }

    /// Check if output is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Silent)
    }
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Silent => Ok(()),
            Output::Text(s) | Output::Json(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// Outcome Conversion Trait
// ============================================================================

/// Trait for converting handler return values into outcomes.
///
/// Implemented for common return types like `String`, `()`, and `Result<T, HandlerError>`.
pub trait IntoOutcome {
    /// Convert into an outcome.
    fn into_outcome(self) -> CommandResult<Output>;
}

impl IntoOutcome for Output {
    fn into_outcome(self) -> CommandResult<Output> {
        Ok(self)
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> CommandResult<Output> {
        Ok(Output::Text(self))
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> CommandResult<Output> {
        Ok(Output::Text(self.to_string()))
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> CommandResult<Output> {
        Ok(Output::Silent)
    }
}

impl<T: IntoOutcome> IntoOutcome for CommandResult<T> {
    fn into_outcome(self) -> CommandResult<Output> {
        self.and_then(IntoOutcome::into_outcome)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_exit_code() {
        let err = HandlerError::user("test error");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_prerequisite_error_carries_hint() {
        let err = HandlerError::prerequisite("team 'red' exists", "run 'team list'");
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            err.to_string(),
            "Error: Prerequisite not met: team 'red' exists\n\nHint: run 'team list'"
        );
    }

    #[test]
    fn test_system_error_exit_code() {
        let err = HandlerError::system("test error");
        assert_eq!(err.exit_code(), 101);
    }

    #[test]
    fn test_string_into_outcome() {
        let outcome = "hello".to_string().into_outcome();
        assert_eq!(outcome.unwrap(), Output::Text("hello".into()));
    }

    #[test]
    fn test_unit_into_outcome() {
        let outcome = ().into_outcome();
        assert!(outcome.unwrap().is_empty());
    }

    #[test]
    fn test_result_err_into_outcome() {
        let result: CommandResult<String> = Err(HandlerError::user("failure"));
        let err = result.into_outcome().unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Error: failure");
    }

    #[test]
    fn test_io_error_is_system() {
        let err: HandlerError = std::io::Error::other("disk").into();
        assert!(matches!(err, HandlerError::System(SystemError::Io(_))));
    }
}
