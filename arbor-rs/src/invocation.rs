//! Resolved invocations and typed access to parsed values.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::command::Command;
use crate::parser::ArgValue;
use crate::{CommandResult, HandlerError, Output, SystemError, UserError};

// ============================================================================
// Argument Values
// ============================================================================

/// Parsed values keyed by argument (or flag) name.
#[derive(Debug, Clone, Default)]
pub struct ArgumentValues {
    values: HashMap<String, ArgValue>,
}

impl ArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    /// Value stored under `name` as `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(ArgValue::downcast_ref)
    }

    /// Value stored under `name`, or `fallback` when absent or of another type.
    pub fn get_or<T: Any + Clone>(&self, name: &str, fallback: T) -> T {
        self.get::<T>(name).cloned().unwrap_or(fallback)
    }

    /// Like [`get`](Self::get) but reports a user error when the value is
    /// missing or stored as another type.
    pub fn require<T: Any>(&self, name: &str) -> Result<&T, HandlerError> {
        let value = self.values.get(name).ok_or_else(|| {
            HandlerError::User(UserError::MissingArgument {
                arg: name.to_string(),
            })
        })?;
        value.downcast_ref::<T>().ok_or_else(|| {
            HandlerError::User(UserError::InvalidArgument {
                arg: name.to_string(),
                reason: format!("expected a value of type {}", std::any::type_name::<T>()),
            })
        })
    }

    pub fn raw(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// Typed Extraction
// ============================================================================

/// Build a value from parsed arguments.
///
/// Usually derived:
///
/// ```rust
/// use arbor::{ArgValue, ArgumentValues, FromInvocation};
///
/// #[derive(FromInvocation)]
/// struct GiveArgs {
///     player: String,
///     #[arbor(name = "amount")]
///     count: i64,
///     note: Option<String>,
/// }
///
/// let mut values = ArgumentValues::new();
/// values.insert("player", ArgValue::new("Alice".to_string()));
/// values.insert("amount", ArgValue::new(3_i64));
///
/// let args = GiveArgs::from_values(&values).unwrap();
/// assert_eq!(args.player, "Alice");
/// assert_eq!(args.count, 3);
/// assert!(args.note.is_none());
/// ```
pub trait FromInvocation: Sized {
    fn from_values(values: &ArgumentValues) -> Result<Self, HandlerError>;
}

// ============================================================================
// Invocation
// ============================================================================

/// A resolved command together with its sender and parsed values.
pub struct Invocation<S> {
    sender: S,
    command: Arc<Command<S>>,
    values: ArgumentValues,
    input: String,
}

impl<S> Invocation<S> {
    pub fn new(
        sender: S,
        command: Arc<Command<S>>,
        values: ArgumentValues,
        input: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            command,
            values,
            input: input.into(),
        }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn command(&self) -> &Arc<Command<S>> {
        &self.command
    }

    pub fn values(&self) -> &ArgumentValues {
        &self.values
    }

    /// Raw input line the invocation was resolved from.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name)
    }

    pub fn get_or<T: Any + Clone>(&self, name: &str, fallback: T) -> T {
        self.values.get_or(name, fallback)
    }

    pub fn require<T: Any>(&self, name: &str) -> Result<&T, HandlerError> {
        self.values.require(name)
    }

    /// Extract a typed argument struct.
    pub fn args<T: FromInvocation>(&self) -> Result<T, HandlerError> {
        T::from_values(&self.values)
    }

    /// Run the handler, turning a panic into a system error.
    pub(crate) fn run(&self) -> CommandResult<Output>
    where
        S: 'static,
    {
        let handler = Arc::clone(self.command.handler());
        match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(self))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    command = %self.command.syntax(),
                    panic = %message,
                    "Command handler panicked"
                );
                Err(HandlerError::System(SystemError::Panicked(message)))
            }
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Invocation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("sender", &self.sender)
            .field("command", &self.command.syntax())
            .field("values", &self.values.names())
            .field("input", &self.input)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> ArgumentValues {
        let mut values = ArgumentValues::new();
        values.insert("player", ArgValue::new("Alice".to_string()));
        values.insert("amount", ArgValue::new(3_i64));
        values
    }

    #[test]
    fn test_typed_getters() {
        let values = values();
        assert_eq!(values.get::<String>("player").map(String::as_str), Some("Alice"));
        assert_eq!(values.get::<i64>("player"), None);
        assert_eq!(values.get_or("missing", 7_i64), 7);
        assert_eq!(values.names(), vec!["amount", "player"]);
    }

    #[test]
    fn test_require_reports_missing_argument() {
        let err = values().require::<String>("item").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Error: Missing argument 'item'");
    }

    #[test]
    fn test_require_reports_type_mismatch() {
        let err = values().require::<i64>("player").unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(matches!(
            &err,
            HandlerError::User(UserError::InvalidArgument { arg, reason })
                if arg == "player" && reason == "expected a value of type i64"
        ));
    }

    #[test]
    fn test_run_catches_panics() {
        let command = Command::<()>::builder("boom")
            .handler(|_: &Invocation<()>| -> String { panic!("kaboom") })
            .build()
            .unwrap();
        let invocation = Invocation::new((), Arc::new(command), ArgumentValues::new(), "boom");

        let err = invocation.run().unwrap_err();
        assert!(matches!(
            err,
            HandlerError::System(SystemError::Panicked(ref message)) if message == "kaboom"
        ));
    }
}
