//! Argument parsers and the parser registry.
//!
//! A parser turns the head of the remaining token stream into a typed value
//! and reports how many tokens it consumed. Parsers are looked up by
//! [`TypeTag`], a stable identifier chosen by whoever registers the factory.

use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod standard;

pub use standard::{
    BooleanParser, ChoiceParser, FloatParser, IntegerParser, StringMode, StringParser,
};

// ============================================================================
// Type Tags
// ============================================================================

/// Stable identifier of a value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    pub const STRING: TypeTag = TypeTag::from_static("string");
    pub const INTEGER: TypeTag = TypeTag::from_static("integer");
    pub const FLOAT: TypeTag = TypeTag::from_static("float");
    pub const BOOLEAN: TypeTag = TypeTag::from_static("boolean");
    pub const CHOICE: TypeTag = TypeTag::from_static("choice");

    /// Create a tag from a static string without allocating.
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Create a tag from an owned string.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeTag {
    fn from(tag: &'static str) -> Self {
        Self::from_static(tag)
    }
}

impl From<String> for TypeTag {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

// ============================================================================
// Parsed Values
// ============================================================================

/// Type-erased parsed value.
///
/// Cloning is cheap; the value itself is shared.
#[derive(Clone)]
pub struct ArgValue(Arc<dyn Any + Send + Sync>);

impl ArgValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the value as `T`, if it was stored as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.0).is::<T>()
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArgValue(..)")
    }
}

/// Successful parse: the value and the number of tokens it took.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub consumed: usize,
    pub value: ArgValue,
}

impl Parsed {
    pub fn new<T: Any + Send + Sync>(consumed: usize, value: T) -> Self {
        Self {
            consumed,
            value: ArgValue::new(value),
        }
    }
}

/// Structured reason a parser rejected its input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFailure {
    #[error("expected a value but the input ended")]
    NoInput,

    #[error("'{input}' is not a valid {expected}")]
    InvalidFormat { input: String, expected: String },

    #[error("{value} is not within [{min}, {max}]")]
    OutOfRange {
        value: String,
        min: String,
        max: String,
    },

    #[error("'{input}' is not one of: {}", .choices.join(", "))]
    UnknownChoice { input: String, choices: Vec<String> },

    #[error("unclosed quote in '{input}'")]
    UnclosedQuote { input: String },

    #[error("unknown flag '{flag}'")]
    UnknownFlag { flag: String },

    #[error("flag '{flag}' given more than once")]
    RepeatedFlag { flag: String },

    #[error("{0}")]
    Custom(String),
}

impl ParseFailure {
    pub fn invalid(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidFormat {
            input: input.into(),
            expected: expected.into(),
        }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

// ============================================================================
// Parser Trait
// ============================================================================

/// Converts the head of the remaining tokens into a typed value.
///
/// Parsers must be stateless: the same instance serves every invocation,
/// possibly from several threads at once.
///
/// # Example
///
/// ```rust
/// use arbor::{ArgumentParser, ParseFailure, Parsed};
///
/// struct Coordinates;
///
/// impl ArgumentParser for Coordinates {
///     fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseFailure> {
///         if tokens.len() < 2 {
///             return Err(ParseFailure::NoInput);
///         }
///         let x: i32 = tokens[0].parse().map_err(|_| ParseFailure::invalid(tokens[0], "coordinate"))?;
///         let z: i32 = tokens[1].parse().map_err(|_| ParseFailure::invalid(tokens[1], "coordinate"))?;
///         Ok(Parsed::new(2, (x, z)))
///     }
/// }
///
/// let parsed = Coordinates.parse(&["10", "-4", "rest"]).unwrap();
/// assert_eq!(parsed.consumed, 2);
/// assert_eq!(parsed.value.downcast_ref::<(i32, i32)>(), Some(&(10, -4)));
/// ```
pub trait ArgumentParser: Send + Sync {
    /// Parse from the remaining tokens (never empty when called by the tree walker).
    fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseFailure>;

    /// Completion candidates for a partially typed token.
    fn suggestions(&self, partial: &str) -> Vec<String> {
        let _ = partial;
        Vec::new()
    }

    /// Render a value this parser produced back into input text.
    ///
    /// Tokenizing the result and parsing it again yields the same value.
    /// `None` when the value is not of this parser's type or the parser has
    /// no textual form for it.
    fn format(&self, value: &ArgValue) -> Option<String> {
        let _ = value;
        None
    }
}

// ============================================================================
// Parser Configuration
// ============================================================================

/// Open per-argument configuration handed to parser factories.
///
/// Factories read the keys they understand and ignore the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParserConfig(BTreeMap<String, Value>);

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Read an array of strings; non-string entries are skipped.
    pub fn get_strings(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Parser Registry
// ============================================================================

/// Factory producing a parser from per-argument configuration.
pub type ParserFactory = Arc<dyn Fn(&ParserConfig) -> Arc<dyn ArgumentParser> + Send + Sync>;

/// No factory is registered for the requested tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no parser registered for type '{0}'")]
pub struct NoParserRegistered(pub TypeTag);

/// Mapping from [`TypeTag`] to parser factory.
///
/// The last registration for a tag wins.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    factories: HashMap<TypeTag, ParserFactory>,
}

impl ParserRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the standard parsers
    /// (`string`, `integer`, `float`, `boolean`, `choice`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        standard::register_defaults(&mut registry);
        registry
    }

    /// Register a factory for `tag`, replacing any previous one.
    pub fn register_parser<F, P>(&mut self, tag: impl Into<TypeTag>, factory: F) -> &mut Self
    where
        F: Fn(&ParserConfig) -> P + Send + Sync + 'static,
        P: ArgumentParser + 'static,
    {
        let factory: ParserFactory = Arc::new(move |config: &ParserConfig| {
            Arc::new(factory(config)) as Arc<dyn ArgumentParser>
        });
        self.register_factory(tag, factory)
    }

    /// Register an already type-erased factory.
    pub fn register_factory(&mut self, tag: impl Into<TypeTag>, factory: ParserFactory) -> &mut Self {
        let tag = tag.into();
        if self.factories.insert(tag.clone(), factory).is_some() {
            tracing::debug!(tag = %tag, "Parser factory replaced");
        }
        self
    }

    /// Instantiate a parser for `tag` with the given configuration.
    pub fn create_parser(
        &self,
        tag: &TypeTag,
        config: &ParserConfig,
    ) -> Result<Arc<dyn ArgumentParser>, NoParserRegistered> {
        self.factories
            .get(tag)
            .map(|factory| factory(config))
            .ok_or_else(|| NoParserRegistered(tag.clone()))
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<TypeTag> {
        let mut tags: Vec<TypeTag> = self.factories.keys().cloned().collect();
        tags.sort();
        tags
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
