//! Built-in parsers registered by [`ParserRegistry::with_defaults`].
//!
//! | Tag | Output | Config keys |
//! |-----|--------|-------------|
//! | `string` | `String` | `mode`: `single` (default), `greedy`, `quoted` |
//! | `integer` | `i64` | `min`, `max` |
//! | `float` | `f64` | `min`, `max` |
//! | `boolean` | `bool` | `liberal` |
//! | `choice` | `String` | `choices`, `case_sensitive` |

use super::{ArgValue, ArgumentParser, ParseFailure, Parsed, ParserConfig, ParserRegistry, TypeTag};

/// Register every standard parser into `registry`.
pub fn register_defaults(registry: &mut ParserRegistry) {
    registry
        .register_parser(TypeTag::STRING, StringParser::from_config)
        .register_parser(TypeTag::INTEGER, IntegerParser::from_config)
        .register_parser(TypeTag::FLOAT, FloatParser::from_config)
        .register_parser(TypeTag::BOOLEAN, BooleanParser::from_config)
        .register_parser(TypeTag::CHOICE, ChoiceParser::from_config);
}

// ============================================================================
// String
// ============================================================================

/// How many tokens a string argument takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringMode {
    /// Exactly one token.
    #[default]
    Single,
    /// Every remaining token, joined by a single space.
    Greedy,
    /// One token, or a `"double quoted"` run of tokens.
    Quoted,
}

#[derive(Debug, Clone, Default)]
pub struct StringParser {
    mode: StringMode,
}

impl StringParser {
    pub fn new(mode: StringMode) -> Self {
        Self { mode }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        let mode = match config.get_str("mode") {
            Some("greedy") => StringMode::Greedy,
            Some("quoted") => StringMode::Quoted,
            _ => StringMode::Single,
        };
        Self { mode }
    }

    fn parse_quoted(tokens: &[&str]) -> Result<Parsed, ParseFailure> {
        let first = tokens[0];
        let Some(opening) = first.strip_prefix('"') else {
            return Ok(Parsed::new(1, first.to_string()));
        };

        if let Some(inner) = opening.strip_suffix('"') {
            return Ok(Parsed::new(1, inner.to_string()));
        }

        let mut words = vec![opening];
        for (index, token) in tokens.iter().copied().enumerate().skip(1) {
            if let Some(last) = token.strip_suffix('"') {
                words.push(last);
                return Ok(Parsed::new(index + 1, words.join(" ")));
            }
            words.push(token);
        }

        Err(ParseFailure::UnclosedQuote {
            input: tokens.join(" "),
        })
    }
}

impl ArgumentParser for StringParser {
    fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseFailure> {
        if tokens.is_empty() {
            return Err(ParseFailure::NoInput);
        }
        match self.mode {
            StringMode::Single => Ok(Parsed::new(1, tokens[0].to_string())),
            StringMode::Greedy => Ok(Parsed::new(tokens.len(), tokens.join(" "))),
            StringMode::Quoted => Self::parse_quoted(tokens),
        }
    }

    /// Single and greedy values are written as is. Quoted values that would
    /// not survive as one bare token are wrapped in quotes.
    ///
    /// Tokenizing collapses whitespace, so text with runs of spaces, tabs or
    /// newlines has no form. Neither does quoted text with an inner word
    /// ending in `"`, which would close the quote early.
    fn format(&self, value: &ArgValue) -> Option<String> {
        let text = value.downcast_ref::<String>()?;
        let words: Vec<&str> = text.split(' ').collect();
        let single_spaced = words
            .iter()
            .all(|word| !word.is_empty() && !word.contains(char::is_whitespace));

        match self.mode {
            StringMode::Single => (single_spaced && words.len() == 1).then(|| text.clone()),
            StringMode::Greedy => single_spaced.then(|| text.clone()),
            StringMode::Quoted => {
                if single_spaced && words.len() == 1 && !text.starts_with('"') {
                    return Some(text.clone());
                }
                let closes_early = words[..words.len() - 1]
                    .iter()
                    .any(|word| word.ends_with('"'));
                (text.is_empty() || (single_spaced && !closes_early))
                    .then(|| format!("\"{}\"", text))
            }
        }
    }
}

// ============================================================================
// Numbers
// ============================================================================

/// Suggest every in-range value when the range is small enough to list.
const MAX_LISTED_RANGE: i64 = 16;

#[derive(Debug, Clone)]
pub struct IntegerParser {
    min: i64,
    max: i64,
}

impl IntegerParser {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self {
            min: config.get_i64("min").unwrap_or(i64::MIN),
            max: config.get_i64("max").unwrap_or(i64::MAX),
        }
    }
}

impl Default for IntegerParser {
    fn default() -> Self {
        Self::new(i64::MIN, i64::MAX)
    }
}

impl ArgumentParser for IntegerParser {
    fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseFailure> {
        let token = tokens.first().ok_or(ParseFailure::NoInput)?;
        let value: i64 = token
            .parse()
            .map_err(|_| ParseFailure::invalid(*token, "integer"))?;

        if value < self.min || value > self.max {
            return Err(ParseFailure::OutOfRange {
                value: value.to_string(),
                min: self.min.to_string(),
                max: self.max.to_string(),
            });
        }
        Ok(Parsed::new(1, value))
    }

    fn format(&self, value: &ArgValue) -> Option<String> {
        value.downcast_ref::<i64>().map(i64::to_string)
    }

    fn suggestions(&self, partial: &str) -> Vec<String> {
        let span = self.max.checked_sub(self.min);
        match span {
            Some(span) if (0..MAX_LISTED_RANGE).contains(&span) => (self.min..=self.max)
                .map(|value| value.to_string())
                .filter(|value| value.starts_with(partial))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FloatParser {
    min: f64,
    max: f64,
}

impl FloatParser {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self {
            min: config.get_f64("min").unwrap_or(f64::MIN),
            max: config.get_f64("max").unwrap_or(f64::MAX),
        }
    }
}

impl Default for FloatParser {
    fn default() -> Self {
        Self::new(f64::MIN, f64::MAX)
    }
}

impl ArgumentParser for FloatParser {
    fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseFailure> {
        let token = tokens.first().ok_or(ParseFailure::NoInput)?;
        let value: f64 = token
            .parse()
            .ok()
            .filter(|value: &f64| value.is_finite())
            .ok_or_else(|| ParseFailure::invalid(*token, "number"))?;

        if value < self.min || value > self.max {
            return Err(ParseFailure::OutOfRange {
                value: value.to_string(),
                min: self.min.to_string(),
                max: self.max.to_string(),
            });
        }
        Ok(Parsed::new(1, value))
    }

    fn format(&self, value: &ArgValue) -> Option<String> {
        value.downcast_ref::<f64>().map(f64::to_string)
    }
}

// ============================================================================
// Boolean
// ============================================================================

const STRICT_TRUE: &[&str] = &["true"];
const STRICT_FALSE: &[&str] = &["false"];
const LIBERAL_TRUE: &[&str] = &["true", "yes", "on", "1"];
const LIBERAL_FALSE: &[&str] = &["false", "no", "off", "0"];

#[derive(Debug, Clone, Default)]
pub struct BooleanParser {
    liberal: bool,
}

impl BooleanParser {
    pub fn new(liberal: bool) -> Self {
        Self { liberal }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.get_bool("liberal").unwrap_or(false))
    }

    fn vocabulary(&self) -> (&'static [&'static str], &'static [&'static str]) {
        if self.liberal {
            (LIBERAL_TRUE, LIBERAL_FALSE)
        } else {
            (STRICT_TRUE, STRICT_FALSE)
        }
    }
}

impl ArgumentParser for BooleanParser {
    fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseFailure> {
        let token = tokens.first().ok_or(ParseFailure::NoInput)?;
        let lowered = token.to_lowercase();
        let (truthy, falsy) = self.vocabulary();

        if truthy.contains(&lowered.as_str()) {
            Ok(Parsed::new(1, true))
        } else if falsy.contains(&lowered.as_str()) {
            Ok(Parsed::new(1, false))
        } else {
            Err(ParseFailure::invalid(*token, "boolean"))
        }
    }

    fn format(&self, value: &ArgValue) -> Option<String> {
        value.downcast_ref::<bool>().map(bool::to_string)
    }

    fn suggestions(&self, partial: &str) -> Vec<String> {
        let (truthy, falsy) = self.vocabulary();
        let partial = partial.to_lowercase();
        truthy
            .iter()
            .chain(falsy)
            .filter(|word| word.starts_with(&partial))
            .map(|word| word.to_string())
            .collect()
    }
}

// ============================================================================
// Choice
// ============================================================================

/// One of a fixed set of words; yields the canonical spelling.
#[derive(Debug, Clone, Default)]
pub struct ChoiceParser {
    choices: Vec<String>,
    case_sensitive: bool,
}

impl ChoiceParser {
    pub fn new<I, T>(choices: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.get_strings("choices").unwrap_or_default())
            .case_sensitive(config.get_bool("case_sensitive").unwrap_or(false))
    }

    fn matches(&self, choice: &str, token: &str) -> bool {
        if self.case_sensitive {
            choice == token
        } else {
            choice.eq_ignore_ascii_case(token)
        }
    }
}

impl ArgumentParser for ChoiceParser {
    fn parse(&self, tokens: &[&str]) -> Result<Parsed, ParseFailure> {
        let token = tokens.first().ok_or(ParseFailure::NoInput)?;
        self.choices
            .iter()
            .find(|choice| self.matches(choice, token))
            .map(|choice| Parsed::new(1, choice.clone()))
            .ok_or_else(|| ParseFailure::UnknownChoice {
                input: token.to_string(),
                choices: self.choices.clone(),
            })
    }

    fn format(&self, value: &ArgValue) -> Option<String> {
        let text = value.downcast_ref::<String>()?;
        self.choices.iter().find(|choice| *choice == text).cloned()
    }

    fn suggestions(&self, partial: &str) -> Vec<String> {
        let partial_lower = partial.to_lowercase();
        self.choices
            .iter()
            .filter(|choice| {
                if self.case_sensitive {
                    choice.starts_with(partial)
                } else {
                    choice.to_lowercase().starts_with(&partial_lower)
                }
            })
            .cloned()
            .collect()
    }
}
