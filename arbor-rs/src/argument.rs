//! Registration-time argument descriptors.
//!
//! An [`ArgumentSpec`] describes one position of a command: a literal keyword,
//! a required or optional typed value, or a trailing group of flags. Specs are
//! plain data; parsers are only instantiated when the command is inserted into
//! a tree.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parser::{ArgValue, ParserConfig, TypeTag};
use crate::permission::Permission;

/// Role of an argument within a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    /// Exact keyword.
    Literal,
    /// Typed value that must be present.
    Required,
    /// Typed value that may be omitted.
    Optional,
    /// Group of `--name` / `-x` flags.
    Flag,
}

/// Value used when an optional argument or flag is omitted.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    /// Raw input run through the argument's parser at registration.
    Input(String),
    /// Already parsed value.
    Value(ArgValue),
}

// ============================================================================
// Flags
// ============================================================================

/// One flag inside a flag group.
///
/// A presence flag yields `true` when given and `false` otherwise; a valued
/// flag parses the tokens following it.
#[derive(Debug, Clone)]
pub struct FlagSpec {
    name: String,
    aliases: Vec<char>,
    value: Option<(TypeTag, ParserConfig)>,
    default: Option<DefaultValue>,
    permission: Permission,
    description: Option<String>,
}

impl FlagSpec {
    /// Flag without a value (`--silent`).
    pub fn presence(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            value: None,
            default: None,
            permission: Permission::Empty,
            description: None,
        }
    }

    /// Flag followed by a value (`--note <string>`).
    pub fn valued(name: impl Into<String>, type_tag: impl Into<TypeTag>) -> Self {
        Self {
            value: Some((type_tag.into(), ParserConfig::new())),
            ..Self::presence(name)
        }
    }

    /// Add a single-character alias (`-s`).
    pub fn short(mut self, alias: char) -> Self {
        self.aliases.push(alias);
        self
    }

    /// Parser configuration for a valued flag; ignored for presence flags.
    pub fn config(mut self, config: ParserConfig) -> Self {
        if let Some((_, existing)) = self.value.as_mut() {
            *existing = config;
        }
        self
    }

    pub fn default_input(mut self, input: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Input(input.into()));
        self
    }

    pub fn default_value<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(DefaultValue::Value(ArgValue::new(value)));
        self
    }

    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permission = permission.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[char] {
        &self.aliases
    }

    pub fn value_type(&self) -> Option<&TypeTag> {
        self.value.as_ref().map(|(tag, _)| tag)
    }

    pub fn value_config(&self) -> Option<&ParserConfig> {
        self.value.as_ref().map(|(_, config)| config)
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn permission_ref(&self) -> &Permission {
        &self.permission
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `--name` or `--name <type>`.
    pub fn syntax(&self) -> String {
        match self.value_type() {
            Some(tag) => format!("--{} <{}>", self.name, tag),
            None => format!("--{}", self.name),
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Descriptor for one argument position of a command.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    kind: ArgumentKind,
    name: String,
    aliases: Vec<String>,
    type_tag: Option<TypeTag>,
    config: ParserConfig,
    default: Option<DefaultValue>,
    permission: Permission,
    description: Option<String>,
    flags: Vec<FlagSpec>,
}

impl ArgumentSpec {
    fn new(kind: ArgumentKind, name: impl Into<String>, type_tag: Option<TypeTag>) -> Self {
        Self {
            kind,
            name: name.into(),
            aliases: Vec::new(),
            type_tag,
            config: ParserConfig::new(),
            default: None,
            permission: Permission::Empty,
            description: None,
            flags: Vec::new(),
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(ArgumentKind::Literal, text, None)
    }

    pub fn required(name: impl Into<String>, type_tag: impl Into<TypeTag>) -> Self {
        Self::new(ArgumentKind::Required, name, Some(type_tag.into()))
    }

    pub fn optional(name: impl Into<String>, type_tag: impl Into<TypeTag>) -> Self {
        Self::new(ArgumentKind::Optional, name, Some(type_tag.into()))
    }

    /// Empty flag group; add members with [`ArgumentSpec::flag`].
    pub fn flags(name: impl Into<String>) -> Self {
        Self::new(ArgumentKind::Flag, name, None)
    }

    /// Alternative text for a literal.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a single parser option.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key, value);
        self
    }

    pub fn default_input(mut self, input: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Input(input.into()));
        self
    }

    pub fn default_value<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(DefaultValue::Value(ArgValue::new(value)));
        self
    }

    /// Node-level permission checked when resolution enters this argument.
    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permission = permission.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn kind(&self) -> ArgumentKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn type_tag(&self) -> Option<&TypeTag> {
        self.type_tag.as_ref()
    }

    pub fn parser_config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn permission_ref(&self) -> &Permission {
        &self.permission
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn flag_specs(&self) -> &[FlagSpec] {
        &self.flags
    }

    pub(crate) fn flags_mut(&mut self) -> &mut Vec<FlagSpec> {
        &mut self.flags
    }

    /// Syntax fragment: `name`, `<name>`, `[name]` or `[--a] [--b <type>]`.
    pub fn label(&self) -> String {
        match self.kind {
            ArgumentKind::Literal => self.name.clone(),
            ArgumentKind::Required => format!("<{}>", self.name),
            ArgumentKind::Optional => format!("[{}]", self.name),
            ArgumentKind::Flag => self
                .flags
                .iter()
                .map(|flag| format!("[{}]", flag.syntax()))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ArgumentSpec::literal("give").label(), "give");
        assert_eq!(ArgumentSpec::required("player", TypeTag::STRING).label(), "<player>");
        assert_eq!(ArgumentSpec::optional("amount", TypeTag::INTEGER).label(), "[amount]");

        let flags = ArgumentSpec::flags("flags")
            .flag(FlagSpec::presence("silent").short('s'))
            .flag(FlagSpec::valued("note", TypeTag::STRING));
        assert_eq!(flags.label(), "[--silent] [--note <string>]");
    }

    #[test]
    fn test_builder_setters() {
        let spec = ArgumentSpec::optional("amount", TypeTag::INTEGER)
            .with_config("min", 1)
            .default_input("1")
            .permission("give.amount")
            .description("How many");

        assert_eq!(spec.kind(), ArgumentKind::Optional);
        assert_eq!(spec.parser_config().get_i64("min"), Some(1));
        assert!(matches!(spec.default(), Some(DefaultValue::Input(input)) if input == "1"));
        assert_eq!(spec.permission_ref(), &Permission::node("give.amount"));
        assert_eq!(spec.description_text(), Some("How many"));
    }

    #[test]
    fn test_presence_flag_ignores_config() {
        let flag = FlagSpec::presence("silent").config(ParserConfig::new().with("min", 1));
        assert!(flag.value_config().is_none());
        assert_eq!(flag.syntax(), "--silent");
    }
}
