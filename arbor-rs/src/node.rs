//! Argument nodes: the units of the command tree.

use std::fmt;
use std::sync::Arc;

use crate::argument::ArgumentKind;
use crate::command::Command;
use crate::parser::{ArgValue, ArgumentParser, ParserConfig, TypeTag};
use crate::permission::Permission;

/// What a node matches.
#[derive(Clone)]
pub(crate) enum Component {
    Root,
    Literal {
        name: String,
        aliases: Vec<String>,
    },
    Value {
        name: String,
        kind: ArgumentKind,
        type_tag: TypeTag,
        config: ParserConfig,
        parser: Arc<dyn ArgumentParser>,
        default: Option<ArgValue>,
    },
    Flags {
        name: String,
        flags: Vec<FlagNode>,
    },
}

/// One member of a flag group, with its parser instantiated.
#[derive(Clone)]
pub(crate) struct FlagNode {
    pub name: String,
    pub aliases: Vec<char>,
    pub value: Option<FlagValue>,
    pub permission: Permission,
}

#[derive(Clone)]
pub(crate) struct FlagValue {
    pub type_tag: TypeTag,
    pub parser: Arc<dyn ArgumentParser>,
    pub default: Option<ArgValue>,
}

impl FlagNode {
    /// Whether `token` is this flag's `--name` or one of its `-x` aliases.
    pub fn matches(&self, token: &str) -> bool {
        if let Some(long) = token.strip_prefix("--") {
            return long == self.name;
        }
        let mut chars = token.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('-'), Some(alias), None) => self.aliases.contains(&alias),
            _ => false,
        }
    }

    pub fn marker(&self) -> String {
        format!("--{}", self.name)
    }
}

/// Whether a token looks like `--name` or `-x`.
///
/// Negative numbers are not flag markers.
pub(crate) fn is_flag_marker(token: &str) -> bool {
    if let Some(long) = token.strip_prefix("--") {
        return !long.is_empty();
    }
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some('-'), Some(alias), None) if alias.is_alphabetic()
    )
}

/// Node of a [`CommandTree`](crate::CommandTree).
///
/// Nodes are owned by the tree; callers only see them through shared
/// references for inspection (help, syntax rendering).
pub struct ArgumentNode<S> {
    pub(crate) component: Component,
    pub(crate) permission: Permission,
    /// Own permissions of every command reachable through this node.
    pub(crate) reachable: Vec<Permission>,
    pub(crate) children: Vec<ArgumentNode<S>>,
    pub(crate) command: Option<Arc<Command<S>>>,
}

impl<S> Clone for ArgumentNode<S> {
    fn clone(&self) -> Self {
        Self {
            component: self.component.clone(),
            permission: self.permission.clone(),
            reachable: self.reachable.clone(),
            children: self.children.clone(),
            command: self.command.clone(),
        }
    }
}

impl<S> ArgumentNode<S> {
    pub(crate) fn root() -> Self {
        Self::new(Component::Root, Permission::Empty)
    }

    pub(crate) fn new(component: Component, permission: Permission) -> Self {
        Self {
            component,
            permission,
            reachable: Vec::new(),
            children: Vec::new(),
            command: None,
        }
    }

    /// `None` for the synthetic root.
    pub fn kind(&self) -> Option<ArgumentKind> {
        match &self.component {
            Component::Root => None,
            Component::Literal { .. } => Some(ArgumentKind::Literal),
            Component::Value { kind, .. } => Some(*kind),
            Component::Flags { .. } => Some(ArgumentKind::Flag),
        }
    }

    pub fn name(&self) -> &str {
        match &self.component {
            Component::Root => "",
            Component::Literal { name, .. }
            | Component::Value { name, .. }
            | Component::Flags { name, .. } => name,
        }
    }

    pub fn aliases(&self) -> &[String] {
        match &self.component {
            Component::Literal { aliases, .. } => aliases,
            _ => &[],
        }
    }

    pub fn type_tag(&self) -> Option<&TypeTag> {
        match &self.component {
            Component::Value { type_tag, .. } => Some(type_tag),
            _ => None,
        }
    }

    /// Declared node-level permission.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    pub fn children(&self) -> &[ArgumentNode<S>] {
        &self.children
    }

    pub fn command(&self) -> Option<&Arc<Command<S>>> {
        self.command.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.command.is_some()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.component, Component::Root)
    }

    /// Syntax fragment used in paths and help output.
    pub fn label(&self) -> String {
        match &self.component {
            Component::Root => String::new(),
            Component::Literal { name, .. } => name.clone(),
            Component::Value {
                name,
                kind: ArgumentKind::Optional,
                ..
            } => format!("[{}]", name),
            Component::Value { name, .. } => format!("<{}>", name),
            Component::Flags { flags, .. } => flags
                .iter()
                .map(|flag| match &flag.value {
                    Some(value) => format!("[--{} <{}>]", flag.name, value.type_tag),
                    None => format!("[--{}]", flag.name),
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Declared permission AND any reachable command's permission.
    pub(crate) fn permitted(&self, check: &dyn Fn(&str) -> bool) -> bool {
        self.permission.test(check)
            && (self.reachable.is_empty() || self.reachable.iter().any(|p| p.test(check)))
    }

    pub(crate) fn literal_names(&self) -> impl Iterator<Item = &str> {
        let (name, aliases): (Option<&str>, &[String]) = match &self.component {
            Component::Literal { name, aliases } => (Some(name.as_str()), aliases.as_slice()),
            _ => (None, &[]),
        };
        name.into_iter().chain(aliases.iter().map(String::as_str))
    }

    pub(crate) fn matches_literal(&self, token: &str) -> bool {
        self.literal_names().any(|literal| literal == token)
    }

    pub(crate) fn literal_child(&self, token: &str) -> Option<&ArgumentNode<S>> {
        self.children.iter().find(|child| child.matches_literal(token))
    }

    /// The Required or Optional child, if any.
    pub(crate) fn value_child(&self) -> Option<&ArgumentNode<S>> {
        self.children
            .iter()
            .find(|child| matches!(child.component, Component::Value { .. }))
    }

    pub(crate) fn flags_child(&self) -> Option<&ArgumentNode<S>> {
        self.children
            .iter()
            .find(|child| matches!(child.component, Component::Flags { .. }))
    }

    /// Child that can be entered without consuming input.
    pub(crate) fn completion_child(&self) -> Option<&ArgumentNode<S>> {
        self.children.iter().find(|child| child.is_completion())
    }

    /// Optional values and flag groups can be entered without input.
    pub(crate) fn is_completion(&self) -> bool {
        matches!(
            self.component,
            Component::Value {
                kind: ArgumentKind::Optional,
                ..
            } | Component::Flags { .. }
        )
    }

    pub(crate) fn flags(&self) -> &[FlagNode] {
        match &self.component {
            Component::Flags { flags, .. } => flags,
            _ => &[],
        }
    }

    pub(crate) fn recognizes_flag(&self, token: &str) -> bool {
        self.flags().iter().any(|flag| flag.matches(token))
    }

    /// Whether a flag group recognizing `token` is reachable from this node
    /// through optional arguments only.
    pub(crate) fn leads_to_flag(&self, token: &str) -> bool {
        let mut current = self;
        loop {
            if let Some(group) = current.flags_child() {
                return group.recognizes_flag(token);
            }
            match current.completion_child() {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    /// Tokens a parser at this node may consume.
    ///
    /// The first token is always offered; input stops before any later token
    /// that this group, or a group reachable from this node, recognizes as a
    /// flag.
    pub(crate) fn parser_input<'t>(&self, tokens: &'t [&'t str]) -> &'t [&'t str] {
        let end = tokens
            .iter()
            .skip(1)
            .position(|token| {
                is_flag_marker(token) && (self.recognizes_flag(token) || self.leads_to_flag(token))
            })
            .map_or(tokens.len(), |index| index + 1);
        &tokens[..end]
    }

    pub(crate) fn parser(&self) -> Option<&Arc<dyn ArgumentParser>> {
        match &self.component {
            Component::Value { parser, .. } => Some(parser),
            _ => None,
        }
    }

    pub(crate) fn default_value(&self) -> Option<&ArgValue> {
        match &self.component {
            Component::Value { default, .. } => default.as_ref(),
            _ => None,
        }
    }
}

impl<S> fmt::Debug for ArgumentNode<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentNode")
            .field("label", &self.label())
            .field("permission", &self.permission)
            .field("terminal", &self.is_terminal())
            .field("children", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(name: &str, aliases: &[char]) -> FlagNode {
        FlagNode {
            name: name.to_string(),
            aliases: aliases.to_vec(),
            value: None,
            permission: Permission::Empty,
        }
    }

    #[test]
    fn test_flag_markers() {
        assert!(is_flag_marker("--silent"));
        assert!(is_flag_marker("-s"));
        assert!(!is_flag_marker("-5"));
        assert!(!is_flag_marker("--"));
        assert!(!is_flag_marker("-"));
        assert!(!is_flag_marker("word"));
    }

    #[test]
    fn test_flag_matches_long_and_short() {
        let silent = flag("silent", &['s']);
        assert!(silent.matches("--silent"));
        assert!(silent.matches("-s"));
        assert!(!silent.matches("-x"));
        assert!(!silent.matches("--sil"));
    }

    #[test]
    fn test_permitted_requires_declared_and_reachable() {
        let mut node: ArgumentNode<()> = ArgumentNode::new(
            Component::Literal {
                name: "team".into(),
                aliases: vec![],
            },
            Permission::node("team"),
        );
        node.reachable = vec![Permission::node("team.create"), Permission::node("team.delete")];

        let check = |permission: &str| permission == "team" || permission == "team.create";
        assert!(node.permitted(&check));

        let check = |permission: &str| permission == "team";
        assert!(!node.permitted(&check));
    }

    #[test]
    fn test_literal_aliases_match() {
        let node: ArgumentNode<()> = ArgumentNode::new(
            Component::Literal {
                name: "teleport".into(),
                aliases: vec!["tp".into()],
            },
            Permission::Empty,
        );
        assert!(node.matches_literal("tp"));
        assert!(node.matches_literal("teleport"));
        assert!(!node.matches_literal("Teleport"));
        assert_eq!(node.label(), "teleport");
    }

    #[test]
    fn test_parser_input_stops_before_recognized_flag() {
        let group: ArgumentNode<()> = ArgumentNode::new(
            Component::Flags {
                name: "flags".into(),
                flags: vec![flag("loud", &['l'])],
            },
            Permission::Empty,
        );
        assert_eq!(group.parser_input(&["hello", "there", "--loud"]), ["hello", "there"]);
        assert_eq!(group.parser_input(&["hello", "-l", "x"]), ["hello"]);
        assert_eq!(group.parser_input(&["--loud", "x"]), ["--loud", "x"]);
        assert_eq!(group.parser_input(&["a", "-5", "--quiet"]), ["a", "-5", "--quiet"]);
    }
}
