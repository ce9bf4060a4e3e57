//! The command tree: insertion with ambiguity checks, and resolution.
//!
//! Commands share a prefix tree rooted at a synthetic node. Insertion builds a
//! branch per command and rejects anything that could make two commands match
//! the same input. Resolution walks tokens down the tree, trying at each node
//! literals first, then flags, then the single value child.

use std::collections::HashSet;
use std::sync::Arc;

use crate::argument::{ArgumentKind, ArgumentSpec, DefaultValue};
use crate::command::Command;
use crate::error::{AmbiguousNodeError, ConfigurationError, Conflict, RegistrationError, ResolveError};
use crate::invocation::ArgumentValues;
use crate::node::{is_flag_marker, ArgumentNode, Component, FlagNode, FlagValue};
use crate::parser::{ArgValue, ArgumentParser, ParseFailure, ParserRegistry, TypeTag};
use crate::permission::{Permission, PermissionChecker, PermissionPolicy};
use crate::tokenize::tokenize;

/// Prefix tree of registered commands.
pub struct CommandTree<S> {
    root: ArgumentNode<S>,
    commands: Vec<Arc<Command<S>>>,
}

impl<S> Clone for CommandTree<S> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<S> Default for CommandTree<S> {
    fn default() -> Self {
        Self {
            root: ArgumentNode::root(),
            commands: Vec::new(),
        }
    }
}

/// Outcome of a successful resolution.
pub struct Resolved<S> {
    pub command: Arc<Command<S>>,
    pub values: ArgumentValues,
    /// Labels of the nodes walked, ending at the command's terminal node.
    pub path: Vec<String>,
}

/// Which nodes a sender may enter.
#[derive(Clone, Copy)]
pub(crate) struct Access<'a> {
    pub check: &'a dyn Fn(&str) -> bool,
    pub policy: PermissionPolicy,
}

impl Access<'_> {
    pub fn allows<S>(&self, node: &ArgumentNode<S>) -> bool {
        self.policy == PermissionPolicy::TerminalOnly || node.permitted(self.check)
    }
}

impl<S> CommandTree<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &ArgumentNode<S> {
        &self.root
    }

    /// Commands in registration order.
    pub fn commands(&self) -> &[Arc<Command<S>>] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Node reached by following `path` labels from the root.
    pub fn node_at(&self, path: &[String]) -> Option<&ArgumentNode<S>> {
        path.iter().try_fold(&self.root, |node, label| {
            node.children.iter().find(|child| &child.label() == label)
        })
    }

    /// Commands whose terminal node lies at or below `path`.
    pub fn commands_under(&self, path: &[String]) -> Vec<Arc<Command<S>>> {
        let mut found = Vec::new();
        if let Some(node) = self.node_at(path) {
            collect_commands(node, &mut found);
        }
        found
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert a command. On error the tree is unchanged.
    pub fn insert(
        &mut self,
        command: Arc<Command<S>>,
        parsers: &ParserRegistry,
    ) -> Result<(), RegistrationError> {
        validate(command.arguments())?;
        let prepared = command
            .arguments()
            .iter()
            .map(|argument| prepare(argument, parsers))
            .collect::<Result<Vec<_>, _>>()?;

        let mut staged = self.root.clone();
        let mut path = Vec::new();
        let mut indices = Vec::new();
        insert_branch(&mut staged, &prepared, &command, &mut path, &mut indices)?;
        check_terminals(&staged, &indices, &path)?;

        self.root = staged;
        self.commands.push(command);
        Ok(())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Walk `tokens` down the tree to a unique command.
    ///
    /// Pure: no handler runs and the tree is not modified. Parsers of nodes the
    /// sender may not enter are never invoked.
    pub fn resolve(
        &self,
        sender: &S,
        tokens: &[&str],
        checker: &dyn PermissionChecker<S>,
        policy: PermissionPolicy,
    ) -> Result<Resolved<S>, ResolveError> {
        if tokens.is_empty() {
            return Err(ResolveError::NoSuchCommand {
                name: String::new(),
            });
        }

        let check = |permission: &str| checker.has_permission(sender, permission);
        let mut walk = Walk {
            tokens,
            access: Access {
                check: &check,
                policy,
            },
            position: 0,
            path: Vec::new(),
            values: ArgumentValues::new(),
        };

        let mut node = &self.root;
        while let Some(&token) = walk.tokens.get(walk.position) {
            node = walk.step(node, token)?;
        }
        let command = walk.complete(node)?;

        let permitted = match policy {
            PermissionPolicy::PerNode => command.permission().test(&check),
            PermissionPolicy::TerminalOnly => command.required_permission().test(&check),
        };
        if !permitted {
            tracing::debug!(
                command = %command.syntax(),
                permission = %command.permission(),
                "Permission denied for command"
            );
            return Err(ResolveError::NoPermission { path: walk.path });
        }

        Ok(Resolved {
            command: Arc::clone(command),
            values: walk.values,
            path: walk.path,
        })
    }
}

fn collect_commands<S>(node: &ArgumentNode<S>, found: &mut Vec<Arc<Command<S>>>) {
    if let Some(command) = &node.command {
        found.push(Arc::clone(command));
    }
    for child in &node.children {
        collect_commands(child, found);
    }
}

// ============================================================================
// Validation
// ============================================================================

fn valid_word(text: &str) -> bool {
    !text.is_empty() && !text.starts_with('-') && !text.chars().any(char::is_whitespace)
}

fn validate(arguments: &[ArgumentSpec]) -> Result<(), ConfigurationError> {
    let first = arguments.first().ok_or(ConfigurationError::EmptyCommand)?;
    if first.kind() != ArgumentKind::Literal {
        return Err(ConfigurationError::NamespaceNotLiteral {
            name: first.name().to_string(),
        });
    }

    let mut names = HashSet::new();
    let mut optional: Option<&str> = None;
    let last = arguments.len() - 1;

    for (index, argument) in arguments.iter().enumerate() {
        let kind = argument.kind();

        if matches!(kind, ArgumentKind::Literal | ArgumentKind::Required) {
            if let Some(optional) = optional {
                return Err(ConfigurationError::RequiredAfterOptional {
                    argument: argument.label(),
                    optional: optional.to_string(),
                });
            }
        }
        if kind != ArgumentKind::Optional && argument.default().is_some() {
            return Err(ConfigurationError::UnexpectedDefault {
                argument: argument.name().to_string(),
            });
        }

        match kind {
            ArgumentKind::Literal => {
                let literals = std::iter::once(argument.name())
                    .chain(argument.aliases().iter().map(String::as_str));
                for literal in literals {
                    if !valid_word(literal) {
                        return Err(ConfigurationError::InvalidLiteral {
                            literal: literal.to_string(),
                        });
                    }
                }
            }
            ArgumentKind::Required | ArgumentKind::Optional => {
                if argument.type_tag().is_none() {
                    return Err(ConfigurationError::MissingType {
                        argument: argument.name().to_string(),
                    });
                }
                if !names.insert(argument.name()) {
                    return Err(ConfigurationError::DuplicateArgument {
                        argument: argument.name().to_string(),
                    });
                }
                if kind == ArgumentKind::Optional {
                    optional = Some(argument.name());
                }
            }
            ArgumentKind::Flag => {
                if index != last {
                    return Err(ConfigurationError::FlagGroupNotLast {
                        group: argument.name().to_string(),
                    });
                }
                if argument.flag_specs().is_empty() {
                    return Err(ConfigurationError::EmptyFlagGroup {
                        group: argument.name().to_string(),
                    });
                }
                let mut aliases = HashSet::new();
                for flag in argument.flag_specs() {
                    if !valid_word(flag.name()) {
                        return Err(ConfigurationError::InvalidFlagName {
                            flag: flag.name().to_string(),
                        });
                    }
                    if let Some(alias) = flag.aliases().iter().find(|alias| !alias.is_alphabetic()) {
                        return Err(ConfigurationError::InvalidFlagName {
                            flag: format!("-{}", alias),
                        });
                    }
                    if flag.value_type().is_none() && flag.default().is_some() {
                        return Err(ConfigurationError::UnexpectedDefault {
                            argument: flag.name().to_string(),
                        });
                    }
                    if !names.insert(flag.name()) {
                        return Err(ConfigurationError::DuplicateArgument {
                            argument: flag.name().to_string(),
                        });
                    }
                    for alias in flag.aliases() {
                        if !aliases.insert(*alias) {
                            return Err(ConfigurationError::DuplicateFlag {
                                flag: format!("-{}", alias),
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// Node Construction
// ============================================================================

struct Prepared {
    component: Component,
    permission: Permission,
}

fn prepare(argument: &ArgumentSpec, parsers: &ParserRegistry) -> Result<Prepared, ConfigurationError> {
    let component = match argument.kind() {
        ArgumentKind::Literal => Component::Literal {
            name: argument.name().to_string(),
            aliases: argument.aliases().to_vec(),
        },
        kind @ (ArgumentKind::Required | ArgumentKind::Optional) => {
            let type_tag = argument
                .type_tag()
                .cloned()
                .ok_or_else(|| ConfigurationError::MissingType {
                    argument: argument.name().to_string(),
                })?;
            let parser = instantiate(argument.name(), &type_tag, argument.parser_config(), parsers)?;
            let default = parse_default(argument.name(), parser.as_ref(), argument.default())?;
            Component::Value {
                name: argument.name().to_string(),
                kind,
                type_tag,
                config: argument.parser_config().clone(),
                parser,
                default,
            }
        }
        ArgumentKind::Flag => {
            let flags = argument
                .flag_specs()
                .iter()
                .map(|flag| -> Result<FlagNode, ConfigurationError> {
                    let value = match (flag.value_type(), flag.value_config()) {
                        (Some(type_tag), Some(config)) => {
                            let parser = instantiate(flag.name(), type_tag, config, parsers)?;
                            let default = parse_default(flag.name(), parser.as_ref(), flag.default())?;
                            Some(FlagValue {
                                type_tag: type_tag.clone(),
                                parser,
                                default,
                            })
                        }
                        _ => None,
                    };
                    Ok(FlagNode {
                        name: flag.name().to_string(),
                        aliases: flag.aliases().to_vec(),
                        value,
                        permission: flag.permission_ref().clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Component::Flags {
                name: argument.name().to_string(),
                flags,
            }
        }
    };
    Ok(Prepared {
        component,
        permission: argument.permission_ref().clone(),
    })
}

fn instantiate(
    argument: &str,
    type_tag: &TypeTag,
    config: &crate::parser::ParserConfig,
    parsers: &ParserRegistry,
) -> Result<Arc<dyn ArgumentParser>, ConfigurationError> {
    parsers
        .create_parser(type_tag, config)
        .map_err(|source| ConfigurationError::NoParser {
            argument: argument.to_string(),
            source,
        })
}

fn parse_default(
    argument: &str,
    parser: &dyn ArgumentParser,
    default: Option<&DefaultValue>,
) -> Result<Option<ArgValue>, ConfigurationError> {
    match default {
        None => Ok(None),
        Some(DefaultValue::Value(value)) => Ok(Some(value.clone())),
        Some(DefaultValue::Input(input)) => {
            let tokens = tokenize(input);
            parser
                .parse(&tokens)
                .map(|parsed| Some(parsed.value))
                .map_err(|source| ConfigurationError::InvalidDefault {
                    argument: argument.to_string(),
                    source,
                })
        }
    }
}

// ============================================================================
// Insertion
// ============================================================================

fn ambiguous(path: &[String], conflict: Conflict) -> AmbiguousNodeError {
    AmbiguousNodeError {
        path: path.to_vec(),
        conflict,
    }
}

fn value_signature(kind: ArgumentKind, name: &str, type_tag: &TypeTag) -> String {
    match kind {
        ArgumentKind::Optional => format!("[{}:{}]", name, type_tag),
        _ => format!("<{}:{}>", name, type_tag),
    }
}

fn insert_branch<S>(
    node: &mut ArgumentNode<S>,
    prepared: &[Prepared],
    command: &Arc<Command<S>>,
    path: &mut Vec<String>,
    indices: &mut Vec<usize>,
) -> Result<(), AmbiguousNodeError> {
    if !node.is_root() {
        node.reachable.push(command.permission().clone());
    }

    let Some((head, rest)) = prepared.split_first() else {
        if let Some(existing) = &node.command {
            return Err(ambiguous(
                path,
                Conflict::DuplicateCommand {
                    existing: existing.syntax(),
                },
            ));
        }
        node.command = Some(Arc::clone(command));
        return Ok(());
    };

    let index = match find_child(node, head, path)? {
        Some(index) => index,
        None => {
            node.children
                .push(ArgumentNode::new(head.component.clone(), head.permission.clone()));
            node.children.len() - 1
        }
    };
    indices.push(index);

    let child = &mut node.children[index];
    path.push(child.label());
    insert_branch(child, rest, command, path, indices)
}

/// Index of an existing child the prepared node merges into, `None` when a new
/// child must be created.
fn find_child<S>(
    node: &mut ArgumentNode<S>,
    head: &Prepared,
    path: &[String],
) -> Result<Option<usize>, AmbiguousNodeError> {
    match &head.component {
        Component::Root => Ok(None),
        Component::Literal { name, aliases } => {
            let existing = node.children.iter().position(|child| {
                matches!(&child.component, Component::Literal { name: other, .. } if other == name)
            });

            for literal in std::iter::once(name).chain(aliases) {
                let collides = node
                    .children
                    .iter()
                    .enumerate()
                    .any(|(index, child)| Some(index) != existing && child.matches_literal(literal));
                if collides {
                    return Err(ambiguous(
                        path,
                        Conflict::LiteralCollision {
                            literal: literal.clone(),
                        },
                    ));
                }
            }

            if let Some(index) = existing {
                let child = &mut node.children[index];
                check_permission(&*child, head, path)?;
                if let Component::Literal { aliases: known, .. } = &mut child.component {
                    for alias in aliases {
                        if !known.contains(alias) {
                            known.push(alias.clone());
                        }
                    }
                }
            }
            Ok(existing)
        }
        Component::Value {
            name,
            kind,
            type_tag,
            config,
            ..
        } => {
            let existing = node
                .children
                .iter()
                .position(|child| matches!(child.component, Component::Value { .. }));
            match existing {
                Some(index) => {
                    let child = &node.children[index];
                    if let Component::Value {
                        name: other_name,
                        kind: other_kind,
                        type_tag: other_tag,
                        config: other_config,
                        ..
                    } = &child.component
                    {
                        let compatible = other_name == name
                            && other_kind == kind
                            && other_tag == type_tag
                            && other_config == config;
                        if !compatible {
                            return Err(ambiguous(
                                path,
                                Conflict::ValueSibling {
                                    existing: value_signature(*other_kind, other_name, other_tag),
                                    incoming: value_signature(*kind, name, type_tag),
                                },
                            ));
                        }
                    }
                    check_permission(child, head, path)?;
                    Ok(Some(index))
                }
                None => {
                    if *kind == ArgumentKind::Optional && node.flags_child().is_some() {
                        return Err(ambiguous(path, Conflict::CompletionSibling));
                    }
                    Ok(None)
                }
            }
        }
        Component::Flags { .. } => {
            if node.flags_child().is_some() {
                return Err(ambiguous(path, Conflict::DuplicateFlagGroup));
            }
            if node.completion_child().is_some() {
                return Err(ambiguous(path, Conflict::CompletionSibling));
            }
            Ok(None)
        }
    }
}

fn check_permission<S>(
    child: &ArgumentNode<S>,
    head: &Prepared,
    path: &[String],
) -> Result<(), AmbiguousNodeError> {
    if child.permission != head.permission {
        return Err(ambiguous(
            path,
            Conflict::PermissionMismatch { node: child.label() },
        ));
    }
    Ok(())
}

/// Reject a terminal reachable from another terminal without consuming input.
fn check_terminals<S>(
    root: &ArgumentNode<S>,
    indices: &[usize],
    path: &[String],
) -> Result<(), AmbiguousNodeError> {
    let mut chain = vec![root];
    let mut node = root;
    for &index in indices {
        node = &node.children[index];
        chain.push(node);
    }

    let shadowed = |existing: &Arc<Command<S>>| {
        ambiguous(
            path,
            Conflict::ShadowedCommand {
                existing: existing.syntax(),
            },
        )
    };

    let mut current = node;
    while let Some(next) = current.completion_child() {
        if let Some(existing) = &next.command {
            return Err(shadowed(existing));
        }
        current = next;
    }

    for pair in chain.windows(2).rev() {
        let (parent, child) = (pair[0], pair[1]);
        if !child.is_completion() {
            break;
        }
        if let Some(existing) = &parent.command {
            return Err(shadowed(existing));
        }
    }
    Ok(())
}

// ============================================================================
// Resolution
// ============================================================================

struct Walk<'a> {
    tokens: &'a [&'a str],
    access: Access<'a>,
    position: usize,
    path: Vec<String>,
    values: ArgumentValues,
}

impl<'a> Walk<'a> {
    fn remaining(&self) -> &'a [&'a str] {
        &self.tokens[self.position.min(self.tokens.len())..]
    }

    fn enter<S>(&mut self, node: &ArgumentNode<S>) -> Result<(), ResolveError> {
        if !self.access.allows(node) {
            tracing::debug!(
                node = %node.label(),
                permission = %node.permission(),
                "Permission denied for node"
            );
            return Err(ResolveError::NoPermission {
                path: self.path.clone(),
            });
        }
        self.path.push(node.label());
        Ok(())
    }

    fn parse_error(&self, argument: &str, source: ParseFailure) -> ResolveError {
        ResolveError::ArgumentParse {
            path: self.path.clone(),
            argument: argument.to_string(),
            source,
        }
    }

    /// Consume the next token(s) at `node`, returning the node moved to.
    fn step<'n, S>(
        &mut self,
        node: &'n ArgumentNode<S>,
        token: &str,
    ) -> Result<&'n ArgumentNode<S>, ResolveError> {
        if let Some(child) = node.literal_child(token) {
            self.enter(child)?;
            self.position += 1;
            return Ok(child);
        }

        if is_flag_marker(token) {
            if let Some(group) = node.flags_child().filter(|group| group.recognizes_flag(token)) {
                self.enter(group)?;
                self.parse_flags(group)?;
                return Ok(group);
            }
            if let Some(optional) = node
                .completion_child()
                .filter(|optional| optional.leads_to_flag(token))
            {
                self.enter(optional)?;
                self.apply_default(optional);
                return Ok(optional);
            }
        }

        if let Some(child) = node.value_child() {
            self.enter(child)?;
            self.parse_value(child)?;
            return Ok(child);
        }

        Err(self.no_match(node, token))
    }

    fn parse_value<S>(&mut self, node: &ArgumentNode<S>) -> Result<(), ResolveError> {
        let Some(parser) = node.parser() else {
            return Ok(());
        };
        let value = self.run_parser(node.name(), parser.as_ref(), node)?;
        self.values.insert(node.name(), value);
        Ok(())
    }

    /// Run `parser` on the remaining input, bounded by the flags reachable
    /// from `bound`.
    fn run_parser<S>(
        &mut self,
        argument: &str,
        parser: &dyn ArgumentParser,
        bound: &ArgumentNode<S>,
    ) -> Result<ArgValue, ResolveError> {
        let remaining = bound.parser_input(self.remaining());
        if remaining.is_empty() {
            return Err(self.parse_error(argument, ParseFailure::NoInput));
        }
        let parsed = parser
            .parse(remaining)
            .map_err(|source| self.parse_error(argument, source))?;
        if parsed.consumed > remaining.len() {
            return Err(self.parse_error(
                argument,
                ParseFailure::custom(format!(
                    "parser consumed {} tokens but only {} remain",
                    parsed.consumed,
                    remaining.len()
                )),
            ));
        }
        self.position += parsed.consumed;
        Ok(parsed.value)
    }

    fn parse_flags<S>(&mut self, group: &ArgumentNode<S>) -> Result<(), ResolveError> {
        let mut seen: Vec<&str> = Vec::new();
        while let Some(&token) = self.tokens.get(self.position) {
            if !is_flag_marker(token) {
                break;
            }
            let Some(flag) = group.flags().iter().find(|flag| flag.matches(token)) else {
                return Err(self.parse_error(
                    group.name(),
                    ParseFailure::UnknownFlag {
                        flag: token.to_string(),
                    },
                ));
            };
            if seen.contains(&flag.name.as_str()) {
                return Err(self.parse_error(
                    group.name(),
                    ParseFailure::RepeatedFlag { flag: flag.marker() },
                ));
            }
            seen.push(&flag.name);

            if !flag.permission.test(self.access.check) {
                tracing::debug!(
                    flag = %flag.marker(),
                    permission = %flag.permission,
                    "Permission denied for flag"
                );
                return Err(ResolveError::NoPermission {
                    path: self.path.clone(),
                });
            }
            self.position += 1;

            let value = match &flag.value {
                Some(value) => self.run_parser(&flag.name, value.parser.as_ref(), group)?,
                None => ArgValue::new(true),
            };
            self.values.insert(flag.name.clone(), value);
        }
        self.fill_flag_defaults(group);
        Ok(())
    }

    fn fill_flag_defaults<S>(&mut self, group: &ArgumentNode<S>) {
        for flag in group.flags() {
            if self.values.contains(&flag.name) {
                continue;
            }
            match &flag.value {
                None => self.values.insert(flag.name.clone(), ArgValue::new(false)),
                Some(FlagValue {
                    default: Some(default),
                    ..
                }) => self.values.insert(flag.name.clone(), default.clone()),
                Some(_) => {}
            }
        }
    }

    fn apply_default<S>(&mut self, node: &ArgumentNode<S>) {
        if let Some(default) = node.default_value() {
            self.values.insert(node.name(), default.clone());
        }
    }

    /// Out of tokens: follow optional arguments and flag groups to a command.
    fn complete<'n, S>(&mut self, node: &'n ArgumentNode<S>) -> Result<&'n Arc<Command<S>>, ResolveError> {
        let mut node = node;
        loop {
            if let Some(command) = &node.command {
                return Ok(command);
            }
            let Some(child) = node.completion_child() else {
                return Err(ResolveError::Incomplete {
                    path: self.path.clone(),
                    expected: node
                        .children
                        .iter()
                        .filter(|child| self.access.allows(*child))
                        .map(ArgumentNode::label)
                        .collect(),
                });
            };
            self.enter(child)?;
            if child.kind() == Some(ArgumentKind::Flag) {
                self.fill_flag_defaults(child);
            } else {
                self.apply_default(child);
            }
            node = child;
        }
    }

    fn no_match<S>(&self, node: &ArgumentNode<S>, token: &str) -> ResolveError {
        if node.is_root() {
            return ResolveError::NoSuchCommand {
                name: token.to_string(),
            };
        }
        if is_flag_marker(token) {
            if let Some(group) = node.flags_child() {
                return self.parse_error(
                    group.name(),
                    ParseFailure::UnknownFlag {
                        flag: token.to_string(),
                    },
                );
            }
        }
        let mut literals = node
            .children
            .iter()
            .filter(|child| child.kind() == Some(ArgumentKind::Literal))
            .peekable();
        if literals.peek().is_some() {
            return ResolveError::UnknownLiteral {
                path: self.path.clone(),
                token: token.to_string(),
                expected: literals
                    .filter(|child| self.access.allows(*child))
                    .map(ArgumentNode::label)
                    .collect(),
            };
        }
        ResolveError::TooManyArguments {
            path: self.path.clone(),
            extra: self.remaining().iter().map(|token| token.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::FlagSpec;
    use crate::invocation::Invocation;

    fn build(builder: crate::command::CommandBuilder<()>) -> Arc<Command<()>> {
        Arc::new(builder.handler(|_: &Invocation<()>| ()).build().unwrap())
    }

    fn insert(tree: &mut CommandTree<()>, builder: crate::command::CommandBuilder<()>) -> Result<(), RegistrationError> {
        tree.insert(build(builder), &ParserRegistry::with_defaults())
    }

    fn conflict(result: Result<(), RegistrationError>) -> Conflict {
        match result {
            Err(RegistrationError::Ambiguous(err)) => err.conflict,
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_prefix_merges() {
        let mut tree = CommandTree::new();
        insert(&mut tree, Command::builder("team").literal("create").required("name", TypeTag::STRING)).unwrap();
        insert(&mut tree, Command::builder("team").literal("delete").required("name", TypeTag::STRING)).unwrap();

        assert_eq!(tree.root().children().len(), 1);
        assert_eq!(tree.root().children()[0].children().len(), 2);
        assert_eq!(tree.commands().len(), 2);
    }

    #[test]
    fn test_value_siblings_conflict() {
        let mut tree = CommandTree::new();
        insert(&mut tree, Command::builder("x").required("a", TypeTag::INTEGER)).unwrap();
        let conflict = conflict(insert(&mut tree, Command::builder("x").required("b", TypeTag::STRING)));
        assert_eq!(
            conflict,
            Conflict::ValueSibling {
                existing: "<a:integer>".into(),
                incoming: "<b:string>".into(),
            }
        );
    }

    #[test]
    fn test_literal_alias_collision() {
        let mut tree = CommandTree::new();
        insert(&mut tree, Command::builder("teleport").literal_with_aliases("here", ["h"])).unwrap();
        let conflict = conflict(insert(&mut tree, Command::builder("teleport").literal("h")));
        assert_eq!(conflict, Conflict::LiteralCollision { literal: "h".into() });
    }

    #[test]
    fn test_optional_extension_is_shadowed() {
        let mut tree = CommandTree::new();
        insert(&mut tree, Command::builder("give").required("player", TypeTag::STRING)).unwrap();
        let conflict = conflict(insert(
            &mut tree,
            Command::builder("give")
                .required("player", TypeTag::STRING)
                .optional("amount", TypeTag::INTEGER),
        ));
        assert!(matches!(conflict, Conflict::ShadowedCommand { .. }));

        let mut tree = CommandTree::new();
        insert(&mut tree, Command::builder("give").optional("amount", TypeTag::INTEGER)).unwrap();
        let conflict = self::conflict(insert(&mut tree, Command::builder("give")));
        assert!(matches!(conflict, Conflict::ShadowedCommand { .. }));
    }

    #[test]
    fn test_flag_groups_are_not_shared() {
        let mut tree = CommandTree::new();
        insert(&mut tree, Command::builder("say").flag(FlagSpec::presence("loud"))).unwrap();
        let conflict = conflict(insert(&mut tree, Command::builder("say").flag(FlagSpec::presence("quiet"))));
        assert_eq!(conflict, Conflict::DuplicateFlagGroup);
    }

    #[test]
    fn test_configuration_errors() {
        let mut tree = CommandTree::new();
        let err = insert(
            &mut tree,
            Command::builder("give")
                .optional("amount", TypeTag::INTEGER)
                .required("player", TypeTag::STRING),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Configuration(ConfigurationError::RequiredAfterOptional { .. })
        ));

        let err = insert(&mut tree, Command::builder("spawn").required("world", "world")).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Configuration(ConfigurationError::NoParser { .. })
        ));

        let err = insert(
            &mut tree,
            Command::builder("give").optional_with_default("amount", TypeTag::INTEGER, "lots"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Configuration(ConfigurationError::InvalidDefault { .. })
        ));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_failed_insert_leaves_tree_unchanged() {
        let mut tree = CommandTree::new();
        insert(&mut tree, Command::builder("x").literal("a").required("v", TypeTag::INTEGER)).unwrap();
        let before = format!("{:?}", tree.root());

        let result = insert(&mut tree, Command::builder("x").literal("a").required("w", TypeTag::STRING));
        assert!(result.is_err());
        assert_eq!(format!("{:?}", tree.root()), before);
        assert_eq!(tree.commands().len(), 1);
    }

    #[test]
    fn test_node_at_and_commands_under() {
        let mut tree = CommandTree::new();
        insert(&mut tree, Command::builder("team").literal("create").required("name", TypeTag::STRING)).unwrap();
        insert(&mut tree, Command::builder("team").literal("list")).unwrap();

        let node = tree.node_at(&["team".to_string()]).unwrap();
        assert_eq!(node.children().len(), 2);
        assert_eq!(tree.commands_under(&["team".to_string()]).len(), 2);
        assert!(tree.node_at(&["nope".to_string()]).is_none());
    }
}
