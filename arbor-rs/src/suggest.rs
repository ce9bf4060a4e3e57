//! Completion candidates for partially typed input.

use crate::argument::ArgumentKind;
use crate::node::{is_flag_marker, ArgumentNode};
use crate::tree::{Access, CommandTree};

/// Suggestions for the last token of `tokens`, which may be empty.
///
/// Walks the complete tokens like resolution does but never fails: any input
/// that does not lead anywhere yields no suggestions. Nodes are filtered by
/// their effective permission under either policy.
pub(crate) fn suggest<S>(
    tree: &CommandTree<S>,
    tokens: &[&str],
    access: Access<'_>,
    limit: usize,
) -> Vec<String> {
    let Some((&partial, complete)) = tokens.split_last() else {
        return Vec::new();
    };

    let mut node = tree.root();
    let mut position = 0;
    let mut used: Vec<&str> = Vec::new();

    while let Some(&token) = complete.get(position) {
        if let Some(child) = node.literal_child(token) {
            if !child.permitted(access.check) {
                return Vec::new();
            }
            node = child;
            position += 1;
            continue;
        }

        if is_flag_marker(token) {
            if let Some(group) = reachable_flags(node) {
                let Some(flag) = group.flags().iter().find(|flag| flag.matches(token)) else {
                    return Vec::new();
                };
                if !group.permitted(access.check) || !flag.permission.test(access.check) {
                    return Vec::new();
                }
                used.push(&flag.name);
                node = group;
                position += 1;

                if let Some(value) = &flag.value {
                    let rest = &complete[position..];
                    if rest.is_empty() {
                        return finish(value.parser.suggestions(partial), limit);
                    }
                    match value.parser.parse(group.parser_input(rest)) {
                        Ok(parsed) if parsed.consumed <= rest.len() => position += parsed.consumed,
                        _ => return Vec::new(),
                    }
                }
                continue;
            }
        }

        if let Some(child) = node.value_child() {
            if !child.permitted(access.check) {
                return Vec::new();
            }
            let rest = &complete[position..];
            match child.parser().map(|parser| parser.parse(child.parser_input(rest))) {
                Some(Ok(parsed)) if parsed.consumed <= rest.len() => {
                    position += parsed.consumed;
                    node = child;
                    continue;
                }
                _ => return Vec::new(),
            }
        }

        return Vec::new();
    }

    let mut candidates = Vec::new();
    let mut offers_values = false;
    for child in node.children() {
        if !child.permitted(access.check) {
            continue;
        }
        match child.kind() {
            Some(ArgumentKind::Literal) => {
                offers_values = true;
                candidates.extend(
                    child
                        .literal_names()
                        .filter(|literal| literal.starts_with(partial))
                        .map(str::to_string),
                );
            }
            Some(ArgumentKind::Required | ArgumentKind::Optional) => {
                offers_values = true;
                if let Some(parser) = child.parser() {
                    candidates.extend(parser.suggestions(partial));
                }
            }
            _ => {}
        }
    }

    if partial.starts_with('-') || !offers_values {
        if let Some(group) = reachable_flags(node).filter(|group| group.permitted(access.check)) {
            candidates.extend(
                group
                    .flags()
                    .iter()
                    .filter(|flag| !used.contains(&flag.name.as_str()))
                    .filter(|flag| flag.permission.test(access.check))
                    .map(|flag| flag.marker())
                    .filter(|marker| marker.starts_with(partial)),
            );
        }
    }

    finish(candidates, limit)
}

/// The flag group at `node`, or the one reachable through optional arguments.
fn reachable_flags<S>(node: &ArgumentNode<S>) -> Option<&ArgumentNode<S>> {
    if node.kind() == Some(ArgumentKind::Flag) {
        return Some(node);
    }
    let mut current = node;
    loop {
        if let Some(group) = current.flags_child() {
            return Some(group);
        }
        current = current.completion_child()?;
    }
}

fn finish(mut candidates: Vec<String>, limit: usize) -> Vec<String> {
    candidates.sort();
    candidates.dedup();
    candidates.truncate(limit);
    candidates
}
