//! Permission predicates and the host permission capability.
//!
//! The engine never interprets permission strings; it only combines them
//! into predicates and asks the host's [`PermissionChecker`] about each node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Predicate over permission strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Always satisfied.
    #[default]
    Empty,
    /// A single permission string.
    Node(String),
    /// Satisfied when any member is (an empty list is satisfied).
    AnyOf(Vec<Permission>),
    /// Satisfied when every member is.
    AllOf(Vec<Permission>),
}

impl Permission {
    pub fn node(permission: impl Into<String>) -> Self {
        let permission = permission.into();
        if permission.is_empty() {
            Permission::Empty
        } else {
            Permission::Node(permission)
        }
    }

    pub fn any_of(members: impl IntoIterator<Item = Permission>) -> Self {
        Permission::AnyOf(members.into_iter().collect())
    }

    pub fn all_of(members: impl IntoIterator<Item = Permission>) -> Self {
        Permission::AllOf(members.into_iter().collect())
    }

    /// Whether this predicate is trivially satisfied.
    pub fn is_empty(&self) -> bool {
        match self {
            Permission::Empty => true,
            Permission::Node(node) => node.is_empty(),
            Permission::AnyOf(members) => {
                members.is_empty() || members.iter().any(Permission::is_empty)
            }
            Permission::AllOf(members) => members.iter().all(Permission::is_empty),
        }
    }

    /// Evaluate against a host check.
    pub fn test(&self, check: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Permission::Empty => true,
            Permission::Node(node) => node.is_empty() || check(node),
            Permission::AnyOf(members) => {
                members.is_empty() || members.iter().any(|member| member.test(check))
            }
            Permission::AllOf(members) => members.iter().all(|member| member.test(check)),
        }
    }

    /// Conjunction, dropping trivially satisfied sides.
    pub fn and(self, other: Permission) -> Permission {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other,
            (_, true) => self,
            _ => Permission::AllOf(vec![self, other]),
        }
    }
}

impl From<&str> for Permission {
    fn from(permission: &str) -> Self {
        Permission::node(permission)
    }
}

impl From<String> for Permission {
    fn from(permission: String) -> Self {
        Permission::node(permission)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Empty => f.write_str("<none>"),
            Permission::Node(node) => f.write_str(node),
            Permission::AnyOf(members) => write_joined(f, members, " | "),
            Permission::AllOf(members) => write_joined(f, members, " & "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, members: &[Permission], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (index, member) in members.iter().enumerate() {
        if index > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", member)?;
    }
    f.write_str(")")
}

/// Host capability answering whether a sender holds a permission string.
///
/// Implemented for any `Fn(&S, &str) -> bool`.
pub trait PermissionChecker<S>: Send + Sync {
    fn has_permission(&self, sender: &S, permission: &str) -> bool;
}

impl<S, F> PermissionChecker<S> for F
where
    F: Fn(&S, &str) -> bool + Send + Sync,
{
    fn has_permission(&self, sender: &S, permission: &str) -> bool {
        self(sender, permission)
    }
}

/// Where resolution consults permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPolicy {
    /// Check every node on the way down, then the matched command.
    #[default]
    PerNode,
    /// Only check the matched command's aggregate permission.
    TerminalOnly,
}
