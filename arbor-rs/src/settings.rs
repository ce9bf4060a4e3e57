//! Manager configuration.

use serde::{Deserialize, Serialize};

use crate::permission::PermissionPolicy;

const DEFAULT_MAX_SUGGESTIONS: usize = 64;

/// How a manager runs resolved commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoordinatorSettings {
    /// Run handlers on the caller's thread.
    #[default]
    Immediate,
    /// Queue handlers for a pool of worker tasks.
    Scheduled { workers: usize },
}

/// Configuration for a [`CommandManager`](crate::CommandManager).
///
/// # Example
///
/// ```rust
/// use arbor::{CoordinatorSettings, ManagerSettings, PermissionPolicy};
///
/// let settings = ManagerSettings::from_json(r#"{
///     "permission_policy": "terminal_only",
///     "coordinator": { "kind": "scheduled", "workers": 4 }
/// }"#).unwrap();
///
/// assert_eq!(settings.permission_policy, PermissionPolicy::TerminalOnly);
/// assert_eq!(settings.coordinator, CoordinatorSettings::Scheduled { workers: 4 });
/// assert_eq!(settings.max_suggestions, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    pub permission_policy: PermissionPolicy,
    pub coordinator: CoordinatorSettings,
    pub max_suggestions: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            permission_policy: PermissionPolicy::default(),
            coordinator: CoordinatorSettings::default(),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

impl ManagerSettings {
    /// Defaults with a scheduled coordinator of `workers` workers.
    pub fn scheduled(workers: usize) -> Self {
        Self {
            coordinator: CoordinatorSettings::Scheduled { workers },
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ManagerSettings::default();
        assert_eq!(settings.permission_policy, PermissionPolicy::PerNode);
        assert_eq!(settings.coordinator, CoordinatorSettings::Immediate);
        assert_eq!(settings.max_suggestions, 64);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        assert_eq!(ManagerSettings::from_json("{}").unwrap(), ManagerSettings::default());
    }

    #[test]
    fn test_json_round_trip() {
        let settings = ManagerSettings::scheduled(2);
        let json = settings.to_json().unwrap();
        assert_eq!(ManagerSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_unknown_coordinator_kind_fails() {
        assert!(ManagerSettings::from_json(r#"{"coordinator": {"kind": "threaded"}}"#).is_err());
    }
}
