//! Reference in-memory permission table.
//!
//! Grants are plain permission strings per subject:
//!
//! - `team.create` grants exactly that node
//! - `team.*` grants every node below `team.`
//! - `*` grants everything
//! - a leading `-` denies instead of granting
//!
//! The most specific matching entry decides; on a tie a denial wins.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use arbor::PermissionChecker;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TABLE_VERSION: u32 = 1;

/// Error type for permission table persistence
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to read permission table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse permission table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported permission table version {0}")]
    Version(u32),
}

/// Persistent table layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableData {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(default)]
    subjects: BTreeMap<String, Vec<String>>,
}

fn current_version() -> u32 {
    TABLE_VERSION
}

/// Thread-safe grant table keyed by subject name.
///
/// # Example
///
/// ```rust
/// use arbor_host::PermissionTable;
///
/// let table = PermissionTable::from_json(r#"{
///     "subjects": { "alice": ["team.*", "-team.delete"] }
/// }"#).unwrap();
///
/// assert!(table.check("alice", "team.create"));
/// assert!(!table.check("alice", "team.delete"));
/// assert!(!table.check("bob", "team.create"));
/// ```
#[derive(Debug)]
pub struct PermissionTable {
    data: RwLock<TableData>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(TableData {
                version: TABLE_VERSION,
                subjects: BTreeMap::new(),
            }),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, TableError> {
        Self::from_data(serde_json::from_str(json)?)
    }

    /// Load a table saved with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let reader = BufReader::new(File::open(path)?);
        Self::from_data(serde_json::from_reader(reader)?)
    }

    fn from_data(data: TableData) -> Result<Self, TableError> {
        if data.version != TABLE_VERSION {
            return Err(TableError::Version(data.version));
        }
        Ok(Self {
            data: RwLock::new(data),
        })
    }

    pub fn to_json(&self) -> Result<String, TableError> {
        Ok(serde_json::to_string_pretty(&*self.data.read())?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &*self.data.read())?;
        Ok(())
    }

    // ========================================================================
    // Grants
    // ========================================================================

    /// Add an entry (`node`, `prefix.*`, `*` or `-node`) for `subject`.
    pub fn grant(&self, subject: impl Into<String>, entry: impl Into<String>) {
        let entry = entry.into();
        let mut data = self.data.write();
        let entries = data.subjects.entry(subject.into()).or_default();
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    /// Remove an entry. Returns whether it was present.
    pub fn revoke(&self, subject: &str, entry: &str) -> bool {
        let mut data = self.data.write();
        let Some(entries) = data.subjects.get_mut(subject) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|existing| existing != entry);
        before != entries.len()
    }

    /// Drop every entry of `subject`.
    pub fn clear(&self, subject: &str) {
        self.data.write().subjects.remove(subject);
    }

    pub fn entries(&self, subject: &str) -> Vec<String> {
        self.data
            .read()
            .subjects
            .get(subject)
            .cloned()
            .unwrap_or_default()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.data.read().subjects.keys().cloned().collect()
    }

    /// Whether `subject` holds `permission`.
    pub fn check(&self, subject: &str, permission: &str) -> bool {
        let data = self.data.read();
        let Some(entries) = data.subjects.get(subject) else {
            return false;
        };
        entries
            .iter()
            .filter_map(|entry| {
                let (denied, pattern) = match entry.strip_prefix('-') {
                    Some(pattern) => (true, pattern),
                    None => (false, entry.as_str()),
                };
                specificity(pattern, permission).map(|rank| (rank, denied))
            })
            .max()
            .is_some_and(|(_, denied)| !denied)
    }

    /// Permission checker looking senders up by `subject(sender)`.
    pub fn checker<S, F>(self: &Arc<Self>, subject: F) -> impl PermissionChecker<S> + 'static
    where
        S: 'static,
        F: Fn(&S) -> String + Send + Sync + 'static,
    {
        let table = Arc::clone(self);
        move |sender: &S, permission: &str| table.check(&subject(sender), permission)
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// How specifically `pattern` matches `permission`, `None` if it does not.
fn specificity(pattern: &str, permission: &str) -> Option<usize> {
    if pattern == permission {
        return Some(usize::MAX);
    }
    if pattern == "*" {
        return Some(0);
    }
    let prefix = pattern.strip_suffix('*')?;
    (prefix.ends_with('.') && permission.starts_with(prefix)).then_some(prefix.len())
}
