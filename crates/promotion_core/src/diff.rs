//! Diff engine
//!
//! Classifies per-key differences between a source and a target snapshot.
//! [`compute_diffs`] is pure: identical inputs always produce an identical,
//! key-ordered list of diffs, which lets the service preview a promotion and
//! re-validate it later with the same result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::errors::ValidationError;

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;

/// Type reported for keys whose provider only knows values.
pub const DEFAULT_CONFIG_TYPE: &str = "STRING";

/// Version reported for keys whose provider does not track versions.
pub const DEFAULT_CONFIG_VERSION: u32 = 1;

/// One configuration entry as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub value: String,
    #[serde(rename = "type")]
    pub config_type: String,
    pub version: u32,
}

impl ConfigRecord {
    pub fn new(value: impl Into<String>, config_type: impl Into<String>, version: u32) -> Self {
        Self {
            value: value.into(),
            config_type: config_type.into(),
            version,
        }
    }

    /// Record for a value-only provider: type `STRING`, version 1.
    pub fn untyped(value: impl Into<String>) -> Self {
        Self::new(value, DEFAULT_CONFIG_TYPE, DEFAULT_CONFIG_VERSION)
    }

    fn same_content(&self, other: &ConfigRecord) -> bool {
        self.value == other.value && self.config_type == other.config_type
    }
}

/// All configuration entries visible in one environment, keyed by config key.
pub type Snapshot = BTreeMap<String, ConfigRecord>;

/// Classification of a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Only present in the source environment.
    New,
    /// Present on both sides with a different value or type.
    Modified,
    /// Only present in the target environment.
    Deleted,
    /// Present on both sides with the same value and type.
    Same,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::New => "NEW",
            ChangeType::Modified => "MODIFIED",
            ChangeType::Deleted => "DELETED",
            ChangeType::Same => "SAME",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(ChangeType::New),
            "MODIFIED" => Ok(ChangeType::Modified),
            "DELETED" => Ok(ChangeType::Deleted),
            "SAME" => Ok(ChangeType::Same),
            other => Err(ValidationError::invalid_format(
                "change_type",
                format!("unknown change type '{other}'"),
            )),
        }
    }
}

/// A single write against the target environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyChange {
    Upsert {
        key: String,
        value: String,
        config_type: String,
    },
    Delete {
        key: String,
    },
}

impl KeyChange {
    pub fn key(&self) -> &str {
        match self {
            KeyChange::Upsert { key, .. } | KeyChange::Delete { key } => key,
        }
    }

    fn upsert(key: &str, record: &ConfigRecord) -> Self {
        KeyChange::Upsert {
            key: key.to_string(),
            value: record.value.clone(),
            config_type: record.config_type.clone(),
        }
    }
}

/// Classified difference of one key between source and target.
///
/// The change type is derived from the records passed to
/// [`ConfigDiff::from_records`] and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDiff {
    config_key: String,
    source: Option<ConfigRecord>,
    target: Option<ConfigRecord>,
    change_type: ChangeType,
}

impl ConfigDiff {
    /// Classify `key` from the records present on each side.
    ///
    /// Returns `None` when the key is absent on both sides. A `SAME` diff carries
    /// the source record on both sides.
    pub fn from_records(
        key: impl Into<String>,
        source: Option<ConfigRecord>,
        target: Option<ConfigRecord>,
    ) -> Option<Self> {
        let (source, target, change_type) = match (source, target) {
            (Some(source), None) => (Some(source), None, ChangeType::New),
            (None, Some(target)) => (None, Some(target), ChangeType::Deleted),
            (Some(source), Some(target)) if source.same_content(&target) => {
                (Some(source.clone()), Some(source), ChangeType::Same)
            }
            (Some(source), Some(target)) => (Some(source), Some(target), ChangeType::Modified),
            (None, None) => return None,
        };

        Some(Self {
            config_key: key.into(),
            source,
            target,
            change_type,
        })
    }

    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    pub fn source(&self) -> Option<&ConfigRecord> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&ConfigRecord> {
        self.target.as_ref()
    }

    pub fn source_value(&self) -> Option<&str> {
        self.source.as_ref().map(|r| r.value.as_str())
    }

    pub fn target_value(&self) -> Option<&str> {
        self.target.as_ref().map(|r| r.value.as_str())
    }

    pub fn source_type(&self) -> Option<&str> {
        self.source.as_ref().map(|r| r.config_type.as_str())
    }

    pub fn target_type(&self) -> Option<&str> {
        self.target.as_ref().map(|r| r.config_type.as_str())
    }

    /// Source version, `0` when the key is absent from the source.
    pub fn source_version(&self) -> u32 {
        self.source.as_ref().map_or(0, |r| r.version)
    }

    /// Target version, `0` when the key is absent from the target.
    pub fn target_version(&self) -> u32 {
        self.target.as_ref().map_or(0, |r| r.version)
    }

    /// Write that promotes this key to the target, `None` for `SAME`.
    pub fn forward_change(&self) -> Option<KeyChange> {
        match (self.change_type, &self.source) {
            (ChangeType::New | ChangeType::Modified, Some(source)) => {
                Some(KeyChange::upsert(&self.config_key, source))
            }
            (ChangeType::Deleted, _) => Some(KeyChange::Delete {
                key: self.config_key.clone(),
            }),
            _ => None,
        }
    }

    /// Write that restores the target to its pre-promotion state, `None` for
    /// `SAME`.
    pub fn reverse_change(&self) -> Option<KeyChange> {
        match (self.change_type, &self.target) {
            (ChangeType::New, _) => Some(KeyChange::Delete {
                key: self.config_key.clone(),
            }),
            (ChangeType::Modified | ChangeType::Deleted, Some(target)) => {
                Some(KeyChange::upsert(&self.config_key, target))
            }
            _ => None,
        }
    }
}

/// Compute the key-ordered diff between `source` and `target`.
///
/// When `key_filter` is given only keys inside it are considered; filter keys
/// missing on both sides produce no diff.
pub fn compute_diffs(
    source: &Snapshot,
    target: &Snapshot,
    key_filter: Option<&BTreeSet<String>>,
) -> Vec<ConfigDiff> {
    let keys: BTreeSet<&String> = source
        .keys()
        .chain(target.keys())
        .filter(|key| key_filter.map_or(true, |filter| filter.contains(*key)))
        .collect();

    keys.into_iter()
        .filter_map(|key| {
            ConfigDiff::from_records(key.clone(), source.get(key).cloned(), target.get(key).cloned())
        })
        .collect()
}

/// Counts of diffs per change type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total: usize,
    pub new_configs: usize,
    pub modified: usize,
    pub deleted: usize,
    pub same: usize,
}

impl DiffSummary {
    pub fn from_diffs(diffs: &[ConfigDiff]) -> Self {
        diffs.iter().fold(Self::default(), |mut summary, diff| {
            summary.total += 1;
            match diff.change_type() {
                ChangeType::New => summary.new_configs += 1,
                ChangeType::Modified => summary.modified += 1,
                ChangeType::Deleted => summary.deleted += 1,
                ChangeType::Same => summary.same += 1,
            }
            summary
        })
    }

    /// Number of diffs that would write to the target.
    pub fn changes(&self) -> usize {
        self.new_configs + self.modified + self.deleted
    }

    pub fn has_changes(&self) -> bool {
        self.changes() > 0
    }
}
