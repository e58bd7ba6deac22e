//! Persisted practice progress.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one saved progress record: a script and the character the
/// user rehearses in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgressKey {
    pub script_id: String,
    pub character: String,
}

impl ProgressKey {
    pub fn new(script_id: impl Into<String>, character: impl Into<String>) -> Self {
        Self {
            script_id: script_id.into(),
            character: character.into(),
        }
    }

    /// Flat key used by storage backends.
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.script_id, self.character)
    }
}

/// The persisted subset of a practice session.
///
/// Wire shape (camelCase JSON):
///
/// ```json
/// {
///   "scriptId": "Hamlet", "character": "HAMLET",
///   "lastActNumber": 1, "lastSceneNumber": 2, "lastLineIndex": 14,
///   "completedLines": [2, 4], "accuracyScores": { "2": 100, "4": 85 },
///   "updatedAt": "2026-10-19T12:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub script_id: String,
    pub character: String,
    pub last_act_number: u32,
    pub last_scene_number: u32,
    pub last_line_index: usize,
    pub completed_lines: Vec<usize>,
    pub accuracy_scores: BTreeMap<usize, u8>,
    /// When this snapshot was written; used to pick the freshest source.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn key(&self) -> ProgressKey {
        ProgressKey::new(self.script_id.clone(), self.character.clone())
    }

    /// Whether `self` was written after `other`.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.updated_at > other.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_joins_script_and_character() {
        assert_eq!(ProgressKey::new("Hamlet", "HAMLET").storage_key(), "Hamlet::HAMLET");
    }

    #[test]
    fn serializes_camel_case_with_string_score_keys() {
        let snapshot = ProgressSnapshot {
            script_id: "Hamlet".into(),
            character: "HAMLET".into(),
            last_act_number: 1,
            last_scene_number: 2,
            last_line_index: 4,
            completed_lines: vec![2],
            accuracy_scores: BTreeMap::from([(2, 100), (4, 0)]),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["lastLineIndex"], 4);
        assert_eq!(json["accuracyScores"]["2"], 100);
        assert_eq!(json["completedLines"][0], 2);

        let back: ProgressSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
