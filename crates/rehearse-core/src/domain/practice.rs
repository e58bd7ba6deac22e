//! Practice session state.
//!
//! [`PracticeState`] is the single value the turn coordinator mutates. The
//! hosting UI only ever sees clones of it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::progress::ProgressSnapshot;
use super::script::Script;

/// How the session moves on once a turn resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PracticeMode {
    /// Advance automatically after each turn.
    #[default]
    Auto,
    /// Halt after each turn until the user asks for the next line.
    Manual,
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        })
    }
}

impl FromStr for PracticeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown practice mode '{other}' (expected auto|manual)")),
        }
    }
}

/// Coordinator state machine label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing in flight; waiting for start or a manual action.
    #[default]
    Idle,
    /// Listening for the user's line.
    AwaitingUserSpeech,
    /// Speaking another character's line.
    PlayingPartnerLine,
    /// Displaying the score for the line just attempted.
    ShowingResult,
    /// Paused by the user; index and scores retained.
    Paused,
    /// Walked past the last line.
    Complete,
}

/// The full observable state of a practice session.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeState {
    pub phase: Phase,
    pub current_line_index: usize,
    pub mode: PracticeMode,
    pub playing: bool,
    pub waiting_for_user: bool,
    /// Seconds left before an unanswered user line is scored as failed.
    pub countdown: u32,
    pub showing_result: bool,
    pub result_accuracy: Option<u8>,
    pub completed_lines: BTreeSet<usize>,
    pub accuracy_scores: BTreeMap<usize, u8>,
}

impl PracticeState {
    pub const fn new(start_index: usize, mode: PracticeMode) -> Self {
        Self {
            phase: Phase::Idle,
            current_line_index: start_index,
            mode,
            playing: false,
            waiting_for_user: false,
            countdown: 0,
            showing_result: false,
            result_accuracy: None,
            completed_lines: BTreeSet::new(),
            accuracy_scores: BTreeMap::new(),
        }
    }

    /// Carry completed lines and scores over from a saved snapshot.
    ///
    /// Entries pointing past the end of the script are dropped, and a line
    /// stays completed only if its saved score meets `threshold`.
    pub fn restore(&mut self, snapshot: &ProgressSnapshot, line_count: usize, threshold: u8) {
        self.accuracy_scores = snapshot
            .accuracy_scores
            .iter()
            .filter(|(i, _)| **i < line_count)
            .map(|(i, s)| (*i, (*s).min(100)))
            .collect();
        self.completed_lines = snapshot
            .completed_lines
            .iter()
            .copied()
            .filter(|i| self.accuracy_scores.get(i).is_some_and(|s| *s >= threshold))
            .collect();
    }

    /// Record the score for `index`.
    ///
    /// An existing score is kept (only a retry clears it). The line is marked
    /// complete when the stored score meets `threshold`. Returns the score
    /// that is stored after the call.
    pub fn record_score(&mut self, index: usize, score: u8, threshold: u8) -> u8 {
        let stored = *self.accuracy_scores.entry(index).or_insert(score.min(100));
        if stored >= threshold {
            self.completed_lines.insert(index);
        }
        stored
    }

    /// Forget the score and completion mark for `index`.
    pub fn clear_line(&mut self, index: usize) {
        self.accuracy_scores.remove(&index);
        self.completed_lines.remove(&index);
    }

    /// Drop all per-turn flags (waiting, result, countdown).
    pub fn clear_turn(&mut self) {
        self.waiting_for_user = false;
        self.showing_result = false;
        self.result_accuracy = None;
        self.countdown = 0;
    }

    /// Build the persisted snapshot for `character` in `script`.
    pub fn snapshot(&self, script: &Script, character: &str) -> ProgressSnapshot {
        let last = self.current_line_index.min(script.len().saturating_sub(1));
        let (act, scene) = script
            .line(last)
            .map_or((0, 0), |l| (l.act_number, l.scene_number));
        ProgressSnapshot {
            script_id: script.id().to_string(),
            character: character.to_string(),
            last_act_number: act,
            last_scene_number: scene,
            last_line_index: last,
            completed_lines: self.completed_lines.iter().copied().collect(),
            accuracy_scores: self.accuracy_scores.clone(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_score_sticks_until_cleared() {
        let mut state = PracticeState::new(0, PracticeMode::Auto);
        assert_eq!(state.record_score(2, 40, 70), 40);
        assert_eq!(state.record_score(2, 100, 70), 40);
        assert!(!state.completed_lines.contains(&2));

        state.clear_line(2);
        assert_eq!(state.record_score(2, 100, 70), 100);
        assert!(state.completed_lines.contains(&2));
    }

    #[test]
    fn completion_requires_threshold() {
        let mut state = PracticeState::new(0, PracticeMode::Auto);
        state.record_score(1, 69, 70);
        state.record_score(3, 70, 70);
        assert_eq!(state.completed_lines.iter().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn restore_drops_out_of_range_and_unscored_lines() {
        let snapshot = ProgressSnapshot {
            script_id: "s".into(),
            character: "c".into(),
            last_act_number: 1,
            last_scene_number: 1,
            last_line_index: 1,
            completed_lines: vec![1, 7, 9],
            accuracy_scores: BTreeMap::from([(1, 90), (9, 100)]),
            updated_at: Utc::now(),
        };
        let mut state = PracticeState::new(0, PracticeMode::Manual);
        state.restore(&snapshot, 5, 70);
        assert_eq!(state.accuracy_scores, BTreeMap::from([(1, 90)]));
        assert_eq!(state.completed_lines, BTreeSet::from([1]));
    }

    #[test]
    fn restore_uncompletes_lines_below_threshold() {
        let snapshot = ProgressSnapshot {
            script_id: "s".into(),
            character: "c".into(),
            last_act_number: 1,
            last_scene_number: 1,
            last_line_index: 3,
            completed_lines: vec![1, 3],
            accuracy_scores: BTreeMap::from([(1, 40), (3, 85)]),
            updated_at: Utc::now(),
        };
        let mut state = PracticeState::new(0, PracticeMode::Auto);
        state.restore(&snapshot, 5, 70);

        // The low score itself is kept; only the completion goes.
        assert_eq!(state.accuracy_scores, BTreeMap::from([(1, 40), (3, 85)]));
        assert_eq!(state.completed_lines, BTreeSet::from([3]));
        for index in &state.completed_lines {
            assert!(state.accuracy_scores[index] >= 70);
        }
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("AUTO".parse::<PracticeMode>().unwrap(), PracticeMode::Auto);
        assert_eq!(" manual".parse::<PracticeMode>().unwrap(), PracticeMode::Manual);
        assert!("fast".parse::<PracticeMode>().is_err());
    }
}
