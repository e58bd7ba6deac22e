//! Inputs fixed for the lifetime of one session.

use std::sync::Arc;

use rehearse_core::{PracticeSettings, ProgressSnapshot, Script, ScriptError};

/// Everything a session needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub script: Arc<Script>,
    /// The character the user rehearses.
    pub character: String,
    /// Line to begin at; clamped into the script.
    pub start_index: usize,
    pub settings: PracticeSettings,
    /// Saved progress whose scores and completed lines carry over.
    pub restore: Option<ProgressSnapshot>,
}

impl SessionConfig {
    /// Configuration starting at line 0 with default settings.
    pub fn new(script: Arc<Script>, character: impl Into<String>) -> Self {
        Self {
            script,
            character: character.into(),
            start_index: 0,
            settings: PracticeSettings::default(),
            restore: None,
        }
    }

    #[must_use]
    pub const fn starting_at(mut self, index: usize) -> Self {
        self.start_index = index;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PracticeSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn restoring(mut self, snapshot: Option<ProgressSnapshot>) -> Self {
        self.restore = snapshot;
        self
    }

    /// Fail unless the character has at least one line.
    pub fn validate(&self) -> Result<(), ScriptError> {
        self.script.ensure_character(&self.character)
    }
}
