//! Script timeline types.
//!
//! A [`Script`] is the immutable, ordered list of lines a session walks
//! through. Classification of raw text into lines happens upstream; this
//! module only validates and queries the structured result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who delivers a line.
///
/// Most lines belong to one character; chorus or unison lines are shared
/// between several. On the wire a single name is a plain string and a
/// shared line is an array of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Speaker {
    One(String),
    Shared(Vec<String>),
}

impl Speaker {
    /// Whether `character` delivers (or co-delivers) this line.
    ///
    /// Names are compared case-insensitively after trimming.
    pub fn includes(&self, character: &str) -> bool {
        let wanted = character.trim();
        match self {
            Self::One(name) => name.trim().eq_ignore_ascii_case(wanted),
            Self::Shared(names) => names.iter().any(|n| n.trim().eq_ignore_ascii_case(wanted)),
        }
    }

    /// The first named speaker, used to pick a voice profile.
    pub fn primary(&self) -> &str {
        match self {
            Self::One(name) => name,
            Self::Shared(names) => names.first().map_or("", String::as_str),
        }
    }

    /// Human-readable label ("HAMLET" or "HORATIO & MARCELLUS").
    pub fn label(&self) -> String {
        match self {
            Self::One(name) => name.clone(),
            Self::Shared(names) => names.join(" & "),
        }
    }
}

/// A single line of the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLine {
    pub id: String,
    pub character: Speaker,
    pub text: String,
    /// Ordinal position in the script (0-based).
    pub index: usize,
    #[serde(alias = "act")]
    pub act_number: u32,
    #[serde(alias = "scene")]
    pub scene_number: u32,
}

/// Errors raised while assembling a script timeline.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script '{0}' has no lines")]
    Empty(String),

    #[error("Line at position {position} carries ordinal {index}")]
    OrdinalMismatch { position: usize, index: usize },

    #[error("Character '{0}' has no lines in this script")]
    UnknownCharacter(String),

    #[error("Invalid script file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Wire shape of a script file handed over by the script provider.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptFile {
    title: String,
    #[serde(default = "default_persistable")]
    persistable: bool,
    lines: Vec<ScriptLine>,
}

const fn default_persistable() -> bool {
    true
}

/// An immutable, validated script timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    id: String,
    lines: Vec<ScriptLine>,
    persistable: bool,
}

impl Script {
    /// Build a script, checking that it is non-empty and that every line's
    /// ordinal equals its position.
    pub fn new(id: impl Into<String>, lines: Vec<ScriptLine>) -> Result<Self, ScriptError> {
        let id = id.into();
        if lines.is_empty() {
            return Err(ScriptError::Empty(id));
        }
        if let Some((position, line)) = lines.iter().enumerate().find(|(i, l)| *i != l.index) {
            return Err(ScriptError::OrdinalMismatch {
                position,
                index: line.index,
            });
        }
        Ok(Self {
            id,
            lines,
            persistable: true,
        })
    }

    /// Parse a script file (`{ "title", "persistable"?, "lines": [...] }`).
    pub fn from_json_str(json: &str) -> Result<Self, ScriptError> {
        let file: ScriptFile = serde_json::from_str(json)?;
        Ok(Self::new(file.title, file.lines)?.with_persistable(file.persistable))
    }

    /// Mark the script as demo content whose progress is never synced remotely.
    #[must_use]
    pub const fn with_persistable(mut self, persistable: bool) -> Self {
        self.persistable = persistable;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn persistable(&self) -> bool {
        self.persistable
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&ScriptLine> {
        self.lines.get(index)
    }

    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the line at `index` belongs to `character`.
    pub fn is_line_for(&self, index: usize, character: &str) -> bool {
        self.line(index).is_some_and(|l| l.character.includes(character))
    }

    /// Indices of every line `character` delivers.
    pub fn indices_for(&self, character: &str) -> Vec<usize> {
        self.lines
            .iter()
            .filter(|l| l.character.includes(character))
            .map(|l| l.index)
            .collect()
    }

    /// Fail unless `character` has at least one line.
    pub fn ensure_character(&self, character: &str) -> Result<(), ScriptError> {
        if self.lines.iter().any(|l| l.character.includes(character)) {
            Ok(())
        } else {
            Err(ScriptError::UnknownCharacter(character.to_string()))
        }
    }
}
