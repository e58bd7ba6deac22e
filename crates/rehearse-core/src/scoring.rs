//! Accuracy scoring: compares the expected line with what the recognizer heard.
//!
//! Everything here is pure and deterministic. Both sides are normalized
//! first (see [`normalize`]); the score is then computed under one of three
//! [`Fidelity`] levels and is always in `0..=100`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default fraction of a word's length tolerated as edit distance in
/// semantic matching.
pub const DEFAULT_SEMANTIC_TOLERANCE: f32 = 0.2;

/// Words this short (in chars) never count in semantic matching.
const MIN_SEMANTIC_WORD_CHARS: usize = 3;

/// Function words long enough to pass the length filter that are skipped in
/// semantic matching unless settings supply another list.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "and", "but", "for", "nor", "yet", "are", "was", "were", "has", "had", "its", "this",
    "that", "with", "from",
];

/// [`DEFAULT_STOP_WORDS`] as owned strings, for settings defaults.
pub fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(ToString::to_string).collect()
}

/// How strictly a spoken line must match the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    /// Normalized texts must be identical.
    Exact,
    /// Word-level overlap with fuzzy per-word matching.
    #[default]
    Semantic,
    /// Character-level similarity of the whole line.
    Loose,
}

impl fmt::Display for Fidelity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Semantic => "semantic",
            Self::Loose => "loose",
        })
    }
}

impl FromStr for Fidelity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "semantic" => Ok(Self::Semantic),
            "loose" => Ok(Self::Loose),
            other => Err(format!(
                "unknown fidelity '{other}' (expected exact|semantic|loose)"
            )),
        }
    }
}

/// Scoring parameters taken from settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub fidelity: Fidelity,
    /// Fraction of word length allowed as edit distance (semantic only).
    pub semantic_tolerance: f32,
    /// Normalized words ignored on both sides (semantic only). Empty means
    /// every word of three or more letters counts.
    pub stop_words: Vec<String>,
    /// Minimum score for a line to count as completed.
    pub completion_threshold: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fidelity: Fidelity::Semantic,
            semantic_tolerance: DEFAULT_SEMANTIC_TOLERANCE,
            stop_words: default_stop_words(),
            completion_threshold: crate::settings::DEFAULT_COMPLETION_THRESHOLD,
        }
    }
}

impl ScoringConfig {
    pub const fn is_complete(&self, score: u8) -> bool {
        score >= self.completion_threshold
    }
}

/// Score `actual` against `expected` with default tolerances.
pub fn score(expected: &str, actual: &str, fidelity: Fidelity) -> u8 {
    score_with(
        expected,
        actual,
        &ScoringConfig {
            fidelity,
            ..ScoringConfig::default()
        },
    )
}

/// Score `actual` against `expected` under `config`.
pub fn score_with(expected: &str, actual: &str, config: &ScoringConfig) -> u8 {
    let expected = normalize(expected);
    let actual = normalize(actual);
    match config.fidelity {
        Fidelity::Exact => {
            if expected == actual {
                100
            } else {
                0
            }
        }
        Fidelity::Semantic => semantic_score(&expected, &actual, config),
        Fidelity::Loose => loose_score(&expected, &actual),
    }
}

/// Normalize text for comparison.
///
/// Lowercases, folds accented Latin letters to their base letter, unifies
/// quote/apostrophe variants, drops punctuation other than apostrophes and
/// collapses whitespace.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match c {
            '\u{2019}' | '\u{2018}' | '\u{02bc}' | '\u{0060}' | '\u{00b4}' | '\u{2032}' | '\'' => {
                out.push('\'');
            }
            // Combining marks left behind by lowercasing (e.g. dotted capital I).
            '\u{0300}'..='\u{036f}' => {}
            '-' | '\u{2010}'..='\u{2015}' | '/' | '_' => out.push(' '),
            c if c.is_whitespace() => out.push(' '),
            c if c.is_alphanumeric() => match fold_letter(c) {
                Some(folded) => out.push_str(folded),
                None => out.push(c),
            },
            _ => {}
        }
    }
    collapse_whitespace(&out)
}

/// Map locale letter variants onto base Latin letters.
fn fold_letter(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'ĥ' | 'ħ' => "h",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'ĵ' => "j",
        'ķ' => "k",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'ś' | 'ŝ' | 'ş' | 'š' | 'ș' => "s",
        'ţ' | 'ť' | 'ŧ' | 'ț' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'ŵ' => "w",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        _ => return None,
    };
    Some(folded)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Words that take part in semantic matching.
fn content_words<'a>(text: &'a str, stop_words: &[String]) -> Vec<&'a str> {
    text.split_whitespace()
        .filter(|w| w.chars().count() >= MIN_SEMANTIC_WORD_CHARS)
        .filter(|w| !stop_words.iter().any(|stop| stop == w))
        .collect()
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn semantic_score(expected: &str, actual: &str, config: &ScoringConfig) -> u8 {
    let expected_words = content_words(expected, &config.stop_words);
    let actual_words = content_words(actual, &config.stop_words);
    let tolerance = config.semantic_tolerance;

    if expected_words.is_empty() {
        return if actual_words.is_empty() { 100 } else { 0 };
    }

    let matches = expected_words
        .iter()
        .filter(|expected_word| {
            let len = expected_word.chars().count();
            let allowed = ((tolerance * len as f32).floor() as usize).max(1);
            actual_words.iter().any(|actual_word| {
                actual_word.contains(*expected_word)
                    || expected_word.contains(actual_word)
                    || edit_distance(expected_word, actual_word) <= allowed
            })
        })
        .count();

    percentage(matches as f64 / expected_words.len() as f64)
}

#[allow(clippy::cast_precision_loss)]
fn loose_score(expected: &str, actual: &str) -> u8 {
    let longest = expected.chars().count().max(actual.chars().count());
    if longest == 0 {
        return 100;
    }
    let distance = edit_distance(expected, actual);
    percentage(1.0 - distance as f64 / longest as f64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentage(ratio: f64) -> u8 {
    (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Levenshtein distance between two strings, counted in chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
