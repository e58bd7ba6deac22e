//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (audio engines, database, network).
//!
//! # Structure
//!
//! - `script` - Script timeline (`Script`, `ScriptLine`, `Speaker`)
//! - `practice` - Session state (`PracticeState`, `Phase`, `PracticeMode`)
//! - `progress` - Persisted progress (`ProgressSnapshot`, `ProgressKey`)
//! - `voice` - Per-character synthesis settings (`VoiceProfile`)

mod practice;
mod progress;
mod script;
mod voice;

pub use practice::{Phase, PracticeMode, PracticeState};
pub use progress::{ProgressKey, ProgressSnapshot};
pub use script::{Script, ScriptError, ScriptLine, Speaker};
pub use voice::VoiceProfile;
