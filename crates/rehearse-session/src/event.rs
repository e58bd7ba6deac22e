//! Messages into and out of the coordinator task.

use rehearse_core::{PracticeMode, ProgressSnapshot};
use tokio::sync::oneshot;

/// Actions requested by the hosting UI.
#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Pause,
    Resume,
    Next,
    Previous,
    JumpTo(usize),
    Retry,
    SetMode(PracticeMode),
    Shutdown(oneshot::Sender<ProgressSnapshot>),
}

/// Notifications emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Progress was saved (after a score or a move to another line).
    ProgressUpdated(ProgressSnapshot),
    /// The session walked past the last line.
    Completed(ProgressSnapshot),
    /// Speech recognition is missing; user lines advance manually only.
    RecognitionUnavailable,
    /// Microphone access was refused; user lines score through the timeout.
    PermissionDenied,
    /// At least one local save failed during the session.
    PersistenceDegraded,
}
