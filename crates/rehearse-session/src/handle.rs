//! Handle used by the hosting UI to drive a running session.

use rehearse_core::{PracticeMode, PracticeState, ProgressSnapshot};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::event::Command;

/// Errors returned by [`SessionHandle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The coordinator task is gone.
    #[error("Practice session has ended")]
    Closed,
}

/// Drives a session spawned with [`PracticeSession::spawn`](crate::PracticeSession::spawn).
///
/// Actions are queued and applied in order by the coordinator task; they
/// return as soon as the action is queued. Dropping the handle shuts the
/// session down.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PracticeState>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub(crate) const fn new(
        commands: mpsc::UnboundedSender<Command>,
        state: watch::Receiver<PracticeState>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            commands,
            state,
            task,
        }
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// Current state.
    pub fn state(&self) -> PracticeState {
        self.state.borrow().clone()
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PracticeState> {
        self.state.clone()
    }

    pub fn start(&self) -> Result<(), SessionError> {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), SessionError> {
        self.send(Command::Resume)
    }

    pub fn next(&self) -> Result<(), SessionError> {
        self.send(Command::Next)
    }

    pub fn previous(&self) -> Result<(), SessionError> {
        self.send(Command::Previous)
    }

    /// Move to `index`; ignored when outside the script.
    pub fn jump_to_line(&self, index: usize) -> Result<(), SessionError> {
        self.send(Command::JumpTo(index))
    }

    /// Forget the current line's score and attempt it again.
    pub fn retry_current_line(&self) -> Result<(), SessionError> {
        self.send(Command::Retry)
    }

    pub fn set_mode(&self, mode: PracticeMode) -> Result<(), SessionError> {
        self.send(Command::SetMode(mode))
    }

    /// Stop all I/O, save, and end the session.
    ///
    /// Returns the final snapshot. The session is not marked complete.
    pub async fn shutdown(self) -> Result<ProgressSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx))?;
        let snapshot = rx.await.map_err(|_| SessionError::Closed)?;
        if let Err(e) = self.task.await {
            tracing::debug!(error = %e, "Session task ended abnormally");
        }
        Ok(snapshot)
    }
}
