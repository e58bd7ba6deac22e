//! Turn coordination for rehearse practice sessions.
//!
//! A session walks a [`Script`](rehearse_core::Script) line by line. Partner
//! lines are spoken through a [`SpeechOutput`](rehearse_core::SpeechOutput);
//! the user's own lines are heard through a
//! [`SpeechInput`](rehearse_core::SpeechInput), scored, and saved through a
//! [`ProgressStore`](rehearse_core::ProgressStore).
//!
//! ```ignore
//! let (session, mut events) = PracticeSession::spawn(config, output, input, store);
//! session.start()?;
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::Completed(snapshot) = event {
//!         println!("{} lines completed", snapshot.completed_lines.len());
//!         break;
//!     }
//! }
//! let snapshot = session.shutdown().await?;
//! ```

mod config;
mod coordinator;
mod event;
mod handle;
mod timer;

pub use config::SessionConfig;
pub use coordinator::PracticeSession;
pub use event::SessionEvent;
pub use handle::{SessionError, SessionHandle};
