//! Timer tasks feeding the coordinator.
//!
//! Every timer is a spawned task that sleeps and then sends a [`TimerFired`]
//! stamped with the turn it was armed for. Cancelling aborts the task; a
//! firing that slips through is discarded by its tag.

use std::time::Duration;

use rehearse_core::TurnTag;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Pause before handing a partner line to the synthesizer.
    LeadIn,
    /// One second of the grace countdown elapsed; `remaining` seconds left.
    GraceTick { remaining: u32 },
    /// The result display ended.
    ResultShown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerFired {
    pub tag: TurnTag,
    pub kind: TimerKind,
}

/// Fire `kind` once after `after`.
pub(crate) fn once(
    tx: &mpsc::UnboundedSender<TimerFired>,
    tag: TurnTag,
    after: Duration,
    kind: TimerKind,
) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = tx.send(TimerFired { tag, kind });
    })
}

/// Tick once per second from `secs - 1` down to zero.
pub(crate) fn grace_countdown(
    tx: &mpsc::UnboundedSender<TimerFired>,
    tag: TurnTag,
    secs: u32,
) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // First tick completes immediately.
        interval.tick().await;
        for remaining in (0..secs).rev() {
            interval.tick().await;
            if tx
                .send(TimerFired {
                    tag,
                    kind: TimerKind::GraceTick { remaining },
                })
                .is_err()
            {
                return;
            }
        }
    })
}
