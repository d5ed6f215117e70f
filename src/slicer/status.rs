//! Observable slice status
//!
//! Each slice request moves through `Idle -> Running -> Completed | Failed`.
//! Transitions are published through a watch channel per logical file so
//! polling UIs can observe progress, and every transition is stamped with
//! an attempt number. Attempt numbers are keyed by filename and increment
//! on every slicer invocation for that file; they are not reset across
//! retries within one call, nor across repeated calls.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::watch;

/// Lifecycle state of a slice request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceState {
    /// No slice has been attempted yet.
    #[default]
    Idle,
    /// A slicer process is running (or queued for a pool slot).
    Running,
    /// Metrics were produced, real or fallback.
    Completed,
    /// All attempts failed; fallback metrics were returned.
    Failed,
}

/// A status snapshot: state plus the attempt that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SliceStatus {
    /// Current lifecycle state.
    pub state: SliceState,
    /// Attempt number stamped on the transition; 0 before the first run.
    pub attempt: u32,
}

/// Receiver half for polling a file's slice status.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    receiver: watch::Receiver<SliceStatus>,
}

impl StatusHandle {
    /// The latest published status.
    pub fn current(&self) -> SliceStatus {
        *self.receiver.borrow()
    }

    /// Wait for the next status transition.
    pub async fn changed(&mut self) -> Option<SliceStatus> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow())
    }
}

/// Per-file status channels and attempt counters.
///
/// Held by the orchestrator; process-wide, not persisted. Counters restart
/// with the process, which is acceptable for polling UIs.
#[derive(Debug, Default)]
pub struct StatusBoard {
    channels: Mutex<HashMap<String, watch::Sender<SliceStatus>>>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl StatusBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next attempt number for a logical file, monotonically increasing.
    pub fn next_attempt(&self, filename: &str) -> u32 {
        let mut attempts = self.attempts.lock();
        let counter = attempts.entry(filename.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Publish a status transition for a file.
    pub fn publish(&self, filename: &str, state: SliceState, attempt: u32) {
        let mut channels = self.channels.lock();
        let sender = channels
            .entry(filename.to_string())
            .or_insert_with(|| watch::channel(SliceStatus::default()).0);
        sender.send_replace(SliceStatus { state, attempt });
    }

    /// Latest status for a file, if any slice has been requested.
    pub fn current(&self, filename: &str) -> Option<SliceStatus> {
        self.channels
            .lock()
            .get(filename)
            .map(|sender| *sender.borrow())
    }

    /// Subscribe to a file's status transitions.
    pub fn watch(&self, filename: &str) -> StatusHandle {
        let mut channels = self.channels.lock();
        let sender = channels
            .entry(filename.to_string())
            .or_insert_with(|| watch::channel(SliceStatus::default()).0);
        StatusHandle {
            receiver: sender.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_increment_per_file() {
        let board = StatusBoard::new();
        assert_eq!(board.next_attempt("a.stl"), 1);
        assert_eq!(board.next_attempt("a.stl"), 2);
        assert_eq!(board.next_attempt("b.stl"), 1);
        assert_eq!(board.next_attempt("a.stl"), 3);
    }

    #[test]
    fn test_publish_and_current() {
        let board = StatusBoard::new();
        assert_eq!(board.current("a.stl"), None);

        board.publish("a.stl", SliceState::Running, 1);
        let status = board.current("a.stl").unwrap();
        assert_eq!(status.state, SliceState::Running);
        assert_eq!(status.attempt, 1);
    }

    #[tokio::test]
    async fn test_watch_observes_transitions() {
        let board = StatusBoard::new();
        let mut handle = board.watch("a.stl");
        assert_eq!(handle.current().state, SliceState::Idle);

        board.publish("a.stl", SliceState::Running, 1);
        let status = handle.changed().await.unwrap();
        assert_eq!(status.state, SliceState::Running);

        board.publish("a.stl", SliceState::Completed, 1);
        let status = handle.changed().await.unwrap();
        assert_eq!(status.state, SliceState::Completed);
    }
}
