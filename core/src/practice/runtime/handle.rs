use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::practice::error::PracticeError;
use crate::practice::types::{Attempt, InboundEvent};

use super::state::{AbortReason, SessionSnapshot, SessionState};
use super::SessionInput;

/// Cloneable front for a running session task. The task is aborted once the
/// last clone is dropped or `cancel` is called.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Arc<str>,
    input_tx: mpsc::Sender<SessionInput>,
    snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    task: Arc<TaskGuard>,
}

struct TaskGuard {
    worker: JoinHandle<()>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

impl SessionHandle {
    pub(super) fn new(
        session_id: Arc<str>,
        input_tx: mpsc::Sender<SessionInput>,
        snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
        worker: JoinHandle<()>,
    ) -> Self {
        let snapshot_rx = snapshot_tx.subscribe();
        Self {
            session_id,
            input_tx,
            snapshot_tx,
            snapshot_rx,
            task: Arc::new(TaskGuard { worker }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn send(&self, event: InboundEvent) -> Result<(), PracticeError> {
        self.dispatch(SessionInput::from(event)).await
    }

    pub async fn playback_finished(&self) -> Result<(), PracticeError> {
        self.dispatch(SessionInput::PlaybackFinished).await
    }

    pub async fn submit_attempt(&self, transcript: impl Into<String>) -> Result<(), PracticeError> {
        self.dispatch(SessionInput::Attempt(Attempt::new(transcript)))
            .await
    }

    /// Explicit stop: the session moves to `Aborted` without further events.
    pub async fn stop(&self) -> Result<(), PracticeError> {
        self.dispatch(SessionInput::Stop(AbortReason::Stopped)).await
    }

    pub async fn disconnect(&self) -> Result<(), PracticeError> {
        self.dispatch(SessionInput::Stop(AbortReason::Disconnected))
            .await
    }

    /// Aborts the task immediately, dropping any pending wait or retry timer,
    /// and publishes an `Aborted` snapshot carrying `reason`.
    pub fn cancel(&self, reason: AbortReason) {
        debug!(
            target: "practice_session",
            session_id = %self.session_id,
            reason = reason.as_str(),
            "cancelling practice session task"
        );
        self.task.worker.abort();
        self.snapshot_tx.send_if_modified(|snapshot| {
            if snapshot.state.is_terminal() {
                return false;
            }
            snapshot.state = SessionState::Aborted;
            snapshot.abort_reason = Some(reason);
            snapshot.current_word = None;
            true
        });
    }

    pub fn is_finished(&self) -> bool {
        self.task.worker.is_finished()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Resolves with the final snapshot once the session reaches a terminal
    /// state, or with the last published one if the task went away first.
    pub async fn wait_terminal(&self) -> SessionSnapshot {
        let mut rx = self.snapshot_rx.clone();
        loop {
            if rx.borrow_and_update().state.is_terminal() {
                break;
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
        let snapshot = rx.borrow().clone();
        snapshot
    }

    pub(crate) async fn dispatch(&self, input: SessionInput) -> Result<(), PracticeError> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| PracticeError::SessionNotFound(self.session_id.to_string()))
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("finished", &self.is_finished())
            .finish()
    }
}
