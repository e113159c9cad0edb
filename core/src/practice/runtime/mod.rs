mod handle;
mod state;
mod worker;

pub use handle::SessionHandle;
pub use state::{AbortReason, SessionSnapshot, SessionState};

use state::PracticeSession;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::audio::AudioSource;
use crate::practice::config::PracticeConfig;
use crate::practice::error::PracticeError;
use crate::practice::policy::RetryPolicy;
use crate::practice::types::{Attempt, InboundEvent, OutboundEvent, Song};

use self::worker::SessionWorker;

/// Inputs accepted by a running session task.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionInput {
    PlaybackFinished,
    Attempt(Attempt),
    Stop(AbortReason),
}

impl SessionInput {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            SessionInput::PlaybackFinished => "playback_finished",
            SessionInput::Attempt(_) => "attempt",
            SessionInput::Stop(_) => "stop",
        }
    }
}

impl From<InboundEvent> for SessionInput {
    fn from(event: InboundEvent) -> Self {
        match event {
            InboundEvent::Attempt { transcript } => SessionInput::Attempt(Attempt::new(transcript)),
            InboundEvent::PlaybackFinished => SessionInput::PlaybackFinished,
            InboundEvent::Stop => SessionInput::Stop(AbortReason::Stopped),
        }
    }
}

/// Spawns the task driving one practice session and returns its handle plus
/// the ordered stream of outbound events. Fails with `EmptySong` before any
/// task is spawned.
pub(crate) fn spawn_session(
    session_id: impl Into<String>,
    song: Arc<Song>,
    config: &PracticeConfig,
    audio: Arc<dyn AudioSource>,
) -> Result<(SessionHandle, mpsc::Receiver<OutboundEvent>), PracticeError> {
    let session = PracticeSession::new(session_id, song, RetryPolicy::from(config))?;
    let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
    let (input_tx, input_rx) = mpsc::channel(config.event_buffer);
    let (snapshot_tx, _) = watch::channel(session.snapshot());
    let snapshot_tx = Arc::new(snapshot_tx);

    info!(
        target: "practice_session",
        session_id = session.id(),
        song_id = %session.song().id,
        words = session.song().len(),
        "spawning practice session"
    );

    let session_id: Arc<str> = Arc::from(session.id());
    let worker = SessionWorker::new(
        session,
        config.clone(),
        input_rx,
        events_tx,
        Arc::clone(&snapshot_tx),
        audio,
    );
    let task = worker.spawn();

    Ok((
        SessionHandle::new(session_id, input_tx, snapshot_tx, task),
        events_rx,
    ))
}
