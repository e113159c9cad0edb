//! Process-wide map from session id to the live session task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info};

use crate::audio::AudioSource;

use super::config::PracticeConfig;
use super::error::PracticeError;
use super::runtime::{self, AbortReason, SessionHandle, SessionSnapshot};
use super::types::{InboundEvent, OutboundEvent, Song};

#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: PracticeConfig,
    audio: Arc<dyn AudioSource>,
    sessions: Mutex<HashMap<String, RegistryEntry>>,
    next_instance: AtomicU64,
}

struct RegistryEntry {
    instance: u64,
    handle: SessionHandle,
}

impl SessionRegistry {
    pub fn new(config: PracticeConfig, audio: Arc<dyn AudioSource>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                audio,
                sessions: Mutex::new(HashMap::new()),
                next_instance: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.inner.config
    }

    /// Starts a session for `song` under `session_id`, replacing and cancelling
    /// any session already registered under that id.
    pub async fn create(
        &self,
        session_id: &str,
        song: Arc<Song>,
    ) -> Result<(SessionHandle, mpsc::Receiver<OutboundEvent>), PracticeError> {
        let instance = self.inner.next_instance.fetch_add(1, Ordering::SeqCst);

        let (handle, events, previous) = {
            let mut sessions = self.inner.sessions.lock().await;
            let (handle, events) = runtime::spawn_session(
                session_id,
                song,
                &self.inner.config,
                Arc::clone(&self.inner.audio),
            )?;
            let previous = sessions.insert(
                session_id.to_string(),
                RegistryEntry {
                    instance,
                    handle: handle.clone(),
                },
            );
            if let Some(previous) = &previous {
                previous.handle.cancel(AbortReason::Replaced);
            }
            (handle, events, previous)
        };

        if let Some(previous) = previous {
            info!(
                target: "session_registry",
                session_id,
                replaced_instance = previous.instance,
                instance,
                "replaced existing practice session"
            );
        }

        self.evict_when_finished(session_id.to_string(), instance, handle.subscribe());
        Ok((handle, events))
    }

    pub async fn get(&self, session_id: &str) -> Result<SessionHandle, PracticeError> {
        let sessions = self.inner.sessions.lock().await;
        sessions
            .get(session_id)
            .map(|entry| entry.handle.clone())
            .filter(is_live)
            .ok_or_else(|| PracticeError::SessionNotFound(session_id.to_string()))
    }

    /// Drops the session from the registry and cancels its task. Returns the
    /// handle only when the session was still live, matching `get`.
    pub async fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        let entry = self.inner.sessions.lock().await.remove(session_id)?;
        let live = is_live(&entry.handle);
        entry.handle.cancel(AbortReason::Stopped);
        debug!(
            target: "session_registry",
            session_id,
            instance = entry.instance,
            live,
            "removed practice session"
        );
        live.then_some(entry.handle)
    }

    /// Forwards an inbound client event to the named session.
    pub async fn dispatch(&self, session_id: &str, event: InboundEvent) -> Result<(), PracticeError> {
        let handle = self.get(session_id).await?;
        handle.send(event).await
    }

    pub async fn stop(&self, session_id: &str) -> Result<(), PracticeError> {
        let handle = self.get(session_id).await?;
        handle.stop().await
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, PracticeError> {
        self.get(session_id).await.map(|handle| handle.snapshot())
    }

    pub async fn len(&self) -> usize {
        self.inner.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn evict_when_finished(
        &self,
        session_id: String,
        instance: u64,
        mut snapshots: watch::Receiver<SessionSnapshot>,
    ) {
        let registry: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                if snapshots.borrow_and_update().state.is_terminal() {
                    break;
                }
                if snapshots.changed().await.is_err() {
                    break;
                }
            }

            if let Some(inner) = registry.upgrade() {
                inner.evict(&session_id, instance).await;
            }
        });
    }
}

impl RegistryInner {
    async fn evict(&self, session_id: &str, instance: u64) {
        let mut sessions = self.sessions.lock().await;
        let matches = sessions
            .get(session_id)
            .map(|entry| entry.instance == instance)
            .unwrap_or(false);
        if matches {
            sessions.remove(session_id);
            debug!(
                target: "session_registry",
                session_id,
                instance,
                "evicted finished practice session"
            );
        }
    }
}

fn is_live(handle: &SessionHandle) -> bool {
    !handle.snapshot().state.is_terminal() && !handle.is_finished()
}
