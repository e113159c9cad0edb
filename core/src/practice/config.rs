use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::{
    DEFAULT_EVENT_BUFFER, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_ATTEMPTS_PER_WORD,
    DEFAULT_RETRY_DELAY, DEFAULT_SIMILARITY_THRESHOLD,
};
use super::error::PracticeError;

/// Tunables shared by every practice session spawned by a registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PracticeConfig {
    pub similarity_threshold: f32,
    pub max_attempts_per_word: u32,
    pub retry_delay_ms: u64,
    pub session_idle_timeout_ms: u64,
    /// When false the session listens for an attempt right after a word is presented.
    pub require_playback_ack: bool,
    pub event_buffer: usize,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_attempts_per_word: DEFAULT_MAX_ATTEMPTS_PER_WORD,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            session_idle_timeout_ms: DEFAULT_IDLE_TIMEOUT.as_millis() as u64,
            require_playback_ack: true,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl PracticeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.session_idle_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), PracticeError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(PracticeError::InvalidConfig(format!(
                "similarityThreshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.max_attempts_per_word == 0 {
            return Err(PracticeError::InvalidConfig(
                "maxAttemptsPerWord must be at least 1".into(),
            ));
        }
        if self.session_idle_timeout_ms == 0 {
            return Err(PracticeError::InvalidConfig(
                "sessionIdleTimeoutMs must be positive".into(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(PracticeError::InvalidConfig(
                "eventBuffer must be positive".into(),
            ));
        }
        Ok(())
    }
}
