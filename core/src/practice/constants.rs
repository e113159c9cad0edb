use std::time::Duration;

pub(crate) const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;
pub(crate) const DEFAULT_MAX_ATTEMPTS_PER_WORD: u32 = 3;
pub(crate) const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_500);
pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(60_000);
pub(crate) const DEFAULT_EVENT_BUFFER: usize = 32;
pub(crate) const AUDIO_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const MESSAGE_CORRECT: &str = "Correct! Well done.";
pub(crate) const MESSAGE_RETRY: &str = "Pronunciation incorrect, try again.";
pub(crate) const MESSAGE_ABANDON: &str = "moving on";
pub(crate) const MESSAGE_COMPLETED: &str = "Song completed!";
