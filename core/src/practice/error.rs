use thiserror::Error;

use super::runtime::SessionState;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PracticeError {
    #[error("song `{0}` not found")]
    SongNotFound(String),
    #[error("song `{0}` has no words to practice")]
    EmptySong(String),
    #[error("session `{0}` not found")]
    SessionNotFound(String),
    #[error("word position {position} is outside of a {len} word song")]
    OutOfRange { position: usize, len: usize },
    #[error("{input} is not accepted while {state}")]
    ProtocolViolation {
        state: SessionState,
        input: &'static str,
    },
    #[error("invalid practice configuration: {0}")]
    InvalidConfig(String),
}

impl PracticeError {
    /// Stable code surfaced to clients instead of the internal message.
    pub fn code(&self) -> &'static str {
        match self {
            PracticeError::SongNotFound(_) => "SONG_NOT_FOUND",
            PracticeError::EmptySong(_) => "EMPTY_SONG",
            PracticeError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            PracticeError::OutOfRange { .. } => "OUT_OF_RANGE",
            PracticeError::ProtocolViolation { .. } => "PROTOCOL_VIOLATION",
            PracticeError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            PracticeError::SessionNotFound("s".into()).code(),
            "SESSION_NOT_FOUND"
        );
        assert_eq!(PracticeError::EmptySong("x".into()).code(), "EMPTY_SONG");
        assert_eq!(
            PracticeError::OutOfRange {
                position: 2,
                len: 2
            }
            .code(),
            "OUT_OF_RANGE"
        );
    }

    #[test]
    fn protocol_violation_mentions_state() {
        let err = PracticeError::ProtocolViolation {
            state: SessionState::PlayingAudio,
            input: "attempt",
        };
        assert_eq!(err.to_string(), "attempt is not accepted while playing_audio");
    }
}
