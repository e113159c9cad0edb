use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::practice::constants::{
    MESSAGE_ABANDON, MESSAGE_COMPLETED, MESSAGE_CORRECT, MESSAGE_RETRY,
};
use crate::practice::error::PracticeError;
use crate::practice::policy::RetryPolicy;
use crate::practice::scorer;
use crate::practice::sequencer::WordSequencer;
use crate::practice::types::{Attempt, Decision, OutboundEvent, Song, Verdict, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    AwaitingWordStart,
    PlayingAudio,
    AwaitingAttempt,
    Scoring,
    Retrying,
    Advancing,
    Completed,
    Aborted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::AwaitingWordStart => "awaiting_word_start",
            SessionState::PlayingAudio => "playing_audio",
            SessionState::AwaitingAttempt => "awaiting_attempt",
            SessionState::Scoring => "scoring",
            SessionState::Retrying => "retrying",
            SessionState::Advancing => "advancing",
            SessionState::Completed => "completed",
            SessionState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    Disconnected,
    IdleTimeout,
    Stopped,
    Replaced,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::Disconnected => "disconnected",
            AbortReason::IdleTimeout => "idle_timeout",
            AbortReason::Stopped => "stopped",
            AbortReason::Replaced => "replaced",
        }
    }
}

/// Read-only progress view published after every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub song_id: String,
    pub state: SessionState,
    pub position: usize,
    pub total_words: usize,
    pub attempts: u32,
    pub current_word: Option<String>,
    pub words_passed: usize,
    pub words_abandoned: usize,
    pub progress_percentage: f64,
    pub abort_reason: Option<AbortReason>,
    pub started_at_ms: u64,
}

/// Side effects requested by a transition, to be carried out in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Emit(OutboundEvent),
    Present {
        word: Word,
        position: usize,
        total: usize,
    },
    ScheduleRetry,
    Finished,
}

/// One practice run through one song. Pure state machine: timers, audio
/// lookup and event delivery belong to the worker that owns it.
#[derive(Debug)]
pub(crate) struct PracticeSession {
    id: String,
    song: Arc<Song>,
    sequencer: WordSequencer,
    policy: RetryPolicy,
    attempts: u32,
    state: SessionState,
    created_at: SystemTime,
    passed: usize,
    abandoned: usize,
    abort_reason: Option<AbortReason>,
}

impl PracticeSession {
    pub(crate) fn new(
        id: impl Into<String>,
        song: Arc<Song>,
        policy: RetryPolicy,
    ) -> Result<Self, PracticeError> {
        if song.is_empty() {
            return Err(PracticeError::EmptySong(song.id.clone()));
        }

        Ok(Self {
            id: id.into(),
            sequencer: WordSequencer::new(song.words()),
            song,
            policy,
            attempts: 0,
            state: SessionState::AwaitingWordStart,
            created_at: SystemTime::now(),
            passed: 0,
            abandoned: 0,
            abort_reason: None,
        })
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn song(&self) -> &Arc<Song> {
        &self.song
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn position(&self) -> usize {
        self.sequencer.position()
    }

    pub(crate) fn current_word(&self) -> Option<&Word> {
        if self.state.is_terminal() {
            return None;
        }
        self.sequencer.current().ok()
    }

    pub(crate) fn abort_reason(&self) -> Option<AbortReason> {
        self.abort_reason
    }

    pub(crate) fn words_passed(&self) -> usize {
        self.passed
    }

    pub(crate) fn words_abandoned(&self) -> usize {
        self.abandoned
    }

    pub(crate) fn start(&mut self) -> Result<Vec<Step>, PracticeError> {
        self.expect_state(SessionState::AwaitingWordStart, "start")?;
        self.present()
    }

    pub(crate) fn playback_finished(&mut self) -> Result<Vec<Step>, PracticeError> {
        self.expect_state(SessionState::PlayingAudio, "playback_finished")?;
        self.state = SessionState::AwaitingAttempt;
        Ok(Vec::new())
    }

    pub(crate) fn retry_elapsed(&mut self) -> Result<Vec<Step>, PracticeError> {
        self.expect_state(SessionState::Retrying, "retry_elapsed")?;
        self.state = SessionState::AwaitingAttempt;
        Ok(Vec::new())
    }

    /// Scores an attempt against the current word and applies the retry policy.
    pub(crate) fn attempt(
        &mut self,
        attempt: &Attempt,
    ) -> Result<(Verdict, Vec<Step>), PracticeError> {
        self.expect_state(SessionState::AwaitingAttempt, "attempt")?;
        self.state = SessionState::Scoring;
        self.attempts = self.attempts.saturating_add(1);

        let target = self.sequencer.current()?.text().to_string();
        let score = scorer::score(&target, &attempt.transcript);
        let verdict = self.policy.verdict(score, self.attempts);

        let mut steps = Vec::new();
        match verdict.decision {
            Decision::Correct => {
                self.passed += 1;
                steps.push(result_step(true, MESSAGE_CORRECT, score));
                steps.extend(self.advance()?);
            }
            Decision::Retry => {
                steps.push(result_step(false, MESSAGE_RETRY, score));
                self.state = SessionState::Retrying;
                steps.push(Step::ScheduleRetry);
            }
            Decision::Abandon => {
                self.abandoned += 1;
                steps.push(result_step(false, MESSAGE_ABANDON, score));
                steps.extend(self.advance()?);
            }
        }

        Ok((verdict, steps))
    }

    /// Moves to `Aborted`. Returns false when the session already terminated.
    pub(crate) fn abort(&mut self, reason: AbortReason) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = SessionState::Aborted;
        self.abort_reason = Some(reason);
        true
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        let total = self.sequencer.len();
        let position = self.sequencer.position().min(total);
        let progress_percentage = if total == 0 {
            0.0
        } else {
            ((position as f64 / total as f64) * 10_000.0).round() / 100.0
        };

        SessionSnapshot {
            session_id: self.id.clone(),
            song_id: self.song.id.clone(),
            state: self.state,
            position,
            total_words: total,
            attempts: self.attempts,
            current_word: self.current_word().map(|word| word.text().to_string()),
            words_passed: self.passed,
            words_abandoned: self.abandoned,
            progress_percentage,
            abort_reason: self.abort_reason,
            started_at_ms: self
                .created_at
                .duration_since(UNIX_EPOCH)
                .map(|duration| duration.as_millis() as u64)
                .unwrap_or(0),
        }
    }

    fn advance(&mut self) -> Result<Vec<Step>, PracticeError> {
        self.state = SessionState::Advancing;
        self.attempts = 0;

        if self.sequencer.advance() {
            self.state = SessionState::AwaitingWordStart;
            return self.present();
        }

        self.state = SessionState::Completed;
        let message = format!(
            "{MESSAGE_COMPLETED} {} of {} words pronounced correctly.",
            self.passed,
            self.sequencer.len()
        );
        Ok(vec![
            Step::Emit(OutboundEvent::Completed { message }),
            Step::Finished,
        ])
    }

    fn present(&mut self) -> Result<Vec<Step>, PracticeError> {
        let word = self.sequencer.current()?.clone();
        self.state = SessionState::PlayingAudio;
        Ok(vec![Step::Present {
            word,
            position: self.sequencer.position(),
            total: self.sequencer.len(),
        }])
    }

    fn expect_state(
        &self,
        expected: SessionState,
        input: &'static str,
    ) -> Result<(), PracticeError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PracticeError::ProtocolViolation {
                state: self.state,
                input,
            })
        }
    }
}

fn result_step(success: bool, message: &str, score: f32) -> Step {
    Step::Emit(OutboundEvent::Result {
        success,
        message: message.to_string(),
        score,
    })
}
