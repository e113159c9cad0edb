use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crate::practice::types::{Attempt, Verdict};

pub(crate) const TARGET: &str = "telemetry::practice";
pub(crate) const EVENT_ATTEMPT: &str = "attempt_scored";
pub(crate) const EVENT_VIOLATION: &str = "protocol_violation";
pub(crate) const EVENT_FINISHED: &str = "session_finished";

#[derive(Debug, Serialize)]
pub struct AttemptScoredEvent<'a> {
    pub session_id: &'a str,
    pub target: &'a str,
    pub transcript: &'a str,
    pub score: f32,
    pub decision: &'static str,
    pub attempt: u32,
    /// Target or transcript normalized to nothing.
    pub degenerate: bool,
    pub received_at_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ProtocolViolationEvent<'a> {
    pub session_id: &'a str,
    pub state: &'static str,
    pub input: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SessionFinishedEvent<'a> {
    pub session_id: &'a str,
    pub song_id: &'a str,
    pub state: &'static str,
    pub abort_reason: Option<&'static str>,
    pub words_passed: usize,
    pub words_abandoned: usize,
    pub duration_ms: u64,
}

pub fn record_attempt_scored(
    session_id: &str,
    target: &str,
    attempt: &Attempt,
    verdict: &Verdict,
    attempt_number: u32,
    degenerate: bool,
) {
    let event = AttemptScoredEvent {
        session_id,
        target,
        transcript: &attempt.transcript,
        score: verdict.score,
        decision: verdict.decision.as_str(),
        attempt: attempt_number,
        degenerate,
        received_at_ms: epoch_ms(attempt.received_at),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_ATTEMPT,
            session_id = event.session_id,
            score = event.score,
            decision = event.decision,
            attempt = event.attempt,
            degenerate = event.degenerate,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_ATTEMPT,
            %err,
            "failed to encode attempt event"
        ),
    }
}

pub fn record_protocol_violation(session_id: &str, state: &'static str, input: &'static str) {
    let event = ProtocolViolationEvent {
        session_id,
        state,
        input,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => warn!(
            target: TARGET,
            event = EVENT_VIOLATION,
            session_id = event.session_id,
            state = event.state,
            input = event.input,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_VIOLATION,
            %err,
            "failed to encode protocol violation event"
        ),
    }
}

pub fn record_session_finished(
    session_id: &str,
    song_id: &str,
    state: &'static str,
    abort_reason: Option<&'static str>,
    words_passed: usize,
    words_abandoned: usize,
    duration: Duration,
) {
    let event = SessionFinishedEvent {
        session_id,
        song_id,
        state,
        abort_reason,
        words_passed,
        words_abandoned,
        duration_ms: duration_to_ms(duration),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_FINISHED,
            session_id = event.session_id,
            song_id = event.song_id,
            state = event.state,
            words_passed = event.words_passed,
            words_abandoned = event.words_abandoned,
            duration_ms = event.duration_ms,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_FINISHED,
            %err,
            "failed to encode session finished event"
        ),
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

fn epoch_ms(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(duration_to_ms)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_clamps_to_u64() {
        let duration = Duration::new(u64::MAX, 0);
        assert_eq!(duration_to_ms(duration), u64::MAX);
    }

    #[test]
    fn finished_event_serializes_abort_reason() {
        let event = SessionFinishedEvent {
            session_id: "s-1",
            song_id: "twinkle",
            state: "aborted",
            abort_reason: Some("idle_timeout"),
            words_passed: 2,
            words_abandoned: 0,
            duration_ms: 60_000,
        };
        let payload = serde_json::to_value(&event).expect("serializes");
        assert_eq!(payload["abort_reason"], "idle_timeout");
        assert_eq!(payload["duration_ms"], 60_000);
    }

    #[test]
    fn attempt_event_carries_receipt_time() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let event = AttemptScoredEvent {
            session_id: "s-1",
            target: "star",
            transcript: "",
            score: 0.0,
            decision: "RETRY",
            attempt: 1,
            degenerate: true,
            received_at_ms: epoch_ms(at),
        };
        let payload = serde_json::to_value(&event).expect("serializes");
        assert_eq!(payload["received_at_ms"], 1_700_000_000_123u64);
        assert_eq!(payload["degenerate"], true);
    }

    #[test]
    fn times_before_the_epoch_clamp_to_zero() {
        assert_eq!(epoch_ms(UNIX_EPOCH - Duration::from_secs(1)), 0);
    }
}
