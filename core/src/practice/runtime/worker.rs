use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant as TokioInstant};
use tracing::{debug, info, warn};

use crate::audio::AudioSource;
use crate::practice::config::PracticeConfig;
use crate::practice::constants::AUDIO_LOOKUP_TIMEOUT;
use crate::practice::error::PracticeError;
use crate::practice::scorer;
use crate::practice::types::{AudioClip, OutboundEvent, Word};
use crate::telemetry::events::{
    record_attempt_scored, record_protocol_violation, record_session_finished,
};

use super::state::{AbortReason, PracticeSession, SessionSnapshot, SessionState, Step};
use super::SessionInput;

pub(crate) struct SessionWorker {
    session: PracticeSession,
    config: PracticeConfig,
    input_rx: mpsc::Receiver<SessionInput>,
    events_tx: mpsc::Sender<OutboundEvent>,
    snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
    audio: Arc<dyn AudioSource>,
    retry_at: Option<TokioInstant>,
    idle_deadline: TokioInstant,
    started_at: Instant,
}

impl SessionWorker {
    pub(crate) fn new(
        session: PracticeSession,
        config: PracticeConfig,
        input_rx: mpsc::Receiver<SessionInput>,
        events_tx: mpsc::Sender<OutboundEvent>,
        snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
        audio: Arc<dyn AudioSource>,
    ) -> Self {
        let idle_deadline = TokioInstant::now() + config.idle_timeout();
        Self {
            session,
            config,
            input_rx,
            events_tx,
            snapshot_tx,
            audio,
            retry_at: None,
            idle_deadline,
            started_at: Instant::now(),
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(mut self) {
        match self.session.start() {
            Ok(steps) => self.apply(steps).await,
            Err(err) => self.reject("start", err),
        }

        while !self.session.state().is_terminal() {
            let retry_at = self.retry_at;
            let idle_deadline = self.idle_deadline;

            tokio::select! {
                biased;

                maybe_input = self.input_rx.recv() => {
                    match maybe_input {
                        Some(input) => self.handle_input(input).await,
                        None => self.abort(AbortReason::Disconnected),
                    }
                }

                _ = sleep_until(retry_at.unwrap_or(idle_deadline)), if retry_at.is_some() => {
                    self.retry_at = None;
                    match self.session.retry_elapsed() {
                        Ok(steps) => self.apply(steps).await,
                        Err(err) => self.reject("retry_elapsed", err),
                    }
                }

                _ = sleep_until(idle_deadline) => {
                    info!(
                        target: "practice_session",
                        session_id = self.session.id(),
                        state = %self.session.state(),
                        "practice session idle timeout"
                    );
                    self.abort(AbortReason::IdleTimeout);
                }
            }
        }

        self.finish();
    }

    async fn handle_input(&mut self, input: SessionInput) {
        let label = input.label();
        match input {
            SessionInput::PlaybackFinished => {
                self.touch();
                match self.session.playback_finished() {
                    Ok(steps) => self.apply(steps).await,
                    Err(err) => self.reject(label, err),
                }
            }
            SessionInput::Attempt(attempt) => {
                self.touch();
                let target = self
                    .session
                    .current_word()
                    .map(|word| word.text().to_string())
                    .unwrap_or_default();
                let attempt_number = self.session.attempts().saturating_add(1);

                let degenerate = scorer::is_degenerate(&target, &attempt.transcript);
                if degenerate {
                    debug!(
                        target: "practice_session",
                        session_id = self.session.id(),
                        "attempt has nothing to compare after normalization"
                    );
                }

                match self.session.attempt(&attempt) {
                    Ok((verdict, steps)) => {
                        record_attempt_scored(
                            self.session.id(),
                            &target,
                            &attempt,
                            &verdict,
                            attempt_number,
                            degenerate,
                        );
                        self.apply(steps).await;
                    }
                    Err(err) => self.reject(label, err),
                }
            }
            SessionInput::Stop(reason) => self.abort(reason),
        }
    }

    async fn apply(&mut self, steps: Vec<Step>) {
        for step in steps {
            if self.session.state() == SessionState::Aborted {
                break;
            }

            match step {
                Step::Emit(event) => self.emit(event).await,
                Step::Present {
                    word,
                    position,
                    total,
                } => {
                    let audio = self.lookup_audio(&word).await;
                    if self.session.state() == SessionState::Aborted {
                        break;
                    }
                    self.emit(OutboundEvent::Word {
                        word: word.text().to_string(),
                        audio,
                        position,
                        total,
                    })
                    .await;

                    if !self.config.require_playback_ack
                        && self.session.state() == SessionState::PlayingAudio
                    {
                        if let Err(err) = self.session.playback_finished() {
                            self.reject("auto_listen", err);
                        }
                    }
                }
                Step::ScheduleRetry => {
                    self.retry_at = Some(TokioInstant::now() + self.config.retry_delay());
                }
                Step::Finished => {
                    debug!(
                        target: "practice_session",
                        session_id = self.session.id(),
                        "practice session reached final word"
                    );
                }
            }
        }

        self.publish_snapshot();
    }

    async fn emit(&mut self, event: OutboundEvent) {
        let kind = event.kind();
        if self.events_tx.send(event).await.is_err() {
            warn!(
                target: "practice_session",
                session_id = self.session.id(),
                event = kind,
                "event receiver dropped, aborting session"
            );
            self.abort(AbortReason::Disconnected);
        }
    }

    /// Races the lookup against stop, disconnect and the idle deadline.
    /// Other input arriving before the word is out is rejected.
    async fn lookup_audio(&mut self, word: &Word) -> Option<AudioClip> {
        let audio = Arc::clone(&self.audio);
        let key = word.clone();
        let lookup = async move { timeout(AUDIO_LOOKUP_TIMEOUT, audio.clip(&key)).await };
        tokio::pin!(lookup);

        let outcome = loop {
            tokio::select! {
                biased;

                maybe_input = self.input_rx.recv() => match maybe_input {
                    Some(SessionInput::Stop(reason)) => {
                        self.abort(reason);
                        return None;
                    }
                    Some(input) => {
                        self.touch();
                        let err = PracticeError::ProtocolViolation {
                            state: self.session.state(),
                            input: input.label(),
                        };
                        self.reject(input.label(), err);
                    }
                    None => {
                        self.abort(AbortReason::Disconnected);
                        return None;
                    }
                },

                _ = sleep_until(self.idle_deadline) => {
                    info!(
                        target: "practice_session",
                        session_id = self.session.id(),
                        word = word.text(),
                        "practice session idle timeout during audio lookup"
                    );
                    self.abort(AbortReason::IdleTimeout);
                    return None;
                }

                outcome = &mut lookup => break outcome,
            }
        };

        match outcome {
            Ok(Ok(clip)) => Some(clip),
            Ok(Err(err)) => {
                warn!(
                    target: "practice_session",
                    session_id = self.session.id(),
                    word = word.text(),
                    %err,
                    "audio lookup failed, presenting word without audio"
                );
                None
            }
            Err(_) => {
                warn!(
                    target: "practice_session",
                    session_id = self.session.id(),
                    word = word.text(),
                    timeout = ?AUDIO_LOOKUP_TIMEOUT,
                    "audio lookup timed out, presenting word without audio"
                );
                None
            }
        }
    }

    fn abort(&mut self, reason: AbortReason) {
        if self.session.abort(reason) {
            self.retry_at = None;
            self.publish_snapshot();
        }
    }

    fn reject(&self, input: &'static str, err: PracticeError) {
        warn!(
            target: "practice_session",
            session_id = self.session.id(),
            input,
            state = %self.session.state(),
            %err,
            "ignoring out-of-order session input"
        );
        record_protocol_violation(self.session.id(), self.session.state().as_str(), input);
    }

    fn touch(&mut self) {
        self.idle_deadline = TokioInstant::now() + self.config.idle_timeout();
    }

    /// A terminal snapshot is final, including one published by `cancel`.
    fn publish_snapshot(&self) {
        let next = self.session.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if current.state.is_terminal() {
                return false;
            }
            *current = next;
            true
        });
    }

    fn finish(&self) {
        self.publish_snapshot();
        record_session_finished(
            self.session.id(),
            &self.session.song().id,
            self.session.state().as_str(),
            self.session.abort_reason().map(|reason| reason.as_str()),
            self.session.words_passed(),
            self.session.words_abandoned(),
            self.started_at.elapsed(),
        );
    }
}
