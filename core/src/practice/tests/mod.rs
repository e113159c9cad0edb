
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::audio::AudioSource;
use crate::practice::types::{AudioClip, OutboundEvent, Song, Word};

/// Hands out a URL per word without touching the filesystem.
struct StubAudio;

#[async_trait]
impl AudioSource for StubAudio {
    async fn clip(&self, word: &Word) -> Result<AudioClip> {
        Ok(AudioClip::reference(format!("clips/{}.mp3", word.text())))
    }
}

struct FailingAudio;

#[async_trait]
impl AudioSource for FailingAudio {
    async fn clip(&self, word: &Word) -> Result<AudioClip> {
        Err(anyhow!("no clip recorded for {}", word.text()))
    }
}

struct SlowAudio {
    delay: Duration,
}

#[async_trait]
impl AudioSource for SlowAudio {
    async fn clip(&self, word: &Word) -> Result<AudioClip> {
        sleep(self.delay).await;
        Ok(AudioClip::reference(word.text().to_string()))
    }
}

fn stub_audio() -> Arc<dyn AudioSource> {
    Arc::new(StubAudio)
}

fn song(id: &str, tokens: &[&str]) -> Arc<Song> {
    Arc::new(Song::new(id, id, tokens.iter().copied()))
}

async fn next_event(events: &mut mpsc::Receiver<OutboundEvent>) -> OutboundEvent {
    events.recv().await.expect("session emitted an event")
}

/// Receives the next `word` event and returns its text and position.
async fn expect_word(events: &mut mpsc::Receiver<OutboundEvent>) -> (String, usize) {
    match next_event(events).await {
        OutboundEvent::Word { word, position, .. } => (word, position),
        other => panic!("expected word event, got {other:?}"),
    }
}

async fn expect_result(events: &mut mpsc::Receiver<OutboundEvent>) -> (bool, String) {
    match next_event(events).await {
        OutboundEvent::Result {
            success, message, ..
        } => (success, message),
        other => panic!("expected result event, got {other:?}"),
    }
}
