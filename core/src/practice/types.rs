use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use std::time::SystemTime;

use super::scorer::normalize;

/// A target token as stored in a song: the normalized text used for scoring and
/// the surface form used to look up its audio rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    text: String,
    audio_key: String,
}

impl Word {
    pub fn new(token: &str) -> Self {
        Self {
            text: normalize(token),
            audio_key: surface_key(token),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio_key(&self) -> &str {
        &self.audio_key
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The token as written, minus surrounding punctuation and with whitespace runs
/// collapsed. Case is kept.
fn surface_key(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct Song {
    pub id: String,
    pub title: String,
    words: Arc<[Word]>,
}

impl Song {
    /// Builds a song from raw lyric tokens, dropping tokens that normalize to nothing.
    pub fn new<I, S>(id: impl Into<String>, title: impl Into<String>, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<Word> = tokens
            .into_iter()
            .map(|token| Word::new(token.as_ref()))
            .filter(|word| !word.is_empty())
            .collect();
        Self {
            id: id.into(),
            title: title.into(),
            words: words.into(),
        }
    }

    pub fn words(&self) -> Arc<[Word]> {
        Arc::clone(&self.words)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub transcript: String,
    pub received_at: SystemTime,
}

impl Attempt {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            received_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Correct,
    Retry,
    Abandon,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Correct => "correct",
            Decision::Retry => "retry",
            Decision::Abandon => "abandon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub score: f32,
    pub decision: Decision,
}

/// Playable rendering of a word as delivered to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "encoding")]
pub enum AudioClip {
    #[serde(rename = "base64")]
    Inline {
        #[serde(rename = "contentType")]
        content_type: String,
        #[serde(serialize_with = "encode_base64")]
        data: Bytes,
    },
    #[serde(rename = "url")]
    Reference { data: String },
}

impl AudioClip {
    pub fn inline(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        AudioClip::Inline {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn reference(url: impl Into<String>) -> Self {
        AudioClip::Reference { data: url.into() }
    }
}

fn encode_base64<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(data))
}

/// Events a session emits towards its client, in protocol order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Word {
        word: String,
        audio: Option<AudioClip>,
        position: usize,
        total: usize,
    },
    Result {
        success: bool,
        message: String,
        score: f32,
    },
    Completed {
        message: String,
    },
}

impl OutboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::Word { .. } => "word",
            OutboundEvent::Result { .. } => "result",
            OutboundEvent::Completed { .. } => "completed",
        }
    }
}

/// Events a client sends into its session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    #[serde(alias = "pronunciation_result")]
    Attempt {
        #[serde(alias = "word")]
        transcript: String,
    },
    #[serde(alias = "audio_ended")]
    PlaybackFinished,
    Stop,
}
