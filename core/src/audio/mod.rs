//! Word pronunciation clip sources.

#[cfg(feature = "remote-audio")]
mod remote;

#[cfg(feature = "remote-audio")]
pub use remote::RemoteSynthesizer;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::practice::types::{AudioClip, Word};

#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn clip(&self, word: &Word) -> Result<AudioClip>;
}

/// Serves pre-rendered clips named `<word>.<extension>` from a directory.
/// The word as written in the song is tried before its normalized form.
#[derive(Debug, Clone)]
pub struct ClipDirectory {
    root: PathBuf,
    extension: String,
}

impl ClipDirectory {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    fn paths_for(&self, word: &Word) -> Result<Vec<PathBuf>> {
        Ok(lookup_stems(word)?
            .into_iter()
            .map(|stem| self.root.join(format!("{stem}.{}", self.extension)))
            .collect())
    }
}

#[async_trait]
impl AudioSource for ClipDirectory {
    async fn clip(&self, word: &Word) -> Result<AudioClip> {
        let paths = self.paths_for(word)?;
        let mut chosen = None;
        for candidate in &paths {
            if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
                chosen = Some(candidate);
                break;
            }
        }
        let path = chosen
            .or(paths.last())
            .with_context(|| format!("no clip name for `{}`", word.text()))?;
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read clip {}", path.display()))?;
        debug!(
            target: "audio",
            path = %path.display(),
            bytes = data.len(),
            "loaded word clip"
        );
        Ok(AudioClip::inline(content_type_for(&self.extension), data))
    }
}

/// Hands the client a URL built from a `{word}` template instead of bytes.
#[derive(Debug, Clone)]
pub struct ReferenceAudio {
    template: String,
}

impl ReferenceAudio {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

#[async_trait]
impl AudioSource for ReferenceAudio {
    async fn clip(&self, word: &Word) -> Result<AudioClip> {
        Ok(AudioClip::reference(
            self.template.replace("{word}", &preferred_stem(word)?),
        ))
    }
}

/// Candidate clip names for a word: its surface form, then its normalized text.
pub(crate) fn lookup_stems(word: &Word) -> Result<Vec<String>> {
    let mut stems: Vec<String> = Vec::with_capacity(2);
    for key in [word.audio_key(), word.text()] {
        if let Ok(stem) = clip_stem(key) {
            if !stems.contains(&stem) {
                stems.push(stem);
            }
        }
    }
    if stems.is_empty() {
        // Surface the reason the normalized text was refused.
        clip_stem(word.text())?;
    }
    Ok(stems)
}

pub(crate) fn preferred_stem(word: &Word) -> Result<String> {
    lookup_stems(word)?
        .into_iter()
        .next()
        .with_context(|| format!("no clip name for `{}`", word.text()))
}

/// File-name safe form of a key; spaces become underscores.
fn clip_stem(text: &str) -> Result<String> {
    if text.is_empty() {
        bail!("word has no text to look up");
    }
    if !text
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '\'' | '-' | '_'))
    {
        bail!("word `{text}` contains characters not allowed in clip names");
    }
    Ok(text.replace(' ', "_"))
}

fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn clip_directory_reads_inline_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("twinkle.mp3"), b"ID3clip").expect("write clip");

        let source = ClipDirectory::new(dir.path(), ".mp3");
        let clip = source.clip(&Word::new("Twinkle")).await.expect("clip");
        assert_eq!(
            clip,
            AudioClip::Inline {
                content_type: "audio/mpeg".into(),
                data: Bytes::from_static(b"ID3clip"),
            }
        );
    }

    #[tokio::test]
    async fn clip_directory_reports_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = ClipDirectory::new(dir.path(), "wav");
        let err = source.clip(&Word::new("star")).await.unwrap_err();
        assert!(err.to_string().contains("star.wav"));
    }

    #[tokio::test]
    async fn clip_directory_prefers_the_word_as_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("Twinkle.mp3"), b"surface").expect("write clip");
        std::fs::write(dir.path().join("twinkle.mp3"), b"normalized").expect("write clip");

        let source = ClipDirectory::new(dir.path(), "mp3");
        let written = source.clip(&Word::new("Twinkle,")).await.expect("clip");
        assert_eq!(
            written,
            AudioClip::inline("audio/mpeg", Bytes::from_static(b"surface"))
        );
        let lower = source.clip(&Word::new("twinkle")).await.expect("clip");
        assert_eq!(
            lower,
            AudioClip::inline("audio/mpeg", Bytes::from_static(b"normalized"))
        );
    }

    #[test]
    fn clip_names_reject_path_tricks() {
        assert!(lookup_stems(&Word::new("a/b")).is_err());
        assert!(lookup_stems(&Word::new("..")).is_err());
        assert!(lookup_stems(&Word::new("../etc/passwd")).is_err());
        assert_eq!(
            lookup_stems(&Word::new("Row  Boat")).expect("stems"),
            vec!["Row_Boat".to_string(), "row_boat".to_string()]
        );
        assert_eq!(preferred_stem(&Word::new("don't")).expect("stem"), "don't");
    }

    #[tokio::test]
    async fn reference_audio_fills_template() {
        let source = ReferenceAudio::new("https://cdn.example/clips/{word}.mp3");
        let clip = source.clip(&Word::new("Star")).await.expect("clip");
        assert_eq!(
            clip,
            AudioClip::reference("https://cdn.example/clips/Star.mp3")
        );
    }
}
