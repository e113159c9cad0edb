//! Service configuration: an optional TOML file plus environment overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

#[cfg(feature = "remote-audio")]
use crate::audio::RemoteSynthesizer;
use crate::audio::{AudioSource, ClipDirectory, ReferenceAudio};
use crate::corpus::InMemoryCatalog;
use crate::practice::PracticeConfig;

pub const CONFIG_PATH_ENV: &str = "SHLOK_CONFIG";
pub const BIND_ENV: &str = "SHLOK_BIND";
pub const CLIP_DIR_ENV: &str = "SHLOK_CLIP_DIR";

const DEFAULT_BIND: &str = "127.0.0.1:8000";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub bind: SocketAddr,
    pub practice: PracticeConfig,
    pub corpus: CorpusConfig,
    pub audio: AudioConfig,
    pub log: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            practice: PracticeConfig::default(),
            corpus: CorpusConfig::default(),
            audio: AudioConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorpusConfig {
    /// TOML file of `[[songs]]`; the built-in songs are used when unset.
    pub songs_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioConfig {
    pub clip_directory: PathBuf,
    pub clip_extension: String,
    /// Takes precedence over the clip directory when set.
    pub synthesizer_url: Option<String>,
    /// URL template containing `{word}`; clients fetch audio themselves.
    pub reference_template: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            clip_directory: PathBuf::from("clips"),
            clip_extension: "mp3".into(),
            synthesizer_url: None,
            reference_template: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    pub json: bool,
    pub directory: Option<PathBuf>,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

impl ServiceConfig {
    /// Reads `SHLOK_CONFIG` (if set), then applies `SHLOK_BIND` and `SHLOK_CLIP_DIR`.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&document)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document).context("invalid service configuration")?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(bind) = std::env::var(BIND_ENV) {
            let bind = if bind.trim().is_empty() {
                DEFAULT_BIND
            } else {
                bind.trim()
            };
            self.bind = bind
                .parse()
                .with_context(|| format!("{BIND_ENV} is not a socket address: {bind}"))?;
        }
        if let Some(dir) = std::env::var_os(CLIP_DIR_ENV) {
            self.audio.clip_directory = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.practice.validate()?;
        Ok(())
    }

    pub fn build_catalog(&self) -> Result<InMemoryCatalog> {
        match &self.corpus.songs_file {
            Some(path) => InMemoryCatalog::from_toml_file(path),
            None => Ok(InMemoryCatalog::builtin()),
        }
    }

    pub fn build_audio_source(&self) -> Arc<dyn AudioSource> {
        let audio = &self.audio;
        if let Some(url) = &audio.synthesizer_url {
            #[cfg(feature = "remote-audio")]
            {
                info!(target: "audio", %url, "fetching clips from synthesizer");
                return Arc::new(RemoteSynthesizer::new(url.as_str()));
            }

            #[cfg(not(feature = "remote-audio"))]
            tracing::warn!(
                target: "audio",
                %url,
                "synthesizerUrl ignored, built without the remote-audio feature"
            );
        }

        if let Some(template) = &audio.reference_template {
            info!(target: "audio", %template, "handing out clip references");
            Arc::new(ReferenceAudio::new(template.as_str()))
        } else {
            info!(
                target: "audio",
                directory = %audio.clip_directory.display(),
                "serving clips from directory"
            );
            Arc::new(ClipDirectory::new(
                &audio.clip_directory,
                audio.clip_extension.as_str(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ServiceConfig::from_toml_str("").expect("parses");
        assert_eq!(config.bind, default_bind());
        assert_eq!(config.practice, PracticeConfig::default());
        assert!(config.corpus.songs_file.is_none());
        assert_eq!(config.audio.clip_extension, "mp3");
        assert_eq!(config.audio.clip_directory, Path::new("clips"));
        assert!(!config.log.json);
    }

    #[test]
    fn reads_practice_options_by_their_documented_names() {
        let config = ServiceConfig::from_toml_str(
            r#"
            bind = "0.0.0.0:9000"

            [practice]
            similarityThreshold = 0.7
            maxAttemptsPerWord = 5
            retryDelayMs = 500
            sessionIdleTimeoutMs = 30000
            requirePlaybackAck = false

            [audio]
            clipDirectory = "/srv/clips"
            clipExtension = "wav"

            [log]
            json = true
            "#,
        )
        .expect("parses");

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.practice.similarity_threshold, 0.7);
        assert_eq!(config.practice.max_attempts_per_word, 5);
        assert_eq!(config.practice.retry_delay_ms, 500);
        assert_eq!(config.practice.session_idle_timeout_ms, 30_000);
        assert!(!config.practice.require_playback_ack);
        assert_eq!(config.audio.clip_directory, Path::new("/srv/clips"));
        assert_eq!(config.audio.clip_extension, "wav");
        assert!(config.log.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_threshold_fails_validation() {
        let config = ServiceConfig::from_toml_str("[practice]\nsimilarityThreshold = 2.0\n")
            .expect("parses");
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shlok.toml");
        std::fs::write(&path, "[practice]\nmaxAttemptsPerWord = 2\n").expect("write");
        let config = ServiceConfig::from_file(&path).expect("loads");
        assert_eq!(config.practice.max_attempts_per_word, 2);
        assert!(ServiceConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn builtin_catalog_when_no_songs_file() {
        let catalog = ServiceConfig::default().build_catalog().expect("catalog");
        assert_eq!(catalog.len(), 3);
    }
}
