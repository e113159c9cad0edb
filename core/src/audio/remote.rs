use std::io::Read;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::practice::types::{AudioClip, Word};

use super::{preferred_stem, AudioSource};

const MAX_REMOTE_CLIP_BYTES: u64 = 4 * 1024 * 1024;

/// Fetches clips from an HTTP text-to-speech service at `<base_url>/<word>`.
#[derive(Debug, Clone)]
pub struct RemoteSynthesizer {
    base_url: String,
}

impl RemoteSynthesizer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, word: &Word) -> Result<String> {
        Ok(format!("{}/{}", self.base_url, preferred_stem(word)?))
    }
}

#[async_trait]
impl AudioSource for RemoteSynthesizer {
    async fn clip(&self, word: &Word) -> Result<AudioClip> {
        let url = self.url_for(word)?;
        tokio::task::spawn_blocking(move || fetch_clip(&url))
            .await
            .context("clip download task failed")?
    }
}

fn fetch_clip(url: &str) -> Result<AudioClip> {
    debug!(target: "audio", url, "fetching word clip");
    let response = ureq::get(url)
        .call()
        .map_err(|err| anyhow!("failed to fetch clip from {url}: {err}"))?;

    if !(200..300).contains(&response.status()) {
        bail!(
            "failed to fetch clip from {url}: received HTTP status {}",
            response.status()
        );
    }

    let content_type = response.content_type().to_string();
    let mut data = Vec::new();
    response
        .into_reader()
        .take(MAX_REMOTE_CLIP_BYTES)
        .read_to_end(&mut data)
        .with_context(|| format!("failed to read clip body from {url}"))?;

    Ok(AudioClip::inline(content_type, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_urls_join_base_and_word() {
        let source = RemoteSynthesizer::new("http://tts.local/say/");
        assert_eq!(
            source.url_for(&Word::new("Hello")).expect("url"),
            "http://tts.local/say/Hello"
        );
    }

    #[test]
    fn unreachable_synthesizer_is_an_error() {
        let err = fetch_clip("http://127.0.0.1:9/hello").unwrap_err();
        assert!(err.to_string().contains("failed to fetch clip"));
    }
}
