use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::client::ForvoClient;
use super::extract;
use crate::media::MediaStore;
use crate::storage::{AudioRecord, Database, ResultKind};

/// Characters left unescaped in relay URLs: unreserved plus `/`.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters left unescaped in a single Forvo path segment.
const SEGMENT_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// One entry of Yomichan's custom audio source list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSource {
    pub name: String,
    pub url: String,
}

/// Resolves a (language, term) pair to playable audio sources.
#[async_trait]
pub trait AudioResolver: Send + Sync {
    /// Sources from Forvo's word page for the exact term.
    async fn word(&self, language: &str, term: &str) -> Vec<AudioSource>;
    /// Sources from Forvo's search page, without contributor attribution.
    async fn search(&self, language: &str, term: &str) -> Vec<AudioSource>;
}

/// Cache-first Forvo resolver. Built once at startup and shared by all requests.
pub struct Forvo {
    audio_host: String,
    public_url: String,
    client: Arc<dyn ForvoClient>,
    db: Database,
    media: Arc<dyn MediaStore>,
}

/// Path of an audio URL relative to the media root, e.g. `mp3/9072967/76/x.mp3`.
pub fn relative_path(audio_url: &str) -> Option<String> {
    let parsed = url::Url::parse(audio_url).ok()?;
    let path = parsed.path().trim_start_matches('/');
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}

impl Forvo {
    pub fn new(
        audio_host: impl Into<String>,
        public_url: impl Into<String>,
        client: Arc<dyn ForvoClient>,
        db: Database,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            audio_host: audio_host.into(),
            public_url: public_url.into(),
            client,
            db,
            media,
        }
    }

    /// URL of a cached file on this relay's `/forvo/` route.
    pub fn local_url(&self, file_path: &str) -> String {
        format!(
            "{}/forvo/{}",
            self.public_url,
            utf8_percent_encode(file_path, PATH_SAFE)
        )
    }

    fn source_for(&self, record: &AudioRecord) -> AudioSource {
        let name = match (record.result_kind, record.contributor.as_deref()) {
            (ResultKind::Match, Some(contributor)) => format!("Forvo ({contributor})"),
            (ResultKind::Match, None) => "Forvo".to_string(),
            (ResultKind::Search, _) => "Forvo Search".to_string(),
        };
        AudioSource {
            name,
            url: self.local_url(&record.file_path),
        }
    }

    /// Cached sources for the pair, or None on a miss. Read errors count as a miss.
    fn cached(&self, language: &str, term: &str) -> Option<Vec<AudioSource>> {
        match self.db.lookup(language, term) {
            Ok(records) if !records.is_empty() => {
                tracing::debug!(language, term, count = records.len(), "Found cached results");
                Some(records.iter().map(|r| self.source_for(r)).collect())
            }
            Ok(_) => None,
            Err(e) => {
                tracing::error!(language, term, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    async fn fetch_page(&self, path: &str) -> Option<String> {
        match self.client.fetch_page(path).await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to fetch Forvo page");
                None
            }
        }
    }

    /// Download unless the file is already on disk. Returns whether the file is present.
    async fn download_if_absent(&self, url: &str, file_path: &str) -> bool {
        match self.media.exists(file_path).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(file_path, error = %e, "Rejected audio path");
                return false;
            }
        }

        tracing::info!(file_path, "Downloading");
        let data = match self.client.fetch_audio(url).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(file_path, error = %e, "Download failed");
                return false;
            }
        };

        match self.media.put_if_absent(file_path, data).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(file_path, error = %e, "Failed to save audio");
                false
            }
        }
    }

    /// Download the audio and record it. None when this source has to be skipped.
    async fn store(
        &self,
        language: &str,
        term: &str,
        result_kind: ResultKind,
        contributor: Option<&str>,
        audio_url: &str,
    ) -> Option<AudioSource> {
        let Some(file_path) = relative_path(audio_url) else {
            tracing::warn!(audio_url, "Audio URL has no usable path");
            return None;
        };
        if !self.download_if_absent(audio_url, &file_path).await {
            return None;
        }

        match self
            .db
            .insert_record(language, term, result_kind, contributor, &file_path)
        {
            Ok(record) => {
                tracing::debug!(
                    language,
                    term,
                    kind = record.result_kind.as_str(),
                    file_path = %record.file_path,
                    "Cached audio record"
                );
                Some(self.source_for(&record))
            }
            Err(e) => {
                tracing::error!(
                    language,
                    term,
                    file_path = %file_path,
                    error = %e,
                    "Failed to cache audio record"
                );
                None
            }
        }
    }
}

#[async_trait]
impl AudioResolver for Forvo {
    async fn word(&self, language: &str, term: &str) -> Vec<AudioSource> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }
        if let Some(cached) = self.cached(language, term) {
            return cached;
        }

        let path = format!("/word/{}/", utf8_percent_encode(term, SEGMENT_SAFE));
        let Some(html) = self.fetch_page(&path).await else {
            return Vec::new();
        };
        let pronunciations = extract::word_pronunciations(&html, language, &self.audio_host);

        let mut sources = Vec::with_capacity(pronunciations.len());
        for pronunciation in pronunciations {
            let stored = self
                .store(
                    language,
                    term,
                    ResultKind::Match,
                    pronunciation.contributor.as_deref(),
                    &pronunciation.audio_url,
                )
                .await;
            sources.extend(stored);
        }
        sources
    }

    async fn search(&self, language: &str, term: &str) -> Vec<AudioSource> {
        let term = term.trim();
        if term.is_empty() {
            return Vec::new();
        }
        if let Some(cached) = self.cached(language, term) {
            return cached;
        }

        let path = format!(
            "/search/{}/{}/",
            utf8_percent_encode(term, SEGMENT_SAFE),
            utf8_percent_encode(language, SEGMENT_SAFE)
        );
        let Some(html) = self.fetch_page(&path).await else {
            return Vec::new();
        };
        let audio_urls = extract::search_pronunciations(&html, &self.audio_host);

        let mut sources = Vec::with_capacity(audio_urls.len());
        for audio_url in audio_urls {
            let stored = self
                .store(language, term, ResultKind::Search, None, &audio_url)
                .await;
            sources.extend(stored);
        }
        sources
    }
}
