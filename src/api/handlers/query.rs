use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::AppQuery;
use crate::forvo::AudioSource;
use crate::AppState;

pub const DEFAULT_LANGUAGE: &str = "ja";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub term: Option<String>,
    /// Name used for `term` by older Yomichan versions
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub reading: Option<String>,
    #[serde(default)]
    pub debug: Option<String>,
}

impl QueryParams {
    pub fn language(&self) -> &str {
        match self.language.as_deref() {
            Some(language) if !language.is_empty() => language,
            _ => DEFAULT_LANGUAGE,
        }
    }

    pub fn term(&self) -> &str {
        match self.term.as_deref() {
            Some(term) if !term.is_empty() => term,
            _ => self.expression.as_deref().unwrap_or_default(),
        }
    }

    pub fn reading(&self) -> &str {
        self.reading.as_deref().unwrap_or_default()
    }

    pub fn is_debug(&self) -> bool {
        match self.debug.as_deref() {
            None => false,
            Some(flag) => {
                let flag = flag.trim().to_ascii_lowercase();
                !matches!(flag.as_str(), "" | "0" | "false" | "no" | "off")
            }
        }
    }
}

/// Envelope Yomichan expects from a custom audio source.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSourceList {
    #[serde(rename = "type")]
    pub kind: String,
    pub audio_sources: Vec<AudioSource>,
}

impl AudioSourceList {
    pub fn new(audio_sources: Vec<AudioSource>) -> Self {
        Self {
            kind: "audioSourceList".to_string(),
            audio_sources,
        }
    }
}

/// Every resolution step, evaluated independently.
#[derive(Debug, Serialize, Deserialize)]
pub struct DebugResponse {
    pub debug: bool,
    pub term: String,
    pub reading: String,
    #[serde(rename = "word.term")]
    pub word_term: Vec<AudioSource>,
    #[serde(rename = "word.reading")]
    pub word_reading: Vec<AudioSource>,
    #[serde(rename = "search.term")]
    pub search_term: Vec<AudioSource>,
    #[serde(rename = "search.reading")]
    pub search_reading: Vec<AudioSource>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Yomichan custom audio source query.
/// Route: GET /?language=&term=&reading=&debug=
///
/// Tries word(term), word(reading), search(term), search(reading) and stops at the
/// first step that yields anything.
pub async fn query_audio(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<QueryParams>,
) -> Response {
    let resolver = &state.resolver;
    let language = params.language();
    let term = params.term();
    let reading = params.reading();

    if params.is_debug() {
        return Json(DebugResponse {
            debug: true,
            term: term.to_string(),
            reading: reading.to_string(),
            word_term: resolver.word(language, term).await,
            word_reading: resolver.word(language, reading).await,
            search_term: resolver.search(language, term).await,
            search_reading: resolver.search(language, reading).await,
        })
        .into_response();
    }

    let mut audio_sources = resolver.word(language, term).await;
    if audio_sources.is_empty() {
        audio_sources = resolver.word(language, reading).await;
    }
    if audio_sources.is_empty() {
        audio_sources = resolver.search(language, term).await;
    }
    if audio_sources.is_empty() {
        audio_sources = resolver.search(language, reading).await;
    }

    tracing::debug!(
        language,
        term,
        reading,
        sources = audio_sources.len(),
        "Resolved audio sources"
    );

    Json(AudioSourceList::new(audio_sources)).into_response()
}
