use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::media::MediaStoreError;
use crate::AppState;

/// Extensions served from the media directory
pub const AUDIO_EXTENSIONS: [&str; 2] = ["mp3", "ogg"];

fn has_audio_extension(path: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Serve a previously downloaded audio file.
/// Route: GET /forvo/*path
pub async fn serve_audio(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    if !has_audio_extension(&path) {
        return Err(ApiError::bad_request("Unsupported audio file type"));
    }

    let data = state.media.get(&path).await.map_err(|e| match e {
        MediaStoreError::NotFound(_) => ApiError::bad_request("Audio file not found"),
        MediaStoreError::InvalidPath(_) => ApiError::bad_request("Invalid audio path"),
        MediaStoreError::Io(e) => ApiError::internal(format!("Failed to read audio: {e}")),
    })?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        mime.as_ref()
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    // Downloads are never rewritten
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_audio_extensions() {
        assert!(has_audio_extension("mp3/1/2/a.mp3"));
        assert!(has_audio_extension("a.OGG"));
        assert!(!has_audio_extension("forvo-relay.redb"));
        assert!(!has_audio_extension("mp3/noext"));
    }
}
