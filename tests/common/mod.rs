//! Shared helpers for forvo-relay integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::percent_decode_str;

use forvo_relay::config::{Config, ForvoConfig, ServerConfig, StorageConfig};
use forvo_relay::forvo::{AudioResolver, FetchError, Forvo, ForvoClient};
use forvo_relay::media::LocalMediaStore;
use forvo_relay::storage::Database;
use forvo_relay::AppState;

pub const AUDIO_HOST: &str = "https://audio00.forvo.com";
pub const WORD_PAGE: &str = include_str!("../fixtures/word_page.html");
pub const SEARCH_PAGE: &str = include_str!("../fixtures/search_page.html");

/// Audio URLs of the non-ad Japanese entries on WORD_PAGE, in page order.
pub fn word_page_audio() -> Vec<String> {
    vec![
        format!("{AUDIO_HOST}/mp3/9072967/76/9072967_76_1149473_1.mp3"),
        format!("{AUDIO_HOST}/mp3/3110911/76/3110911_76_4072.mp3"),
    ]
}

/// Audio URLs on SEARCH_PAGE, in page order.
pub fn search_page_audio() -> Vec<String> {
    vec![
        format!("{AUDIO_HOST}/mp3/7654321/76/7654321_76_77.mp3"),
        format!("{AUDIO_HOST}/mp3/2468024/76/2468024_76_13579.mp3"),
    ]
}

/// Canned Forvo responses. Pages are keyed by their percent-decoded path.
#[derive(Default)]
pub struct StubClient {
    pages: HashMap<String, String>,
    audio: HashMap<String, Bytes>,
    pub page_requests: Mutex<Vec<String>>,
    pub audio_requests: Mutex<Vec<String>>,
}

impl StubClient {
    pub fn with_page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(path.to_string(), html.to_string());
        self
    }

    pub fn with_audio(mut self, url: &str, data: &[u8]) -> Self {
        self.audio
            .insert(url.to_string(), Bytes::copy_from_slice(data));
        self
    }

    pub fn page_requests(&self) -> Vec<String> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn audio_requests(&self) -> Vec<String> {
        self.audio_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForvoClient for StubClient {
    async fn fetch_page(&self, path: &str) -> Result<String, FetchError> {
        let decoded = percent_decode_str(path).decode_utf8_lossy().into_owned();
        self.page_requests.lock().unwrap().push(decoded.clone());
        self.pages
            .get(&decoded)
            .cloned()
            .ok_or(FetchError::Status {
                status: 404,
                url: decoded,
            })
    }

    async fn fetch_audio(&self, url: &str) -> Result<Bytes, FetchError> {
        self.audio_requests.lock().unwrap().push(url.to_string());
        self.audio.get(url).cloned().ok_or(FetchError::Status {
            status: 404,
            url: url.to_string(),
        })
    }
}

/// Fails the test if any network access is attempted.
pub struct OfflineClient;

#[async_trait]
impl ForvoClient for OfflineClient {
    async fn fetch_page(&self, path: &str) -> Result<String, FetchError> {
        panic!("unexpected page fetch: {path}");
    }

    async fn fetch_audio(&self, url: &str) -> Result<Bytes, FetchError> {
        panic!("unexpected audio fetch: {url}");
    }
}

pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub db: Database,
    pub media: Arc<LocalMediaStore>,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("data")).unwrap();
        let media = Arc::new(LocalMediaStore::new(dir.path().join("user_files")).unwrap());
        Self { dir, db, media }
    }

    pub fn forvo(&self, client: Arc<dyn ForvoClient>, public_url: &str) -> Forvo {
        Forvo::new(
            AUDIO_HOST,
            public_url,
            client,
            self.db.clone(),
            self.media.clone(),
        )
    }

    pub fn config(&self, public_url: &str) -> Config {
        Config {
            server: ServerConfig {
                bind_address: "127.0.0.1:0".to_string(),
                public_url: public_url.to_string(),
            },
            storage: StorageConfig {
                media_dir: self.media.base_path().to_string_lossy().to_string(),
                data_dir: self.dir.path().join("data").to_string_lossy().to_string(),
            },
            forvo: ForvoConfig::default(),
        }
    }

    pub fn state(&self, public_url: &str, resolver: Arc<dyn AudioResolver>) -> Arc<AppState> {
        Arc::new(AppState {
            config: self.config(public_url),
            db: self.db.clone(),
            media: self.media.clone(),
            resolver,
        })
    }
}

/// Bind an ephemeral port; returns the listener and its base URL.
pub async fn bind() -> (tokio::net::TcpListener, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("http://{addr}"))
}

/// Serve the relay in the background.
pub fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) {
    let app = forvo_relay::api::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}
