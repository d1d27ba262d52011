//! forvo-relay - Local Forvo pronunciation relay for Yomichan
//!
//! This crate answers Yomichan "custom audio source" queries with:
//! - Cache-first resolution of (language, term) pairs against Forvo's word and search pages
//! - Downloaded audio kept in a media directory and served back over HTTP
//! - redb embedded database memoizing every resolved source (append-only)

pub mod api;
pub mod config;
pub mod forvo;
pub mod media;
pub mod storage;

use std::sync::Arc;

use config::Config;
use forvo::AudioResolver;
use media::MediaStore;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub media: Arc<dyn MediaStore>,
    pub resolver: Arc<dyn AudioResolver>,
}
