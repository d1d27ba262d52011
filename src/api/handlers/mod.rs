mod admin;
mod audio;
mod query;

pub use admin::{health, HealthResponse};
pub use audio::{serve_audio, AUDIO_EXTENSIONS};
pub use query::{query_audio, AudioSourceList, DebugResponse, QueryParams};
