use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance of a cached audio file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Found on Forvo's word page, attributed to a contributor
    Match,
    /// Found through Forvo's search page, anonymous
    Search,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKind::Match => "match",
            ResultKind::Search => "search",
        }
    }
}

/// A cache row stored in redb. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRecord {
    pub id: u64,
    pub language: String,
    pub term: String,
    pub result_kind: ResultKind,
    #[serde(default)]
    pub contributor: Option<String>,
    /// Path relative to the media root
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}
