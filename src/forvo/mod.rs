//! Forvo scraping: HTTP access, markup extraction and the cache-first resolver.

pub mod client;
pub mod extract;
mod resolver;

pub use client::{FetchError, ForvoClient, HttpForvoClient};
pub use resolver::{relative_path, AudioResolver, AudioSource, Forvo};
