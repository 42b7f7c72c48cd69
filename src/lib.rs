//! Shukan - web novel aggregation and translation backend.
//!
//! This library provides functionality for:
//! - Fetching chapter pages from a fixed set of Chinese and Japanese novel sites
//! - Translating novel details and chapters through Gemini or OpenAI-compatible APIs
//! - Persisting novels and their chapter chains in SQLite
//! - Serving the library and the translation pipeline over a JSON HTTP API

pub mod api;
pub mod config;
pub mod console;
mod cookies;
pub mod error;
pub mod fetcher;
pub mod lock;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod sources;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use api::{AppState, build_router};
pub use config::Config;
pub use console::Console;
pub use error::{ConfigError, FetchError, PipelineError, ProviderError, SourceError, StoreError};
pub use fetcher::{PageFetcher, WebFetcher};
pub use lock::KeyedLock;
pub use models::{Chapter, Novel, NovelStatus};
pub use pipeline::{PipelineDeps, TranslationPipeline};
pub use providers::TranslationProvider;
pub use sources::{Source, SourceRegistry};
pub use store::{NovelStore, SqliteStore};
