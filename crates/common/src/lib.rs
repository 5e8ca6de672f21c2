//! PressForge Common Library
//!
//! Shared code for the gateway and the workers:
//! - Database models, schema and repository
//! - Provider clients (LLM, images, storage, translation, search index)
//! - Content spans and generation pipelines
//! - Error types, configuration, auth and metrics

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod errors;
pub mod images;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod search_index;
pub mod storage;
pub mod translation;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use providers::Providers;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language of articles created without an explicit one
pub const DEFAULT_LANG: &str = "en";
