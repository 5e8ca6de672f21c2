//! Configuration management for PressForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Text generation (LLM) provider
    #[serde(default)]
    pub llm: LlmConfig,

    /// Image generation provider
    #[serde(default)]
    pub images: ImageConfig,

    /// Object storage for generated images and ebooks
    #[serde(default)]
    pub storage: StorageConfig,

    /// Translation provider
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Hosted search index
    #[serde(default)]
    pub search_index: SearchIndexConfig,

    /// Ebook storefront
    #[serde(default)]
    pub storefront: StorefrontConfig,

    /// Admin route protection
    #[serde(default)]
    pub admin: AdminConfig,

    /// CORS allowlist
    #[serde(default)]
    pub cors: CorsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Batch worker settings
    #[serde(default)]
    pub workers: WorkerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds (generation calls are slow)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (postgres:// in production, sqlite:// for local runs)
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider: groq, mock
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// Model used for articles
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Larger model used for long-form pipelines (future topics, ebooks)
    #[serde(default = "default_llm_long_form_model")]
    pub long_form_model: String,

    /// Sampling temperature for article generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Provider: huggingface, fireworks, stable_horde, mock
    #[serde(default = "default_image_provider")]
    pub provider: String,

    /// API key / token
    pub api_key: Option<String>,

    /// Override for the provider's endpoint
    pub api_base: Option<String>,

    /// Model identifier (Hugging Face repo, Fireworks workflow, Horde model)
    pub model: Option<String>,

    /// Overall bound for a single generation, including polling
    #[serde(default = "default_image_timeout")]
    pub timeout_secs: u64,

    /// Interval between job status checks for polling providers
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_image_width")]
    pub width: u32,

    #[serde(default = "default_image_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Provider: firebase, memory
    #[serde(default = "default_storage_provider")]
    pub provider: String,

    /// Bucket name
    pub bucket: Option<String>,

    /// Service account key file; access tokens are minted and refreshed from it
    pub credentials_path: Option<String>,

    /// Fixed OAuth access token, used only without `credentials_path`
    pub access_token: Option<String>,

    /// Storage API base URL
    #[serde(default = "default_storage_api_base")]
    pub api_base: String,

    /// Base URL for public object links
    #[serde(default = "default_storage_public_base")]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    /// Provider: libretranslate, none
    #[serde(default = "default_translation_provider")]
    pub provider: String,

    /// Translate endpoint
    #[serde(default = "default_translation_url")]
    pub api_url: String,

    /// Optional API key for hosted instances
    pub api_key: Option<String>,

    /// Every language an article should exist in
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<String>,

    /// Fixed wait before every translation attempt
    #[serde(default = "default_translation_delay")]
    pub delay_secs: u64,

    /// Random extra wait in [0, jitter_ms)
    #[serde(default)]
    pub jitter_ms: u64,

    /// Attempts per text before giving up and keeping the original
    #[serde(default = "default_translation_attempts")]
    pub max_attempts: u32,

    /// Request timeout in seconds
    #[serde(default = "default_translation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchIndexConfig {
    /// Algolia application id
    pub app_id: Option<String>,

    /// Algolia admin API key
    pub api_key: Option<String>,

    /// Index name
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Override for the API host (tests, proxies)
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorefrontConfig {
    /// Gumroad access token
    pub access_token: Option<String>,

    /// API base URL
    #[serde(default = "default_storefront_api_base")]
    pub api_base: String,

    /// Listing price in cents
    #[serde(default = "default_price_cents")]
    pub price_cents: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Shared secret expected in the x-admin-secret-key header
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Origins allowed to call /api/*
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Generation requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A region the daily job brainstorms topics for
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegionConfig {
    pub name: String,
    pub lang: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Pause between two generations
    #[serde(default = "default_generation_delay")]
    pub generation_delay_secs: u64,

    /// Pause between two image generations inside one article
    #[serde(default = "default_image_delay")]
    pub image_delay_secs: u64,

    /// RSS/Atom feeds polled by the breaking news job
    #[serde(default = "default_feeds")]
    pub feeds: Vec<String>,

    /// Headlines considered per breaking news run
    #[serde(default = "default_breaking_candidates")]
    pub breaking_news_candidates: usize,

    /// Articles generated per breaking news run
    #[serde(default = "default_breaking_quota")]
    pub breaking_news_quota: usize,

    /// Articles generated per future-content run
    #[serde(default = "default_future_quota")]
    pub future_quota: usize,

    /// Language future-content articles are stored under
    #[serde(default = "default_lang")]
    pub future_lang: String,

    /// Regions for the daily job
    #[serde(default = "default_regions")]
    pub regions: Vec<RegionConfig>,

    /// Topics generated per region by the daily job
    #[serde(default = "default_articles_per_region")]
    pub articles_per_region: usize,

    /// Weekly plan file
    #[serde(default = "default_weekly_plan_path")]
    pub weekly_plan_path: String,

    /// Ebook plan file
    #[serde(default = "default_ebook_plan_path")]
    pub ebook_plan_path: String,

    /// Document converter executable
    #[serde(default = "default_converter")]
    pub converter_command: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5001 }
fn default_request_timeout() -> u64 { 300 }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_llm_provider() -> String { "groq".to_string() }
fn default_llm_api_base() -> String { "https://api.groq.com/openai/v1".to_string() }
fn default_llm_model() -> String { "llama-3.1-8b-instant".to_string() }
fn default_llm_long_form_model() -> String { "llama-3.3-70b-versatile".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_llm_timeout() -> u64 { 90 }
fn default_image_provider() -> String { "huggingface".to_string() }
fn default_image_timeout() -> u64 { 90 }
fn default_poll_interval() -> u64 { 5 }
fn default_image_width() -> u32 { 1024 }
fn default_image_height() -> u32 { 512 }
fn default_storage_provider() -> String { "firebase".to_string() }
fn default_storage_api_base() -> String { "https://storage.googleapis.com".to_string() }
fn default_storage_public_base() -> String { "https://storage.googleapis.com".to_string() }
fn default_translation_provider() -> String { "libretranslate".to_string() }
fn default_translation_url() -> String { "https://libretranslate.de/translate".to_string() }
fn default_target_languages() -> Vec<String> {
    ["en", "hi", "fr", "de", "pt", "es", "it", "ja", "ko", "ru"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_translation_delay() -> u64 { 10 }
fn default_translation_attempts() -> u32 { 3 }
fn default_translation_timeout() -> u64 { 60 }
fn default_index_name() -> String { "articles".to_string() }
fn default_storefront_api_base() -> String { "https://api.gumroad.com/v2".to_string() }
fn default_price_cents() -> u32 { 499 }
fn default_allowed_origins() -> Vec<String> { vec!["http://localhost:3000".to_string()] }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "pressforge".to_string() }
fn default_rate_limit() -> u32 { 2 }
fn default_burst() -> u32 { 10 }
fn default_enabled() -> bool { true }
fn default_generation_delay() -> u64 { 20 }
fn default_image_delay() -> u64 { 5 }
fn default_feeds() -> Vec<String> {
    [
        "http://feeds.bbci.co.uk/news/world/rss.xml",
        "http://rss.cnn.com/rss/edition.rss",
        "https://www.aljazeera.com/xml/rss/all.xml",
        "https://rss.nytimes.com/services/xml/rss/nyt/HomePage.xml",
        "https://timesofindia.indiatimes.com/rssfeedstopstories.cms",
        "https://news.google.com/rss?gl=IN&hl=en-IN&ceid=IN:en",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_breaking_candidates() -> usize { 10 }
fn default_breaking_quota() -> usize { 2 }
fn default_future_quota() -> usize { 10 }
fn default_lang() -> String { "en".to_string() }
fn default_regions() -> Vec<RegionConfig> {
    [
        ("india", "hi"),
        ("united_states", "en"),
        ("france", "fr"),
        ("germany", "de"),
        ("brazil", "pt"),
    ]
    .iter()
    .map(|(name, lang)| RegionConfig {
        name: name.to_string(),
        lang: lang.to_string(),
    })
    .collect()
}
fn default_articles_per_region() -> usize { 2 }
fn default_weekly_plan_path() -> String { "weekly_plan.json".to_string() }
fn default_ebook_plan_path() -> String { "ebook_plan.json".to_string() }
fn default_converter() -> String { "pandoc".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_base: default_llm_api_base(),
            model: default_llm_model(),
            long_form_model: default_llm_long_form_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            provider: default_image_provider(),
            api_key: None,
            api_base: None,
            model: None,
            timeout_secs: default_image_timeout(),
            poll_interval_secs: default_poll_interval(),
            width: default_image_width(),
            height: default_image_height(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_storage_provider(),
            bucket: None,
            credentials_path: None,
            access_token: None,
            api_base: default_storage_api_base(),
            public_base_url: default_storage_public_base(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: default_translation_provider(),
            api_url: default_translation_url(),
            api_key: None,
            target_languages: default_target_languages(),
            delay_secs: default_translation_delay(),
            jitter_ms: 0,
            max_attempts: default_translation_attempts(),
            timeout_secs: default_translation_timeout(),
        }
    }
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            api_key: None,
            index_name: default_index_name(),
            api_base: None,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base: default_storefront_api_base(),
            price_cents: default_price_cents(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            generation_delay_secs: default_generation_delay(),
            image_delay_secs: default_image_delay(),
            feeds: default_feeds(),
            breaking_news_candidates: default_breaking_candidates(),
            breaking_news_quota: default_breaking_quota(),
            future_quota: default_future_quota(),
            future_lang: default_lang(),
            regions: default_regions(),
            articles_per_region: default_articles_per_region(),
            weekly_plan_path: default_weekly_plan_path(),
            ebook_plan_path: default_ebook_plan_path(),
            converter_command: default_converter(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__LLM__API_KEY=gsk_...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("translation.target_languages")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("workers.feeds")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Pause between generations in the batch workers
    pub fn generation_delay(&self) -> Duration {
        Duration::from_secs(self.workers.generation_delay_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/pressforge".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            llm: LlmConfig::default(),
            images: ImageConfig::default(),
            storage: StorageConfig::default(),
            translation: TranslationConfig::default(),
            search_index: SearchIndexConfig::default(),
            storefront: StorefrontConfig::default(),
            admin: AdminConfig::default(),
            cors: CorsConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            workers: WorkerConfig::default(),
        }
    }
}
