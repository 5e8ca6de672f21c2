//! Machine translation clients

use crate::config::TranslationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[async_trait]
pub trait Translator: Send + Sync {
    /// One translation attempt, no retry
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;

    fn provider_name(&self) -> &str;
}

// ============================================================================
// LibreTranslate
// ============================================================================

pub struct LibreTranslateClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibreResponse {
    translated_text: Option<String>,
}

impl LibreTranslateClient {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let body = LibreRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream("translation", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                "translation",
                format!("API error {}: {}", status, body),
            ));
        }

        let parsed: LibreResponse = response.json().await?;
        Ok(parsed.translated_text.unwrap_or_else(|| text.to_string()))
    }

    fn provider_name(&self) -> &str {
        "libretranslate"
    }
}

// ============================================================================
// Passthrough / Mock
// ============================================================================

/// Returns the input unchanged
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn provider_name(&self) -> &str {
        "passthrough"
    }
}

/// Mock translator for testing.
///
/// Prefixes text with `[target] `, unless an override for the exact
/// `(target, text)` pair is registered. Can fail a number of leading calls.
#[derive(Default)]
pub struct MockTranslator {
    overrides: Mutex<HashMap<(String, String), String>>,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate `text` into `target` as `output`
    pub fn with_override(self, target: &str, text: &str, output: &str) -> Self {
        if let Ok(mut overrides) = self.overrides.lock() {
            overrides.insert((target.to_string(), text.to_string()), output.to_string());
        }
        self
    }

    /// Fail the first `n` calls
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::upstream("translation", "mock failure"));
        }

        let key = (target.to_string(), text.to_string());
        if let Some(output) = self.overrides.lock().ok().and_then(|o| o.get(&key).cloned()) {
            return Ok(output);
        }

        Ok(format!("[{}] {}", target, text))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// Create a translator based on configuration
pub fn create_translator(config: &TranslationConfig) -> Result<Arc<dyn Translator>> {
    match config.provider.as_str() {
        "libretranslate" => Ok(Arc::new(LibreTranslateClient::new(config)?)),
        "passthrough" => Ok(Arc::new(PassthroughTranslator)),
        "mock" => Ok(Arc::new(MockTranslator::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown translation provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_libretranslate_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_json(serde_json::json!({
                "q": "Hello", "source": "en", "target": "fr", "format": "text", "api_key": "k"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": "Bonjour"
            })))
            .mount(&server)
            .await;

        let config = TranslationConfig {
            api_url: format!("{}/translate", server.uri()),
            api_key: Some("k".into()),
            ..TranslationConfig::default()
        };
        let client = LibreTranslateClient::new(&config).unwrap();
        assert_eq!(client.translate("Hello", "en", "fr").await.unwrap(), "Bonjour");
    }

    #[tokio::test]
    async fn test_libretranslate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let config = TranslationConfig {
            api_url: server.uri(),
            ..TranslationConfig::default()
        };
        let client = LibreTranslateClient::new(&config).unwrap();
        let err = client.translate("Hello", "en", "de").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_mock_translator() {
        let mock = MockTranslator::new()
            .with_override("ja", "Title", "!!!")
            .failing_first(1);

        assert!(mock.translate("Title", "en", "ja").await.is_err());
        assert_eq!(mock.translate("Title", "en", "ja").await.unwrap(), "!!!");
        assert_eq!(mock.translate("Body", "en", "fr").await.unwrap(), "[fr] Body");
        assert_eq!(mock.calls(), 3);
    }
}
