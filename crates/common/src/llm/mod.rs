//! Text generation
//!
//! One capability trait with pluggable backends:
//! - Groq / any OpenAI-compatible chat completions endpoint
//! - Mock (scripted responses for tests and offline runs)
//!
//! [`complete_json`] layers the two-tier structured extraction on top of any
//! backend.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Output shape requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// A single chat completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub format: ResponseFormat,
    /// Use the long-form model (chapters, full articles)
    pub long_form: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.7,
            format: ResponseFormat::Text,
            long_form: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = ResponseFormat::JsonObject;
        self
    }

    pub fn long_form(mut self) -> Self {
        self.long_form = true;
        self
    }
}

/// Trait for text generation
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one completion and return the raw model output
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

// ============================================================================
// OpenAI-compatible client (Groq)
// ============================================================================

/// Chat completions client for Groq and other OpenAI-compatible APIs
pub struct GroqClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    long_form_model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormatBody {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatBody>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl GroqClient {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            long_form_model: config.long_form_model.clone(),
        })
    }

    async fn make_request(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model,
            messages,
            temperature: request.temperature,
            response_format: (request.format == ResponseFormat::JsonObject)
                .then_some(ResponseFormatBody { kind: "json_object" }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream("llm", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream("llm", format!("API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream("llm", format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::upstream("llm", "Empty completion"))
    }
}

#[async_trait]
impl TextGenerator for GroqClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let model = if request.long_form {
            self.long_form_model.as_str()
        } else {
            self.model.as_str()
        };

        let start = Instant::now();
        let result = self.make_request(model, request).await;
        metrics::record_llm_call(start.elapsed().as_secs_f64(), model, result.is_ok());

        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Mock generator for testing.
///
/// Returns scripted responses in order; once the script is exhausted every
/// call gets the canned article below.
#[derive(Default)]
pub struct MockTextGenerator {
    script: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

/// Response of [`MockTextGenerator`] once its script runs out
pub const MOCK_ARTICLE: &str = r#"{"title": "Mock Article", "slug": "mock-article", "meta_description": "A generated article.", "content": "Intro paragraph.\n\n[IMAGE: a quiet lake]\n\nClosing paragraph."}"#;

impl MockTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator that answers with `responses` in order
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::default();
        for response in responses {
            mock.push(Ok(response.into()));
        }
        mock
    }

    /// Queue one more response or failure
    pub fn push(&self, response: Result<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(MOCK_ARTICLE.to_string()))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

/// Create a text generator based on configuration
pub fn create_text_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "groq" | "openai" => {
            let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: format!("llm.api_key is required for provider '{}'", config.provider),
            })?;
            Ok(Arc::new(GroqClient::new(config, api_key)?))
        }
        "mock" => Ok(Arc::new(MockTextGenerator::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown llm provider: {}", other),
        }),
    }
}

// ============================================================================
// Structured extraction
// ============================================================================

/// Ask for a JSON object and deserialize it.
///
/// First a JSON-mode call whose output is parsed as is. If that call or the
/// parse fails, a plain-text call follows; the text between the first `{` and
/// the last `}` is parsed strictly, then again with raw control characters
/// inside string literals escaped.
pub async fn complete_json<T>(generator: &dyn TextGenerator, request: &CompletionRequest) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut json_request = request.clone();
    json_request.format = ResponseFormat::JsonObject;

    match generator.complete(&json_request).await {
        Ok(raw) => match serde_json::from_str::<T>(raw.trim()) {
            Ok(value) => return Ok(value),
            Err(e) => warn!(error = %e, "JSON-mode output did not parse, retrying as text"),
        },
        Err(e) => warn!(error = %e, "JSON-mode call failed, retrying as text"),
    }

    let mut text_request = request.clone();
    text_request.format = ResponseFormat::Text;
    let raw = generator.complete(&text_request).await?;

    parse_embedded_json(&raw)
}

/// Parse the object spanning the first `{` to the last `}` of `raw`
pub fn parse_embedded_json<T>(raw: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let candidate = extract_json_object(raw).ok_or_else(|| AppError::UnparseableResponse {
        message: "no JSON object in model output".to_string(),
    })?;

    match serde_json::from_str::<T>(candidate) {
        Ok(value) => Ok(value),
        Err(strict) => {
            debug!(error = %strict, "Strict parse failed, trying lenient parse");
            serde_json::from_str::<T>(&escape_control_chars(candidate)).map_err(|e| {
                AppError::UnparseableResponse {
                    message: e.to_string(),
                }
            })
        }
    }
}

/// Slice from the first `{` to the last `}` inclusive
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Escape control characters that appear raw inside JSON string literals
fn escape_control_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out
}
