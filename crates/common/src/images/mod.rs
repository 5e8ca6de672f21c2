//! Image generation service abstraction
//!
//! Backends, selected by `images.provider`:
//! - Hugging Face inference (image bytes in the response)
//! - Fireworks text-to-image (image bytes in the response)
//! - Stable Horde (submit, poll until done, download)
//! - Mock

use crate::config::ImageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const HUGGINGFACE_BASE: &str = "https://api-inference.huggingface.co/models";
const HUGGINGFACE_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";
const FIREWORKS_BASE: &str = "https://api.fireworks.ai/inference/v1/workflows/accounts/fireworks/models";
const FIREWORKS_MODEL: &str = "flux-1-schnell-fp8";
const STABLE_HORDE_BASE: &str = "https://stablehorde.net/api/v2";
const STABLE_HORDE_ANONYMOUS_KEY: &str = "0000000000";

/// Raw image returned by a provider
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl GeneratedImage {
    /// File extension matching the content type
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// Trait for image generation
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produce one image for `prompt`
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage>;

    fn provider_name(&self) -> &str;
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(Into::into)
}

/// Read a bytes response, rejecting error statuses and empty bodies
async fn image_from_response(
    service: &str,
    response: reqwest::Response,
    default_type: &str,
) -> Result<GeneratedImage> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::upstream(service, format!("API error {}: {}", status, body)));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with("image/"))
        .unwrap_or(default_type)
        .to_string();

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(AppError::upstream(service, "returned no image data"));
    }

    Ok(GeneratedImage {
        bytes: bytes.to_vec(),
        content_type,
    })
}

// ============================================================================
// Hugging Face
// ============================================================================

pub struct HuggingFaceGenerator {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl HuggingFaceGenerator {
    pub fn new(config: &ImageConfig, api_key: String) -> Result<Self> {
        let base = config.api_base.as_deref().unwrap_or(HUGGINGFACE_BASE);
        let model = config.model.as_deref().unwrap_or(HUGGINGFACE_MODEL);

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            url: format!("{}/{}", base.trim_end_matches('/'), model),
        })
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "inputs": prompt }))
            .send()
            .await
            .map_err(|e| AppError::upstream("huggingface", format!("Request failed: {}", e)))?;

        image_from_response("huggingface", response, "image/png").await
    }

    fn provider_name(&self) -> &str {
        "huggingface"
    }
}

// ============================================================================
// Fireworks
// ============================================================================

pub struct FireworksGenerator {
    client: reqwest::Client,
    api_key: String,
    url: String,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
struct FireworksRequest {
    prompt: String,
    width: u32,
    height: u32,
}

impl FireworksGenerator {
    pub fn new(config: &ImageConfig, api_key: String) -> Result<Self> {
        let base = config.api_base.as_deref().unwrap_or(FIREWORKS_BASE);
        let model = config.model.as_deref().unwrap_or(FIREWORKS_MODEL);

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key,
            url: format!("{}/{}/text_to_image", base.trim_end_matches('/'), model),
            width: config.width,
            height: config.height,
        })
    }
}

#[async_trait]
impl ImageGenerator for FireworksGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let body = FireworksRequest {
            prompt: format!("{}, cinematic, masterpiece, 8k", prompt),
            width: self.width,
            height: self.height,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "image/jpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream("fireworks", format!("Request failed: {}", e)))?;

        image_from_response("fireworks", response, "image/jpeg").await
    }

    fn provider_name(&self) -> &str {
        "fireworks"
    }
}

// ============================================================================
// Stable Horde
// ============================================================================

/// Asynchronous generation: submit, poll the check endpoint, then download
pub struct StableHordeGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    width: u32,
    height: u32,
    poll_interval: Duration,
    max_wait: Duration,
}

#[derive(Serialize)]
struct HordeSubmit<'a> {
    prompt: &'a str,
    params: HordeParams,
}

#[derive(Serialize)]
struct HordeParams {
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct HordeSubmitted {
    id: String,
}

#[derive(Deserialize)]
struct HordeCheck {
    done: bool,
    #[serde(default)]
    faulted: bool,
}

#[derive(Deserialize)]
struct HordeStatus {
    #[serde(default)]
    generations: Vec<HordeGeneration>,
}

#[derive(Deserialize)]
struct HordeGeneration {
    img: String,
}

impl StableHordeGenerator {
    pub fn new(config: &ImageConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: config
                .api_key
                .clone()
                .unwrap_or_else(|| STABLE_HORDE_ANONYMOUS_KEY.to_string()),
            base_url: config
                .api_base
                .as_deref()
                .unwrap_or(STABLE_HORDE_BASE)
                .trim_end_matches('/')
                .to_string(),
            // Horde only accepts multiples of 64
            width: config.width / 64 * 64,
            height: config.height / 64 * 64,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            max_wait: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn submit(&self, prompt: &str) -> Result<String> {
        let body = HordeSubmit {
            prompt,
            params: HordeParams {
                width: self.width,
                height: self.height,
            },
        };

        let response = self
            .client
            .post(format!("{}/generate/async", self.base_url))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                "stablehorde",
                format!("Submit failed {}: {}", status, body),
            ));
        }

        let submitted: HordeSubmitted = response.json().await?;
        Ok(submitted.id)
    }

    async fn check(&self, id: &str) -> Result<HordeCheck> {
        let check = self
            .client
            .get(format!("{}/generate/check/{}", self.base_url, id))
            .send()
            .await?
            .error_for_status()?
            .json::<HordeCheck>()
            .await?;

        Ok(check)
    }

    async fn wait_until_done(&self, id: &str) -> Result<()> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.poll_interval)
            .with_multiplier(1.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(Some(self.max_wait))
            .build();

        backoff::future::retry(policy, || async {
            let check = self.check(id).await.map_err(backoff::Error::permanent)?;
            if check.faulted {
                return Err(backoff::Error::permanent(AppError::upstream(
                    "stablehorde",
                    format!("generation {} faulted", id),
                )));
            }
            if !check.done {
                debug!(id, "Stable Horde generation still pending");
                return Err(backoff::Error::transient(AppError::upstream(
                    "stablehorde",
                    format!("generation {} did not finish in time", id),
                )));
            }
            Ok(())
        })
        .await
    }

    async fn fetch_result(&self, id: &str) -> Result<GeneratedImage> {
        let status = self
            .client
            .get(format!("{}/generate/status/{}", self.base_url, id))
            .send()
            .await?
            .error_for_status()?
            .json::<HordeStatus>()
            .await?;

        let img = status
            .generations
            .into_iter()
            .next()
            .map(|g| g.img)
            .ok_or_else(|| AppError::upstream("stablehorde", "no generations returned"))?;

        let response = self
            .client
            .get(&img)
            .send()
            .await
            .map_err(|e| AppError::upstream("stablehorde", format!("Download failed: {}", e)))?;

        image_from_response("stablehorde", response, "image/webp").await
    }
}

#[async_trait]
impl ImageGenerator for StableHordeGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let id = self.submit(prompt).await?;
        info!(id = %id, "Stable Horde generation submitted");

        self.wait_until_done(&id).await?;
        self.fetch_result(&id).await
    }

    fn provider_name(&self) -> &str {
        "stablehorde"
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Mock generator for testing: a fixed PNG signature, or always failing
pub struct MockImageGenerator {
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
}

/// Bytes returned by [`MockImageGenerator`]
pub const MOCK_IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nmock";

impl MockImageGenerator {
    pub fn new() -> Self {
        Self {
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Generator whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Take `delay` before answering, like a slow provider
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(AppError::upstream("mock", format!("refused prompt '{}'", prompt)));
        }

        Ok(GeneratedImage {
            bytes: MOCK_IMAGE_BYTES.to_vec(),
            content_type: "image/png".to_string(),
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// Create an image generator based on configuration
pub fn create_image_generator(config: &ImageConfig) -> Result<Arc<dyn ImageGenerator>> {
    let require_key = || {
        config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: format!("images.api_key is required for provider '{}'", config.provider),
        })
    };

    match config.provider.as_str() {
        "huggingface" => Ok(Arc::new(HuggingFaceGenerator::new(config, require_key()?)?)),
        "fireworks" => Ok(Arc::new(FireworksGenerator::new(config, require_key()?)?)),
        "stablehorde" => Ok(Arc::new(StableHordeGenerator::new(config)?)),
        "mock" => Ok(Arc::new(MockImageGenerator::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown image provider: {}", other),
        }),
    }
}
