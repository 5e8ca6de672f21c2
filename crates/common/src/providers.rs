//! Provider wiring
//!
//! One client per external capability, built once at process start from
//! configuration and handed to handlers and jobs.

use crate::config::AppConfig;
use crate::errors::Result;
use crate::images::{create_image_generator, ImageGenerator, MockImageGenerator};
use crate::llm::{create_text_generator, MockTextGenerator, TextGenerator};
use crate::storage::{create_storage, InMemoryStorage, ObjectStorage};
use crate::translation::{create_translator, MockTranslator, Translator};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Providers {
    pub llm: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub storage: Arc<dyn ObjectStorage>,
    pub translator: Arc<dyn Translator>,
}

impl Providers {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let providers = Self {
            llm: create_text_generator(&config.llm)?,
            images: create_image_generator(&config.images)?,
            storage: create_storage(&config.storage)?,
            translator: create_translator(&config.translation)?,
        };

        info!(
            llm = %config.llm.provider,
            images = %config.images.provider,
            storage = %config.storage.provider,
            translation = %config.translation.provider,
            "Providers initialised"
        );

        Ok(providers)
    }

    /// Offline providers: mock LLM, images and translator, in-memory storage
    pub fn mock() -> Self {
        Self::with_llm(Arc::new(MockTextGenerator::new()))
    }

    /// Offline providers around a given text generator
    pub fn with_llm(llm: Arc<dyn TextGenerator>) -> Self {
        Self {
            llm,
            images: Arc::new(MockImageGenerator::new()),
            storage: Arc::new(InMemoryStorage::new()),
            translator: Arc::new(MockTranslator::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_with_offline_providers() {
        let mut config = AppConfig::default();
        config.llm.provider = "mock".into();
        config.images.provider = "mock".into();
        config.storage.provider = "memory".into();
        config.translation.provider = "passthrough".into();

        let providers = Providers::from_config(&config).unwrap();
        assert_eq!(providers.llm.model_name(), "mock");
        assert_eq!(providers.translator.provider_name(), "passthrough");
    }

    #[test]
    fn test_missing_credentials_fail() {
        let config = AppConfig::default();
        assert!(Providers::from_config(&config).is_err());
    }
}
