//! Translation fan-out: one source article -> one row per target language

use crate::config::TranslationConfig;
use crate::content::slugify;
use crate::db::models::{Article, Category};
use crate::db::{NewArticle, Repository};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::translation::Translator;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pacing and retry for individual translation calls
#[derive(Debug, Clone)]
pub struct TranslationPolicy {
    pub delay: Duration,
    pub jitter: Duration,
    pub max_attempts: u32,
}

impl TranslationPolicy {
    /// No waiting, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            delay: Duration::ZERO,
            jitter: Duration::ZERO,
            max_attempts,
        }
    }

    fn pause(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        } else {
            Duration::ZERO
        };
        self.delay + extra
    }
}

impl From<&TranslationConfig> for TranslationPolicy {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            delay: Duration::from_secs(config.delay_secs),
            jitter: Duration::from_millis(config.jitter_ms),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// Why a language produced no row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyTranslated,
    EmptySlug,
    SlugTaken(String),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct TranslationReport {
    pub created: Vec<Article>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl TranslationReport {
    pub fn created_langs(&self) -> Vec<&str> {
        self.created.iter().map(|a| a.lang.as_str()).collect()
    }
}

#[derive(Clone)]
pub struct TranslationFanout {
    translator: Arc<dyn Translator>,
    repo: Repository,
    languages: Vec<String>,
    policy: TranslationPolicy,
}

impl TranslationFanout {
    pub fn new(
        translator: Arc<dyn Translator>,
        repo: Repository,
        languages: Vec<String>,
        policy: TranslationPolicy,
    ) -> Self {
        Self {
            translator,
            repo,
            languages,
            policy,
        }
    }

    /// Translate one text with pacing and retries.
    ///
    /// Exhausting every attempt is not an error: the original text comes back.
    pub async fn translate_text(&self, text: &str, source: &str, target: &str) -> String {
        if text.trim().is_empty() || source == target {
            return text.to_string();
        }

        for attempt in 1..=self.policy.max_attempts {
            let pause = self.policy.pause();
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            match self.translator.translate(text, source, target).await {
                Ok(translated) => return translated,
                Err(e) => warn!(
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    source,
                    target,
                    error = %e,
                    "Translation attempt failed"
                ),
            }
        }

        warn!(source, target, "All translation attempts failed, keeping original text");
        text.to_string()
    }

    /// Translate `source` into every configured language it lacks
    pub async fn fan_out(&self, source: &Article) -> Result<TranslationReport> {
        if source.is_translation() {
            return Err(AppError::Validation {
                message: format!("article {} is itself a translation", source.id),
                field: None,
            });
        }

        let categories = self.repo.categories_for_article(source).await?;
        let mut report = TranslationReport::default();

        info!(id = source.id, lang = %source.lang, "Starting translation fan-out");

        for lang in &self.languages {
            if *lang == source.lang {
                continue;
            }

            match self.translate_into(source, &categories, lang).await {
                Ok(Ok(article)) => {
                    info!(id = article.id, lang = %lang, slug = %article.slug, "Translation created");
                    report.created.push(article);
                }
                Ok(Err(reason)) => {
                    info!(lang = %lang, reason = ?reason, "Translation skipped");
                    report.skipped.push((lang.clone(), reason));
                }
                Err(e) => {
                    warn!(lang = %lang, error = %e, "Translation failed");
                    report.skipped.push((lang.clone(), SkipReason::Failed(e.to_string())));
                }
            }
        }

        metrics::record_translations(report.created.len(), report.skipped.len());
        Ok(report)
    }

    async fn translate_into(
        &self,
        source: &Article,
        categories: &[Category],
        lang: &str,
    ) -> Result<std::result::Result<Article, SkipReason>> {
        if self.repo.find_translation(source.id, lang).await?.is_some() {
            return Ok(Err(SkipReason::AlreadyTranslated));
        }

        let title = self.translate_text(&source.title, &source.lang, lang).await;
        let slug = slugify(&title);
        if slug.is_empty() {
            warn!(lang, title = %title, "Translated title yields an empty slug");
            return Ok(Err(SkipReason::EmptySlug));
        }

        let meta = self
            .translate_text(&source.meta_description, &source.lang, lang)
            .await;
        let content = self.translate_text(&source.content, &source.lang, lang).await;

        if self.repo.find_by_slug_and_lang(&slug, lang).await?.is_some() {
            return Ok(Err(SkipReason::SlugTaken(slug)));
        }

        let article = self
            .repo
            .create_article(NewArticle {
                slug,
                lang: lang.to_string(),
                title,
                meta_description: meta,
                content,
                image_url: source.image_url.clone(),
                is_published: source.is_published,
                is_breaking_news: source.is_breaking_news,
                author_name: source.author_name.clone(),
                author_bio: source.author_bio.clone(),
                original_article_id: Some(source.id),
            })
            .await?;

        for category in categories {
            self.repo.attach_category(article.id, category.id).await?;
        }

        Ok(Ok(article))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use crate::translation::MockTranslator;

    async fn source(repo: &Repository) -> Article {
        let article = repo
            .create_article(NewArticle {
                slug: "ocean-life".into(),
                lang: "en".into(),
                title: "Ocean Life".into(),
                meta_description: "Fish".into(),
                content: "Deep sea".into(),
                image_url: Some("https://img/hero.png".into()),
                is_published: true,
                is_breaking_news: true,
                author_name: Some("Ana".into()),
                author_bio: None,
                original_article_id: None,
            })
            .await
            .unwrap();
        let category = repo.get_or_create_category("Science").await.unwrap();
        repo.attach_category(article.id, category.id).await.unwrap();
        article
    }

    fn fanout(repo: &Repository, translator: MockTranslator, langs: &[&str]) -> TranslationFanout {
        TranslationFanout::new(
            Arc::new(translator),
            repo.clone(),
            langs.iter().map(|l| l.to_string()).collect(),
            TranslationPolicy::immediate(3),
        )
    }

    #[tokio::test]
    async fn test_fan_out_copies_fields_and_categories() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let src = source(&repo).await;

        let report = fanout(&repo, MockTranslator::new(), &["en", "fr", "de"])
            .fan_out(&src)
            .await
            .unwrap();
        assert_eq!(report.created_langs(), vec!["fr", "de"]);

        let fr = &report.created[0];
        assert_eq!(fr.slug, "fr-ocean-life");
        assert_eq!(fr.original_article_id, Some(src.id));
        assert_eq!(fr.image_url, src.image_url);
        assert!(fr.is_breaking_news);
        assert_eq!(repo.categories_for_article(fr).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_translation_creates_no_row() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let src = source(&repo).await;
        let fan = fanout(&repo, MockTranslator::new(), &["fr"]);

        fan.fan_out(&src).await.unwrap();
        let again = fan.fan_out(&src).await.unwrap();

        assert!(again.created.is_empty());
        assert_eq!(again.skipped, vec![("fr".to_string(), SkipReason::AlreadyTranslated)]);
        assert_eq!(repo.list_translations(src.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_slug_is_skipped_and_batch_continues() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let src = source(&repo).await;
        let translator = MockTranslator::new().with_override("ja", "Ocean Life", "???");

        let report = fanout(&repo, translator, &["ja", "fr"]).fan_out(&src).await.unwrap();

        assert_eq!(report.created_langs(), vec!["fr"]);
        assert_eq!(report.skipped, vec![("ja".to_string(), SkipReason::EmptySlug)]);
    }

    #[tokio::test]
    async fn test_retry_then_original_text() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let fan = fanout(&repo, MockTranslator::new().failing_first(2), &["fr"]);
        assert_eq!(fan.translate_text("Hi", "en", "fr").await, "[fr] Hi");

        let fan = fanout(&repo, MockTranslator::new().failing_first(3), &["fr"]);
        assert_eq!(fan.translate_text("Hi", "en", "fr").await, "Hi");
    }

    #[tokio::test]
    async fn test_no_call_for_empty_or_same_language() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let translator = Arc::new(MockTranslator::new());
        let fan = TranslationFanout::new(
            translator.clone(),
            repo,
            vec![],
            TranslationPolicy::immediate(1),
        );

        assert_eq!(fan.translate_text("", "en", "fr").await, "");
        assert_eq!(fan.translate_text("Hi", "en", "en").await, "Hi");
        assert_eq!(translator.calls(), 0);
    }

    #[tokio::test]
    async fn test_translations_are_not_fanned_out() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let src = source(&repo).await;
        let fan = fanout(&repo, MockTranslator::new(), &["fr"]);
        let report = fan.fan_out(&src).await.unwrap();

        assert!(fan.fan_out(&report.created[0]).await.is_err());
    }
}
