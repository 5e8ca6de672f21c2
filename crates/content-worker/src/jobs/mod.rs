//! Batch jobs and the context they share
//!
//! Every job walks its topics one at a time. A failing topic is logged and
//! skipped; only an empty topic list ends a run early.

pub mod breaking_news;
pub mod daily;
pub mod ebook;
pub mod future;
pub mod translate;
pub mod weekly;

use crate::errors::WorkerResult;
use chrono::NaiveDate;
use pressforge_common::{
    config::AppConfig,
    db::{models::Article, DbPool, Repository},
    errors::Result,
    pipeline::{ContentGenerator, ImageResolver, TranslationFanout, TranslationPolicy},
    Providers,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Characters of a candidate compared against existing titles
const SIMILAR_TITLE_PREFIX: usize = 50;

/// Tally of one job run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: usize,
    pub existing: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn log(&self, job: &str) {
        info!(
            job,
            created = self.created,
            existing = self.existing,
            skipped = self.skipped,
            failed = self.failed,
            "Job finished"
        );
    }
}

pub struct JobContext {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub providers: Providers,
    pub generator: ContentGenerator,
    pub images: ImageResolver,
    pub translations: TranslationFanout,
    pub http: reqwest::Client,
    /// Fan out every created article
    pub translate: bool,
    delay: Duration,
}

impl JobContext {
    pub fn new(
        config: Arc<AppConfig>,
        db: DbPool,
        providers: Providers,
        translate: bool,
    ) -> WorkerResult<Self> {
        let repo = Repository::new(db);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pressforge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            generator: ContentGenerator::new(providers.llm.clone(), repo.clone()),
            images: ImageResolver::new(
                providers.images.clone(),
                providers.storage.clone(),
                repo.clone(),
            )
            .with_delay(Duration::from_secs(config.workers.image_delay_secs)),
            translations: TranslationFanout::new(
                providers.translator.clone(),
                repo.clone(),
                config.translation.target_languages.clone(),
                TranslationPolicy::from(&config.translation),
            ),
            delay: config.generation_delay(),
            http,
            translate,
            providers,
            repo,
            config,
        })
    }

    pub fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }

    /// Wait between generations
    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Whether a stored title already contains the start of `candidate`
    pub async fn has_similar_title(&self, candidate: &str) -> Result<bool> {
        let prefix: String = candidate.trim().chars().take(SIMILAR_TITLE_PREFIX).collect();
        if prefix.is_empty() {
            return Ok(false);
        }
        self.repo.title_contains(&prefix).await
    }

    /// Translate a source article into every configured language
    pub async fn fan_out(&self, article: &Article) {
        match self.translations.fan_out(article).await {
            Ok(report) => info!(
                id = article.id,
                created = ?report.created_langs(),
                skipped = report.skipped.len(),
                "Translations done"
            ),
            Err(e) => warn!(id = article.id, error = %e, "Translation fan-out failed"),
        }
    }

    /// Hook after a new article: fan out when `--translate` is set
    pub async fn after_created(&self, article: &Article) {
        if self.translate {
            self.fan_out(article).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use pressforge_common::config::RegionConfig;
    use pressforge_common::llm::MockTextGenerator;

    pub async fn context(llm: MockTextGenerator, configure: impl FnOnce(&mut AppConfig)) -> JobContext {
        context_with(Arc::new(llm), configure).await
    }

    /// Context over an in-memory database with no delays
    pub async fn context_with(
        llm: Arc<MockTextGenerator>,
        configure: impl FnOnce(&mut AppConfig),
    ) -> JobContext {
        let mut config = AppConfig::default();
        config.workers.generation_delay_secs = 0;
        config.workers.image_delay_secs = 0;
        config.translation.delay_secs = 0;
        config.translation.jitter_ms = 0;
        config.translation.target_languages = vec!["en".into(), "fr".into()];
        config.workers.regions = vec![RegionConfig {
            name: "india".into(),
            lang: "hi".into(),
        }];
        configure(&mut config);

        let db = DbPool::in_memory().await.unwrap();
        let providers = Providers::with_llm(llm);
        JobContext::new(Arc::new(config), db, providers, false).unwrap()
    }

    pub fn draft_json(title: &str, content: &str) -> String {
        serde_json::json!({
            "title": title,
            "meta_description": "meta",
            "content": content,
            "category": "World News",
            "authorName": "Sam Reyes",
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use pressforge_common::db::NewArticle;
    use pressforge_common::llm::MockTextGenerator;

    #[tokio::test]
    async fn test_similar_title_uses_prefix() {
        let ctx = context(MockTextGenerator::new(), |_| {}).await;
        ctx.repo
            .create_article(NewArticle {
                slug: "storm".into(),
                lang: "en".into(),
                title: "Live: Storm reaches the coast overnight".into(),
                meta_description: String::new(),
                content: String::new(),
                image_url: None,
                is_published: true,
                is_breaking_news: true,
                author_name: None,
                author_bio: None,
                original_article_id: None,
            })
            .await
            .unwrap();

        assert!(ctx.has_similar_title("Storm reaches the coast").await.unwrap());
        assert!(!ctx.has_similar_title("Markets rally").await.unwrap());
        assert!(!ctx.has_similar_title("  ").await.unwrap());
    }
}
