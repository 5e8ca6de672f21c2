//! Article generation: topic -> LLM draft -> stored article

use crate::content::slugify;
use crate::db::models::Article;
use crate::db::{NewArticle, Repository};
use crate::errors::{AppError, Result};
use crate::llm::{complete_json, CompletionRequest, TextGenerator};
use crate::metrics;
use crate::prompts;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Prompt family used for the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleStyle {
    #[default]
    Evergreen,
    News,
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub lang: String,
    pub keywords: Vec<String>,
    pub style: ArticleStyle,
    pub breaking_news: bool,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            lang: crate::DEFAULT_LANG.to_string(),
            keywords: Vec::new(),
            style: ArticleStyle::Evergreen,
            breaking_news: false,
            temperature: 0.7,
        }
    }
}

impl GenerationOptions {
    pub fn in_lang(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            ..Self::default()
        }
    }
}

/// Structured model output for one article
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub meta_description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "authorName")]
    pub author_name: Option<String>,
    #[serde(default, rename = "authorBio")]
    pub author_bio: Option<String>,
    /// Hero image resolved before storing; never read from the model
    #[serde(skip)]
    pub image_url: Option<String>,
}

impl ArticleDraft {
    /// Slug from the model, or derived from the title when absent or empty
    pub fn resolved_slug(&self) -> String {
        self.slug
            .as_deref()
            .map(slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&self.title))
    }
}

#[derive(Debug, Deserialize)]
struct KeywordList {
    #[serde(default)]
    keywords: Vec<String>,
}

/// Result of a generation request
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// A new row was inserted
    Created(Article),
    /// An article with the same `(slug, lang)` already existed
    Existing(Article),
}

impl GenerationOutcome {
    pub fn article(&self) -> &Article {
        match self {
            GenerationOutcome::Created(a) | GenerationOutcome::Existing(a) => a,
        }
    }

    pub fn into_article(self) -> Article {
        match self {
            GenerationOutcome::Created(a) | GenerationOutcome::Existing(a) => a,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, GenerationOutcome::Created(_))
    }
}

/// Turns topics into stored articles
#[derive(Clone)]
pub struct ContentGenerator {
    llm: Arc<dyn TextGenerator>,
    repo: Repository,
}

impl ContentGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>, repo: Repository) -> Self {
        Self { llm, repo }
    }

    /// SEO keywords for a topic; empty when the model does not cooperate
    pub async fn generate_keywords(&self, topic: &str) -> Vec<String> {
        let request = CompletionRequest::new(prompts::keywords(topic)).with_temperature(0.5);

        match complete_json::<KeywordList>(self.llm.as_ref(), &request).await {
            Ok(list) => list
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            Err(e) => {
                warn!(topic, error = %e, "Keyword generation failed, continuing without keywords");
                Vec::new()
            }
        }
    }

    /// Ask the model for an article; nothing is stored
    #[instrument(skip(self, options), fields(lang = %options.lang))]
    pub async fn draft(&self, topic: &str, options: &GenerationOptions) -> Result<ArticleDraft> {
        let prompt = match options.style {
            ArticleStyle::Evergreen => prompts::combined_article(topic, &options.keywords),
            ArticleStyle::News => prompts::news_article(topic, &options.keywords),
        };
        let request = CompletionRequest::new(prompt)
            .with_temperature(options.temperature)
            .long_form();

        let draft: ArticleDraft = complete_json(self.llm.as_ref(), &request).await?;

        if draft.title.trim() == prompts::INVALID_TOPIC_TITLE {
            metrics::record_generation("invalid_topic", &options.lang);
            return Err(AppError::InvalidTopic {
                topic: topic.to_string(),
            });
        }

        if draft.resolved_slug().is_empty() || draft.content.trim().is_empty() {
            return Err(AppError::UnparseableResponse {
                message: "draft is missing a title or content".to_string(),
            });
        }

        Ok(draft)
    }

    /// Persist a draft unless `(slug, lang)` is already taken
    pub async fn store(
        &self,
        draft: ArticleDraft,
        options: &GenerationOptions,
    ) -> Result<GenerationOutcome> {
        let slug = draft.resolved_slug();

        if let Some(existing) = self.repo.find_by_slug_and_lang(&slug, &options.lang).await? {
            info!(slug = %slug, lang = %options.lang, "Article already exists");
            metrics::record_generation("existing", &options.lang);
            return Ok(GenerationOutcome::Existing(existing));
        }

        let new = NewArticle {
            slug: slug.clone(),
            lang: options.lang.clone(),
            title: draft.title.trim().to_string(),
            meta_description: draft.meta_description,
            content: draft.content,
            image_url: draft.image_url,
            is_published: true,
            is_breaking_news: options.breaking_news,
            author_name: draft.author_name,
            author_bio: draft.author_bio,
            original_article_id: None,
        };

        let category = draft
            .category
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let article = match self.repo.create_article_in_category(new, category).await {
            Ok(article) => article,
            Err(e) => {
                // Lost a race on the unique index
                if let Some(existing) = self.repo.find_by_slug_and_lang(&slug, &options.lang).await? {
                    metrics::record_generation("existing", &options.lang);
                    return Ok(GenerationOutcome::Existing(existing));
                }
                return Err(e);
            }
        };

        info!(id = article.id, slug = %article.slug, lang = %article.lang, "Article created");
        metrics::record_generation("created", &options.lang);
        Ok(GenerationOutcome::Created(article))
    }

    /// Draft and store in one step
    pub async fn generate(&self, topic: &str, options: &GenerationOptions) -> Result<GenerationOutcome> {
        let draft = self.draft(topic, options).await?;
        self.store(draft, options).await
    }
}
