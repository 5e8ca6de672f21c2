//! Placeholder resolution: prompt -> image -> storage -> article content

use crate::content::Content;
use crate::db::models::Article;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::images::ImageGenerator;
use crate::metrics;
use crate::storage::ObjectStorage;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Object name prefix for article images
pub const IMAGE_PREFIX: &str = "images/";

/// Re-reads allowed when another writer changes the content mid-resolution
const CONTENT_WRITE_ATTEMPTS: usize = 5;

/// Outcome of resolving a draft's placeholders before it is stored
#[derive(Debug, Clone)]
pub struct ResolvedContent {
    pub content: String,
    /// First image URL, used as hero
    pub hero: Option<String>,
    pub resolved: usize,
}

#[derive(Clone)]
pub struct ImageResolver {
    images: Arc<dyn ImageGenerator>,
    storage: Arc<dyn ObjectStorage>,
    repo: Repository,
    delay: Duration,
}

impl ImageResolver {
    pub fn new(
        images: Arc<dyn ImageGenerator>,
        storage: Arc<dyn ObjectStorage>,
        repo: Repository,
    ) -> Self {
        Self {
            images,
            storage,
            repo,
            delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive images in [`resolve_all`](Self::resolve_all)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Generate and upload under `images/{stem}.{ext}`, or fall back to a
    /// random previously uploaded image.
    async fn obtain_image(&self, prompt: &str, stem: &str) -> Result<String> {
        match self.generate_and_upload(prompt, stem).await {
            Ok(url) => {
                metrics::record_image_resolution("generated");
                Ok(url)
            }
            Err(e) => {
                warn!(prompt, error = %e, "Image generation failed, using a fallback image");
                match self.random_existing_image().await {
                    Some(url) => {
                        metrics::record_image_resolution("fallback");
                        Ok(url)
                    }
                    None => {
                        metrics::record_image_failure();
                        Err(AppError::ImageUnavailable {
                            prompt: prompt.to_string(),
                        })
                    }
                }
            }
        }
    }

    async fn generate_and_upload(&self, prompt: &str, stem: &str) -> Result<String> {
        let image = self.images.generate(prompt).await?;
        let name = format!("{}{}.{}", IMAGE_PREFIX, stem, image.extension());
        self.storage
            .upload(&name, image.bytes, &image.content_type)
            .await
    }

    async fn random_existing_image(&self) -> Option<String> {
        match self.storage.list(IMAGE_PREFIX).await {
            Ok(urls) => urls.choose(&mut rand::thread_rng()).cloned(),
            Err(e) => {
                warn!(error = %e, "Listing fallback images failed");
                None
            }
        }
    }

    /// Resolve the placeholder at `slot` of a stored article.
    ///
    /// Returns the image URL. The hero image is only set when still empty.
    pub async fn resolve_placeholder(
        &self,
        slug: &str,
        lang: Option<&str>,
        slot: usize,
        prompt: &str,
    ) -> Result<String> {
        let article = self
            .repo
            .find_by_slug(slug, lang)
            .await?
            .ok_or_else(|| AppError::ArticleNotFound {
                key: slug.to_string(),
            })?;

        let url = self
            .obtain_image(prompt, &format!("{}-{}", article.slug, slot + 1))
            .await?;

        match self.write_resolution(article.id, slot, prompt, &url).await? {
            Some(resolved) => info!(slug, slot = resolved, "Placeholder resolved"),
            None => warn!(slug, slot, prompt, "No matching placeholder left in article"),
        }

        if self.repo.set_hero_if_missing(article.id, &url).await? {
            info!(slug, url = %url, "Hero image set");
        }

        Ok(url)
    }

    /// Apply one resolution to the latest stored content.
    ///
    /// Image generation takes long enough for other resolutions of the same
    /// article to land in between, so the body is re-read and swapped only
    /// while unchanged.
    async fn write_resolution(
        &self,
        id: i32,
        slot: usize,
        prompt: &str,
        url: &str,
    ) -> Result<Option<usize>> {
        for attempt in 1..=CONTENT_WRITE_ATTEMPTS {
            let current = self
                .repo
                .find_article_by_id(id)
                .await?
                .ok_or_else(|| AppError::ArticleNotFound { key: id.to_string() })?;

            let mut content = Content::parse(&current.content);
            let Some(resolved) = content.resolve(slot, prompt, url) else {
                return Ok(None);
            };

            if self
                .repo
                .replace_content_if_unchanged(id, &current.content, content.render())
                .await?
            {
                return Ok(Some(resolved));
            }
            debug!(id, attempt, "Content changed underneath, re-reading");
        }

        Err(AppError::Internal {
            message: format!("article {} kept changing while resolving a placeholder", id),
        })
    }

    /// Resolve every placeholder of a draft before it is stored.
    ///
    /// Placeholders without any available image stay in place.
    pub async fn resolve_all(&self, slug: &str, markdown: &str) -> Result<ResolvedContent> {
        let mut content = Content::parse(markdown);
        let placeholders = content.placeholders();
        let stamp = chrono::Utc::now().timestamp_millis();

        let mut hero = None;
        let mut resolved = 0;

        for (n, placeholder) in placeholders.iter().enumerate() {
            if n > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let stem = format!("{}-{}-{}", slug, stamp, placeholder.slot + 1);
            match self.obtain_image(&placeholder.prompt, &stem).await {
                Ok(url) => {
                    if content.resolve(placeholder.slot, &placeholder.prompt, &url).is_some() {
                        resolved += 1;
                        hero.get_or_insert(url);
                    }
                }
                Err(e) => warn!(slug, slot = placeholder.slot, error = %e, "Leaving placeholder unresolved"),
            }
        }

        Ok(ResolvedContent {
            content: content.render(),
            hero,
            resolved,
        })
    }

    /// Replace the hero image of an article with a freshly generated one
    pub async fn regenerate_hero(&self, article_id: i32, prompt: Option<&str>) -> Result<Article> {
        let article = self
            .repo
            .find_article_by_id(article_id)
            .await?
            .ok_or_else(|| AppError::ArticleNotFound {
                key: article_id.to_string(),
            })?;

        let prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&article.title)
            .to_string();

        let stem = format!("{}-{}", article.slug, chrono::Utc::now().timestamp_millis());
        let url = self.generate_and_upload(&prompt, &stem).await?;
        metrics::record_image_resolution("generated");

        info!(id = article.id, url = %url, "Hero image regenerated");
        self.repo.replace_hero(article, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DbPool, NewArticle};
    use crate::images::MockImageGenerator;
    use crate::storage::InMemoryStorage;

    struct Fixture {
        resolver: ImageResolver,
        repo: Repository,
        storage: Arc<InMemoryStorage>,
    }

    async fn fixture(images: MockImageGenerator, storage: InMemoryStorage) -> Fixture {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let storage = Arc::new(storage);
        let resolver = ImageResolver::new(Arc::new(images), storage.clone(), repo.clone());
        Fixture { resolver, repo, storage }
    }

    async fn article(repo: &Repository, content: &str, image_url: Option<&str>) -> Article {
        repo.create_article(NewArticle {
            slug: "bikes".into(),
            lang: "en".into(),
            title: "Bikes".into(),
            meta_description: "m".into(),
            content: content.into(),
            image_url: image_url.map(String::from),
            is_published: true,
            is_breaking_news: false,
            author_name: None,
            author_bio: None,
            original_article_id: None,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_replaces_only_the_placeholder() {
        let f = fixture(MockImageGenerator::new(), InMemoryStorage::new()).await;
        let original = "Intro text.\n\n[IMAGE: \"a red bicycle\"]\n\n## More\n[IMAGE: a road]";
        let stored = article(&f.repo, original, None).await;

        let url = f
            .resolver
            .resolve_placeholder("bikes", None, 0, "\"a red bicycle\"")
            .await
            .unwrap();
        assert_eq!(url, InMemoryStorage::url_for("images/bikes-1.png"));

        let updated = f.repo.find_article_by_id(stored.id).await.unwrap().unwrap();
        let expected = original.replace(
            "[IMAGE: \"a red bicycle\"]",
            &format!("![a red bicycle]({})", url),
        );
        assert_eq!(updated.content, expected);
        assert_eq!(updated.image_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_concurrent_resolutions_both_land() {
        let images = MockImageGenerator::new().with_delay(Duration::from_millis(200));
        let f = fixture(images, InMemoryStorage::new()).await;
        let stored = article(&f.repo, "A [IMAGE: one] B [IMAGE: two] C", None).await;

        let (first, second) = tokio::join!(
            f.resolver.resolve_placeholder("bikes", None, 0, "one"),
            f.resolver.resolve_placeholder("bikes", None, 1, "two"),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        let updated = f.repo.find_article_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(
            updated.content,
            format!("A ![one]({}) B ![two]({}) C", first, second)
        );
        assert!(updated
            .image_url
            .as_deref()
            .is_some_and(|hero| hero == first || hero == second));
    }

    #[tokio::test]
    async fn test_slot_already_resolved_falls_back_to_prompt() {
        let f = fixture(MockImageGenerator::new(), InMemoryStorage::new()).await;
        let stored = article(
            &f.repo,
            "![done](https://img/done.png)\n[IMAGE: b]\n[IMAGE: a]\n",
            Some("https://img/done.png"),
        )
        .await;

        let url = f.resolver.resolve_placeholder("bikes", None, 0, "a").await.unwrap();

        let updated = f.repo.find_article_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(
            updated.content,
            format!("![done](https://img/done.png)\n[IMAGE: b]\n![a]({})\n", url)
        );
        assert_eq!(updated.image_url.as_deref(), Some("https://img/done.png"));
    }

    #[tokio::test]
    async fn test_existing_hero_is_kept() {
        let f = fixture(MockImageGenerator::new(), InMemoryStorage::new()).await;
        let stored = article(&f.repo, "[IMAGE: a]", Some("https://hero/original.png")).await;

        f.resolver.resolve_placeholder("bikes", Some("en"), 0, "a").await.unwrap();

        let updated = f.repo.find_article_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(updated.image_url.as_deref(), Some("https://hero/original.png"));
        assert!(!updated.content.contains("[IMAGE:"));
    }

    #[tokio::test]
    async fn test_unknown_slug_is_not_found() {
        let f = fixture(MockImageGenerator::new(), InMemoryStorage::new()).await;
        let err = f.resolver.resolve_placeholder("nope", None, 0, "a").await.unwrap_err();
        assert!(matches!(err, AppError::ArticleNotFound { .. }));
    }

    #[tokio::test]
    async fn test_fallback_to_existing_image() {
        let storage = InMemoryStorage::new();
        storage.insert("images/old.png", vec![1], "image/png");
        let f = fixture(MockImageGenerator::failing(), storage).await;
        article(&f.repo, "[IMAGE: a]", None).await;

        let url = f.resolver.resolve_placeholder("bikes", None, 0, "a").await.unwrap();
        assert_eq!(url, InMemoryStorage::url_for("images/old.png"));
    }

    #[tokio::test]
    async fn test_no_image_available() {
        let f = fixture(MockImageGenerator::failing(), InMemoryStorage::new()).await;
        let stored = article(&f.repo, "[IMAGE: a]", None).await;

        let err = f.resolver.resolve_placeholder("bikes", None, 0, "a").await.unwrap_err();
        assert!(matches!(err, AppError::ImageUnavailable { .. }));

        let unchanged = f.repo.find_article_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(unchanged.content, "[IMAGE: a]");
    }

    #[tokio::test]
    async fn test_resolve_all_sets_hero_from_first_image() {
        let f = fixture(MockImageGenerator::new(), InMemoryStorage::new()).await;
        let out = f
            .resolver
            .resolve_all("draft", "A [IMAGE: one] B [IMAGE: two] C")
            .await
            .unwrap();

        assert_eq!(out.resolved, 2);
        assert!(!out.content.contains("[IMAGE:"));
        assert!(out.hero.as_deref().is_some_and(|h| out.content.contains(h)));
        assert_eq!(f.storage.object_names().len(), 2);
    }

    #[tokio::test]
    async fn test_regenerate_hero_overwrites() {
        let f = fixture(MockImageGenerator::new(), InMemoryStorage::new()).await;
        let stored = article(&f.repo, "text", Some("https://hero/old.png")).await;

        let updated = f.resolver.regenerate_hero(stored.id, Some("sunset")).await.unwrap();
        let url = updated.image_url.unwrap();
        assert!(url.starts_with(&InMemoryStorage::url_for("images/bikes-")));
        assert_ne!(url, "https://hero/old.png");
    }
}
