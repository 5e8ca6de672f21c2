//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::content::slugify;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, Statement,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

/// Fields of a row about to be inserted
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub slug: String,
    pub lang: String,
    pub title: String,
    pub meta_description: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_published: bool,
    pub is_breaking_news: bool,
    pub author_name: Option<String>,
    pub author_bio: Option<String>,
    pub original_article_id: Option<i32>,
}

/// One page of a listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }
}

/// Row offset of a 1-based page, `None` when it does not fit a SQL `OFFSET`
fn page_offset(page: u64, limit: u64) -> Option<u64> {
    page.saturating_sub(1)
        .checked_mul(limit)
        .filter(|offset| *offset <= i64::MAX as u64)
}

/// Listing row for the public API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub lang: String,
    pub image_url: Option<String>,
    pub meta_description: String,
}

impl From<Article> for ArticleSummary {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            slug: article.slug,
            title: article.title,
            lang: article.lang,
            image_url: article.image_url,
            meta_description: article.meta_description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationRef {
    pub lang: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

impl From<Category> for CategoryRef {
    fn from(category: Category) -> Self {
        Self {
            name: category.name,
            slug: category.slug,
        }
    }
}

/// Full article view with its translation siblings and categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetails {
    pub id: i32,
    pub slug: String,
    pub lang: String,
    pub title: String,
    pub meta_description: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_published: bool,
    pub is_breaking_news: bool,
    #[serde(rename = "authorName")]
    pub author_name: Option<String>,
    #[serde(rename = "authorBio")]
    pub author_bio: Option<String>,
    pub original_article_id: Option<i32>,
    pub translations: Vec<TranslationRef>,
    pub categories: Vec<CategoryRef>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Article Lookups
    // ========================================================================

    /// Find article by ID
    pub async fn find_article_by_id(&self, id: i32) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find article by the unique `(slug, lang)` pair
    pub async fn find_by_slug_and_lang(&self, slug: &str, lang: &str) -> Result<Option<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::Slug.eq(slug))
            .filter(ArticleColumn::Lang.eq(lang))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find article by slug; without a language the oldest row wins
    pub async fn find_by_slug(&self, slug: &str, lang: Option<&str>) -> Result<Option<Article>> {
        match lang {
            Some(lang) => self.find_by_slug_and_lang(slug, lang).await,
            None => ArticleEntity::find()
                .filter(ArticleColumn::Slug.eq(slug))
                .order_by_asc(ArticleColumn::Id)
                .one(self.conn())
                .await
                .map_err(Into::into),
        }
    }

    /// Find a published article by slug
    pub async fn find_published_by_slug(
        &self,
        slug: &str,
        lang: Option<&str>,
    ) -> Result<Option<Article>> {
        let mut query = ArticleEntity::find()
            .filter(ArticleColumn::Slug.eq(slug))
            .filter(ArticleColumn::IsPublished.eq(true));

        if let Some(lang) = lang {
            query = query.filter(ArticleColumn::Lang.eq(lang));
        }

        query
            .order_by_asc(ArticleColumn::Id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find the translation of `original_id` into `lang`
    pub async fn find_translation(&self, original_id: i32, lang: &str) -> Result<Option<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::OriginalArticleId.eq(original_id))
            .filter(ArticleColumn::Lang.eq(lang))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// All translations of a source article
    pub async fn list_translations(&self, original_id: i32) -> Result<Vec<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::OriginalArticleId.eq(original_id))
            .order_by_asc(ArticleColumn::Lang)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Whether any article title contains `fragment`
    pub async fn title_contains(&self, fragment: &str) -> Result<bool> {
        let found = ArticleEntity::find()
            .filter(ArticleColumn::Title.contains(fragment))
            .one(self.conn())
            .await?;

        Ok(found.is_some())
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Published articles, newest first, one page at a time
    pub async fn list_published(
        &self,
        page: u64,
        limit: u64,
        exclude_slug: Option<&str>,
        lang: Option<&str>,
    ) -> Result<Page<Article>> {
        let mut query = ArticleEntity::find().filter(ArticleColumn::IsPublished.eq(true));

        if let Some(slug) = exclude_slug {
            query = query.filter(ArticleColumn::Slug.ne(slug));
        }
        if let Some(lang) = lang {
            query = query.filter(ArticleColumn::Lang.eq(lang));
        }

        let Some(offset) = page_offset(page, limit) else {
            return Ok(Page::empty());
        };
        let mut items = query
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .offset(offset)
            .limit(limit.saturating_add(1))
            .all(self.conn())
            .await?;

        let has_more = items.len() as u64 > limit;
        items.truncate(limit as usize);

        Ok(Page { items, has_more })
    }

    /// Every published article, newest first
    pub async fn list_all_published(&self, lang: Option<&str>) -> Result<Vec<Article>> {
        let mut query = ArticleEntity::find().filter(ArticleColumn::IsPublished.eq(true));
        if let Some(lang) = lang {
            query = query.filter(ArticleColumn::Lang.eq(lang));
        }

        query
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Every article regardless of state (admin listing)
    pub async fn list_all_articles(&self) -> Result<Vec<Article>> {
        ArticleEntity::find()
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Published articles together with their categories
    pub async fn published_with_categories(&self) -> Result<Vec<(Article, Vec<Category>)>> {
        ArticleEntity::find()
            .filter(ArticleColumn::IsPublished.eq(true))
            .order_by_asc(ArticleColumn::Id)
            .find_with_related(CategoryEntity)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Full-text search over published articles
    pub async fn search_published(&self, query: &str, limit: u64) -> Result<Vec<Article>> {
        let conn = self.conn();

        if conn.get_database_backend() == DbBackend::Postgres {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"SELECT * FROM articles
                   WHERE is_published = TRUE
                     AND to_tsvector('simple', title || ' ' || content) @@ plainto_tsquery('simple', $1)
                   ORDER BY ts_rank(to_tsvector('simple', title || ' ' || content), plainto_tsquery('simple', $1)) DESC
                   LIMIT $2"#,
                [query.into(), (limit as i64).into()],
            );

            return ArticleEntity::find()
                .from_raw_sql(stmt)
                .all(conn)
                .await
                .map_err(Into::into);
        }

        ArticleEntity::find()
            .filter(ArticleColumn::IsPublished.eq(true))
            .filter(
                Condition::any()
                    .add(ArticleColumn::Title.contains(query))
                    .add(ArticleColumn::Content.contains(query)),
            )
            .order_by_desc(ArticleColumn::CreatedAt)
            .limit(limit)
            .all(conn)
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Article Writes
    // ========================================================================

    /// Insert a new article
    pub async fn create_article(&self, new: NewArticle) -> Result<Article> {
        insert_article(self.conn(), new).await
    }

    /// Insert a new article and link it to a category (created by name when
    /// missing) as one unit; nothing is kept when any step fails
    pub async fn create_article_in_category(
        &self,
        new: NewArticle,
        category: Option<&str>,
    ) -> Result<Article> {
        let txn = self.conn().begin().await?;

        let article = insert_article(&txn, new).await?;
        if let Some(name) = category {
            let category = find_or_insert_category(&txn, name).await?;
            link_category(&txn, article.id, category.id).await?;
        }

        txn.commit().await?;
        Ok(article)
    }

    /// Admin edit: replace content and optionally title and meta description
    pub async fn update_article(
        &self,
        article: Article,
        content: String,
        title: Option<String>,
        meta_description: Option<String>,
    ) -> Result<Article> {
        let mut active: ArticleActiveModel = article.into();
        active.content = Set(content);
        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(meta) = meta_description {
            active.meta_description = Set(meta);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(self.conn()).await.map_err(Into::into)
    }

    /// Replace the markdown body only if it still equals `expected`.
    ///
    /// Returns whether the row was changed; `false` means another writer got
    /// there first and the caller should re-read.
    pub async fn replace_content_if_unchanged(
        &self,
        id: i32,
        expected: &str,
        content: String,
    ) -> Result<bool> {
        let result = ArticleEntity::update_many()
            .col_expr(ArticleColumn::Content, Expr::value(content))
            .col_expr(ArticleColumn::UpdatedAt, Expr::value(now()))
            .filter(ArticleColumn::Id.eq(id))
            .filter(ArticleColumn::Content.eq(expected))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Set the hero image only while it is still null.
    ///
    /// Returns whether the row was changed.
    pub async fn set_hero_if_missing(&self, id: i32, url: &str) -> Result<bool> {
        let result = ArticleEntity::update_many()
            .col_expr(ArticleColumn::ImageUrl, Expr::value(url))
            .col_expr(ArticleColumn::UpdatedAt, Expr::value(now()))
            .filter(ArticleColumn::Id.eq(id))
            .filter(ArticleColumn::ImageUrl.is_null())
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Overwrite the hero image
    pub async fn replace_hero(&self, article: Article, url: String) -> Result<Article> {
        let mut active: ArticleActiveModel = article.into();
        active.image_url = Set(Some(url));
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(self.conn()).await.map_err(Into::into)
    }

    /// Flip `is_published`
    pub async fn toggle_published(&self, article: Article) -> Result<Article> {
        let published = article.is_published;
        let mut active: ArticleActiveModel = article.into();
        active.is_published = Set(!published);
        active.updated_at = Set(chrono::Utc::now().into());

        active.update(self.conn()).await.map_err(Into::into)
    }

    /// Delete an article and its category links.
    ///
    /// Translations that point at it are left in place.
    pub async fn delete_article(&self, id: i32) -> Result<bool> {
        let txn = self.conn().begin().await?;

        ArticleCategoryEntity::delete_many()
            .filter(ArticleCategoryColumn::ArticleId.eq(id))
            .exec(&txn)
            .await?;

        let result = ArticleEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Category Operations
    // ========================================================================

    /// All categories ordered by name
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        CategoryEntity::find()
            .order_by_asc(CategoryColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find category by slug
    pub async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        CategoryEntity::find()
            .filter(CategoryColumn::Slug.eq(slug))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find a category by name (or by its derived slug), creating it when absent
    pub async fn get_or_create_category(&self, name: &str) -> Result<Category> {
        find_or_insert_category(self.conn(), name).await
    }

    /// Link an article to a category; linking twice is a no-op
    pub async fn attach_category(&self, article_id: i32, category_id: i32) -> Result<()> {
        link_category(self.conn(), article_id, category_id).await
    }

    /// Categories of an article
    pub async fn categories_for_article(&self, article: &Article) -> Result<Vec<Category>> {
        article
            .find_related(CategoryEntity)
            .order_by_asc(CategoryColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Published articles of a category, newest first
    pub async fn list_published_in_category(
        &self,
        category_id: i32,
        page: u64,
        limit: u64,
    ) -> Result<Page<Article>> {
        let Some(offset) = page_offset(page, limit) else {
            return Ok(Page::empty());
        };

        let mut items = ArticleEntity::find()
            .join(
                sea_orm::JoinType::InnerJoin,
                article::Relation::ArticleCategories.def(),
            )
            .filter(ArticleCategoryColumn::CategoryId.eq(category_id))
            .filter(ArticleColumn::IsPublished.eq(true))
            .order_by_desc(ArticleColumn::CreatedAt)
            .order_by_desc(ArticleColumn::Id)
            .offset(offset)
            .limit(limit.saturating_add(1))
            .all(self.conn())
            .await?;

        let has_more = items.len() as u64 > limit;
        items.truncate(limit as usize);

        Ok(Page { items, has_more })
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Assemble the full article view: sibling translations and categories
    pub async fn article_details(&self, article: Article) -> Result<ArticleDetails> {
        let root_id = article.original_article_id.unwrap_or(article.id);

        let siblings = ArticleEntity::find()
            .filter(
                Condition::any()
                    .add(ArticleColumn::Id.eq(root_id))
                    .add(ArticleColumn::OriginalArticleId.eq(root_id)),
            )
            .filter(ArticleColumn::Id.ne(article.id))
            .order_by_asc(ArticleColumn::Lang)
            .all(self.conn())
            .await?;

        let categories = self.categories_for_article(&article).await?;

        Ok(ArticleDetails {
            id: article.id,
            slug: article.slug,
            lang: article.lang,
            title: article.title,
            meta_description: article.meta_description,
            content: article.content,
            image_url: article.image_url,
            is_published: article.is_published,
            is_breaking_news: article.is_breaking_news,
            author_name: article.author_name,
            author_bio: article.author_bio,
            original_article_id: article.original_article_id,
            translations: siblings
                .into_iter()
                .map(|a| TranslationRef {
                    lang: a.lang,
                    slug: a.slug,
                })
                .collect(),
            categories: categories.into_iter().map(CategoryRef::from).collect(),
            created_at: article.created_at,
            updated_at: article.updated_at,
        })
    }
}

fn now() -> DateTimeWithTimeZone {
    chrono::Utc::now().into()
}

async fn insert_article<C: ConnectionTrait>(db: &C, new: NewArticle) -> Result<Article> {
    let now: DateTimeWithTimeZone = chrono::Utc::now().into();

    let article = ArticleActiveModel {
        slug: Set(new.slug),
        lang: Set(new.lang),
        title: Set(new.title),
        meta_description: Set(new.meta_description),
        content: Set(new.content),
        image_url: Set(new.image_url),
        is_published: Set(new.is_published),
        is_breaking_news: Set(new.is_breaking_news),
        author_name: Set(new.author_name),
        author_bio: Set(new.author_bio),
        original_article_id: Set(new.original_article_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    article.insert(db).await.map_err(Into::into)
}

async fn find_or_insert_category<C: ConnectionTrait>(db: &C, name: &str) -> Result<Category> {
    let name = name.trim();
    let slug = slugify(name);

    let existing = CategoryEntity::find()
        .filter(
            Condition::any()
                .add(CategoryColumn::Name.eq(name))
                .add(CategoryColumn::Slug.eq(slug.as_str())),
        )
        .one(db)
        .await?;

    if let Some(category) = existing {
        return Ok(category);
    }

    CategoryActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn link_category<C: ConnectionTrait>(db: &C, article_id: i32, category_id: i32) -> Result<()> {
    let existing = ArticleCategoryEntity::find_by_id((article_id, category_id))
        .one(db)
        .await?;

    if existing.is_none() {
        ArticleCategoryActiveModel {
            article_id: Set(article_id),
            category_id: Set(category_id),
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(slug: &str, lang: &str) -> NewArticle {
        NewArticle {
            slug: slug.to_string(),
            lang: lang.to_string(),
            title: format!("Title of {}", slug),
            meta_description: "meta".to_string(),
            content: "Body".to_string(),
            image_url: None,
            is_published: true,
            is_breaking_news: false,
            author_name: Some("Ada".to_string()),
            author_bio: None,
            original_article_id: None,
        }
    }

    async fn repo() -> Repository {
        Repository::new(DbPool::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_create_and_find_by_slug_and_lang() {
        let repo = repo().await;
        let created = repo.create_article(sample("rust-news", "en")).await.unwrap();

        let found = repo.find_by_slug_and_lang("rust-news", "en").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(created.id));
        assert!(repo.find_by_slug_and_lang("rust-news", "fr").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slug_lang_unique_index() {
        let repo = repo().await;
        repo.create_article(sample("same", "en")).await.unwrap();
        repo.create_article(sample("same", "fr")).await.unwrap();

        let dup = repo.create_article(sample("same", "en")).await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_hero_is_set_only_once() {
        let repo = repo().await;
        let article = repo.create_article(sample("hero", "en")).await.unwrap();

        assert!(repo.set_hero_if_missing(article.id, "https://img/1.png").await.unwrap());
        assert!(!repo.set_hero_if_missing(article.id, "https://img/2.png").await.unwrap());

        let reloaded = repo.find_article_by_id(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded.image_url.as_deref(), Some("https://img/1.png"));
    }

    #[tokio::test]
    async fn test_delete_keeps_translations() {
        let repo = repo().await;
        let source = repo.create_article(sample("origin", "en")).await.unwrap();
        let mut fr = sample("origine", "fr");
        fr.original_article_id = Some(source.id);
        let translation = repo.create_article(fr).await.unwrap();

        let category = repo.get_or_create_category("Science").await.unwrap();
        repo.attach_category(source.id, category.id).await.unwrap();

        assert!(repo.delete_article(source.id).await.unwrap());
        assert!(repo.find_article_by_id(source.id).await.unwrap().is_none());

        let links = ArticleCategoryEntity::find()
            .filter(ArticleCategoryColumn::ArticleId.eq(source.id))
            .all(repo.conn())
            .await
            .unwrap();
        assert!(links.is_empty());

        let orphan = repo.find_article_by_id(translation.id).await.unwrap().unwrap();
        assert_eq!(orphan.original_article_id, Some(source.id));
    }

    #[tokio::test]
    async fn test_pagination_has_more() {
        let repo = repo().await;
        for i in 0..3 {
            repo.create_article(sample(&format!("post-{}", i), "en")).await.unwrap();
        }

        let first = repo.list_published(1, 2, None, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more);

        let second = repo.list_published(2, 2, None, None).await.unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(!second.has_more);

        let excluded = repo.list_published(1, 10, Some("post-0"), None).await.unwrap();
        assert!(excluded.items.iter().all(|a| a.slug != "post-0"));
    }

    #[tokio::test]
    async fn test_page_past_any_offset_is_empty() {
        let repo = repo().await;
        repo.create_article(sample("only", "en")).await.unwrap();

        let page = repo.list_published(u64::MAX, 100, None, None).await.unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);

        let far = repo.list_published(u64::MAX / 1000, 100, None, None).await.unwrap();
        assert!(far.items.is_empty());

        let category = repo.get_or_create_category("Science").await.unwrap();
        let in_category = repo
            .list_published_in_category(category.id, u64::MAX, 100)
            .await
            .unwrap();
        assert!(in_category.items.is_empty());
    }

    #[tokio::test]
    async fn test_content_swap_needs_the_expected_body() {
        let repo = repo().await;
        let article = repo.create_article(sample("swap", "en")).await.unwrap();

        assert!(!repo
            .replace_content_if_unchanged(article.id, "stale", "lost".into())
            .await
            .unwrap());
        assert!(repo
            .replace_content_if_unchanged(article.id, "Body", "New body".into())
            .await
            .unwrap());

        let reloaded = repo.find_article_by_id(article.id).await.unwrap().unwrap();
        assert_eq!(reloaded.content, "New body");
    }

    #[tokio::test]
    async fn test_article_and_category_are_stored_together() {
        let repo = repo().await;
        let article = repo
            .create_article_in_category(sample("linked", "en"), Some("Science"))
            .await
            .unwrap();
        let categories = repo.categories_for_article(&article).await.unwrap();
        assert_eq!(categories[0].name, "Science");

        repo.conn()
            .execute_unprepared("DROP TABLE article_categories")
            .await
            .unwrap();
        let err = repo
            .create_article_in_category(sample("unlinked", "en"), Some("Science"))
            .await;
        assert!(err.is_err());
        assert!(repo.find_by_slug_and_lang("unlinked", "en").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_category_get_or_create_and_listing() {
        let repo = repo().await;
        let a = repo.get_or_create_category("Space Tech").await.unwrap();
        let b = repo.get_or_create_category("Space Tech").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.slug, "space-tech");

        let article = repo.create_article(sample("orbit", "en")).await.unwrap();
        repo.attach_category(article.id, a.id).await.unwrap();
        repo.attach_category(article.id, a.id).await.unwrap();

        let page = repo.list_published_in_category(a.id, 1, 10).await.unwrap();
        assert_eq!(page.items.len(), 1);

        let details = repo.article_details(article).await.unwrap();
        assert_eq!(
            details.categories,
            vec![CategoryRef {
                name: "Space Tech".into(),
                slug: "space-tech".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_details_list_sibling_translations() {
        let repo = repo().await;
        let source = repo.create_article(sample("hello", "en")).await.unwrap();
        for (slug, lang) in [("bonjour", "fr"), ("hallo", "de")] {
            let mut t = sample(slug, lang);
            t.original_article_id = Some(source.id);
            repo.create_article(t).await.unwrap();
        }

        let fr = repo.find_by_slug_and_lang("bonjour", "fr").await.unwrap().unwrap();
        let details = repo.article_details(fr).await.unwrap();
        let langs: Vec<_> = details.translations.iter().map(|t| t.lang.as_str()).collect();
        assert_eq!(langs, vec!["de", "en"]);

        let json = serde_json::to_value(&details).unwrap();
        assert!(json.get("authorName").is_some());
    }

    #[tokio::test]
    async fn test_search_falls_back_to_like() {
        let repo = repo().await;
        let mut a = sample("quantum", "en");
        a.content = "Qubits and entanglement".into();
        repo.create_article(a).await.unwrap();
        repo.create_article(sample("other", "en")).await.unwrap();

        let hits = repo.search_published("entanglement", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "quantum");
    }

    #[tokio::test]
    async fn test_title_contains() {
        let repo = repo().await;
        repo.create_article(sample("mars", "en")).await.unwrap();
        assert!(repo.title_contains("Title of ma").await.unwrap());
        assert!(!repo.title_contains("Venus").await.unwrap());
    }
}
