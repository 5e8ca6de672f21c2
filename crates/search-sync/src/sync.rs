//! Published articles -> search index records

use pressforge_common::{
    db::Repository,
    errors::Result,
    metrics,
    search_index::{SearchIndex, SearchRecord},
};
use tracing::info;

/// Push every published article; returns how many records were sent
pub async fn sync_published(repo: &Repository, index: &dyn SearchIndex) -> Result<usize> {
    let records: Vec<SearchRecord> = repo
        .published_with_categories()
        .await?
        .into_iter()
        .map(|(article, categories)| SearchRecord::from_article(article, categories))
        .collect();

    if records.is_empty() {
        info!("No published articles, nothing to sync");
        return Ok(0);
    }

    info!(count = records.len(), "Syncing articles to search index");
    let sent = index.save_records(&records).await?;
    metrics::record_search_sync(sent);

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressforge_common::db::{DbPool, NewArticle};
    use pressforge_common::search_index::InMemorySearchIndex;

    fn article(slug: &str, published: bool) -> NewArticle {
        NewArticle {
            slug: slug.to_string(),
            lang: "en".to_string(),
            title: slug.to_uppercase(),
            meta_description: "m".to_string(),
            content: "c".to_string(),
            image_url: None,
            is_published: published,
            is_breaking_news: false,
            author_name: Some("Ana".to_string()),
            author_bio: None,
            original_article_id: None,
        }
    }

    #[tokio::test]
    async fn test_only_published_articles_are_sent() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let live = repo.create_article(article("live", true)).await.unwrap();
        repo.create_article(article("draft", false)).await.unwrap();
        let category = repo.get_or_create_category("Travel").await.unwrap();
        repo.attach_category(live.id, category.id).await.unwrap();

        let index = InMemorySearchIndex::new();
        let sent = sync_published(&repo, &index).await.unwrap();
        assert_eq!(sent, 1);

        let records = index.records();
        assert_eq!(records[0].object_id, live.id.to_string());
        assert_eq!(records[0].categories, vec!["Travel"]);
        assert_eq!(records[0].author_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_empty_store_is_a_no_op() {
        let repo = Repository::new(DbPool::in_memory().await.unwrap());
        let index = InMemorySearchIndex::new();

        tokio_test::assert_ok!(sync_published(&repo, &index).await);
        assert!(index.records().is_empty());
    }
}
