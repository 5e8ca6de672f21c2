//! External search index (Algolia)

use crate::config::SearchIndexConfig;
use crate::db::models::{Article, Category};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Largest batch sent in one request
pub const BATCH_SIZE: usize = 1000;

/// Searchable projection of a published article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub title: String,
    pub slug: String,
    pub lang: String,
    pub meta_description: String,
    #[serde(rename = "authorName")]
    pub author_name: Option<String>,
    pub image_url: Option<String>,
    pub categories: Vec<String>,
}

impl SearchRecord {
    pub fn from_article(article: Article, categories: Vec<Category>) -> Self {
        Self {
            object_id: article.id.to_string(),
            title: article.title,
            slug: article.slug,
            lang: article.lang,
            meta_description: article.meta_description,
            author_name: article.author_name,
            image_url: article.image_url,
            categories: categories.into_iter().map(|c| c.name).collect(),
        }
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or replace records; returns how many were sent
    async fn save_records(&self, records: &[SearchRecord]) -> Result<usize>;
}

// ============================================================================
// Algolia
// ============================================================================

pub struct AlgoliaIndex {
    client: reqwest::Client,
    app_id: String,
    api_key: String,
    url: String,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<BatchOperation<'a>>,
}

#[derive(Serialize)]
struct BatchOperation<'a> {
    action: &'static str,
    body: &'a SearchRecord,
}

impl AlgoliaIndex {
    pub fn new(config: &SearchIndexConfig, app_id: String, api_key: String) -> Result<Self> {
        let base = config
            .api_base
            .clone()
            .unwrap_or_else(|| format!("https://{}.algolia.net", app_id));

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()?,
            url: format!(
                "{}/1/indexes/{}/batch",
                base.trim_end_matches('/'),
                config.index_name
            ),
            app_id,
            api_key,
        })
    }
}

#[async_trait]
impl SearchIndex for AlgoliaIndex {
    async fn save_records(&self, records: &[SearchRecord]) -> Result<usize> {
        for (batch_no, chunk) in records.chunks(BATCH_SIZE).enumerate() {
            let body = BatchRequest {
                requests: chunk
                    .iter()
                    .map(|record| BatchOperation {
                        action: "updateObject",
                        body: record,
                    })
                    .collect(),
            };

            let response = self
                .client
                .post(&self.url)
                .header("X-Algolia-Application-Id", &self.app_id)
                .header("X-Algolia-API-Key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| AppError::upstream("algolia", format!("Request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::upstream(
                    "algolia",
                    format!("Batch {} failed {}: {}", batch_no, status, body),
                ));
            }

            info!(batch = batch_no, records = chunk.len(), "Batch pushed to search index");
        }

        Ok(records.len())
    }
}

/// Keeps records in memory, for tests and dry runs
#[derive(Default)]
pub struct InMemorySearchIndex {
    records: Mutex<Vec<SearchRecord>>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SearchRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn save_records(&self, records: &[SearchRecord]) -> Result<usize> {
        let mut stored = self.records.lock().map_err(|_| AppError::Internal {
            message: "search index lock poisoned".to_string(),
        })?;

        for record in records {
            stored.retain(|r| r.object_id != record.object_id);
            stored.push(record.clone());
        }
        Ok(records.len())
    }
}

/// Create the search index client; both credentials are required
pub fn create_search_index(config: &SearchIndexConfig) -> Result<Arc<dyn SearchIndex>> {
    match (&config.app_id, &config.api_key) {
        (Some(app_id), Some(api_key)) => Ok(Arc::new(AlgoliaIndex::new(
            config,
            app_id.clone(),
            api_key.clone(),
        )?)),
        _ => Err(AppError::Configuration {
            message: "search_index.app_id and search_index.api_key are required".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(id: i32) -> SearchRecord {
        SearchRecord {
            object_id: id.to_string(),
            title: format!("T{}", id),
            slug: format!("t-{}", id),
            lang: "en".into(),
            meta_description: String::new(),
            author_name: None,
            image_url: None,
            categories: vec!["Tech".into()],
        }
    }

    #[tokio::test]
    async fn test_algolia_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/indexes/articles/batch"))
            .and(header("X-Algolia-Application-Id", "APP"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"taskID": 1})))
            .expect(2)
            .mount(&server)
            .await;

        let config = SearchIndexConfig {
            api_base: Some(server.uri()),
            ..SearchIndexConfig::default()
        };
        let index = AlgoliaIndex::new(&config, "APP".into(), "KEY".into()).unwrap();

        let records: Vec<_> = (0..(BATCH_SIZE as i32 + 1)).map(record).collect();
        assert_eq!(index.save_records(&records).await.unwrap(), BATCH_SIZE + 1);
    }

    #[test]
    fn test_record_serialization() {
        let json = serde_json::to_value(record(7)).unwrap();
        assert_eq!(json["objectID"], "7");
        assert!(json.get("authorName").is_some());
    }

    #[tokio::test]
    async fn test_in_memory_index_replaces_by_id() {
        let index = InMemorySearchIndex::new();
        index.save_records(&[record(1), record(2)]).await.unwrap();
        let mut updated = record(1);
        updated.title = "New".into();
        index.save_records(&[updated]).await.unwrap();

        let records = index.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r.title == "New"));
    }
}
