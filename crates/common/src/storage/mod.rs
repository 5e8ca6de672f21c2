//! Object storage for generated images and e-books
//!
//! The Firebase backend talks to the Cloud Storage JSON API of the project's
//! bucket; uploaded objects are made publicly readable.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

mod credentials;

pub use credentials::{Credentials, ServiceAccountKey, ServiceAccountTokens, STORAGE_SCOPE};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `name` and return its public URL
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Public URLs of every object whose name starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

// ============================================================================
// Firebase / Cloud Storage
// ============================================================================

pub struct FirebaseStorage {
    client: reqwest::Client,
    bucket: String,
    credentials: Credentials,
    api_base: String,
    public_base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ObjectItem {
    name: String,
}

impl FirebaseStorage {
    pub fn new(config: &StorageConfig, bucket: String, credentials: Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            bucket,
            credentials,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, name)
    }
}

#[async_trait]
impl ObjectStorage for FirebaseStorage {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.api_base, self.bucket);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.credentials.bearer().await?)
            .query(&[
                ("uploadType", "media"),
                ("name", name),
                ("predefinedAcl", "publicRead"),
            ])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::upstream("storage", format!("Upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                "storage",
                format!("Upload of {} failed {}: {}", name, status, body),
            ));
        }

        debug!(object = name, "Object uploaded");
        Ok(self.public_url(name))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let url = format!("{}/storage/v1/b/{}/o", self.api_base, self.bucket);
        let mut urls = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(self.credentials.bearer().await?)
                .query(&[("prefix", prefix)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ObjectList = request
                .send()
                .await
                .map_err(|e| AppError::upstream("storage", format!("List failed: {}", e)))?
                .error_for_status()?
                .json()
                .await?;

            urls.extend(
                page.items
                    .into_iter()
                    .filter(|item| item.name != prefix)
                    .map(|item| self.public_url(&item.name)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(urls)
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Storage kept in process memory, for tests and offline runs
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<BTreeMap<String, (Vec<u8>, String)>>,
    fail_uploads: bool,
}

pub const MEMORY_BASE_URL: &str = "memory://pressforge";

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects every upload but still lists
    pub fn rejecting_uploads() -> Self {
        Self {
            objects: Mutex::default(),
            fail_uploads: true,
        }
    }

    /// Seed an object without going through `upload`
    pub fn insert(&self, name: &str, bytes: Vec<u8>, content_type: &str) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(name.to_string(), (bytes, content_type.to_string()));
        }
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn url_for(name: &str) -> String {
        format!("{}/{}", MEMORY_BASE_URL, name)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        if self.fail_uploads {
            return Err(AppError::upstream("storage", format!("Upload of {} rejected", name)));
        }
        self.insert(name, bytes, content_type);
        Ok(Self::url_for(name))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.lock().map_err(|_| AppError::Internal {
            message: "storage lock poisoned".to_string(),
        })?;

        Ok(objects
            .keys()
            .filter(|name| name.starts_with(prefix) && name.as_str() != prefix)
            .map(|name| Self::url_for(name))
            .collect())
    }
}

/// Create object storage based on configuration
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ObjectStorage>> {
    match config.provider.as_str() {
        "firebase" | "gcs" => {
            let bucket = config.bucket.clone().ok_or_else(|| AppError::Configuration {
                message: "storage.bucket is required".to_string(),
            })?;
            let credentials = match (&config.credentials_path, &config.access_token) {
                (Some(path), _) => Credentials::ServiceAccount(ServiceAccountTokens::new(
                    ServiceAccountKey::from_file(path)?,
                )?),
                (None, Some(token)) => Credentials::Static(token.clone()),
                (None, None) => {
                    return Err(AppError::Configuration {
                        message: "storage.credentials_path or storage.access_token is required"
                            .to_string(),
                    })
                }
            };
            Ok(Arc::new(FirebaseStorage::new(config, bucket, credentials)?))
        }
        "memory" => Ok(Arc::new(InMemoryStorage::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown storage provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::credentials::tests::{key_for, mount_token};
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn firebase(server: &MockServer) -> FirebaseStorage {
        let config = StorageConfig {
            api_base: server.uri(),
            public_base_url: "https://cdn.example".to_string(),
            ..StorageConfig::default()
        };
        FirebaseStorage::new(&config, "bucket-1".into(), Credentials::Static("tok".into())).unwrap()
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/bucket-1/o"))
            .and(query_param("name", "images/post-1.png"))
            .and(query_param("predefinedAcl", "publicRead"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "images/post-1.png"})))
            .mount(&server)
            .await;

        let url = firebase(&server)
            .upload("images/post-1.png", vec![1, 2], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/bucket-1/images/post-1.png");
    }

    #[tokio::test]
    async fn test_list_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/bucket-1/o"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"name": "images/b.png"}]
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/bucket-1/o"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"name": "images/"}, {"name": "images/a.png"}],
                "nextPageToken": "p2"
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let urls = firebase(&server).list("images/").await.unwrap();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/bucket-1/images/a.png".to_string(),
                "https://cdn.example/bucket-1/images/b.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_service_account_token_authorizes_every_request() {
        let server = MockServer::start().await;
        mount_token(&server, "ya29.first", 3600, 1).await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/bucket-1/o"))
            .and(header("authorization", "Bearer ya29.first"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "x"})))
            .expect(2)
            .mount(&server)
            .await;

        let config = StorageConfig {
            api_base: server.uri(),
            public_base_url: "https://cdn.example".to_string(),
            ..StorageConfig::default()
        };
        let tokens = ServiceAccountTokens::new(key_for(&server)).unwrap();
        let storage =
            FirebaseStorage::new(&config, "bucket-1".into(), Credentials::ServiceAccount(tokens)).unwrap();

        storage.upload("images/a.png", vec![1], "image/png").await.unwrap();
        storage.upload("images/b.png", vec![2], "image/png").await.unwrap();
    }

    #[test]
    fn test_firebase_needs_credentials() {
        let config = StorageConfig {
            provider: "firebase".to_string(),
            bucket: Some("bucket-1".to_string()),
            credentials_path: None,
            access_token: None,
            ..StorageConfig::default()
        };
        let err = create_storage(&config).err().unwrap();
        assert!(err.to_string().contains("credentials_path"));

        let config = StorageConfig {
            credentials_path: Some("/nonexistent/key.json".to_string()),
            ..config
        };
        assert!(matches!(
            create_storage(&config).err().unwrap(),
            AppError::Configuration { .. }
        ));
    }

    #[tokio::test]
    async fn test_in_memory_storage() {
        let storage = InMemoryStorage::new();
        storage.upload("images/x.png", vec![1], "image/png").await.unwrap();
        storage.insert("ebooks/y.epub", vec![2], "application/epub+zip");

        let images = storage.list("images/").await.unwrap();
        assert_eq!(images, vec![InMemoryStorage::url_for("images/x.png")]);

        let rejecting = InMemoryStorage::rejecting_uploads();
        assert!(rejecting.upload("images/z.png", vec![], "image/png").await.is_err());
    }
}
