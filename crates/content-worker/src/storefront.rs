//! Storefront client for publishing finished e-books (Gumroad API v2)

use crate::errors::{WorkerError, WorkerResult};
use pressforge_common::config::StorefrontConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub price_cents: u32,
    /// Public download URL of the uploaded file
    pub file_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    product: Option<Product>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub short_url: Option<String>,
}

pub struct Storefront {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl Storefront {
    /// `None` when no access token is configured
    pub fn from_config(config: &StorefrontConfig) -> WorkerResult<Option<Self>> {
        let Some(token) = config.access_token.clone().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Some(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: token,
        }))
    }

    pub async fn create_product(&self, product: &NewProduct<'_>) -> WorkerResult<Product> {
        let price = product.price_cents.to_string();
        let form = [
            ("access_token", self.access_token.as_str()),
            ("name", product.name),
            ("description", product.description),
            ("price", price.as_str()),
            ("url", product.file_url),
        ];

        let response = self
            .http
            .post(format!("{}/products", self.api_base))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let envelope: ProductEnvelope = response.json().await.map_err(|e| {
            WorkerError::Storefront(format!("unexpected response ({}): {}", status, e))
        })?;

        match envelope {
            ProductEnvelope { success: true, product: Some(product), .. } => Ok(product),
            ProductEnvelope { message, .. } => Err(WorkerError::Storefront(
                message.unwrap_or_else(|| format!("product creation failed with {}", status)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> StorefrontConfig {
        StorefrontConfig {
            access_token: Some("tok".into()),
            api_base: base.to_string(),
            price_cents: 499,
        }
    }

    fn product<'a>() -> NewProduct<'a> {
        NewProduct {
            name: "Bread Basics",
            description: "Your first loaf",
            price_cents: 499,
            file_url: "https://files/bread.epub",
        }
    }

    #[tokio::test]
    async fn test_create_product() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/products"))
            .and(body_string_contains("name=Bread+Basics"))
            .and(body_string_contains("price=499"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "product": {"id": "p1", "short_url": "https://shop/p1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Storefront::from_config(&config(&server.uri())).unwrap().unwrap();
        let created = store.create_product(&product()).await.unwrap();
        assert_eq!(created.id, "p1");
        assert_eq!(created.short_url.as_deref(), Some("https://shop/p1"));
    }

    #[tokio::test]
    async fn test_rejected_product() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "success": false,
                "message": "The access token is invalid"
            })))
            .mount(&server)
            .await;

        let store = Storefront::from_config(&config(&server.uri())).unwrap().unwrap();
        let err = store.create_product(&product()).await.unwrap_err();
        assert!(err.to_string().contains("access token is invalid"));
    }

    #[test]
    fn test_unconfigured() {
        let mut cfg = config("http://x");
        cfg.access_token = None;
        assert!(Storefront::from_config(&cfg).unwrap().is_none());
    }
}
