//! Admin authentication
//!
//! Admin routes carry the shared secret in `x-admin-secret-key`. Only a
//! SHA-256 digest of the configured secret is kept in memory; an unset
//! secret rejects every request.

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sha2::{Digest, Sha256};

/// Header carrying the admin secret
pub const ADMIN_HEADER: &str = "x-admin-secret-key";

/// Digest of the configured admin secret
#[derive(Debug, Clone, Default)]
pub struct AdminSecret {
    digest: Option<String>,
}

impl AdminSecret {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            digest: secret.filter(|s| !s.is_empty()).map(hash_secret),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    /// Check a presented secret
    pub fn verify(&self, candidate: &str) -> bool {
        match &self.digest {
            Some(digest) => hash_secret(candidate) == *digest,
            None => false,
        }
    }
}

/// Hex SHA-256 of a secret
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Proof that the request presented the admin secret
#[derive(Debug, Clone)]
pub struct AdminContext {
    /// Request ID for tracing
    pub request_id: Option<String>,
}

impl<S> FromRequestParts<S> for AdminContext
where
    AdminSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let secret = AdminSecret::from_ref(state);

        if !secret.is_configured() {
            return Err(AppError::Unauthorized {
                message: "Admin access is disabled".to_string(),
            });
        }

        let presented = parts
            .headers
            .get(ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: format!("Missing {} header", ADMIN_HEADER),
            })?;

        if !secret.verify(presented) {
            return Err(AppError::Unauthorized {
                message: "Invalid admin secret".to_string(),
            });
        }

        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(AdminContext { request_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_verify() {
        let secret = AdminSecret::new(Some("s3cret"));
        assert!(secret.verify("s3cret"));
        assert!(!secret.verify("S3cret"));
    }

    #[test]
    fn test_unset_or_empty_secret_rejects_everything() {
        assert!(!AdminSecret::new(None).verify(""));
        assert!(!AdminSecret::new(Some("")).verify(""));
    }

    #[tokio::test]
    async fn test_extractor() {
        let secret = AdminSecret::new(Some("key"));

        let (mut parts, _) = Request::builder()
            .header(ADMIN_HEADER, "key")
            .body(())
            .unwrap()
            .into_parts();
        assert!(AdminContext::from_request_parts(&mut parts, &secret).await.is_ok());

        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let err = AdminContext::from_request_parts(&mut parts, &secret).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }
}
