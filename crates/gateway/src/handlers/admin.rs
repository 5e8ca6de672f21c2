//! Admin handlers
//!
//! Every handler takes an [`AdminContext`], so a request without the
//! configured `x-admin-secret-key` never reaches the repository.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_body;
use crate::AppState;
use pressforge_common::{
    auth::AdminContext,
    db::{models::Article, ArticleDetails},
    errors::{AppError, Result},
};

#[derive(Serialize)]
pub struct AdminArticleRow {
    pub id: i32,
    pub title: String,
    pub is_published: bool,
    pub lang: String,
}

impl From<Article> for AdminArticleRow {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            is_published: article.is_published,
            lang: article.lang,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditArticleRequest {
    pub content: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    #[validate(length(max = 500))]
    pub meta_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegenerateImageRequest {
    pub prompt: Option<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn load(state: &AppState, id: i32) -> Result<Article> {
    state
        .repo
        .find_article_by_id(id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound { key: id.to_string() })
}

/// Every article, newest first, published or not
pub async fn list_articles(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<Vec<AdminArticleRow>>> {
    let articles = state.repo.list_all_articles().await?;
    Ok(Json(articles.into_iter().map(AdminArticleRow::from).collect()))
}

pub async fn get_article(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<i32>,
) -> Result<Json<ArticleDetails>> {
    let article = load(&state, id).await?;
    Ok(Json(state.repo.article_details(article).await?))
}

/// Replace an article body; title and meta description are optional
pub async fn edit_article(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<i32>,
    body: std::result::Result<Json<EditArticleRequest>, JsonRejection>,
) -> Result<Json<ArticleDetails>> {
    let request = parse_body(body)?;
    let content = request.content.ok_or_else(|| AppError::MissingField {
        field: "content".to_string(),
    })?;

    let article = load(&state, id).await?;
    let updated = state
        .repo
        .update_article(article, content, request.title, request.meta_description)
        .await?;

    tracing::info!(id, request_id = ?admin.request_id, "Article edited");
    Ok(Json(state.repo.article_details(updated).await?))
}

/// Delete an article and its category links; translations are kept
pub async fn delete_article(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    if !state.repo.delete_article(id).await? {
        return Err(AppError::ArticleNotFound { key: id.to_string() });
    }

    tracing::info!(id, request_id = ?admin.request_id, "Article deleted");
    Ok(Json(MessageResponse {
        message: "Article deleted successfully".to_string(),
    }))
}

pub async fn toggle_publish(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<i32>,
) -> Result<Json<ArticleDetails>> {
    let article = load(&state, id).await?;
    let updated = state.repo.toggle_published(article).await?;

    tracing::info!(id, is_published = updated.is_published, "Publish state toggled");
    Ok(Json(state.repo.article_details(updated).await?))
}

/// Replace the hero image; the body `{prompt}` is optional
pub async fn regenerate_image(
    State(state): State<AppState>,
    _admin: AdminContext,
    Path(id): Path<i32>,
    body: Bytes,
) -> Result<Json<ArticleDetails>> {
    let request: RegenerateImageRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RegenerateImageRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidFormat {
            message: e.to_string(),
        })?
    };

    let updated = state
        .images
        .regenerate_hero(id, request.prompt.as_deref())
        .await?;

    Ok(Json(state.repo.article_details(updated).await?))
}
