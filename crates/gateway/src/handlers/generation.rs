//! Generation handlers: article drafts and on-demand placeholder images

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{parse_body, required};
use crate::AppState;
use pressforge_common::{
    db::ArticleDetails,
    errors::{AppError, Result},
    pipeline::{GenerationOptions, GenerationOutcome},
    DEFAULT_LANG,
};

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateContentRequest {
    #[validate(length(max = 500))]
    pub query: Option<String>,

    #[validate(length(min = 2, max = 10))]
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateImageRequest {
    #[validate(length(max = 2000))]
    pub prompt: Option<String>,
    pub slug: Option<String>,
    pub index: Option<usize>,
    pub lang: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateImageResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// Generate an article for a topic.
///
/// 201 with the new article, or 200 with the article already stored under
/// the same slug and language.
pub async fn generate_content(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateContentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ArticleDetails>)> {
    let request = parse_body(body)?;
    let query = required(&request.query, "query")?;
    let lang = request.lang.as_deref().unwrap_or(DEFAULT_LANG);

    tracing::info!(query, lang, "Generating article");

    let outcome = state
        .generator
        .generate(query, &GenerationOptions::in_lang(lang))
        .await?;

    let status = match outcome {
        GenerationOutcome::Created(_) => StatusCode::CREATED,
        GenerationOutcome::Existing(_) => StatusCode::OK,
    };

    let details = state.repo.article_details(outcome.into_article()).await?;
    Ok((status, Json(details)))
}

/// Generate the image for one placeholder of a stored article
pub async fn generate_image(
    State(state): State<AppState>,
    body: std::result::Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Json<GenerateImageResponse>> {
    let request = parse_body(body)?;
    let prompt = required(&request.prompt, "prompt")?;
    let slug = required(&request.slug, "slug")?;
    let index = request.index.ok_or_else(|| AppError::MissingField {
        field: "index".to_string(),
    })?;

    let image_url = state
        .images
        .resolve_placeholder(slug, request.lang.as_deref(), index, prompt)
        .await?;

    Ok(Json(GenerateImageResponse { image_url }))
}
