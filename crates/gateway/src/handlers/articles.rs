//! Public article handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::page_params;
use crate::AppState;
use pressforge_common::{
    db::{ArticleDetails, ArticleSummary},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct LangQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub exclude: Option<String>,
    pub lang: Option<String>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Serialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleSummary>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ArticleSummary>,
}

/// A published article by slug, optionally in a given language
pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LangQuery>,
) -> Result<Json<ArticleDetails>> {
    let article = state
        .repo
        .find_published_by_slug(&slug, query.lang.as_deref())
        .await?
        .ok_or_else(|| AppError::ArticleNotFound { key: slug.clone() })?;

    Ok(Json(state.repo.article_details(article).await?))
}

/// Published articles, newest first
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ArticleListResponse>> {
    let lang = query.lang.as_deref();

    if query.all {
        let articles = state.repo.list_all_published(lang).await?;
        return Ok(Json(ArticleListResponse {
            articles: articles.into_iter().map(ArticleSummary::from).collect(),
            has_more: false,
        }));
    }

    let (page, limit) = page_params(query.page, query.limit);
    let exclude = query.exclude.as_deref().filter(|s| !s.is_empty());
    let result = state.repo.list_published(page, limit, exclude, lang).await?;

    Ok(Json(ArticleListResponse {
        articles: result.items.into_iter().map(ArticleSummary::from).collect(),
        has_more: result.has_more,
    }))
}

/// Full-text search over published articles
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    let q = super::required(&query.q, "q")?.to_string();
    let (_, limit) = page_params(None, query.limit);

    let results = state.repo.search_published(&q, limit).await?;
    tracing::debug!(query = %q, hits = results.len(), "Search completed");

    Ok(Json(SearchResponse {
        query: q,
        results: results.into_iter().map(ArticleSummary::from).collect(),
    }))
}
