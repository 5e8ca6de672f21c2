//! Category handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::page_params;
use crate::AppState;
use pressforge_common::{
    db::{ArticleSummary, CategoryRef},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Serialize)]
pub struct CategoryArticlesResponse {
    pub category: CategoryRef,
    pub articles: Vec<ArticleSummary>,
    pub has_more: bool,
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryRef>>> {
    let categories = state.repo.list_categories().await?;
    Ok(Json(categories.into_iter().map(CategoryRef::from).collect()))
}

/// Published articles of one category
pub async fn category_articles(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryArticlesResponse>> {
    let category = state
        .repo
        .find_category_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::CategoryNotFound { slug: slug.clone() })?;

    let (page, limit) = page_params(query.page, query.limit);
    let result = state
        .repo
        .list_published_in_category(category.id, page, limit)
        .await?;

    Ok(Json(CategoryArticlesResponse {
        category: category.into(),
        articles: result.items.into_iter().map(ArticleSummary::from).collect(),
        has_more: result.has_more,
    }))
}
