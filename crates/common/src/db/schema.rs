//! Schema bootstrap
//!
//! Tables are derived from the entity definitions so SQLite (local runs,
//! tests) and PostgreSQL share a single source of truth.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, Schema};
use tracing::debug;

/// Name of the unique `(slug, lang)` index
pub const SLUG_LANG_INDEX: &str = "ux_articles_slug_lang";

/// Create all tables and indexes that do not exist yet
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, ArticleEntity).await?;
    create_table(db, &schema, CategoryEntity).await?;
    create_table(db, &schema, ArticleCategoryEntity).await?;

    for mut index in schema.create_index_from_entity(ArticleEntity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    let slug_lang = Index::create()
        .if_not_exists()
        .name(SLUG_LANG_INDEX)
        .table(ArticleEntity)
        .col(ArticleColumn::Slug)
        .col(ArticleColumn::Lang)
        .unique()
        .to_owned();
    db.execute(backend.build(&slug_lang)).await?;

    if backend == DbBackend::Postgres {
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_articles_content_fts ON articles \
             USING GIN (to_tsvector('simple', title || ' ' || content))",
        )
        .await?;
    }

    debug!(?backend, "Schema ensured");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
