//! Article entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique per language only
    #[sea_orm(column_type = "String(StringLen::N(255))")]
    pub slug: String,

    #[sea_orm(column_type = "String(StringLen::N(10))", default_value = "en")]
    pub lang: String,

    #[sea_orm(column_type = "String(StringLen::N(500))")]
    pub title: String,

    #[sea_orm(column_type = "String(StringLen::N(1000))")]
    pub meta_description: String,

    /// Markdown, may still contain `[IMAGE: ...]` placeholders
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Hero image
    #[sea_orm(column_type = "String(StringLen::N(500))", nullable)]
    pub image_url: Option<String>,

    pub is_published: bool,

    pub is_breaking_news: bool,

    #[sea_orm(column_type = "String(StringLen::N(255))", nullable)]
    pub author_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub author_bio: Option<String>,

    /// Source article of a translation. Not a foreign key: deleting a
    /// source leaves its translations pointing at a missing row.
    #[sea_orm(indexed, nullable)]
    pub original_article_id: Option<i32>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article_category::Entity")]
    ArticleCategories,
}

impl Related<super::article_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ArticleCategories.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::article_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::article_category::Relation::Article.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A translation has a source; a source has none
    pub fn is_translation(&self) -> bool {
        self.original_article_id.is_some()
    }
}
