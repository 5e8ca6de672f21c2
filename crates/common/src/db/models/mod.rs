//! SeaORM entity models
//!
//! Database entities for PressForge

pub mod article;
pub mod article_category;
pub mod category;

pub use article::{
    Entity as ArticleEntity,
    Model as Article,
    ActiveModel as ArticleActiveModel,
    Column as ArticleColumn,
};

pub use category::{
    Entity as CategoryEntity,
    Model as Category,
    ActiveModel as CategoryActiveModel,
    Column as CategoryColumn,
};

pub use article_category::{
    Entity as ArticleCategoryEntity,
    Model as ArticleCategory,
    ActiveModel as ArticleCategoryActiveModel,
    Column as ArticleCategoryColumn,
};
