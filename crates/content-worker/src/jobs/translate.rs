//! Translate one stored article on demand

use super::{JobContext, RunSummary};
use crate::errors::WorkerResult;
use pressforge_common::errors::AppError;
use tracing::info;

pub async fn run(ctx: &JobContext, article_id: i32) -> WorkerResult<RunSummary> {
    let article = ctx
        .repo
        .find_article_by_id(article_id)
        .await?
        .ok_or_else(|| AppError::ArticleNotFound {
            key: article_id.to_string(),
        })?;

    let report = ctx.translations.fan_out(&article).await?;
    for (lang, reason) in &report.skipped {
        info!(lang = %lang, reason = ?reason, "Language skipped");
    }

    Ok(RunSummary {
        created: report.created.len(),
        skipped: report.skipped.len(),
        ..RunSummary::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WorkerError;
    use crate::jobs::testing::context;
    use pressforge_common::db::NewArticle;
    use pressforge_common::llm::MockTextGenerator;

    #[tokio::test]
    async fn test_translate_existing_article() {
        let ctx = context(MockTextGenerator::new(), |c| {
            c.translation.target_languages = vec!["en".into(), "de".into(), "es".into()];
        })
        .await;
        let article = ctx
            .repo
            .create_article(NewArticle {
                slug: "green-tea".into(),
                lang: "en".into(),
                title: "Green Tea".into(),
                meta_description: "m".into(),
                content: "c".into(),
                image_url: None,
                is_published: true,
                is_breaking_news: false,
                author_name: None,
                author_bio: None,
                original_article_id: None,
            })
            .await
            .unwrap();

        let first = run(&ctx, article.id).await.unwrap();
        assert_eq!(first.created, 2);

        let again = run(&ctx, article.id).await.unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(again.skipped, 2);
    }

    #[tokio::test]
    async fn test_unknown_article() {
        let ctx = context(MockTextGenerator::new(), |_| {}).await;
        let err = run(&ctx, 404).await.unwrap_err();
        assert!(matches!(err, WorkerError::App(AppError::ArticleNotFound { .. })));
    }
}
