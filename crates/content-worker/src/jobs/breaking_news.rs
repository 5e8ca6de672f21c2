//! Breaking news: feed headlines -> news articles

use super::{JobContext, RunSummary};
use crate::errors::WorkerResult;
use crate::feeds;
use pressforge_common::pipeline::{ArticleStyle, GenerationOptions, GenerationOutcome};
use pressforge_common::DEFAULT_LANG;
use tracing::{info, warn};

pub async fn run(ctx: &JobContext) -> WorkerResult<RunSummary> {
    let workers = &ctx.config.workers;
    let mut summary = RunSummary::default();

    let headlines = feeds::fetch_headlines(&ctx.http, &workers.feeds).await;
    if headlines.is_empty() {
        info!("No headlines found, nothing to do");
        return Ok(summary);
    }

    for headline in headlines.iter().take(workers.breaking_news_candidates) {
        if summary.created >= workers.breaking_news_quota {
            break;
        }

        if ctx.has_similar_title(headline).await? {
            info!(headline = %headline, "Similar article exists, skipping");
            summary.skipped += 1;
            continue;
        }

        let options = GenerationOptions {
            lang: DEFAULT_LANG.to_string(),
            keywords: ctx.generator.generate_keywords(headline).await,
            style: ArticleStyle::News,
            breaking_news: true,
            temperature: 0.6,
        };

        match ctx.generator.generate(headline, &options).await {
            Ok(GenerationOutcome::Created(article)) => {
                summary.created += 1;
                ctx.after_created(&article).await;
                ctx.pause().await;
            }
            Ok(GenerationOutcome::Existing(article)) => {
                info!(slug = %article.slug, "Article already exists, skipping");
                summary.existing += 1;
            }
            Err(e) => {
                warn!(headline = %headline, error = %e, "Generation failed");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{context, draft_json};
    use pressforge_common::db::NewArticle;
    use pressforge_common::llm::MockTextGenerator;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<rss><channel>
        <item><title>Storm reaches coast</title></item>
        <item><title>Markets rally on rate cut</title></item>
        <item><title>Storm reaches coast</title></item>
        <item><title>Election called</title></item>
    </channel></rss>"#;

    async fn feed_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_quota_and_similar_title_skip() {
        let server = feed_server().await;
        let llm = MockTextGenerator::scripted([
            r#"{"keywords": ["rate cut"]}"#.to_string(),
            draft_json("Markets rally on rate cut", "Body"),
        ]);
        let ctx = context(llm, |c| {
            c.workers.feeds = vec![server.uri()];
            c.workers.breaking_news_quota = 1;
        })
        .await;

        ctx.repo
            .create_article(NewArticle {
                slug: "storm".into(),
                lang: "en".into(),
                title: "Storm reaches coast as warnings rise".into(),
                meta_description: String::new(),
                content: String::new(),
                image_url: None,
                is_published: true,
                is_breaking_news: true,
                author_name: None,
                author_bio: None,
                original_article_id: None,
            })
            .await
            .unwrap();

        let summary = run(&ctx).await.unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);

        let article = ctx
            .repo
            .find_by_slug_and_lang("markets-rally-on-rate-cut", "en")
            .await
            .unwrap()
            .unwrap();
        assert!(article.is_breaking_news);
        assert_eq!(ctx.repo.categories_for_article(&article).await.unwrap()[0].name, "World News");
    }

    #[tokio::test]
    async fn test_no_feeds_ends_cleanly() {
        let ctx = context(MockTextGenerator::new(), |c| c.workers.feeds = vec![]).await;
        assert_eq!(run(&ctx).await.unwrap(), RunSummary::default());
    }
}
