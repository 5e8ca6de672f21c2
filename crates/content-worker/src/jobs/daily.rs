//! Daily regional trends: brainstorm per region, write in the region's
//! language, then translate into every other configured language

use super::{JobContext, RunSummary};
use crate::errors::WorkerResult;
use pressforge_common::{
    config::RegionConfig,
    llm::{complete_json, CompletionRequest},
    pipeline::{GenerationOptions, GenerationOutcome},
    prompts,
};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct TopicList {
    #[serde(default)]
    topics: Vec<String>,
}

async fn regional_topics(ctx: &JobContext, region: &RegionConfig) -> Vec<String> {
    let count = ctx.config.workers.articles_per_region;
    let request = CompletionRequest::new(prompts::regional_trends(
        &region.name,
        &region.lang,
        count,
        ctx.today(),
    ))
    .with_temperature(0.8);

    match complete_json::<TopicList>(ctx.providers.llm.as_ref(), &request).await {
        Ok(list) => list
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .take(count)
            .collect(),
        Err(e) => {
            warn!(region = %region.name, error = %e, "Trend brainstorm failed");
            Vec::new()
        }
    }
}

pub async fn run(ctx: &JobContext) -> WorkerResult<RunSummary> {
    let mut summary = RunSummary::default();

    for region in &ctx.config.workers.regions {
        let topics = regional_topics(ctx, region).await;
        if topics.is_empty() {
            info!(region = %region.name, "No topics for region");
            continue;
        }

        for topic in &topics {
            if ctx.has_similar_title(topic).await? {
                info!(topic = %topic, "Similar article exists, skipping");
                summary.skipped += 1;
                continue;
            }

            let query = format!("{} (write in {})", topic, region.lang);
            match ctx
                .generator
                .generate(&query, &GenerationOptions::in_lang(region.lang.clone()))
                .await
            {
                Ok(GenerationOutcome::Created(article)) => {
                    summary.created += 1;
                    ctx.fan_out(&article).await;
                }
                Ok(GenerationOutcome::Existing(_)) => summary.existing += 1,
                Err(e) => {
                    warn!(region = %region.name, topic = %topic, error = %e, "Generation failed");
                    summary.failed += 1;
                }
            }

            ctx.pause().await;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{context, draft_json};
    use pressforge_common::llm::MockTextGenerator;

    #[tokio::test]
    async fn test_region_article_is_translated() {
        let llm = MockTextGenerator::scripted([
            r#"{"topics": ["Cricket final"]}"#.to_string(),
            draft_json("Cricket Final Tonight", "Body"),
        ]);
        let ctx = context(llm, |c| c.workers.articles_per_region = 1).await;

        let summary = run(&ctx).await.unwrap();
        assert_eq!(summary.created, 1);

        let source = ctx
            .repo
            .find_by_slug_and_lang("cricket-final-tonight", "hi")
            .await
            .unwrap()
            .unwrap();
        let translations = ctx.repo.list_translations(source.id).await.unwrap();
        let langs: Vec<&str> = translations.iter().map(|a| a.lang.as_str()).collect();
        assert_eq!(langs, vec!["en", "fr"]);
    }

    #[tokio::test]
    async fn test_region_without_topics_is_skipped() {
        let ctx = context(MockTextGenerator::scripted(["no", "json"]), |_| {}).await;
        assert_eq!(run(&ctx).await.unwrap(), RunSummary::default());
    }
}
