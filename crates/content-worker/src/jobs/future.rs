//! Forecast job: topics likely to trend next month, written ahead of time

use super::{JobContext, RunSummary};
use crate::errors::WorkerResult;
use pressforge_common::{
    llm::{complete_json, CompletionRequest},
    pipeline::{GenerationOptions, GenerationOutcome},
    prompts,
};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct FutureTopics {
    #[serde(default)]
    future_topics: Vec<String>,
}

async fn predict_topics(ctx: &JobContext) -> Vec<String> {
    let request = CompletionRequest::new(prompts::future_topics(
        ctx.today(),
        ctx.config.workers.future_quota,
    ))
    .with_temperature(0.8);

    match complete_json::<FutureTopics>(ctx.providers.llm.as_ref(), &request).await {
        Ok(list) => list
            .future_topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Err(e) => {
            warn!(error = %e, "Topic forecast failed");
            Vec::new()
        }
    }
}

pub async fn run(ctx: &JobContext) -> WorkerResult<RunSummary> {
    let mut summary = RunSummary::default();

    let topics = predict_topics(ctx).await;
    if topics.is_empty() {
        info!("No future topics predicted, nothing to do");
        return Ok(summary);
    }
    info!(count = topics.len(), "Future topics predicted");

    for topic in &topics {
        if ctx.has_similar_title(topic).await? {
            info!(topic = %topic, "Similar article exists, skipping");
            summary.skipped += 1;
            continue;
        }

        match generate_one(ctx, topic).await {
            Ok(Some(GenerationOutcome::Created(article))) => {
                summary.created += 1;
                ctx.after_created(&article).await;
            }
            Ok(_) => summary.existing += 1,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Forecast article failed");
                summary.failed += 1;
            }
        }

        ctx.pause().await;
    }

    Ok(summary)
}

/// Draft, resolve every image inline, then store. `None` when the slug is taken.
async fn generate_one(
    ctx: &JobContext,
    topic: &str,
) -> pressforge_common::Result<Option<GenerationOutcome>> {
    let options = GenerationOptions {
        keywords: ctx.generator.generate_keywords(topic).await,
        ..GenerationOptions::in_lang(ctx.config.workers.future_lang.clone())
    };

    let query = prompts::future_query(topic, ctx.today());
    let mut draft = ctx.generator.draft(&query, &options).await?;

    let slug = draft.resolved_slug();
    if ctx.repo.find_by_slug_and_lang(&slug, &options.lang).await?.is_some() {
        info!(slug = %slug, "Article already exists, skipping image generation");
        return Ok(None);
    }

    let resolved = ctx.images.resolve_all(&slug, &draft.content).await?;
    info!(slug = %slug, images = resolved.resolved, "Images resolved");
    draft.content = resolved.content;
    draft.image_url = resolved.hero;

    ctx.generator.store(draft, &options).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{context, context_with, draft_json};
    use pressforge_common::llm::MockTextGenerator;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_articles_stored_with_resolved_images() {
        let llm = Arc::new(MockTextGenerator::scripted([
            r#"{"future_topics": ["Winter Games opening", "Total solar eclipse"]}"#.to_string(),
            r#"{"keywords": []}"#.to_string(),
            draft_json("Winter Games Preview", "Intro [IMAGE: \"ski jump\"] more [IMAGE: crowd]"),
            r#"{"keywords": []}"#.to_string(),
            draft_json("Eclipse Guide", "Look up [IMAGE: the sun]"),
        ]));
        let ctx = context_with(llm.clone(), |c| c.workers.future_lang = "hi".into()).await;

        let summary = run(&ctx).await.unwrap();
        assert_eq!(summary.created, 2);

        let games = ctx
            .repo
            .find_by_slug_and_lang("winter-games-preview", "hi")
            .await
            .unwrap()
            .unwrap();
        assert!(!games.content.contains("[IMAGE:"));
        assert!(games.content.contains("![ski jump]("));
        let hero = games.image_url.unwrap();
        assert!(games.content.contains(&hero));

        let prompts: Vec<String> = llm.requests().into_iter().map(|r| r.prompt).collect();
        assert!(prompts[2].contains("forward-looking"));
    }

    #[tokio::test]
    async fn test_failed_forecast_ends_cleanly() {
        let ctx = context(MockTextGenerator::scripted(["nothing", "still nothing"]), |_| {}).await;
        let summary = run(&ctx).await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }
}
