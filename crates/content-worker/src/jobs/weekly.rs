//! Weekly content cluster: one pillar theme, one supporting article per run

use super::{JobContext, RunSummary};
use crate::errors::WorkerResult;
use crate::plan::{self, iso_week, PlannedTopic, Status, WeekScoped, WeeklyPlan};
use pressforge_common::{
    llm::{complete_json, CompletionRequest},
    pipeline::{GenerationOptions, GenerationOutcome},
    prompts,
};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Supporting topics per week, one per day
const CLUSTER_SIZE: usize = 7;

#[derive(Debug, Deserialize)]
struct WeeklyTheme {
    pillar_topic: String,
    #[serde(default)]
    cluster_topics: Vec<String>,
    #[serde(default)]
    category: Option<String>,
}

async fn create_plan(ctx: &JobContext) -> pressforge_common::Result<WeeklyPlan> {
    let request = CompletionRequest::new(prompts::weekly_theme(CLUSTER_SIZE));
    let theme: WeeklyTheme = complete_json(ctx.providers.llm.as_ref(), &request).await?;

    let (week_year, week_number) = iso_week(ctx.today());
    Ok(WeeklyPlan {
        week_year,
        week_number,
        pillar_topic: theme.pillar_topic,
        category: theme
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "General".to_string()),
        topics: theme
            .cluster_topics
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(|title| PlannedTopic {
                title,
                status: Status::Pending,
            })
            .collect(),
    })
}

/// This week's plan from disk, or a fresh one when missing or stale
pub async fn load_or_create(ctx: &JobContext, path: &Path) -> WorkerResult<WeeklyPlan> {
    if let Some(existing) = plan::load::<WeeklyPlan>(path).await {
        if existing.is_current(ctx.today()) {
            info!(week = existing.week_number, pillar = %existing.pillar_topic, "Loaded weekly plan");
            return Ok(existing);
        }
        info!(week = existing.week_number, "Weekly plan is stale");
    }

    let fresh = create_plan(ctx).await?;
    plan::save(path, &fresh).await?;
    info!(week = fresh.week_number, pillar = %fresh.pillar_topic, topics = fresh.topics.len(), "Created weekly plan");
    Ok(fresh)
}

pub async fn run(ctx: &JobContext, path: &Path) -> WorkerResult<RunSummary> {
    let mut summary = RunSummary::default();
    let mut plan = load_or_create(ctx, path).await?;

    let Some(index) = plan.next_pending() else {
        info!("Every topic of this week is done");
        return Ok(summary);
    };
    let topic = plan.topics[index].title.clone();

    if ctx.has_similar_title(&topic).await? {
        info!(topic = %topic, "Similar article exists, skipping topic");
        plan.mark(index, Status::Skipped);
        plan::save(path, &plan).await?;
        summary.skipped += 1;
        return Ok(summary);
    }

    let query = format!("{} (category: {})", topic, plan.category);
    match ctx.generator.generate(&query, &GenerationOptions::default()).await {
        Ok(outcome) => {
            match &outcome {
                GenerationOutcome::Created(article) => {
                    summary.created += 1;
                    ctx.after_created(article).await;
                }
                GenerationOutcome::Existing(_) => summary.existing += 1,
            }
            plan.mark(index, Status::Completed);
            plan::save(path, &plan).await?;
            info!(topic = %topic, "Topic completed");
        }
        Err(e) => {
            warn!(topic = %topic, error = %e, "Generation failed, the topic stays pending");
            summary.failed += 1;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{context_with, draft_json};
    use pressforge_common::llm::MockTextGenerator;
    use std::sync::Arc;

    const THEME: &str = r#"{"pillar_topic": "Home gardening", "cluster_topics": ["Raised beds", "Composting"], "category": "Lifestyle"}"#;

    #[tokio::test]
    async fn test_plan_created_then_topics_completed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weekly_plan.json");
        let llm = Arc::new(MockTextGenerator::scripted([
            THEME.to_string(),
            draft_json("Raised Beds 101", "Body"),
            draft_json("Composting at Home", "Body"),
        ]));
        let ctx = context_with(llm.clone(), |_| {}).await;

        let first = run(&ctx, &path).await.unwrap();
        assert_eq!(first.created, 1);
        let saved: WeeklyPlan = plan::load(&path).await.unwrap();
        assert_eq!((saved.week_year, saved.week_number), iso_week(ctx.today()));
        assert_eq!(saved.topics[0].status, Status::Completed);
        assert_eq!(saved.topics[1].status, Status::Pending);
        assert!(llm.requests()[1].prompt.contains("Raised beds (category: Lifestyle)"));

        run(&ctx, &path).await.unwrap();
        let saved: WeeklyPlan = plan::load(&path).await.unwrap();
        assert_eq!(saved.next_pending(), None);

        let done = run(&ctx, &path).await.unwrap();
        assert_eq!(done, RunSummary::default());
        assert_eq!(ctx.repo.list_all_articles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_plan_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weekly_plan.json");
        let ctx = context_with(Arc::new(MockTextGenerator::scripted([THEME])), |_| {}).await;

        let (year, week) = iso_week(ctx.today());
        let stale = WeeklyPlan {
            week_year: year - 1,
            week_number: week,
            pillar_topic: "Old".into(),
            category: "Old".into(),
            topics: vec![],
        };
        plan::save(&path, &stale).await.unwrap();

        let loaded = load_or_create(&ctx, &path).await.unwrap();
        assert_eq!(loaded.pillar_topic, "Home gardening");
        assert_eq!(loaded.topics.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_generation_keeps_topic_pending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weekly_plan.json");
        let refusal = r#"{"title": "Invalid Topic Request", "content": ""}"#;
        let ctx = context_with(Arc::new(MockTextGenerator::scripted([THEME, refusal])), |_| {}).await;

        let summary = run(&ctx, &path).await.unwrap();
        assert_eq!(summary.failed, 1);
        let saved: WeeklyPlan = plan::load(&path).await.unwrap();
        assert_eq!(saved.next_pending(), Some(0));
    }
}
