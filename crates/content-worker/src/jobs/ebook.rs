//! Weekly e-book: outline, chapters one by one, then EPUB and storefront listing
//!
//! Each chapter is written to the plan file as soon as it exists, so an
//! interrupted run resumes where it stopped.

use super::{JobContext, RunSummary};
use crate::converter::EpubConverter;
use crate::errors::WorkerResult;
use crate::plan::{self, iso_week, Chapter, EbookPlan, Status, WeekScoped};
use crate::storefront::{NewProduct, Storefront};
use pressforge_common::{
    content::slugify,
    errors::AppError,
    llm::{complete_json, CompletionRequest},
    prompts,
};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

const CHAPTER_COUNT: usize = 6;
const EPUB_CONTENT_TYPE: &str = "application/epub+zip";

#[derive(Debug, Deserialize)]
struct Outline {
    ebook_title: String,
    #[serde(default)]
    subtitle: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    chapters: Vec<OutlineChapter>,
}

#[derive(Debug, Deserialize)]
struct OutlineChapter {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ChapterBody {
    content: String,
}

async fn create_plan(ctx: &JobContext) -> pressforge_common::Result<EbookPlan> {
    let request = CompletionRequest::new(prompts::ebook_outline(CHAPTER_COUNT)).with_temperature(0.8);
    let outline: Outline = complete_json(ctx.providers.llm.as_ref(), &request).await?;

    let chapters: Vec<Chapter> = outline
        .chapters
        .into_iter()
        .filter(|c| !c.title.trim().is_empty())
        .map(|c| Chapter {
            title: c.title,
            status: Status::Pending,
            content: None,
        })
        .collect();

    if chapters.is_empty() || outline.ebook_title.trim().is_empty() {
        return Err(AppError::UnparseableResponse {
            message: "e-book outline has no title or chapters".to_string(),
        });
    }

    let (week_year, week_number) = iso_week(ctx.today());
    Ok(EbookPlan {
        week_year,
        week_number,
        ebook_title: outline.ebook_title,
        subtitle: outline.subtitle,
        category: outline.category.unwrap_or_else(|| "General".to_string()),
        chapters,
        published: false,
        product_url: None,
    })
}

pub async fn load_or_create(ctx: &JobContext, path: &Path) -> WorkerResult<EbookPlan> {
    if let Some(existing) = plan::load::<EbookPlan>(path).await {
        if existing.is_current(ctx.today()) {
            info!(title = %existing.ebook_title, "Loaded e-book plan");
            return Ok(existing);
        }
        info!(week = existing.week_number, "E-book plan is stale");
    }

    let fresh = create_plan(ctx).await?;
    plan::save(path, &fresh).await?;
    info!(title = %fresh.ebook_title, chapters = fresh.chapters.len(), "Created e-book plan");
    Ok(fresh)
}

async fn write_chapter(ctx: &JobContext, plan: &EbookPlan, index: usize) -> pressforge_common::Result<String> {
    let request = CompletionRequest::new(prompts::ebook_chapter(
        &plan.ebook_title,
        &plan.subtitle,
        &plan.chapters[index].title,
        &plan.outline(),
    ))
    .long_form();

    let body: ChapterBody = complete_json(ctx.providers.llm.as_ref(), &request).await?;
    if body.content.trim().is_empty() {
        return Err(AppError::UnparseableResponse {
            message: "chapter content is empty".to_string(),
        });
    }
    Ok(body.content)
}

pub async fn run(ctx: &JobContext, path: &Path) -> WorkerResult<RunSummary> {
    let mut summary = RunSummary::default();
    let mut plan = load_or_create(ctx, path).await?;

    if plan.published {
        info!(title = %plan.ebook_title, "E-book already published this week");
        return Ok(summary);
    }

    for index in plan.pending_chapters() {
        match write_chapter(ctx, &plan, index).await {
            Ok(content) => {
                let chapter = &mut plan.chapters[index];
                chapter.content = Some(content);
                chapter.status = Status::Completed;
                plan::save(path, &plan).await?;
                info!(chapter = %plan.chapters[index].title, "Chapter written");
                summary.created += 1;
            }
            Err(e) => {
                warn!(chapter = %plan.chapters[index].title, error = %e, "Chapter failed");
                summary.failed += 1;
            }
        }
        ctx.pause().await;
    }

    if !plan.is_complete() {
        info!(pending = plan.pending_chapters().len(), "E-book incomplete, resuming next run");
        return Ok(summary);
    }

    let Some(storefront) = Storefront::from_config(&ctx.config.storefront)? else {
        warn!("No storefront access token configured, e-book stays unpublished");
        return Ok(summary);
    };

    let converter = EpubConverter::new(&ctx.config.workers.converter_command)?;
    let epub = converter.convert(&plan.manuscript()).await?;

    let object = format!("ebooks/{}.epub", slugify(&plan.ebook_title));
    let file_url = ctx.providers.storage.upload(&object, epub, EPUB_CONTENT_TYPE).await?;
    info!(url = %file_url, "E-book uploaded");

    let description = if plan.subtitle.is_empty() {
        plan.ebook_title.clone()
    } else {
        plan.subtitle.clone()
    };
    let product = storefront
        .create_product(&NewProduct {
            name: &plan.ebook_title,
            description: &description,
            price_cents: ctx.config.storefront.price_cents,
            file_url: &file_url,
        })
        .await?;

    plan.published = true;
    plan.product_url = product.short_url.or(Some(file_url));
    plan::save(path, &plan).await?;
    info!(title = %plan.ebook_title, product = %product.id, "E-book published");

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::context;
    use pressforge_common::llm::MockTextGenerator;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OUTLINE: &str = r#"{"ebook_title": "Bread Basics", "subtitle": "Your first loaf", "category": "Food", "chapters": [{"title": "Introduction"}, {"title": "Kneading"}]}"#;

    async fn storefront() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(url_path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "product": {"id": "p9", "short_url": "https://shop/p9"}
            })))
            .mount(&server)
            .await;
        server
    }

    fn fake_converter(dir: &Path) -> String {
        let script = dir.join("convert.sh");
        std::fs::write(&script, "cp \"$1\" \"$3\"\n").unwrap();
        format!("sh {}", script.display())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resume_then_publish() {
        let dir = tempfile::tempdir().unwrap();
        let plan_path = dir.path().join("ebook_plan.json");
        let server = storefront().await;
        let converter = fake_converter(dir.path());
        let configure = |c: &mut pressforge_common::AppConfig| {
            c.storefront.access_token = Some("tok".into());
            c.storefront.api_base = server.uri();
            c.workers.converter_command = converter.clone();
        };

        // second chapter fails on both extraction tiers
        let llm = MockTextGenerator::scripted([OUTLINE, r#"{"content": "Flour and water."}"#, "oops", "oops"]);
        let ctx = context(llm, configure).await;
        let first = run(&ctx, &plan_path).await.unwrap();
        assert_eq!((first.created, first.failed), (1, 1));

        let saved: EbookPlan = plan::load(&plan_path).await.unwrap();
        assert!(!saved.published);
        assert_eq!(saved.pending_chapters(), vec![1]);

        let llm = MockTextGenerator::scripted([r#"{"content": "Push, fold, turn."}"#]);
        let ctx = context(llm, configure).await;
        let second = run(&ctx, &plan_path).await.unwrap();
        assert_eq!(second.created, 1);

        let saved: EbookPlan = plan::load(&plan_path).await.unwrap();
        assert!(saved.published);
        assert_eq!(saved.product_url.as_deref(), Some("https://shop/p9"));
        assert_eq!(saved.chapters[1].content.as_deref(), Some("Push, fold, turn."));
    }

    #[tokio::test]
    async fn test_published_plan_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let plan_path = dir.path().join("ebook_plan.json");
        let ctx = context(MockTextGenerator::new(), |_| {}).await;

        let (week_year, week_number) = iso_week(ctx.today());
        let done = EbookPlan {
            week_year,
            week_number,
            ebook_title: "Done".into(),
            subtitle: String::new(),
            category: "Food".into(),
            chapters: vec![],
            published: true,
            product_url: None,
        };
        plan::save(&plan_path, &done).await.unwrap();

        assert_eq!(run(&ctx, &plan_path).await.unwrap(), RunSummary::default());
    }

    #[tokio::test]
    async fn test_empty_outline_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let outline = r#"{"ebook_title": "Nothing", "chapters": []}"#;
        let ctx = context(MockTextGenerator::scripted([outline]), |_| {}).await;

        assert!(run(&ctx, &dir.path().join("ebook_plan.json")).await.is_err());
    }
}
