//! PressForge Content Worker
//!
//! Scheduled batch jobs that discover topics, generate articles and
//! optionally translate them:
//! 1. `breaking-news` from RSS/Atom headlines
//! 2. `future` from forecast topics, images resolved before saving
//! 3. `weekly` from a week-scoped content cluster plan
//! 4. `daily` from regional trend brainstorms
//! 5. `translate` for one stored article
//! 6. `ebook` from a week-scoped outline, published to the storefront

mod converter;
mod errors;
mod feeds;
mod jobs;
mod plan;
mod storefront;

use anyhow::Context;
use clap::{Parser, Subcommand};
use jobs::JobContext;
use pressforge_common::{
    config::AppConfig,
    db::{ensure_schema, DbPool},
    metrics, Providers, VERSION,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "content-worker", version, about = "PressForge batch content jobs")]
struct Cli {
    /// Translate every article the job creates
    #[arg(long, global = true)]
    translate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write news articles for fresh feed headlines
    BreakingNews,

    /// Write ahead for topics expected to trend next month
    Future,

    /// Write the next topic of this week's content cluster
    Weekly {
        /// Plan file, defaults to `workers.weekly_plan_path`
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Write regional trend articles and translate them
    Daily,

    /// Translate one stored article into every configured language
    Translate {
        #[arg(long)]
        article_id: i32,
    },

    /// Continue this week's e-book and publish it once complete
    Ebook {
        /// Plan file, defaults to `workers.ebook_plan_path`
        #[arg(long)]
        plan: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.observability.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting PressForge Content Worker v{}", VERSION);
    metrics::register_metrics();

    let db = DbPool::new(&config.database).await?;
    ensure_schema(db.conn()).await?;
    let providers = Providers::from_config(&config)?;

    let config = Arc::new(config);
    let ctx = JobContext::new(config.clone(), db, providers, cli.translate)?;

    let (job, summary) = match cli.command {
        Command::BreakingNews => ("breaking-news", jobs::breaking_news::run(&ctx).await?),
        Command::Future => ("future", jobs::future::run(&ctx).await?),
        Command::Weekly { plan } => {
            let path = plan.unwrap_or_else(|| PathBuf::from(&config.workers.weekly_plan_path));
            ("weekly", jobs::weekly::run(&ctx, &path).await?)
        }
        Command::Daily => ("daily", jobs::daily::run(&ctx).await?),
        Command::Translate { article_id } => ("translate", jobs::translate::run(&ctx, article_id).await?),
        Command::Ebook { plan } => {
            let path = plan.unwrap_or_else(|| PathBuf::from(&config.workers.ebook_plan_path));
            ("ebook", jobs::ebook::run(&ctx, &path).await?)
        }
    };

    summary.log(job);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_translate_flag() {
        let cli = Cli::try_parse_from(["content-worker", "weekly", "--translate"]).unwrap();
        assert!(cli.translate);
        assert!(matches!(cli.command, Command::Weekly { plan: None }));

        let cli = Cli::try_parse_from(["content-worker", "translate", "--article-id", "7"]).unwrap();
        assert!(matches!(cli.command, Command::Translate { article_id: 7 }));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["content-worker"]).is_err());
    }
}
