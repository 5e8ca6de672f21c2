//! PressForge Search Sync
//!
//! One-shot job: reads every published article with its categories and
//! pushes them to the configured search index.

mod sync;

use anyhow::Context;
use pressforge_common::{
    config::AppConfig,
    db::{ensure_schema, DbPool, Repository},
    metrics::register_metrics,
    search_index::create_search_index,
    VERSION,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.observability.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting PressForge Search Sync v{}", VERSION);

    let index = create_search_index(&config.search_index)?;
    register_metrics();

    let db = DbPool::new(&config.database).await?;
    ensure_schema(db.conn()).await?;
    let repo = Repository::new(db);

    let sent = sync::sync_published(&repo, index.as_ref()).await?;
    info!(records = sent, index = %config.search_index.index_name, "Search sync complete");

    Ok(())
}
