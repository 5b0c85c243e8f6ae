use graphrec_engine::{
    db::{FileSnapshotStore, JsonlInteractionSource},
    services::{persist_on_shutdown, warm_start},
    Config, RecommendationEngine,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("graphrec_engine=info")),
        )
        .init();

    let config = Config::from_env()?;
    let engine = RecommendationEngine::new(config.engine_settings());
    let snapshots = FileSnapshotStore::new(&config.snapshot_path);
    let source = JsonlInteractionSource::new(&config.interactions_path);

    tracing::info!(
        snapshot = %snapshots.path().display(),
        interactions = %config.interactions_path,
        "Configuration loaded"
    );

    let outcome = warm_start(&engine, &snapshots, &source).await?;
    tracing::info!(
        origin = ?outcome.origin,
        replayed = outcome.replayed,
        users = outcome.stats.users,
        items = outcome.stats.items,
        edges = outcome.stats.edges,
        newest = ?outcome.stats.newest_timestamp,
        "Graph ready"
    );

    let written = persist_on_shutdown(&engine, &snapshots).await?;
    tracing::info!(written, "Compaction finished");

    Ok(())
}
