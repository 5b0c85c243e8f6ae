use serde::Serialize;
use std::time::Instant;

use crate::{
    db::{InteractionSource, SnapshotStore},
    error::GraphResult,
    models::GraphStats,
};

use super::RecommendationEngine;

/// How the graph was populated at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOrigin {
    /// Loaded from a snapshot, then refreshed with newer rows
    Snapshot,
    /// Replayed from every source row
    Rebuilt,
}

/// Outcome of [`warm_start`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmStart {
    pub origin: StartOrigin,
    /// Rows applied from the interaction source
    pub replayed: usize,
    pub stats: GraphStats,
}

/// Populates the engine at process start
///
/// Prefers the latest snapshot and replays only rows at or after its newest
/// edge. A missing, unreadable, corrupt or item-less snapshot is discarded
/// and the graph is rebuilt from every source row, after which a fresh
/// snapshot is stored so the next start is fast.
pub async fn warm_start(
    engine: &RecommendationEngine,
    snapshots: &dyn SnapshotStore,
    source: &dyn InteractionSource,
) -> GraphResult<WarmStart> {
    let start = Instant::now();

    if load_latest_snapshot(engine, snapshots).await {
        let watermark = engine.stats().newest_timestamp;
        let rows = source.interactions_since(watermark).await?;
        let replayed = engine.replay_since(rows, watermark)?;
        let stats = engine.stats();

        tracing::info!(
            source = source.name(),
            replayed,
            items = stats.items,
            edges = stats.edges,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Graph warm-started from snapshot"
        );
        return Ok(WarmStart {
            origin: StartOrigin::Snapshot,
            replayed,
            stats,
        });
    }

    tracing::info!(source = source.name(), "Rebuilding graph from interaction source");
    let rows = source.interactions_since(None).await?;
    let replayed = engine.replay(rows)?;

    if engine.item_count() > 0 {
        if let Err(e) = snapshots.store(engine.save_snapshot()).await {
            tracing::warn!(store = snapshots.name(), error = %e, "Failed to store initial snapshot");
        } else {
            tracing::info!(store = snapshots.name(), "Initial snapshot stored");
        }
    }

    let stats = engine.stats();
    tracing::info!(
        replayed,
        items = stats.items,
        edges = stats.edges,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Graph rebuilt from source"
    );
    Ok(WarmStart {
        origin: StartOrigin::Rebuilt,
        replayed,
        stats,
    })
}

/// Saves the graph on graceful shutdown; an item-less graph is not saved
///
/// Returns whether a snapshot was written. If every edge was removed since
/// the last save, the previous snapshot stays in the store and the next
/// [`warm_start`] loads those edges again; callers that delete likes must
/// remove them from the interaction source too, or store a snapshot
/// themselves through [`RecommendationEngine::save_snapshot`].
pub async fn persist_on_shutdown(
    engine: &RecommendationEngine,
    snapshots: &dyn SnapshotStore,
) -> GraphResult<bool> {
    let items = engine.item_count();
    if items == 0 {
        tracing::info!("Graph is empty, skipping snapshot");
        return Ok(false);
    }

    snapshots.store(engine.save_snapshot()).await?;
    tracing::info!(store = snapshots.name(), items, "Snapshot persisted on shutdown");
    Ok(true)
}

/// True if a usable snapshot is now loaded into the engine
async fn load_latest_snapshot(engine: &RecommendationEngine, snapshots: &dyn SnapshotStore) -> bool {
    let bytes = match snapshots.fetch_latest().await {
        Ok(Some(bytes)) if !bytes.is_empty() => bytes,
        Ok(_) => {
            tracing::info!(store = snapshots.name(), "No snapshot available");
            return false;
        }
        Err(e) => {
            tracing::warn!(store = snapshots.name(), error = %e, "Snapshot fetch failed");
            return false;
        }
    };

    match engine.load_snapshot(&bytes) {
        Ok(stats) if stats.items > 0 => true,
        Ok(_) => {
            tracing::warn!("Snapshot has no items, discarding it");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "Snapshot unusable, discarding it");
            false
        }
    }
}
