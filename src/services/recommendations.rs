use chrono::Utc;
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::GraphResult,
    graph::{codec, GraphStore},
    models::{
        Algorithm, CategoryLookup, GraphStats, Interaction, ItemId, RecommendQuery,
        Recommendation, Timestamp, UserId,
    },
};

use super::{PersonalizedPageRank, ScoringPolicy, WalkSettings, WeightedBfs};

/// Tunables shared by every query against one engine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineSettings {
    pub scoring: ScoringPolicy,
    pub walks: WalkSettings,
    /// Fixed PageRank seed; `None` draws from OS entropy per query
    pub walk_seed: Option<u64>,
}

/// The recommendation engine facade
///
/// Owns the single graph instance behind a reader-writer lock. Mutations and
/// snapshot loads take the write lock; traversals and snapshot saves share
/// the read lock, so recommendation queries run concurrently with each other
/// but never observe a half-applied write. Cloning shares the same graph.
#[derive(Clone, Default)]
pub struct RecommendationEngine {
    graph: Arc<RwLock<GraphStore>>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    /// Creates an engine over an empty graph
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_graph(GraphStore::new(), settings)
    }

    pub fn with_graph(graph: GraphStore, settings: EngineSettings) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            settings,
        }
    }

    /// Records a like. Re-liking replaces the edge timestamp.
    pub fn add_interaction(
        &self,
        user_id: i64,
        item_id: i64,
        timestamp: Timestamp,
    ) -> GraphResult<()> {
        let (user, item) = Interaction::new(user_id, item_id, timestamp).validate()?;
        let inserted = self.graph.write().add_edge(user, item, timestamp);

        tracing::debug!(
            user = %user,
            item = %item,
            timestamp,
            inserted,
            "Interaction added"
        );
        Ok(())
    }

    /// Removes a like; returns false if the edge did not exist
    pub fn remove_interaction(&self, user_id: i64, item_id: i64) -> GraphResult<bool> {
        let user = UserId::new(user_id)?;
        let item = ItemId::new(item_id)?;
        let removed = self.graph.write().remove_edge(user, item);

        tracing::debug!(user = %user, item = %item, removed, "Interaction removed");
        Ok(removed)
    }

    /// Applies a batch of likes atomically
    ///
    /// Every row is validated before the write lock is taken; one invalid
    /// identifier rejects the whole batch and leaves the graph untouched.
    pub fn replay<I>(&self, interactions: I) -> GraphResult<usize>
    where
        I: IntoIterator<Item = Interaction>,
    {
        let edges = interactions
            .into_iter()
            .map(|row| {
                let (user, item) = row.validate()?;
                Ok((user, item, row.timestamp))
            })
            .collect::<GraphResult<Vec<_>>>()?;

        let mut graph = self.graph.write();
        for &(user, item, timestamp) in &edges {
            graph.add_edge(user, item, timestamp);
        }
        drop(graph);

        tracing::info!(applied = edges.len(), "Interactions replayed");
        Ok(edges.len())
    }

    /// Replays only rows at or after `watermark`
    ///
    /// Inclusive, so rows sharing the newest snapshot second are never lost;
    /// re-adding an edge with its own timestamp leaves the graph unchanged.
    pub fn replay_since<I>(&self, interactions: I, watermark: Option<Timestamp>) -> GraphResult<usize>
    where
        I: IntoIterator<Item = Interaction>,
    {
        match watermark {
            Some(since) => self.replay(interactions.into_iter().filter(|row| row.timestamp >= since)),
            None => self.replay(interactions),
        }
    }

    /// Ranks candidates for the query; an empty list means "no graph signal"
    pub fn recommend(
        &self,
        query: &RecommendQuery,
        categories: &dyn CategoryLookup,
    ) -> GraphResult<Vec<Recommendation>> {
        let mut rng = self.walk_rng();
        self.recommend_with_rng(query, categories, &mut rng)
    }

    /// Same as [`recommend`](Self::recommend) with a caller-supplied random source
    pub fn recommend_with_rng<R: Rng + ?Sized>(
        &self,
        query: &RecommendQuery,
        categories: &dyn CategoryLookup,
        rng: &mut R,
    ) -> GraphResult<Vec<Recommendation>> {
        let start = Instant::now();
        let (user, exclude) = query.resolve()?;
        let now = query.now.unwrap_or_else(|| Utc::now().timestamp());
        let scoring = &self.settings.scoring;

        let graph = self.graph.read();
        let results = match query.algorithm {
            Algorithm::Bfs => WeightedBfs::new(&graph, scoring, categories, now).recommend(
                user,
                query.k,
                &query.genre_prefs,
                &exclude,
            ),
            Algorithm::PageRank => {
                let num_walks = query.num_walks.unwrap_or(self.settings.walks.num_walks);
                PersonalizedPageRank::new(&graph, scoring, categories, now, self.settings.walks)
                    .recommend(user, query.k, &query.genre_prefs, &exclude, num_walks, rng)
            }
        };
        drop(graph);

        tracing::debug!(
            user = %user,
            algorithm = %query.algorithm,
            k = query.k,
            returned = results.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Recommendation computed"
        );

        Ok(results)
    }

    /// Encodes the full current graph
    pub fn save_snapshot(&self) -> Vec<u8> {
        let graph = self.graph.read();
        let bytes = codec::save(&graph);

        tracing::info!(
            edges = graph.edge_count(),
            bytes = bytes.len(),
            "Graph snapshot saved"
        );
        bytes
    }

    /// Replaces the graph with a decoded snapshot
    ///
    /// Decoding happens before the write lock is taken; on failure the
    /// current graph is left exactly as it was.
    pub fn load_snapshot(&self, bytes: &[u8]) -> GraphResult<GraphStats> {
        let loaded = codec::load(bytes).map_err(|e| {
            tracing::warn!(error = %e, bytes = bytes.len(), "Rejected graph snapshot");
            e
        })?;
        let stats = loaded.stats();
        *self.graph.write() = loaded;

        tracing::info!(
            users = stats.users,
            items = stats.items,
            edges = stats.edges,
            "Graph snapshot loaded"
        );
        Ok(stats)
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.read().stats()
    }

    pub fn item_count(&self) -> usize {
        self.graph.read().item_count()
    }

    /// Items a user likes, sorted by item ID
    pub fn neighbors_of_user(&self, user_id: i64) -> GraphResult<Vec<(ItemId, Timestamp)>> {
        let user = UserId::new(user_id)?;
        let mut neighbors: Vec<_> = self.graph.read().neighbors_of_user(user).collect();
        neighbors.sort_unstable();
        Ok(neighbors)
    }

    /// Users who like an item, sorted by user ID
    pub fn neighbors_of_item(&self, item_id: i64) -> GraphResult<Vec<(UserId, Timestamp)>> {
        let item = ItemId::new(item_id)?;
        let mut neighbors: Vec<_> = self.graph.read().neighbors_of_item(item).collect();
        neighbors.sort_unstable();
        Ok(neighbors)
    }

    /// Runs `f` against the graph under the read lock
    pub fn with_graph_read<T>(&self, f: impl FnOnce(&GraphStore) -> T) -> T {
        let graph = self.graph.read();
        f(&graph)
    }

    fn walk_rng(&self) -> ChaCha8Rng {
        match self.settings.walk_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}
