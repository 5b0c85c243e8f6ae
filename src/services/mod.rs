pub mod bfs;
pub mod lifecycle;
pub mod pagerank;
pub mod recommendations;
pub mod scoring;

pub use bfs::WeightedBfs;
pub use lifecycle::{persist_on_shutdown, warm_start, StartOrigin, WarmStart};
pub use pagerank::{PersonalizedPageRank, WalkSettings};
pub use recommendations::{EngineSettings, RecommendationEngine};
pub use scoring::ScoringPolicy;

use crate::models::{ItemId, Recommendation};

/// Orders candidates by score descending, then item ID ascending, keeping `k`
pub(crate) fn rank_top_k<I>(scores: I, k: usize) -> Vec<Recommendation>
where
    I: IntoIterator<Item = (ItemId, f64)>,
{
    let mut ranked: Vec<Recommendation> = scores
        .into_iter()
        .map(|(item_id, score)| Recommendation { item_id, score })
        .collect();
    ranked.sort_unstable_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    ranked.truncate(k);
    ranked
}
