use std::collections::{HashMap, HashSet};

use crate::graph::GraphStore;
use crate::models::{CategoryLookup, GenrePrefs, ItemId, Recommendation, Timestamp, UserId};

use super::{rank_top_k, ScoringPolicy};

/// Depth-2 weighted traversal: user → item → neighbor user → candidate item
///
/// Every path `u → i → n → c` contributes `w(u, i) * w(n, c)` to candidate
/// `c`, so items liked by many of the user's neighbors accumulate rank. The
/// source user is never re-entered, and items the source already has an
/// edge to are never candidates. Ties are broken by ascending item ID.
pub struct WeightedBfs<'a> {
    graph: &'a GraphStore,
    scoring: &'a ScoringPolicy,
    categories: &'a dyn CategoryLookup,
    now: Timestamp,
}

impl<'a> WeightedBfs<'a> {
    pub fn new(
        graph: &'a GraphStore,
        scoring: &'a ScoringPolicy,
        categories: &'a dyn CategoryLookup,
        now: Timestamp,
    ) -> Self {
        Self {
            graph,
            scoring,
            categories,
            now,
        }
    }

    /// Ranks up to `k` candidates; an empty list means no local signal
    pub fn recommend(
        &self,
        user: UserId,
        k: usize,
        genre_prefs: &GenrePrefs,
        exclude: &HashSet<ItemId>,
    ) -> Vec<Recommendation> {
        if k == 0 {
            return Vec::new();
        }

        let scores = self.accumulate(user, genre_prefs, exclude);
        rank_top_k(scores, k)
    }

    fn accumulate(
        &self,
        user: UserId,
        genre_prefs: &GenrePrefs,
        exclude: &HashSet<ItemId>,
    ) -> HashMap<ItemId, f64> {
        let weight = |item: ItemId, ts: Timestamp| {
            self.scoring
                .edge_weight(ts, self.now, self.categories.category_of(item), genre_prefs)
        };

        // Outer hops are visited in ID order so float sums are reproducible.
        let mut own_items: Vec<_> = self.graph.neighbors_of_user(user).collect();
        own_items.sort_unstable_by_key(|&(item, _)| item);

        let mut scores: HashMap<ItemId, f64> = HashMap::new();
        for (via_item, own_ts) in own_items {
            let own_weight = weight(via_item, own_ts);

            let mut neighbors: Vec<UserId> = self
                .graph
                .neighbors_of_item(via_item)
                .map(|(neighbor, _)| neighbor)
                .filter(|&neighbor| neighbor != user)
                .collect();
            neighbors.sort_unstable();

            for neighbor in neighbors {
                for (candidate, ts) in self.graph.neighbors_of_user(neighbor) {
                    if exclude.contains(&candidate) || self.graph.has_edge(user, candidate) {
                        continue;
                    }
                    *scores.entry(candidate).or_insert(0.0) += own_weight * weight(candidate, ts);
                }
            }
        }

        tracing::debug!(
            user = %user,
            candidates = scores.len(),
            "Weighted BFS traversal finished"
        );

        scores
    }
}
