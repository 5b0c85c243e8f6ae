use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::graph::GraphStore;
use crate::models::{CategoryLookup, GenrePrefs, ItemId, Recommendation, Timestamp, UserId};

use super::{rank_top_k, ScoringPolicy};

pub const DEFAULT_NUM_WALKS: usize = 10_000;
pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_CONTINUE_PROBABILITY: f64 = 0.85;

/// Walk termination and parallelism knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkSettings {
    /// Walk budget when the query does not override it
    pub num_walks: usize,
    /// Maximum item visits per walk
    pub max_depth: usize,
    /// Chance of taking each user → item hop after the first full cycle
    pub continue_probability: f64,
    /// Walker threads per query
    pub threads: usize,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            num_walks: DEFAULT_NUM_WALKS,
            max_depth: DEFAULT_MAX_DEPTH,
            continue_probability: DEFAULT_CONTINUE_PROBABILITY,
            threads: 1,
        }
    }
}

/// Monte Carlo personalized PageRank over the bipartite graph
///
/// Each walk starts at the source user and alternates user → item and
/// item → user hops, choosing the next node with probability proportional
/// to the edge weight. Every item visit is counted. The first two item
/// visits (one full user → item → user → item cycle) are unconditional;
/// each further one happens with `continue_probability`, and no walk
/// visits more than `max_depth` items. Nodes without edges end the walk.
///
/// Scores are visit frequencies: visits divided by the number of walks.
pub struct PersonalizedPageRank<'a> {
    graph: &'a GraphStore,
    scoring: &'a ScoringPolicy,
    categories: &'a dyn CategoryLookup,
    now: Timestamp,
    settings: WalkSettings,
}

impl<'a> PersonalizedPageRank<'a> {
    pub fn new(
        graph: &'a GraphStore,
        scoring: &'a ScoringPolicy,
        categories: &'a dyn CategoryLookup,
        now: Timestamp,
        settings: WalkSettings,
    ) -> Self {
        Self {
            graph,
            scoring,
            categories,
            now,
            settings,
        }
    }

    /// Ranks up to `k` items by visit frequency, excluding `exclude`
    ///
    /// A source user without edges yields an empty list.
    pub fn recommend<R: Rng + ?Sized>(
        &self,
        user: UserId,
        k: usize,
        genre_prefs: &GenrePrefs,
        exclude: &HashSet<ItemId>,
        num_walks: usize,
        rng: &mut R,
    ) -> Vec<Recommendation> {
        if k == 0 || num_walks == 0 || self.settings.max_depth == 0 {
            return Vec::new();
        }
        if self.graph.user_degree(user) == 0 {
            tracing::debug!(user = %user, "Source user has no edges, skipping walks");
            return Vec::new();
        }

        let visits = self.simulate(user, genre_prefs, num_walks, rng);

        tracing::debug!(
            user = %user,
            walks = num_walks,
            visited_items = visits.len(),
            "Personalized PageRank walks finished"
        );

        let total = num_walks as f64;
        let frequencies = visits
            .into_iter()
            .filter(|(item, _)| !exclude.contains(item))
            .map(|(item, count)| (item, count as f64 / total));
        rank_top_k(frequencies, k)
    }

    /// Runs all walks, splitting them across walker threads when configured
    ///
    /// Each thread owns its counters and an RNG seeded from `rng`, so a
    /// seeded `rng` gives the same visits for the same thread count.
    fn simulate<R: Rng + ?Sized>(
        &self,
        user: UserId,
        genre_prefs: &GenrePrefs,
        num_walks: usize,
        rng: &mut R,
    ) -> HashMap<ItemId, u64> {
        let threads = self.settings.threads.clamp(1, num_walks);
        if threads == 1 {
            return self.run_walks(user, genre_prefs, num_walks, rng);
        }

        let seeds: Vec<u64> = (0..threads).map(|_| rng.gen()).collect();
        let per_thread = num_walks / threads;
        let remainder = num_walks % threads;

        std::thread::scope(|scope| {
            let handles: Vec<_> = seeds
                .into_iter()
                .enumerate()
                .map(|(index, seed)| {
                    let walks = per_thread + usize::from(index < remainder);
                    scope.spawn(move || {
                        let mut local_rng = ChaCha8Rng::seed_from_u64(seed);
                        self.run_walks(user, genre_prefs, walks, &mut local_rng)
                    })
                })
                .collect();

            let mut merged: HashMap<ItemId, u64> = HashMap::new();
            for handle in handles {
                let local = match handle.join() {
                    Ok(local) => local,
                    Err(panic) => std::panic::resume_unwind(panic),
                };
                for (item, count) in local {
                    *merged.entry(item).or_insert(0) += count;
                }
            }
            merged
        })
    }

    fn run_walks<R: Rng + ?Sized>(
        &self,
        source: UserId,
        genre_prefs: &GenrePrefs,
        walks: usize,
        rng: &mut R,
    ) -> HashMap<ItemId, u64> {
        let mut transitions = Transitions::new(self, genre_prefs);
        let mut visits: HashMap<ItemId, u64> = HashMap::new();

        for _ in 0..walks {
            let mut current = source;
            for depth in 0..self.settings.max_depth {
                if depth >= 2 && rng.gen::<f64>() >= self.settings.continue_probability {
                    break;
                }
                let Some(item) = transitions.next_item(current, rng) else {
                    break;
                };
                *visits.entry(item).or_insert(0) += 1;

                if depth + 1 == self.settings.max_depth {
                    break;
                }
                let Some(user) = transitions.next_user(item, rng) else {
                    break;
                };
                current = user;
            }
        }

        visits
    }
}

/// Weighted choice among a node's neighbors, sorted by ID
struct Choices<T> {
    targets: Vec<T>,
    distribution: WeightedIndex<f64>,
}

impl<T: Copy + Ord> Choices<T> {
    fn build(mut weighted: Vec<(T, f64)>) -> Option<Self> {
        weighted.sort_unstable_by_key(|&(target, _)| target);
        let distribution = WeightedIndex::new(weighted.iter().map(|(_, w)| *w)).ok()?;
        Some(Self {
            targets: weighted.into_iter().map(|(target, _)| target).collect(),
            distribution,
        })
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.targets[self.distribution.sample(rng)]
    }
}

/// Per-query memo of transition distributions
///
/// Edge weights depend only on `now` and the genre set, both fixed for a
/// query, so each node's distribution is built once and reused by every walk.
struct Transitions<'p, 'a> {
    ppr: &'p PersonalizedPageRank<'a>,
    genre_prefs: &'p GenrePrefs,
    from_users: HashMap<UserId, Option<Choices<ItemId>>>,
    from_items: HashMap<ItemId, Option<Choices<UserId>>>,
}

impl<'p, 'a> Transitions<'p, 'a> {
    fn new(ppr: &'p PersonalizedPageRank<'a>, genre_prefs: &'p GenrePrefs) -> Self {
        Self {
            ppr,
            genre_prefs,
            from_users: HashMap::new(),
            from_items: HashMap::new(),
        }
    }

    fn weight(&self, item: ItemId, ts: Timestamp) -> f64 {
        self.ppr.scoring.edge_weight(
            ts,
            self.ppr.now,
            self.ppr.categories.category_of(item),
            self.genre_prefs,
        )
    }

    fn next_item<R: Rng + ?Sized>(&mut self, user: UserId, rng: &mut R) -> Option<ItemId> {
        if !self.from_users.contains_key(&user) {
            let weighted: Vec<(ItemId, f64)> = self
                .ppr
                .graph
                .neighbors_of_user(user)
                .map(|(item, ts)| (item, self.weight(item, ts)))
                .collect();
            self.from_users.insert(user, Choices::build(weighted));
        }
        sample_from(&self.from_users, &user, rng)
    }

    fn next_user<R: Rng + ?Sized>(&mut self, item: ItemId, rng: &mut R) -> Option<UserId> {
        if !self.from_items.contains_key(&item) {
            let weighted: Vec<(UserId, f64)> = self
                .ppr
                .graph
                .neighbors_of_item(item)
                .map(|(user, ts)| (user, self.weight(item, ts)))
                .collect();
            self.from_items.insert(item, Choices::build(weighted));
        }
        sample_from(&self.from_items, &item, rng)
    }
}

fn sample_from<K: Eq + Hash, T: Copy + Ord, R: Rng + ?Sized>(
    memo: &HashMap<K, Option<Choices<T>>>,
    node: &K,
    rng: &mut R,
) -> Option<T> {
    memo.get(node)
        .and_then(Option::as_ref)
        .map(|choices| choices.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemCatalog;
    use rand::rngs::mock::StepRng;

    const NOW: i64 = 1_700_000_000;

    fn user(id: i64) -> UserId {
        UserId::new(id).unwrap()
    }

    fn item(id: i64) -> ItemId {
        ItemId::new(id).unwrap()
    }

    fn graph_of(edges: &[(i64, i64, i64)]) -> GraphStore {
        let mut graph = GraphStore::new();
        for &(u, i, ts) in edges {
            graph.add_edge(user(u), item(i), ts);
        }
        graph
    }

    fn settings(max_depth: usize, continue_probability: f64, threads: usize) -> WalkSettings {
        WalkSettings {
            num_walks: 1_000,
            max_depth,
            continue_probability,
            threads,
        }
    }

    #[test]
    fn test_single_edge_exact_visits() {
        // The only walk possible is 1 → 1 → 1 → 1 → ...
        let graph = graph_of(&[(1, 1, NOW)]);
        let policy = ScoringPolicy::default();
        let catalog = ItemCatalog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let always = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(3, 1.0, 1));
        let recs = always.recommend(user(1), 5, &GenrePrefs::new(), &HashSet::new(), 100, &mut rng);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].score, 3.0);

        let never = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(3, 0.0, 1));
        let recs = never.recommend(user(1), 5, &GenrePrefs::new(), &HashSet::new(), 100, &mut rng);
        assert_eq!(recs[0].score, 2.0);
    }

    fn chain() -> GraphStore {
        graph_of(&[(1, 1, NOW), (2, 1, NOW), (2, 2, NOW), (3, 2, NOW), (3, 3, NOW)])
    }

    fn visit_counts(recs: &[Recommendation], walks: usize) -> Vec<(i64, u64)> {
        recs.iter()
            .map(|r| (i64::from(r.item_id), (r.score * walks as f64).round() as u64))
            .collect()
    }

    #[test]
    fn test_visits_bounded_by_depth() {
        // No dead ends and no early stop: every walk makes exactly four visits.
        let graph = chain();
        let policy = ScoringPolicy::default();
        let catalog = ItemCatalog::new();
        let ppr = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(4, 1.0, 1));
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let walks = 500;
        let recs = ppr.recommend(user(1), 10, &GenrePrefs::new(), &HashSet::new(), walks, &mut rng);
        let counts = visit_counts(&recs, walks);
        let total: u64 = counts.iter().map(|&(_, n)| n).sum();
        assert_eq!(total, 4 * walks as u64);

        // User 1 only reaches item 1 on the first hop.
        let first = counts.iter().find(|&&(id, _)| id == 1).map(|&(_, n)| n);
        assert!(first >= Some(walks as u64));
    }

    #[test]
    fn test_fixed_rng_streams_give_exact_visits() {
        let graph = chain();
        let policy = ScoringPolicy::default();
        let catalog = ItemCatalog::new();
        let ppr = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(4, 0.85, 1));
        let walks = 10;

        // All-zero draws always take the lowest neighbor and never stop early:
        // 1 -> i1 -> 1 -> i1 -> 1 -> i1 -> 1 -> i1.
        let mut low = StepRng::new(0, 0);
        let recs = ppr.recommend(user(1), 10, &GenrePrefs::new(), &HashSet::new(), walks, &mut low);
        assert_eq!(visit_counts(&recs, walks), vec![(1, 40)]);
        assert_eq!(recs[0].score, 4.0);

        // All-one draws take the highest neighbor:
        // 1 -> i1 -> 2 -> i2 -> 3 -> i3 -> 3 -> i3.
        let always = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(4, 1.0, 1));
        let mut high = StepRng::new(u64::MAX, 0);
        let recs = always.recommend(user(1), 10, &GenrePrefs::new(), &HashSet::new(), walks, &mut high);
        assert_eq!(visit_counts(&recs, walks), vec![(3, 20), (1, 10), (2, 10)]);
        assert_eq!(recs[0].score, 2.0);
        assert_eq!(recs[1].score, 1.0);
    }

    #[test]
    fn test_cold_start_user_is_empty() {
        let graph = graph_of(&[(2, 1, NOW)]);
        let policy = ScoringPolicy::default();
        let catalog = ItemCatalog::new();
        let ppr = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, WalkSettings::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let recs = ppr.recommend(user(1), 5, &GenrePrefs::new(), &HashSet::new(), 1_000, &mut rng);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_exclusions_removed() {
        let graph = graph_of(&[(1, 1, NOW), (2, 1, NOW), (2, 2, NOW)]);
        let policy = ScoringPolicy::default();
        let catalog = ItemCatalog::new();
        let ppr = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(3, 1.0, 1));
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let exclude = HashSet::from([item(1)]);
        let recs = ppr.recommend(user(1), 5, &GenrePrefs::new(), &exclude, 2_000, &mut rng);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].item_id, item(2));
        assert!(recs[0].score > 0.0);
    }

    #[test]
    fn test_same_seed_same_ranking() {
        let graph = graph_of(&[
            (1, 1, NOW),
            (1, 2, NOW - 86_400 * 40),
            (2, 1, NOW),
            (2, 3, NOW),
            (3, 2, NOW),
            (3, 4, NOW),
            (4, 3, NOW),
            (4, 5, NOW),
        ]);
        let policy = ScoringPolicy::default();
        let catalog = ItemCatalog::new();

        for threads in [1, 4] {
            let ppr = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(3, 0.85, threads));
            let run = |seed: u64| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                ppr.recommend(user(1), 10, &GenrePrefs::new(), &HashSet::new(), 3_000, &mut rng)
            };
            assert_eq!(run(42), run(42));
        }
    }

    #[test]
    fn test_threads_conserve_walk_budget() {
        // With one edge and no early stop every walk makes exactly three visits.
        let graph = graph_of(&[(1, 1, NOW)]);
        let policy = ScoringPolicy::default();
        let catalog = ItemCatalog::new();
        let ppr = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(3, 1.0, 3));
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let recs = ppr.recommend(user(1), 1, &GenrePrefs::new(), &HashSet::new(), 1_001, &mut rng);
        assert_eq!(recs[0].score, 3.0);
    }

    #[test]
    fn test_weighted_sampling_prefers_boosted_genre() {
        // User 1 reaches item 2 and item 3 only through neighbor 2.
        let graph = graph_of(&[(1, 1, NOW), (2, 1, NOW), (2, 2, NOW), (2, 3, NOW)]);
        let policy = ScoringPolicy::new(0.05, 4.0);
        let mut catalog = ItemCatalog::new();
        catalog.set_category(2, "Crime").unwrap();
        catalog.set_category(3, "Action").unwrap();
        let ppr = PersonalizedPageRank::new(&graph, &policy, &catalog, NOW, settings(2, 1.0, 1));
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let prefs: GenrePrefs = ["Action"].into_iter().collect();
        let exclude = HashSet::from([item(1)]);
        let recs = ppr.recommend(user(1), 5, &prefs, &exclude, 5_000, &mut rng);
        assert_eq!(recs[0].item_id, item(3));
    }
}
