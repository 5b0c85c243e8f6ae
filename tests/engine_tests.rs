use std::collections::{HashMap, HashSet};
use std::thread;

use graphrec_engine::{
    db::{FileSnapshotStore, JsonlInteractionSource, SnapshotStore},
    models::CatalogItem,
    services::{persist_on_shutdown, warm_start, StartOrigin},
    Algorithm, EngineSettings, GenrePrefs, GraphError, Interaction, ItemCatalog, ItemId,
    RecommendQuery, RecommendationEngine, ScoringPolicy,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const T0: i64 = 1_700_000_000;

fn seeded_engine() -> RecommendationEngine {
    RecommendationEngine::new(EngineSettings {
        walk_seed: Some(7),
        ..EngineSettings::default()
    })
}

fn item_ids(recs: &[graphrec_engine::Recommendation]) -> Vec<i64> {
    recs.iter().map(|r| i64::from(r.item_id)).collect()
}

#[test]
fn test_bfs_single_path_scenario() {
    let engine = seeded_engine();
    engine.add_interaction(1, 1, T0).unwrap();
    engine.add_interaction(2, 1, T0).unwrap();
    engine.add_interaction(2, 2, T0).unwrap();

    let query = RecommendQuery::new(Algorithm::Bfs, 1, 5).excluding([1]).at(T0);
    let recs = engine.recommend(&query, &ItemCatalog::new()).unwrap();

    assert_eq!(item_ids(&recs), vec![2]);
    let w = ScoringPolicy::default().edge_weight(T0, T0, None, &GenrePrefs::new());
    assert!((recs[0].score - w * w).abs() < 1e-12);
}

#[test]
fn test_user_without_edges_gets_empty_lists() {
    let engine = seeded_engine();
    engine.add_interaction(2, 1, T0).unwrap();
    engine.add_interaction(3, 1, T0).unwrap();

    for algorithm in [Algorithm::Bfs, Algorithm::PageRank] {
        let query = RecommendQuery::new(algorithm, 99, 10).at(T0);
        let recs = engine.recommend(&query, &ItemCatalog::new()).unwrap();
        assert!(recs.is_empty(), "{} should have no signal", algorithm);
    }
}

#[test]
fn test_genre_preference_raises_boosted_item() {
    let engine = seeded_engine();
    engine.add_interaction(1, 1, T0).unwrap();
    engine.add_interaction(2, 1, T0).unwrap();
    engine.add_interaction(2, 2, T0).unwrap();
    engine.add_interaction(2, 3, T0).unwrap();

    let catalog: ItemCatalog = [
        CatalogItem {
            id: ItemId::new(2).unwrap(),
            title: "Heat".to_string(),
            category: "action".to_string(),
        },
        CatalogItem {
            id: ItemId::new(3).unwrap(),
            title: "Amelie".to_string(),
            category: "romance".to_string(),
        },
    ]
    .into_iter()
    .collect();

    let plain = RecommendQuery::new(Algorithm::Bfs, 1, 5).at(T0);
    let plain = engine.recommend(&plain, &catalog).unwrap();
    assert_eq!(item_ids(&plain), vec![2, 3]);
    assert_eq!(plain[0].score, plain[1].score);

    let prefs: GenrePrefs = ["action"].into_iter().collect();
    let boosted = RecommendQuery::new(Algorithm::Bfs, 1, 5)
        .with_genres(prefs)
        .at(T0);
    let boosted = engine.recommend(&boosted, &catalog).unwrap();
    assert_eq!(item_ids(&boosted), vec![2, 3]);
    assert!(boosted[0].score > plain[0].score);
    assert!(boosted[0].score > boosted[1].score);
}

#[test]
fn test_category_map_works_as_lookup() {
    let engine = seeded_engine();
    engine.add_interaction(1, 1, T0).unwrap();
    engine.add_interaction(2, 1, T0).unwrap();
    engine.add_interaction(2, 4, T0).unwrap();
    engine.add_interaction(2, 5, T0).unwrap();

    let categories = HashMap::from([(ItemId::new(5).unwrap(), "drama".to_string())]);
    let prefs: GenrePrefs = ["drama"].into_iter().collect();
    let query = RecommendQuery::new(Algorithm::Bfs, 1, 1).with_genres(prefs).at(T0);

    let recs = engine.recommend(&query, &categories).unwrap();
    assert_eq!(item_ids(&recs), vec![5]);
}

#[test]
fn test_pagerank_seeded_query_is_reproducible() {
    let engine = seeded_engine();
    for (user, item) in [(1, 1), (1, 2), (2, 1), (2, 3), (3, 2), (3, 4), (4, 3), (4, 5)] {
        engine.add_interaction(user, item, T0).unwrap();
    }

    let query = RecommendQuery::new(Algorithm::PageRank, 1, 10)
        .with_walks(500)
        .excluding([1, 2])
        .at(T0);
    let first = engine.recommend(&query, &ItemCatalog::new()).unwrap();
    let second = engine.recommend(&query, &ItemCatalog::new()).unwrap();
    assert_eq!(first, second);

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let injected = engine
        .recommend_with_rng(&query, &ItemCatalog::new(), &mut rng)
        .unwrap();
    assert_eq!(first, injected);

    assert!(!first.is_empty());
    for rec in &first {
        assert!(rec.score > 0.0 && rec.score <= 3.0);
        assert!(![1, 2].contains(&i64::from(rec.item_id)));
    }
}

#[test]
fn test_invalid_identifiers_are_rejected_before_mutation() {
    let engine = seeded_engine();
    engine.add_interaction(1, 1, T0).unwrap();
    let before = engine.stats();

    assert!(matches!(
        engine.add_interaction(0, 1, T0),
        Err(GraphError::InvalidIdentifier { .. })
    ));
    assert!(engine.add_interaction(1, -3, T0).is_err());
    assert!(engine.remove_interaction(-1, 1).is_err());
    assert!(engine
        .replay(vec![Interaction::new(5, 5, T0), Interaction::new(6, 0, T0)])
        .is_err());

    let query = RecommendQuery::new(Algorithm::Bfs, 1, 5).excluding([-2]);
    assert!(engine.recommend(&query, &ItemCatalog::new()).is_err());

    assert_eq!(engine.stats(), before);
}

#[test]
fn test_remove_twice_is_idempotent() {
    let engine = seeded_engine();
    engine.add_interaction(1, 1, T0).unwrap();
    engine.add_interaction(1, 2, T0).unwrap();

    assert!(engine.remove_interaction(1, 1).unwrap());
    let after_first = engine.stats();
    assert!(!engine.remove_interaction(1, 1).unwrap());
    assert_eq!(engine.stats(), after_first);
    assert_eq!(after_first.edges, 1);
}

#[test]
fn test_snapshot_round_trip_between_engines() {
    let source = seeded_engine();
    source
        .replay(vec![
            Interaction::new(1, 10, T0),
            Interaction::new(1, 11, T0 + 5),
            Interaction::new(2, 10, T0 - 5),
        ])
        .unwrap();

    let target = seeded_engine();
    let stats = target.load_snapshot(&source.save_snapshot()).unwrap();
    assert_eq!(stats, source.stats());
    assert_eq!(
        target.neighbors_of_user(1).unwrap(),
        source.neighbors_of_user(1).unwrap()
    );
    assert_eq!(
        target.neighbors_of_item(10).unwrap(),
        source.neighbors_of_item(10).unwrap()
    );
}

#[test]
fn test_corrupt_snapshot_keeps_current_graph() {
    let engine = seeded_engine();
    engine.add_interaction(1, 1, T0).unwrap();
    let mut bytes = engine.save_snapshot();
    bytes.truncate(bytes.len() - 1);

    let err = engine.load_snapshot(&bytes).unwrap_err();
    assert!(err.is_corrupt_snapshot());
    assert_eq!(engine.stats().edges, 1);
}

#[test]
fn test_concurrent_readers_and_writers() {
    let engine = seeded_engine();
    engine.add_interaction(1, 1, T0).unwrap();

    thread::scope(|scope| {
        for writer in 0..4i64 {
            let engine = engine.clone();
            scope.spawn(move || {
                for n in 0..50i64 {
                    let user = 100 + writer;
                    engine.add_interaction(user, 1 + n % 7, T0 + n).unwrap();
                }
            });
        }
        for _ in 0..4 {
            let engine = engine.clone();
            scope.spawn(move || {
                let query = RecommendQuery::new(Algorithm::Bfs, 1, 5).at(T0);
                for _ in 0..50 {
                    let recs = engine.recommend(&query, &ItemCatalog::new()).unwrap();
                    let ids: HashSet<i64> = item_ids(&recs).into_iter().collect();
                    assert!(!ids.contains(&1));
                }
            });
        }
    });

    let stats = engine.stats();
    assert_eq!(stats.users, 5);
    assert_eq!(stats.items, 7);
    assert_eq!(stats.edges, 1 + 4 * 7);
    engine.with_graph_read(|graph| {
        for (user, item, _) in graph.edges() {
            assert!(graph.neighbors_of_item(item).any(|(u, _)| u == user));
        }
    });
}

#[tokio::test]
async fn test_file_backed_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("state").join("graph.bin");
    let interactions_path = dir.path().join("interactions.jsonl");

    let rows = [
        Interaction::new(1, 10, 100),
        Interaction::new(2, 10, 200),
        Interaction::new(2, 11, 300),
    ];
    let contents: String = rows
        .iter()
        .map(|row| serde_json::to_string(row).unwrap() + "\n")
        .collect();
    tokio::fs::write(&interactions_path, contents).await.unwrap();

    let snapshots = FileSnapshotStore::new(&snapshot_path);
    let source = JsonlInteractionSource::new(&interactions_path);

    let first = seeded_engine();
    let outcome = warm_start(&first, &snapshots, &source).await.unwrap();
    assert_eq!(outcome.origin, StartOrigin::Rebuilt);
    assert_eq!(outcome.replayed, 3);
    assert!(snapshots.fetch_latest().await.unwrap().is_some());

    first.add_interaction(3, 12, 400).unwrap();
    assert!(persist_on_shutdown(&first, &snapshots).await.unwrap());

    let second = seeded_engine();
    let outcome = warm_start(&second, &snapshots, &source).await.unwrap();
    assert_eq!(outcome.origin, StartOrigin::Snapshot);
    assert_eq!(outcome.replayed, 0);
    assert_eq!(outcome.stats, first.stats());
}
