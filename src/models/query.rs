use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;

use crate::error::GraphResult;

use super::{GenrePrefs, ItemId, Timestamp, UserId};

/// Ranking algorithm selector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Depth-2 weighted breadth-first search: deterministic and explainable
    #[default]
    Bfs,
    /// Monte Carlo personalized PageRank: global and probabilistic
    #[serde(alias = "ppr")]
    PageRank,
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Bfs => write!(f, "bfs"),
            Algorithm::PageRank => write!(f, "pagerank"),
        }
    }
}

/// One ranked candidate
///
/// `score` is the accumulated path weight for BFS and the visit frequency
/// (visits / walks) for PageRank.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Recommendation {
    pub item_id: ItemId,
    pub score: f64,
}

/// A recommendation read request
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RecommendQuery {
    #[serde(default)]
    pub algorithm: Algorithm,
    pub user_id: i64,
    pub k: usize,
    #[serde(default)]
    pub genre_prefs: GenrePrefs,
    /// Items the caller never wants back, typically the user's history
    #[serde(default)]
    pub exclude_ids: HashSet<i64>,
    /// Overrides the configured walk budget (PageRank only)
    #[serde(default)]
    pub num_walks: Option<usize>,
    /// Overrides the wall clock used for time decay
    #[serde(default)]
    pub now: Option<Timestamp>,
}

impl RecommendQuery {
    pub fn new(algorithm: Algorithm, user_id: i64, k: usize) -> Self {
        Self {
            algorithm,
            user_id,
            k,
            genre_prefs: GenrePrefs::new(),
            exclude_ids: HashSet::new(),
            num_walks: None,
            now: None,
        }
    }

    pub fn with_genres(mut self, genre_prefs: GenrePrefs) -> Self {
        self.genre_prefs = genre_prefs;
        self
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.exclude_ids.extend(ids);
        self
    }

    pub fn with_walks(mut self, num_walks: usize) -> Self {
        self.num_walks = Some(num_walks);
        self
    }

    pub fn at(mut self, now: Timestamp) -> Self {
        self.now = Some(now);
        self
    }

    /// Validates the source user and every excluded item
    pub(crate) fn resolve(&self) -> GraphResult<(UserId, HashSet<ItemId>)> {
        let user = UserId::new(self.user_id)?;
        let exclude = self
            .exclude_ids
            .iter()
            .map(|&id| ItemId::new(id))
            .collect::<GraphResult<HashSet<_>>>()?;
        Ok((user, exclude))
    }
}
