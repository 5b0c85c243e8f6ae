use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Genre labels a user has opted into
///
/// Supplied by the caller on every query. Labels are opaque strings and are
/// matched exactly against item categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct GenrePrefs {
    genres: HashSet<String>,
}

impl GenrePrefs {
    /// Creates an empty preference set (pure recency scoring)
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a genre label
    pub fn add_genre(&mut self, genre: impl Into<String>) {
        self.genres.insert(genre.into());
    }

    pub fn contains(&self, genre: &str) -> bool {
        self.genres.contains(genre)
    }

    /// True when the item's category is one of the user's genres
    pub fn matches(&self, category: Option<&str>) -> bool {
        category.is_some_and(|c| self.contains(c))
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }
}

impl<S: Into<String>> FromIterator<S> for GenrePrefs {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            genres: iter.into_iter().map(Into::into).collect(),
        }
    }
}
