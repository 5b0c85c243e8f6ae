use crate::models::{GenrePrefs, Timestamp};

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Decay rate per day. Gives weights of ~0.4 after a month and ~0.1 after six.
pub const DEFAULT_DECAY_RATE: f64 = 0.05;

pub const DEFAULT_GENRE_BOOST: f64 = 0.5;

/// Per-edge weight shared by both ranking algorithms
///
/// `weight = (1 + boost) / (1 + decay_rate * age_days)`, where `boost` is
/// `genre_boost` when the edge's item category is among the user's genres
/// and zero otherwise. Ages are clamped at zero so clock skew can never
/// push a weight above `1 + boost`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    pub decay_rate: f64,
    pub genre_boost: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            decay_rate: DEFAULT_DECAY_RATE,
            genre_boost: DEFAULT_GENRE_BOOST,
        }
    }
}

impl ScoringPolicy {
    pub fn new(decay_rate: f64, genre_boost: f64) -> Self {
        Self {
            decay_rate,
            genre_boost,
        }
    }

    /// Weight of a single edge as seen at `now`
    pub fn edge_weight(
        &self,
        edge_timestamp: Timestamp,
        now: Timestamp,
        item_category: Option<&str>,
        genre_prefs: &GenrePrefs,
    ) -> f64 {
        let boost = if genre_prefs.matches(item_category) {
            self.genre_boost
        } else {
            0.0
        };
        (1.0 + boost) / (1.0 + self.decay_rate * age_in_days(edge_timestamp, now))
    }
}

/// Non-negative age of an edge in days
pub fn age_in_days(edge_timestamp: Timestamp, now: Timestamp) -> f64 {
    let seconds = now.saturating_sub(edge_timestamp).max(0);
    seconds as f64 / SECONDS_PER_DAY
}
