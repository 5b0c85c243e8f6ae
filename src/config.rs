use serde::Deserialize;

use crate::services::{
    pagerank::{DEFAULT_CONTINUE_PROBABILITY, DEFAULT_MAX_DEPTH, DEFAULT_NUM_WALKS},
    scoring::{DEFAULT_DECAY_RATE, DEFAULT_GENRE_BOOST},
    EngineSettings, ScoringPolicy, WalkSettings,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// File holding the latest graph snapshot
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// JSON-lines export of the interactions table
    #[serde(default = "default_interactions_path")]
    pub interactions_path: String,

    /// Time-decay rate per day
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,

    /// Additive weight bonus for preferred genres
    #[serde(default = "default_genre_boost")]
    pub genre_boost: f64,

    /// Default PageRank walk budget
    #[serde(default = "default_num_walks")]
    pub num_walks: usize,

    /// Maximum item visits per walk
    #[serde(default = "default_max_walk_depth")]
    pub max_walk_depth: usize,

    /// Walk continuation probability after the first full cycle
    #[serde(default = "default_continue_probability")]
    pub continue_probability: f64,

    /// Walker threads per PageRank query
    #[serde(default = "default_walk_threads")]
    pub walk_threads: usize,

    /// Fixed seed for reproducible PageRank output
    #[serde(default)]
    pub walk_seed: Option<u64>,
}

fn default_snapshot_path() -> String {
    "graph.bin".to_string()
}

fn default_interactions_path() -> String {
    "interactions.jsonl".to_string()
}

fn default_decay_rate() -> f64 {
    DEFAULT_DECAY_RATE
}

fn default_genre_boost() -> f64 {
    DEFAULT_GENRE_BOOST
}

fn default_num_walks() -> usize {
    DEFAULT_NUM_WALKS
}

fn default_max_walk_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_continue_probability() -> f64 {
    DEFAULT_CONTINUE_PROBABILITY
}

fn default_walk_threads() -> usize {
    1
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            anyhow::bail!("DECAY_RATE must be a non-negative number, got {}", self.decay_rate);
        }
        if !self.genre_boost.is_finite() || self.genre_boost < 0.0 {
            anyhow::bail!("GENRE_BOOST must be a non-negative number, got {}", self.genre_boost);
        }
        if !(0.0..=1.0).contains(&self.continue_probability) {
            anyhow::bail!(
                "CONTINUE_PROBABILITY must be within [0, 1], got {}",
                self.continue_probability
            );
        }
        if self.max_walk_depth == 0 {
            anyhow::bail!("MAX_WALK_DEPTH must be at least 1");
        }
        if self.walk_threads == 0 {
            anyhow::bail!("WALK_THREADS must be at least 1");
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            scoring: ScoringPolicy::new(self.decay_rate, self.genre_boost),
            walks: WalkSettings {
                num_walks: self.num_walks,
                max_depth: self.max_walk_depth,
                continue_probability: self.continue_probability,
                threads: self.walk_threads,
            },
            walk_seed: self.walk_seed,
        }
    }
}
