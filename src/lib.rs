pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{GraphError, GraphResult};
pub use graph::GraphStore;
pub use models::{
    Algorithm, GenrePrefs, GraphStats, Interaction, ItemCatalog, ItemId, RecommendQuery,
    Recommendation, UserId,
};
pub use services::{EngineSettings, RecommendationEngine, ScoringPolicy, WalkSettings};
