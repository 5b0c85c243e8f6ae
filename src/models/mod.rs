use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{GraphError, GraphResult, IdKind};

pub mod catalog;
pub mod query;
pub mod user_preferences;

pub use catalog::{CatalogItem, CategoryLookup, ItemCatalog};
pub use query::{Algorithm, RecommendQuery, Recommendation};
pub use user_preferences::GenrePrefs;

/// Unix time in seconds
pub type Timestamp = i64;

/// Defines a graph node identifier.
///
/// Values are always in `1..=i64::MAX`, so a constructed ID is valid by
/// construction and converts back to `i64` losslessly.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(u64);

        impl $name {
            /// Validates a caller-supplied identifier
            pub fn new(raw: i64) -> GraphResult<Self> {
                if raw <= 0 {
                    return Err(GraphError::InvalidIdentifier {
                        kind: $kind,
                        value: raw,
                    });
                }
                Ok(Self(raw as u64))
            }

            /// Accepts an identifier read from a snapshot record
            pub(crate) fn from_raw(raw: u64) -> Option<Self> {
                if raw == 0 || raw > i64::MAX as u64 {
                    None
                } else {
                    Some(Self(raw))
                }
            }

            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = GraphError;

            fn try_from(raw: i64) -> GraphResult<Self> {
                Self::new(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0 as i64
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// A user node. Never compared against item IDs even when numerically equal.
    UserId,
    IdKind::User
);

define_id!(
    /// An item node.
    ItemId,
    IdKind::Item
);

/// A raw like-interaction as it arrives from the source of truth
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interaction {
    pub user_id: i64,
    pub item_id: i64,
    pub timestamp: Timestamp,
}

impl Interaction {
    pub fn new(user_id: i64, item_id: i64, timestamp: Timestamp) -> Self {
        Self {
            user_id,
            item_id,
            timestamp,
        }
    }

    /// Validates both identifiers before anything touches the graph
    pub fn validate(&self) -> GraphResult<(UserId, ItemId)> {
        Ok((UserId::new(self.user_id)?, ItemId::new(self.item_id)?))
    }
}

/// Diagnostic counters for a graph instance
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct GraphStats {
    pub users: usize,
    pub items: usize,
    pub edges: usize,
    /// Newest edge timestamp; the replay watermark after a snapshot load
    pub newest_timestamp: Option<Timestamp>,
}
