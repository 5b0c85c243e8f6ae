use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::GraphResult;

use super::ItemId;

/// Read-only item → category lookup consumed by scoring
///
/// The catalog belongs to the caller; the engine only borrows it for the
/// duration of a query. `Sync` because parallel walkers share it.
pub trait CategoryLookup: Sync {
    fn category_of(&self, item: ItemId) -> Option<&str>;
}

impl CategoryLookup for HashMap<ItemId, String> {
    fn category_of(&self, item: ItemId) -> Option<&str> {
        self.get(&item).map(String::as_str)
    }
}

/// A catalog entry as loaded from the item table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub category: String,
}

/// In-memory item catalog keyed by item ID
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    categories: HashMap<ItemId, String>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or replaces) the category of an item
    pub fn set_category(&mut self, item_id: i64, category: impl Into<String>) -> GraphResult<()> {
        let item = ItemId::new(item_id)?;
        self.categories.insert(item, category.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl FromIterator<CatalogItem> for ItemCatalog {
    fn from_iter<I: IntoIterator<Item = CatalogItem>>(iter: I) -> Self {
        Self {
            categories: iter.into_iter().map(|i| (i.id, i.category)).collect(),
        }
    }
}

impl CategoryLookup for ItemCatalog {
    fn category_of(&self, item: ItemId) -> Option<&str> {
        self.categories.get(&item).map(String::as_str)
    }
}
