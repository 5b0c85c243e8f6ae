use std::collections::HashMap;

use crate::models::{GraphStats, ItemId, Timestamp, UserId};

/// Bipartite user–item adjacency
///
/// Every edge is held twice, once per direction, so that both traversal
/// directions enumerate in O(degree). The two maps are only ever mutated
/// together, inside the same `&mut self` call, which keeps them mirrored.
/// Nodes whose last edge is removed are dropped from their map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStore {
    users: HashMap<UserId, HashMap<ItemId, Timestamp>>,
    items: HashMap<ItemId, HashMap<UserId, Timestamp>>,
    edge_count: usize,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the edge, or replaces its timestamp if the user already likes the item
    ///
    /// Returns true if the edge is new.
    pub fn add_edge(&mut self, user: UserId, item: ItemId, timestamp: Timestamp) -> bool {
        let previous = self
            .users
            .entry(user)
            .or_default()
            .insert(item, timestamp);
        self.items.entry(item).or_default().insert(user, timestamp);

        if previous.is_none() {
            self.edge_count += 1;
        }
        previous.is_none()
    }

    /// Deletes the edge from both directions; absent edges are a no-op
    ///
    /// Returns true if an edge was removed.
    pub fn remove_edge(&mut self, user: UserId, item: ItemId) -> bool {
        let Some(user_edges) = self.users.get_mut(&user) else {
            return false;
        };
        if user_edges.remove(&item).is_none() {
            return false;
        }
        if user_edges.is_empty() {
            self.users.remove(&user);
        }

        if let Some(item_edges) = self.items.get_mut(&item) {
            item_edges.remove(&user);
            if item_edges.is_empty() {
                self.items.remove(&item);
            }
        }

        self.edge_count -= 1;
        true
    }

    /// Items the user has an edge to, with the edge timestamp
    pub fn neighbors_of_user(
        &self,
        user: UserId,
    ) -> impl Iterator<Item = (ItemId, Timestamp)> + '_ {
        self.users
            .get(&user)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(&item, &ts)| (item, ts)))
    }

    /// Users with an edge to the item, with the edge timestamp
    pub fn neighbors_of_item(
        &self,
        item: ItemId,
    ) -> impl Iterator<Item = (UserId, Timestamp)> + '_ {
        self.items
            .get(&item)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(&user, &ts)| (user, ts)))
    }

    pub fn has_edge(&self, user: UserId, item: ItemId) -> bool {
        self.users
            .get(&user)
            .is_some_and(|edges| edges.contains_key(&item))
    }

    pub fn edge_timestamp(&self, user: UserId, item: ItemId) -> Option<Timestamp> {
        self.users.get(&user).and_then(|edges| edges.get(&item)).copied()
    }

    pub fn user_degree(&self, user: UserId) -> usize {
        self.users.get(&user).map_or(0, HashMap::len)
    }

    pub fn item_degree(&self, item: ItemId) -> usize {
        self.items.get(&item).map_or(0, HashMap::len)
    }

    /// Every edge as `(user, item, timestamp)`, in no particular order
    pub fn edges(&self) -> impl Iterator<Item = (UserId, ItemId, Timestamp)> + '_ {
        self.users.iter().flat_map(|(&user, edges)| {
            edges.iter().map(move |(&item, &ts)| (user, item, ts))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    pub fn newest_timestamp(&self) -> Option<Timestamp> {
        self.edges().map(|(_, _, ts)| ts).max()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            users: self.user_count(),
            items: self.item_count(),
            edges: self.edge_count(),
            newest_timestamp: self.newest_timestamp(),
        }
    }

    pub(crate) fn reserve(&mut self, edges: usize) {
        self.users.reserve(edges);
        self.items.reserve(edges);
    }
}
