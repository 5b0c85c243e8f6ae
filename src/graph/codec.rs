//! Snapshot encoding for [`GraphStore`]
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "GREC"
//! 4       2     format version (1)
//! 6       2     reserved, zero
//! 8       8     edge count N
//! 16      24*N  records: user_id u64, item_id u64, timestamp i64
//! ```
//!
//! Records are written sorted by `(user_id, item_id)`, so two equal graphs
//! always encode to identical bytes.

use crate::error::{GraphError, GraphResult};
use crate::models::{ItemId, UserId};

use super::GraphStore;

pub const MAGIC: &[u8; 4] = b"GREC";
pub const FORMAT_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 16;
pub const RECORD_SIZE: usize = 24;

/// Encodes the whole graph
pub fn save(graph: &GraphStore) -> Vec<u8> {
    let mut edges: Vec<_> = graph.edges().collect();
    edges.sort_unstable_by_key(|&(user, item, _)| (user, item));

    let mut buf = Vec::with_capacity(HEADER_SIZE + RECORD_SIZE * edges.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&(edges.len() as u64).to_le_bytes());

    for (user, item, timestamp) in edges {
        buf.extend_from_slice(&user.get().to_le_bytes());
        buf.extend_from_slice(&item.get().to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
    }

    buf
}

/// Decodes a snapshot into a fresh graph
///
/// Fails with [`GraphError::CorruptSnapshot`] on any malformation; nothing
/// is returned in that case, so a caller can never observe a partial graph.
pub fn load(bytes: &[u8]) -> GraphResult<GraphStore> {
    if bytes.len() < HEADER_SIZE {
        return Err(GraphError::corrupt(format!(
            "header needs {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let (header, body) = bytes.split_at(HEADER_SIZE);
    if &header[0..4] != MAGIC {
        return Err(GraphError::corrupt("bad magic"));
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(GraphError::corrupt(format!(
            "unsupported format version {}",
            version
        )));
    }
    if header[6..8] != [0u8, 0] {
        return Err(GraphError::corrupt("reserved header bytes are not zero"));
    }

    let count = read_u64(&header[8..16]);
    let expected = usize::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(RECORD_SIZE))
        .ok_or_else(|| GraphError::corrupt(format!("edge count {} is too large", count)))?;
    if body.len() != expected {
        return Err(GraphError::corrupt(format!(
            "{} edges need {} record bytes, got {}",
            count,
            expected,
            body.len()
        )));
    }

    let mut graph = GraphStore::new();
    graph.reserve(count as usize);

    for (index, record) in body.chunks_exact(RECORD_SIZE).enumerate() {
        let raw_user = read_u64(&record[0..8]);
        let raw_item = read_u64(&record[8..16]);
        let timestamp = i64::from_le_bytes(to_array(&record[16..24]));

        let user = UserId::from_raw(raw_user).ok_or_else(|| {
            GraphError::corrupt(format!("record {}: invalid user id {}", index, raw_user))
        })?;
        let item = ItemId::from_raw(raw_item).ok_or_else(|| {
            GraphError::corrupt(format!("record {}: invalid item id {}", index, raw_item))
        })?;

        if !graph.add_edge(user, item, timestamp) {
            return Err(GraphError::corrupt(format!(
                "record {}: duplicate edge ({}, {})",
                index, user, item
            )));
        }
    }

    Ok(graph)
}

fn read_u64(bytes: &[u8]) -> u64 {
    u64::from_le_bytes(to_array(bytes))
}

fn to_array(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(bytes);
    out
}
