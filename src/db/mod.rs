pub mod interactions;
pub mod snapshot;

pub use interactions::{InteractionSource, JsonlInteractionSource};
pub use snapshot::{FileSnapshotStore, SnapshotStore};
