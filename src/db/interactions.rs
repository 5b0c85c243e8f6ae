use std::io::ErrorKind;
use std::path::PathBuf;

use crate::{
    error::GraphResult,
    models::{Interaction, Timestamp},
};

/// The source of truth for likes, used to rebuild or refresh the graph
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InteractionSource: Send + Sync {
    /// Rows with `timestamp >= watermark`, or every row when `None`
    async fn interactions_since(&self, watermark: Option<Timestamp>)
        -> GraphResult<Vec<Interaction>>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// JSON-lines export of the interactions table
///
/// One `{"user_id", "item_id", "timestamp"}` object per line. A missing file
/// is an empty source. Unparseable lines and rows with invalid identifiers
/// are skipped with a warning rather than failing the whole load.
#[derive(Debug, Clone)]
pub struct JsonlInteractionSource {
    path: PathBuf,
}

impl JsonlInteractionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, contents: &[u8], watermark: Option<Timestamp>) -> Vec<Interaction> {
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for (index, raw) in contents.split(|&b| b == b'\n').enumerate() {
            let line = match std::str::from_utf8(raw) {
                Ok(line) => line.trim(),
                Err(e) => {
                    tracing::warn!(line = index + 1, error = %e, "Skipping non UTF-8 interaction row");
                    skipped += 1;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let row = match serde_json::from_str::<Interaction>(line) {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(line = index + 1, error = %e, "Skipping malformed interaction row");
                    skipped += 1;
                    continue;
                }
            };
            if let Err(e) = row.validate() {
                tracing::warn!(line = index + 1, error = %e, "Skipping invalid interaction row");
                skipped += 1;
                continue;
            }

            if watermark.map_or(true, |since| row.timestamp >= since) {
                rows.push(row);
            }
        }

        tracing::info!(
            path = %self.path.display(),
            rows = rows.len(),
            skipped,
            "Interaction rows read"
        );
        rows
    }
}

#[async_trait::async_trait]
impl InteractionSource for JsonlInteractionSource {
    async fn interactions_since(
        &self,
        watermark: Option<Timestamp>,
    ) -> GraphResult<Vec<Interaction>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "Interaction file not found, source is empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(self.parse(&contents, watermark))
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}
