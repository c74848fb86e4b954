//! Prompt queue loading

use std::path::Path;

use crate::core::{Item, PilotError, Result};

/// Split line-oriented text into items, one per non-blank trimmed line
pub fn parse_items(content: &str) -> Vec<Item> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, text)| Item::new(index, text))
        .collect()
}

/// Load the queue from a UTF-8 text file.
///
/// A missing, unreadable or effectively empty file is
/// [`PilotError::QueueSourceMissing`].
pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    let content = std::fs::read_to_string(path).map_err(|e| PilotError::QueueSourceMissing {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let items = parse_items(&content);
    if items.is_empty() {
        return Err(PilotError::QueueSourceMissing {
            path: path.to_path_buf(),
            reason: "file has no non-blank lines".to_string(),
        });
    }

    tracing::info!(path = %path.display(), count = items.len(), "queue loaded");
    Ok(items)
}
