// Durable per-chapter text records.
//
// Keys are `<prefix><chapter_id>`. Records are written only on an explicit
// save, read on a hydration miss or a revert, and removed with the chapter.

use std::sync::Arc;

use anyhow::{Context, Result};
use folio_common::types::ChapterId;

use super::kv::KeyValueStore;

pub const DEFAULT_KEY_PREFIX: &str = "folio-chapter-";

#[derive(Clone)]
pub struct ChapterStore {
    kv: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl ChapterStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_prefix(kv, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(kv: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self { kv, prefix: prefix.into() }
    }

    pub fn key_for(&self, chapter_id: &ChapterId) -> String {
        format!("{}{}", self.prefix, chapter_id)
    }

    /// `None` when the chapter was never saved.
    pub fn read(&self, chapter_id: &ChapterId) -> Result<Option<String>> {
        self.kv
            .get(&self.key_for(chapter_id))
            .with_context(|| format!("failed to read saved text for chapter {chapter_id}"))
    }

    pub fn write(&self, chapter_id: &ChapterId, text: &str) -> Result<()> {
        self.kv
            .set(&self.key_for(chapter_id), text)
            .with_context(|| format!("failed to save text for chapter {chapter_id}"))
    }

    pub fn remove(&self, chapter_id: &ChapterId) -> Result<()> {
        self.kv
            .delete(&self.key_for(chapter_id))
            .with_context(|| format!("failed to delete saved text for chapter {chapter_id}"))
    }
}

impl std::fmt::Debug for ChapterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterStore").field("prefix", &self.prefix).finish_non_exhaustive()
    }
}
