// Per-chapter undo/redo history over plain text snapshots.
//
// Every content transition (typing, AI drafts, grammar fixes, humanized
// text) goes through `ChapterContentMap::commit_edit`, so undo/redo behaves
// the same regardless of where an edit came from.
//
// The map is copy-on-write: mutations go through `Arc::make_mut`, so a
// `ContentSnapshot` taken earlier keeps seeing the state it was taken from.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use folio_common::types::ChapterId;
use serde::{Deserialize, Serialize};

/// Default cap on `past` entries per chapter. Oldest snapshots go first.
pub const DEFAULT_MAX_DEPTH: usize = 500;

/// Shared, immutable view of every chapter history at one point in time.
pub type ContentSnapshot = Arc<HashMap<ChapterId, Arc<ContentHistory>>>;

/// The (past, present, future) triple for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHistory {
    /// Prior snapshots, oldest first.
    #[serde(default)]
    past: VecDeque<String>,
    present: String,
    /// Redo candidates, most recently undone first.
    #[serde(default)]
    future: VecDeque<String>,
}

impl ContentHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self { past: VecDeque::new(), present: initial.into(), future: VecDeque::new() }
    }

    pub fn present(&self) -> &str {
        &self.present
    }

    pub fn past(&self) -> &VecDeque<String> {
        &self.past
    }

    pub fn future(&self) -> &VecDeque<String> {
        &self.future
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    fn commit(&mut self, next: String, max_depth: usize) {
        let previous = std::mem::replace(&mut self.present, next);
        self.past.push_back(previous);
        self.future.clear();

        // 0 disables the cap.
        if max_depth > 0 {
            while self.past.len() > max_depth {
                self.past.pop_front();
            }
        }
    }

    fn undo(&mut self) -> bool {
        let Some(prev) = self.past.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, prev);
        self.future.push_front(current);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push_back(current);
        true
    }
}

/// ChapterId -> ContentHistory, created lazily on first selection.
#[derive(Debug, Clone)]
pub struct ChapterContentMap {
    entries: ContentSnapshot,
    max_depth: usize,
}

impl ChapterContentMap {
    pub fn new(max_depth: usize) -> Self {
        Self { entries: Arc::new(HashMap::new()), max_depth }
    }

    /// Rebuild a map from serialized `(chapter, history)` pairs.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (ChapterId, ContentHistory)>,
        max_depth: usize,
    ) -> Self {
        let entries =
            pairs.into_iter().map(|(chapter_id, history)| (chapter_id, Arc::new(history))).collect();
        Self { entries: Arc::new(entries), max_depth }
    }

    /// Pairs in a stable (id-sorted) order for persistence.
    pub fn to_pairs(&self) -> Vec<(ChapterId, ContentHistory)> {
        let mut pairs = self
            .entries
            .iter()
            .map(|(chapter_id, history)| (chapter_id.clone(), ContentHistory::clone(history)))
            .collect::<Vec<_>>();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Cheap handle on the current state. Later mutations never show through it.
    pub fn snapshot(&self) -> ContentSnapshot {
        Arc::clone(&self.entries)
    }

    pub fn contains(&self, chapter_id: &ChapterId) -> bool {
        self.entries.contains_key(chapter_id)
    }

    pub fn get(&self, chapter_id: &ChapterId) -> Option<&ContentHistory> {
        self.entries.get(chapter_id).map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `present` for the chapter, or `""` when it was never hydrated.
    pub fn get_current(&self, chapter_id: &ChapterId) -> String {
        self.get(chapter_id).map(|history| history.present.clone()).unwrap_or_default()
    }

    /// Create the entry with `initial` as `present`. Never overwrites an
    /// existing entry; returns whether one was created.
    pub fn hydrate(&mut self, chapter_id: &ChapterId, initial: impl Into<String>) -> bool {
        if self.contains(chapter_id) {
            return false;
        }
        Arc::make_mut(&mut self.entries)
            .insert(chapter_id.clone(), Arc::new(ContentHistory::new(initial)));
        true
    }

    /// Record a forward edit. Writing the current `present` again changes
    /// nothing (the triple keeps its identity).
    pub fn commit_edit(&mut self, chapter_id: &ChapterId, new_text: impl Into<String>) -> bool {
        let new_text = new_text.into();
        match self.entries.get(chapter_id) {
            Some(history) if history.present != new_text => {}
            _ => return false,
        }
        let max_depth = self.max_depth;
        self.history_mut(chapter_id)
            .map(|history| history.commit(new_text, max_depth))
            .is_some()
    }

    pub fn undo(&mut self, chapter_id: &ChapterId) -> bool {
        if !self.get(chapter_id).is_some_and(ContentHistory::can_undo) {
            return false;
        }
        self.history_mut(chapter_id).is_some_and(ContentHistory::undo)
    }

    pub fn redo(&mut self, chapter_id: &ChapterId) -> bool {
        if !self.get(chapter_id).is_some_and(ContentHistory::can_redo) {
            return false;
        }
        self.history_mut(chapter_id).is_some_and(ContentHistory::redo)
    }

    /// Discard all lineage and restart from `durable_text`. Not undoable.
    /// Chapters without an entry are left alone.
    pub fn revert(&mut self, chapter_id: &ChapterId, durable_text: impl Into<String>) -> bool {
        match self.history_mut(chapter_id) {
            Some(history) => {
                *history = ContentHistory::new(durable_text);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, chapter_id: &ChapterId) -> bool {
        if !self.contains(chapter_id) {
            return false;
        }
        Arc::make_mut(&mut self.entries).remove(chapter_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries = Arc::new(HashMap::new());
    }

    fn history_mut(&mut self, chapter_id: &ChapterId) -> Option<&mut ContentHistory> {
        if !self.contains(chapter_id) {
            return None;
        }
        Arc::make_mut(&mut self.entries).get_mut(chapter_id).map(Arc::make_mut)
    }
}

impl Default for ChapterContentMap {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn id(raw: &str) -> ChapterId {
        ChapterId::from(raw)
    }

    fn hydrated(initial: &str) -> (ChapterContentMap, ChapterId) {
        let mut map = ChapterContentMap::default();
        let chapter = id("ch1");
        map.hydrate(&chapter, initial);
        (map, chapter)
    }

    #[test]
    fn unknown_chapter_reads_empty_and_ignores_mutations() {
        let mut map = ChapterContentMap::default();
        let chapter = id("missing");

        assert_eq!(map.get_current(&chapter), "");
        assert!(!map.commit_edit(&chapter, "text"));
        assert!(!map.undo(&chapter));
        assert!(!map.redo(&chapter));
        assert!(!map.revert(&chapter, "durable"));
        assert!(!map.remove(&chapter));
        assert!(map.is_empty());
    }

    #[test]
    fn hydrate_is_idempotent() {
        let (mut map, chapter) = hydrated("first");
        assert!(!map.hydrate(&chapter, "second"));
        assert_eq!(map.get_current(&chapter), "first");
    }

    #[test]
    fn hydrated_empty_entry_is_distinct_from_absence() {
        let (map, chapter) = hydrated("");
        assert!(map.contains(&chapter));
        assert_eq!(map.get_current(&chapter), "");
    }

    #[test]
    fn edit_then_undo_restores_previous_text_and_fills_future() {
        let (mut map, chapter) = hydrated("Hello world");

        assert!(map.commit_edit(&chapter, "Hello world!"));
        assert!(map.undo(&chapter));

        let history = map.get(&chapter).unwrap();
        assert_eq!(history.present(), "Hello world");
        assert_eq!(history.future().iter().collect::<Vec<_>>(), vec!["Hello world!"]);
        assert!(history.past().is_empty());
    }

    #[test]
    fn undo_steps_back_one_edit_at_a_time() {
        let (mut map, chapter) = hydrated("v0");
        for step in 1..=4 {
            map.commit_edit(&chapter, format!("v{step}"));
        }

        for expected in ["v3", "v2", "v1", "v0"] {
            assert!(map.undo(&chapter));
            assert_eq!(map.get_current(&chapter), expected);
        }
        assert!(!map.undo(&chapter), "past is exhausted");
        assert_eq!(map.get_current(&chapter), "v0");
    }

    #[test]
    fn redo_consumes_future_front_first() {
        let (mut map, chapter) = hydrated("a");
        map.commit_edit(&chapter, "b");
        map.commit_edit(&chapter, "c");
        map.undo(&chapter);
        map.undo(&chapter);

        assert!(map.redo(&chapter));
        assert_eq!(map.get_current(&chapter), "b");
        assert!(map.redo(&chapter));
        assert_eq!(map.get_current(&chapter), "c");
        assert!(!map.redo(&chapter));
    }

    #[test]
    fn forward_edit_clears_redo() {
        let (mut map, chapter) = hydrated("a");
        map.commit_edit(&chapter, "b");
        map.undo(&chapter);
        assert!(map.get(&chapter).unwrap().can_redo());

        map.commit_edit(&chapter, "c");
        let history = map.get(&chapter).unwrap();
        assert!(history.future().is_empty());
        assert_eq!(history.past().iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn identical_commit_keeps_the_same_allocation() {
        let (mut map, chapter) = hydrated("same");
        map.commit_edit(&chapter, "other");
        map.undo(&chapter);
        let before = map.snapshot();

        assert!(!map.commit_edit(&chapter, "same"));

        let after = map.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after[&chapter].future().len(), 1);
    }

    #[test]
    fn revert_discards_lineage() {
        let (mut map, chapter) = hydrated("a");
        map.commit_edit(&chapter, "b");
        map.commit_edit(&chapter, "c");
        map.undo(&chapter);

        assert!(map.revert(&chapter, "durable"));
        let history = map.get(&chapter).unwrap();
        assert_eq!(history, &ContentHistory::new("durable"));
    }

    #[test]
    fn snapshots_are_unaffected_by_later_mutations() {
        let (mut map, chapter) = hydrated("draft");
        let snapshot = map.snapshot();

        map.commit_edit(&chapter, "revised");
        map.hydrate(&id("ch2"), "other");

        assert_eq!(snapshot[&chapter].present(), "draft");
        assert!(!snapshot.contains_key(&id("ch2")));
        assert_eq!(map.get_current(&chapter), "revised");
    }

    #[test]
    fn past_is_capped_at_max_depth() {
        let mut map = ChapterContentMap::new(3);
        let chapter = id("ch1");
        map.hydrate(&chapter, "0");
        for step in 1..=6 {
            map.commit_edit(&chapter, step.to_string());
        }

        let history = map.get(&chapter).unwrap();
        assert_eq!(history.past().iter().collect::<Vec<_>>(), vec!["3", "4", "5"]);
        assert_eq!(history.present(), "6");
    }

    #[test]
    fn zero_max_depth_keeps_everything() {
        let mut map = ChapterContentMap::new(0);
        let chapter = id("ch1");
        map.hydrate(&chapter, "0");
        for step in 1..=DEFAULT_MAX_DEPTH + 10 {
            map.commit_edit(&chapter, step.to_string());
        }
        assert_eq!(map.get(&chapter).unwrap().past().len(), DEFAULT_MAX_DEPTH + 10);
    }

    #[test]
    fn pairs_round_trip_through_json() {
        let (mut map, chapter) = hydrated("a");
        map.commit_edit(&chapter, "b");
        map.undo(&chapter);

        let json = serde_json::to_string(&map.to_pairs()).unwrap();
        assert_eq!(json, r#"[["ch1",{"past":[],"present":"a","future":["b"]}]]"#);

        let pairs: Vec<(ChapterId, ContentHistory)> = serde_json::from_str(&json).unwrap();
        let restored = ChapterContentMap::from_pairs(pairs, DEFAULT_MAX_DEPTH);
        assert_eq!(restored.get(&chapter), map.get(&chapter));
    }
}
