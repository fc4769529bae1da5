// Mutable session state guarded by the workbench mutex, plus the
// read-only view handed to callers.

use folio_common::types::{BookIdea, Chapter, ChapterId, DEFAULT_GENRE};
use serde::Serialize;
use uuid::Uuid;

use super::flight::{FlightTable, OperationState};
use crate::history::{ChapterContentMap, ContentSnapshot, DEFAULT_MAX_DEPTH};
use crate::layout::{PaneLayout, PaneLayoutManager};
use crate::store::projects::Project;

pub const UNTITLED_BOOK: &str = "Untitled Book";

#[derive(Debug, Clone)]
pub struct SessionState {
    pub project_id: String,
    pub project_name: Option<String>,
    pub genre: String,
    pub topics: Vec<String>,
    pub ideas: Vec<BookIdea>,
    pub selected_idea: Option<BookIdea>,
    pub chapters: Vec<Chapter>,
    pub active_chapter: Option<ChapterId>,
    pub contents: ChapterContentMap,
    /// Transient analysis / suggested-edits output for the active chapter.
    pub analysis: Option<String>,
    /// User-facing error banner.
    pub error: Option<String>,
    /// Cover image as a `data:` URL.
    pub cover_image: Option<String>,
    pub flights: FlightTable,
    pub layout: PaneLayoutManager,
}

impl SessionState {
    pub fn new(genre: impl Into<String>, max_depth: usize, layout: PaneLayout) -> Self {
        Self {
            project_id: Uuid::new_v4().to_string(),
            project_name: None,
            genre: genre.into(),
            topics: Vec::new(),
            ideas: Vec::new(),
            selected_idea: None,
            chapters: Vec::new(),
            active_chapter: None,
            contents: ChapterContentMap::new(max_depth),
            analysis: None,
            error: None,
            cover_image: None,
            flights: FlightTable::default(),
            layout: PaneLayoutManager::new(layout),
        }
    }

    pub fn chapter(&self, chapter_id: &ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| &chapter.id == chapter_id)
    }

    pub fn chapter_mut(&mut self, chapter_id: &ChapterId) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|chapter| &chapter.id == chapter_id)
    }

    pub fn book_title(&self) -> &str {
        self.selected_idea.as_ref().map_or(UNTITLED_BOOK, |idea| idea.title.as_str())
    }

    /// Start over with a fresh project id. Genre and pane layout survive.
    pub fn reset(&mut self) {
        self.project_id = Uuid::new_v4().to_string();
        self.project_name = None;
        self.topics.clear();
        self.ideas.clear();
        self.selected_idea = None;
        self.cover_image = None;
        self.clear_outline();
        self.error = None;
    }

    /// Drop the outline and every chapter history that belonged to it.
    pub fn clear_outline(&mut self) {
        self.chapters.clear();
        self.active_chapter = None;
        self.analysis = None;
        self.contents.clear();
    }

    pub fn to_project(&self, name: String, last_modified: i64) -> Project {
        Project {
            id: self.project_id.clone(),
            name,
            last_modified,
            genre: self.genre.clone(),
            topics: self.topics.clone(),
            ideas: self.ideas.clone(),
            idea: self.selected_idea.clone(),
            chapters: self.chapters.clone(),
            chapter_contents: self.contents.to_pairs(),
            cover_image: self.cover_image.clone(),
        }
    }

    /// Replace the session with a saved project. Histories come back as
    /// saved; nothing is selected.
    pub fn apply_project(&mut self, project: Project) {
        let max_depth = self.contents.max_depth();
        self.project_id = project.id;
        self.project_name = Some(project.name);
        if !project.genre.is_empty() {
            self.genre = project.genre;
        }
        self.topics = project.topics;
        self.ideas = project.ideas;
        self.selected_idea = project.idea;
        self.chapters = project.chapters;
        self.contents = ChapterContentMap::from_pairs(project.chapter_contents, max_depth);
        self.cover_image = project.cover_image;
        self.active_chapter = None;
        self.analysis = None;
        self.error = None;
    }

    pub fn view(&self) -> SessionView {
        let active = self.active_chapter.as_ref().and_then(|id| self.contents.get(id));
        SessionView {
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
            genre: self.genre.clone(),
            topics: self.topics.clone(),
            ideas: self.ideas.clone(),
            selected_idea: self.selected_idea.clone(),
            chapters: self.chapters.clone(),
            active_chapter: self.active_chapter.clone(),
            active_content: active.map(|history| history.present().to_string()),
            can_undo: active.is_some_and(|history| history.can_undo()),
            can_redo: active.is_some_and(|history| history.can_redo()),
            analysis: self.analysis.clone(),
            error: self.error.clone(),
            has_cover: self.cover_image.is_some(),
            pane_widths: self.layout.widths().to_vec(),
            operations: self
                .flights
                .active()
                .map(|(scope, state)| ActiveOperation { scope: scope.to_string(), state })
                .collect(),
            contents: self.contents.snapshot(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_GENRE, DEFAULT_MAX_DEPTH, PaneLayout::default())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveOperation {
    pub scope: String,
    pub state: OperationState,
}

/// Point-in-time copy of the session for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub project_id: String,
    pub project_name: Option<String>,
    pub genre: String,
    pub topics: Vec<String>,
    pub ideas: Vec<BookIdea>,
    pub selected_idea: Option<BookIdea>,
    pub chapters: Vec<Chapter>,
    pub active_chapter: Option<ChapterId>,
    pub active_content: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub analysis: Option<String>,
    pub error: Option<String>,
    pub has_cover: bool,
    pub pane_widths: Vec<f64>,
    pub operations: Vec<ActiveOperation>,
    #[serde(skip)]
    pub contents: ContentSnapshot,
}
