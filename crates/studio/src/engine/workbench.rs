// Session coordinator.
//
// Every mutation of chapter content enters here and is routed through the
// history map under one set of rules: hydrate on first touch, confirm before
// overwriting non-empty text, at most one AI operation per chapter, and an
// error banner (never a partial write) when the provider fails.
//
// The session mutex is only held for synchronous sections; it is released
// before awaiting the provider or the confirmation prompt.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use folio_common::types::{Chapter, ChapterId, ConnectionError, DEFAULT_GENRE};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::confirm::{ConfirmRequest, ConfirmationPrompt};
use super::flight::{FlightGuard, FlightScope, OperationKind, OperationState};
use super::session::{SessionState, SessionView};
use crate::config::FolioConfig;
use crate::export::{render_html, BookManifest, ExportChapter};
use crate::generation::prompt::{self, AnalysisContext};
use crate::generation::{GenerationClient, GenerationError, GenerationOutput, GenerationRequest};
use crate::history::{ContentHistory, ContentSnapshot, DEFAULT_MAX_DEPTH};
use crate::layout::{LayoutError, PaneLayout};
use crate::store::chapters::{ChapterStore, DEFAULT_KEY_PREFIX};
use crate::store::kv::KeyValueStore;
use crate::store::projects::{ImportError, ImportSummary, Project, ProjectLibrary};

const NO_CONTENT_ANALYZE: &str = "There is no content to analyze.";
const NO_ASPECTS: &str = "Please select at least one aspect to analyze.";
const NO_CONTENT_EDIT: &str = "There is no content to edit.";
const NO_CONTENT_HUMANIZE: &str = "There is no content to humanize.";
const NO_CONTENT_GRAMMAR: &str = "There is no content to check.";

#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error("{scope} is busy: {state}")]
    Busy { scope: FlightScope, state: OperationState },

    #[error("chapter {0} is not in the outline")]
    UnknownChapter(ChapterId),

    #[error("book idea {0} was not found")]
    UnknownIdea(String),

    #[error("project {0} was not found")]
    UnknownProject(String),

    #[error("select a book idea first")]
    NoIdea,

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("{0:#}")]
    Storage(#[from] anyhow::Error),
}

/// How an operation ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// Nothing to change (e.g. the new text equals the present text).
    Unchanged,
    /// The user declined the confirmation.
    Aborted,
    /// The chapter was empty; the provider was not called.
    NoContent(String),
    /// Editorial feedback (analysis or suggested edits).
    Feedback(String),
}

/// Injected services.
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub generator: Arc<dyn GenerationClient>,
    pub confirm: Arc<dyn ConfirmationPrompt>,
}

#[derive(Debug, Clone)]
pub struct WorkbenchOptions {
    pub genre: String,
    pub max_depth: usize,
    pub layout: PaneLayout,
    pub key_prefix: String,
    pub grounding: bool,
}

impl Default for WorkbenchOptions {
    fn default() -> Self {
        Self {
            genre: DEFAULT_GENRE.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            layout: PaneLayout::default(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            grounding: false,
        }
    }
}

impl WorkbenchOptions {
    pub fn from_config(config: &FolioConfig) -> Result<Self, LayoutError> {
        Ok(Self {
            genre: config.genre.clone(),
            max_depth: config.history.max_depth,
            layout: config.layout.to_layout()?,
            key_prefix: config.storage.key_prefix.clone(),
            grounding: config.generation.grounding,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Rewrite {
    Draft,
    Humanize,
    Grammar,
}

impl Rewrite {
    fn kind(self) -> OperationKind {
        match self {
            Self::Draft => OperationKind::GenerateChapter,
            Self::Humanize => OperationKind::Humanize,
            Self::Grammar => OperationKind::FixGrammar,
        }
    }
}

#[derive(Debug, Clone)]
enum Review {
    Analyze(Vec<String>),
    SuggestEdits,
}

impl Review {
    fn kind(&self) -> OperationKind {
        match self {
            Self::Analyze(_) => OperationKind::Analyze,
            Self::SuggestEdits => OperationKind::SuggestEdits,
        }
    }
}

#[derive(Clone)]
pub struct Workbench {
    state: Arc<Mutex<SessionState>>,
    chapters: ChapterStore,
    library: ProjectLibrary,
    generator: Arc<dyn GenerationClient>,
    confirm: Arc<dyn ConfirmationPrompt>,
    grounding: bool,
}

impl Workbench {
    pub fn new(collaborators: Collaborators, options: WorkbenchOptions) -> Self {
        let Collaborators { store, generator, confirm } = collaborators;
        let state = SessionState::new(options.genre, options.max_depth, options.layout);
        Self {
            state: Arc::new(Mutex::new(state)),
            chapters: ChapterStore::with_prefix(Arc::clone(&store), options.key_prefix),
            library: ProjectLibrary::new(store),
            generator,
            confirm,
            grounding: options.grounding,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionView {
        self.lock().view()
    }

    /// Copy-on-write view of every loaded history.
    pub fn contents(&self) -> ContentSnapshot {
        self.lock().contents.snapshot()
    }

    /// Present text, or `""` when the chapter has no history yet.
    pub fn current_content(&self, chapter_id: &ChapterId) -> String {
        self.lock().contents.get_current(chapter_id)
    }

    pub fn history(&self, chapter_id: &ChapterId) -> Option<ContentHistory> {
        self.lock().contents.get(chapter_id).cloned()
    }

    pub fn operation_state(&self, chapter_id: &ChapterId) -> OperationState {
        self.lock().flights.chapter_state(chapter_id)
    }

    pub fn project_operation_state(&self) -> OperationState {
        self.lock().flights.state(&FlightScope::Project)
    }

    // ── Selection and manual edits ─────────────────────────────────

    /// Make `chapter_id` active, hydrating it from durable storage the
    /// first time it is touched this session.
    pub fn select_chapter(&self, chapter_id: &ChapterId) -> Result<(), WorkbenchError> {
        let mut state = self.lock();
        require_chapter(&state, chapter_id)?;
        self.ensure_hydrated(&mut state, chapter_id)?;
        state.active_chapter = Some(chapter_id.clone());
        state.analysis = None;
        Ok(())
    }

    /// Returns whether the text changed.
    pub fn edit(
        &self,
        chapter_id: &ChapterId,
        text: impl Into<String>,
    ) -> Result<bool, WorkbenchError> {
        let mut state = self.lock();
        self.prepare_manual(&mut state, chapter_id)?;
        Ok(state.contents.commit_edit(chapter_id, text))
    }

    pub fn undo(&self, chapter_id: &ChapterId) -> Result<bool, WorkbenchError> {
        let mut state = self.lock();
        self.prepare_manual(&mut state, chapter_id)?;
        Ok(state.contents.undo(chapter_id))
    }

    pub fn redo(&self, chapter_id: &ChapterId) -> Result<bool, WorkbenchError> {
        let mut state = self.lock();
        self.prepare_manual(&mut state, chapter_id)?;
        Ok(state.contents.redo(chapter_id))
    }

    /// Persist the present text. History is left as is.
    pub fn save(&self, chapter_id: &ChapterId) -> Result<(), WorkbenchError> {
        let mut state = self.lock();
        require_chapter(&state, chapter_id)?;
        self.ensure_hydrated(&mut state, chapter_id)?;
        let text = state.contents.get_current(chapter_id);
        self.chapters.write(chapter_id, &text)?;
        debug!(chapter = %chapter_id, bytes = text.len(), "chapter saved");
        Ok(())
    }

    /// Remove a chapter everywhere: active pointer, history, durable record,
    /// outline entry and every connection that targets it. Returns whether
    /// the chapter was in the outline.
    pub fn delete_chapter(&self, chapter_id: &ChapterId) -> Result<bool, WorkbenchError> {
        let mut state = self.lock();
        ensure_chapter_idle(&state, chapter_id)?;

        // Durable record first: a storage failure leaves the session intact.
        self.chapters.remove(chapter_id)?;

        if state.active_chapter.as_ref() == Some(chapter_id) {
            state.active_chapter = None;
            state.analysis = None;
        }
        state.contents.remove(chapter_id);
        let before = state.chapters.len();
        state.chapters.retain(|chapter| &chapter.id != chapter_id);
        for chapter in &mut state.chapters {
            chapter.disconnect(chapter_id);
        }
        let existed = state.chapters.len() != before;
        info!(chapter = %chapter_id, existed, "chapter deleted");
        Ok(existed)
    }

    fn prepare_manual(
        &self,
        state: &mut SessionState,
        chapter_id: &ChapterId,
    ) -> Result<(), WorkbenchError> {
        require_chapter(state, chapter_id)?;
        ensure_chapter_idle(state, chapter_id)?;
        self.ensure_hydrated(state, chapter_id)
    }

    fn ensure_hydrated(
        &self,
        state: &mut SessionState,
        chapter_id: &ChapterId,
    ) -> Result<(), WorkbenchError> {
        if state.contents.contains(chapter_id) {
            return Ok(());
        }
        match self.chapters.read(chapter_id) {
            Ok(saved) => {
                debug!(chapter = %chapter_id, found = saved.is_some(), "hydrating chapter");
                state.contents.hydrate(chapter_id, saved.unwrap_or_default());
                Ok(())
            }
            Err(error) => {
                warn!(chapter = %chapter_id, error = %format!("{error:#}"), "hydration failed");
                state.error = Some(format!("Could not load the saved chapter: {error:#}"));
                Err(error.into())
            }
        }
    }

    // ── Outline ────────────────────────────────────────────────────

    pub fn set_genre(&self, genre: impl Into<String>) {
        self.lock().genre = genre.into();
    }

    pub fn set_topics(&self, topics: Vec<String>) {
        self.lock().topics = topics;
    }

    /// Choose an idea. The previous outline and its histories are dropped.
    pub fn select_idea(&self, idea_id: &str) -> Result<(), WorkbenchError> {
        let mut state = self.lock();
        ensure_no_flights(&state)?;
        let idea = state
            .ideas
            .iter()
            .find(|idea| idea.id == idea_id)
            .cloned()
            .ok_or_else(|| WorkbenchError::UnknownIdea(idea_id.to_string()))?;
        state.selected_idea = Some(idea);
        state.clear_outline();
        Ok(())
    }

    /// Swap in a new outline, dropping the old chapters' histories.
    pub fn replace_outline(&self, chapters: Vec<Chapter>) -> Result<(), WorkbenchError> {
        let mut state = self.lock();
        ensure_no_flights(&state)?;
        state.clear_outline();
        state.chapters = chapters;
        Ok(())
    }

    pub fn add_chapter(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> ChapterId {
        let chapter = Chapter::new(title, description);
        let chapter_id = chapter.id.clone();
        self.lock().chapters.push(chapter);
        chapter_id
    }

    pub fn connect_chapters(
        &self,
        source: &ChapterId,
        target: &ChapterId,
        description: impl Into<String>,
    ) -> Result<(), WorkbenchError> {
        let mut state = self.lock();
        require_chapter(&state, target)?;
        let chapter = state
            .chapter_mut(source)
            .ok_or_else(|| WorkbenchError::UnknownChapter(source.clone()))?;
        chapter.connect(target.clone(), description)?;
        Ok(())
    }

    pub fn disconnect_chapters(
        &self,
        source: &ChapterId,
        target: &ChapterId,
    ) -> Result<bool, WorkbenchError> {
        let mut state = self.lock();
        let chapter = state
            .chapter_mut(source)
            .ok_or_else(|| WorkbenchError::UnknownChapter(source.clone()))?;
        Ok(chapter.disconnect(target))
    }

    // ── Error banner ───────────────────────────────────────────────

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.lock().error = None;
    }

    // ── Pane layout ────────────────────────────────────────────────

    pub fn begin_drag(&self, handle: usize, pointer_x: f64) -> bool {
        self.lock().layout.begin_drag(handle, pointer_x)
    }

    pub fn drag_to(&self, pointer_x: f64, container_width_px: f64) -> bool {
        self.lock().layout.drag_to(pointer_x, container_width_px)
    }

    pub fn end_drag(&self) -> Option<usize> {
        self.lock().layout.end_drag()
    }

    pub fn reset_layout(&self) {
        self.lock().layout.reset();
    }

    pub fn pane_widths(&self) -> Vec<f64> {
        self.lock().layout.widths().to_vec()
    }

    // ── Chapter AI operations ──────────────────────────────────────

    /// Draft the chapter from its outline entry. Confirms first when the
    /// chapter already has text.
    pub async fn generate_chapter(&self, chapter_id: &ChapterId) -> Result<Outcome, WorkbenchError> {
        self.rewrite(chapter_id, Rewrite::Draft).await
    }

    pub async fn humanize(&self, chapter_id: &ChapterId) -> Result<Outcome, WorkbenchError> {
        self.rewrite(chapter_id, Rewrite::Humanize).await
    }

    pub async fn fix_grammar(&self, chapter_id: &ChapterId) -> Result<Outcome, WorkbenchError> {
        self.rewrite(chapter_id, Rewrite::Grammar).await
    }

    /// Editorial analysis. The result is shown only if the chapter is still
    /// active when it arrives.
    pub async fn analyze(
        &self,
        chapter_id: &ChapterId,
        aspects: Vec<String>,
    ) -> Result<Outcome, WorkbenchError> {
        self.review(chapter_id, Review::Analyze(aspects)).await
    }

    pub async fn suggest_edits(&self, chapter_id: &ChapterId) -> Result<Outcome, WorkbenchError> {
        self.review(chapter_id, Review::SuggestEdits).await
    }

    /// Discard the chapter's history and reload the saved text.
    pub async fn revert(&self, chapter_id: &ChapterId) -> Result<Outcome, WorkbenchError> {
        let kind = OperationKind::Revert;
        let scope = FlightScope::Chapter(chapter_id.clone());
        {
            let mut state = self.lock();
            require_chapter(&state, chapter_id)?;
            ensure_outline_settled(&state)?;
            claim(&mut state, scope.clone(), kind, true)?;
        }
        let guard = FlightGuard::new(Arc::clone(&self.state), scope);

        if !self.await_confirmation(&guard, kind, chapter_id).await {
            return Ok(Outcome::Aborted);
        }

        let saved = self.chapters.read(chapter_id);
        let mut state = self.lock();
        guard.complete(&mut state);
        // The outline may have been replaced while the prompt was open.
        require_chapter(&state, chapter_id)?;
        match saved {
            Ok(saved) => {
                let text = saved.unwrap_or_default();
                if !state.contents.revert(chapter_id, text.clone()) {
                    state.contents.hydrate(chapter_id, text);
                }
                info!(chapter = %chapter_id, "chapter reverted to saved text");
                Ok(Outcome::Applied)
            }
            Err(error) => {
                warn!(chapter = %chapter_id, error = %format!("{error:#}"), "revert failed");
                state.error = Some(format!("Could not load the saved chapter: {error:#}"));
                Err(error.into())
            }
        }
    }

    async fn rewrite(
        &self,
        chapter_id: &ChapterId,
        rewrite: Rewrite,
    ) -> Result<Outcome, WorkbenchError> {
        let kind = rewrite.kind();
        let scope = FlightScope::Chapter(chapter_id.clone());
        let (request, needs_confirmation) = {
            let mut state = self.lock();
            let chapter = require_chapter(&state, chapter_id)?.clone();
            ensure_chapter_idle(&state, chapter_id)?;
            ensure_outline_settled(&state)?;
            self.ensure_hydrated(&mut state, chapter_id)?;

            let text = state.contents.get_current(chapter_id);
            let has_text = !text.trim().is_empty();
            let needs_confirmation = !text.is_empty();
            let request = match rewrite {
                Rewrite::Draft => {
                    let idea = state.selected_idea.as_ref().ok_or(WorkbenchError::NoIdea)?;
                    GenerationRequest::text(prompt::chapter_prompt(
                        &idea.title,
                        &idea.synopsis,
                        &chapter.chapter_title,
                        &chapter.chapter_description,
                    ))
                    .with_grounding(self.grounding)
                }
                Rewrite::Humanize if !has_text => {
                    return Ok(Outcome::NoContent(NO_CONTENT_HUMANIZE.into()));
                }
                Rewrite::Humanize => GenerationRequest::text(prompt::humanize_prompt(&text)),
                Rewrite::Grammar if !has_text => {
                    return Ok(Outcome::NoContent(NO_CONTENT_GRAMMAR.into()));
                }
                Rewrite::Grammar => GenerationRequest::text(prompt::grammar_prompt(&text)).fast(),
            };
            claim(&mut state, scope.clone(), kind, needs_confirmation)?;
            (request, needs_confirmation)
        };
        let guard = FlightGuard::new(Arc::clone(&self.state), scope);

        if needs_confirmation && !self.await_confirmation(&guard, kind, chapter_id).await {
            return Ok(Outcome::Aborted);
        }

        info!(chapter = %chapter_id, operation = %kind, "requesting generation");
        let result = self.generator.generate(request).await.and_then(GenerationOutput::into_text);

        let mut state = self.lock();
        guard.complete(&mut state);
        match result {
            Ok(text) => {
                let changed = state.contents.commit_edit(chapter_id, text);
                info!(chapter = %chapter_id, operation = %kind, changed, "generation applied");
                Ok(if changed { Outcome::Applied } else { Outcome::Unchanged })
            }
            Err(error) => Err(provider_failure(&mut state, kind, error)),
        }
    }

    async fn review(
        &self,
        chapter_id: &ChapterId,
        review: Review,
    ) -> Result<Outcome, WorkbenchError> {
        let kind = review.kind();
        let scope = FlightScope::Chapter(chapter_id.clone());
        let request = {
            let mut state = self.lock();
            let chapter = require_chapter(&state, chapter_id)?.clone();
            ensure_chapter_idle(&state, chapter_id)?;
            ensure_outline_settled(&state)?;
            self.ensure_hydrated(&mut state, chapter_id)?;

            let text = state.contents.get_current(chapter_id);
            let empty_message = match &review {
                Review::Analyze(_) if text.trim().is_empty() => Some(NO_CONTENT_ANALYZE),
                Review::Analyze(aspects) if aspects.is_empty() => Some(NO_ASPECTS),
                Review::SuggestEdits if text.trim().is_empty() => Some(NO_CONTENT_EDIT),
                _ => None,
            };
            if let Some(message) = empty_message {
                if state.active_chapter.as_ref() == Some(chapter_id) {
                    state.analysis = Some(message.to_string());
                }
                return Ok(Outcome::NoContent(message.to_string()));
            }

            let prompt = match &review {
                Review::Analyze(aspects) => {
                    let synopsis =
                        state.selected_idea.as_ref().map_or("", |idea| idea.synopsis.as_str());
                    let context = AnalysisContext {
                        book_synopsis: synopsis,
                        chapter_description: &chapter.chapter_description,
                    };
                    prompt::analyze_prompt(&text, aspects, &context)
                }
                Review::SuggestEdits => prompt::suggest_edits_prompt(&text),
            };
            claim(&mut state, scope.clone(), kind, false)?;
            GenerationRequest::text(prompt).fast()
        };
        let guard = FlightGuard::new(Arc::clone(&self.state), scope);

        info!(chapter = %chapter_id, operation = %kind, "requesting feedback");
        let result = self.generator.generate(request).await.and_then(GenerationOutput::into_text);

        let mut state = self.lock();
        guard.complete(&mut state);
        match result {
            Ok(feedback) => {
                if state.active_chapter.as_ref() == Some(chapter_id) {
                    state.analysis = Some(feedback.clone());
                }
                Ok(Outcome::Feedback(feedback))
            }
            Err(error) => Err(provider_failure(&mut state, kind, error)),
        }
    }

    /// Ask the user. On decline the caller returns and the dropped guard
    /// releases the scope.
    async fn await_confirmation(
        &self,
        guard: &FlightGuard,
        kind: OperationKind,
        chapter_id: &ChapterId,
    ) -> bool {
        let accepted = self.confirm.confirm(ConfirmRequest::operation(kind, chapter_id.clone())).await;
        let mut state = self.lock();
        if accepted {
            if let Some(scope) = guard.scope() {
                state.flights.confirm(scope);
            }
        } else {
            info!(chapter = %chapter_id, operation = %kind, "declined by user");
        }
        accepted
    }

    // ── Project-scope AI operations ────────────────────────────────

    /// Replace the idea list for the current genre. The selected idea and
    /// outline are cleared once new ideas arrive.
    pub async fn generate_ideas(&self) -> Result<Outcome, WorkbenchError> {
        let kind = OperationKind::GenerateIdeas;
        let request = {
            let mut state = self.lock();
            ensure_no_flights(&state)?;
            claim(&mut state, FlightScope::Project, kind, false)?;
            GenerationRequest::text(prompt::ideas_prompt(&state.genre))
                .with_schema(prompt::ideas_schema())
        };
        let guard = FlightGuard::new(Arc::clone(&self.state), FlightScope::Project);

        info!(operation = %kind, "requesting generation");
        let result = self
            .generator
            .generate(request)
            .await
            .and_then(GenerationOutput::into_text)
            .and_then(|raw| prompt::parse_ideas(&raw));

        let mut state = self.lock();
        guard.complete(&mut state);
        match result {
            Ok(ideas) => {
                info!(count = ideas.len(), "ideas generated");
                state.ideas = ideas;
                state.selected_idea = None;
                state.clear_outline();
                Ok(Outcome::Applied)
            }
            Err(error) => Err(provider_failure(&mut state, kind, error)),
        }
    }

    pub async fn generate_outline(&self) -> Result<Outcome, WorkbenchError> {
        let kind = OperationKind::GenerateOutline;
        let request = {
            let mut state = self.lock();
            ensure_no_flights(&state)?;
            let idea = state.selected_idea.as_ref().ok_or(WorkbenchError::NoIdea)?;
            let request = GenerationRequest::text(prompt::outline_prompt(&idea.title, &idea.synopsis))
                .with_schema(prompt::outline_schema());
            claim(&mut state, FlightScope::Project, kind, false)?;
            request
        };
        let guard = FlightGuard::new(Arc::clone(&self.state), FlightScope::Project);

        info!(operation = %kind, "requesting generation");
        let result = self
            .generator
            .generate(request)
            .await
            .and_then(GenerationOutput::into_text)
            .and_then(|raw| prompt::parse_outline(&raw));

        let mut state = self.lock();
        guard.complete(&mut state);
        match result {
            Ok(chapters) => {
                info!(count = chapters.len(), "outline generated");
                state.clear_outline();
                state.chapters = chapters;
                Ok(Outcome::Applied)
            }
            Err(error) => Err(provider_failure(&mut state, kind, error)),
        }
    }

    pub async fn generate_cover(&self) -> Result<Outcome, WorkbenchError> {
        let kind = OperationKind::GenerateCover;
        let request = {
            let mut state = self.lock();
            let idea = state.selected_idea.as_ref().ok_or(WorkbenchError::NoIdea)?;
            let request =
                GenerationRequest::image(prompt::cover_prompt(&idea.title, &idea.synopsis, &state.genre));
            claim(&mut state, FlightScope::Project, kind, false)?;
            request
        };
        let guard = FlightGuard::new(Arc::clone(&self.state), FlightScope::Project);

        info!(operation = %kind, "requesting cover image");
        let result = self.generator.generate(request).await.and_then(GenerationOutput::into_images);

        let mut state = self.lock();
        guard.complete(&mut state);
        match result {
            Ok(images) => {
                state.cover_image = images.first().map(|image| image.data_url());
                Ok(Outcome::Applied)
            }
            Err(error) => Err(provider_failure(&mut state, kind, error)),
        }
    }

    // ── Projects ───────────────────────────────────────────────────

    /// Upsert the session into the project library.
    pub fn save_project(&self, name: Option<&str>) -> Result<Project, WorkbenchError> {
        let project = {
            let mut state = self.lock();
            let name = name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .or_else(|| state.project_name.clone())
                .unwrap_or_else(|| state.book_title().to_string());
            state.project_name = Some(name.clone());
            state.to_project(name, Utc::now().timestamp_millis())
        };
        self.library.upsert(project.clone())?;
        info!(project = %project.id, name = %project.name, "project saved");
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, WorkbenchError> {
        Ok(self.library.list()?)
    }

    pub fn export_projects(&self) -> Result<String, WorkbenchError> {
        Ok(self.library.export_all()?)
    }

    pub fn import_projects(&self, json: &str) -> Result<ImportSummary, WorkbenchError> {
        let summary = self.library.import(json)?;
        info!(
            imported = summary.imported,
            updated = summary.updated,
            skipped = summary.skipped,
            "projects imported"
        );
        Ok(summary)
    }

    /// Replace the session with a saved project without asking.
    pub fn open_project(&self, project_id: &str) -> Result<(), WorkbenchError> {
        let project = self
            .library
            .get(project_id)?
            .ok_or_else(|| WorkbenchError::UnknownProject(project_id.to_string()))?;
        let mut state = self.lock();
        ensure_no_flights(&state)?;
        state.apply_project(project);
        info!(project = %project_id, "project opened");
        Ok(())
    }

    /// Confirm, then replace the session with a saved project.
    pub async fn load_project(&self, project_id: &str) -> Result<Outcome, WorkbenchError> {
        ensure_no_flights(&self.lock())?;
        if !self.confirm.confirm(ConfirmRequest::load_project(project_id)).await {
            return Ok(Outcome::Aborted);
        }
        self.open_project(project_id)?;
        Ok(Outcome::Applied)
    }

    /// Confirm, then start an empty project.
    pub async fn new_project(&self) -> Result<Outcome, WorkbenchError> {
        ensure_no_flights(&self.lock())?;
        if !self.confirm.confirm(ConfirmRequest::new_project()).await {
            return Ok(Outcome::Aborted);
        }
        let mut state = self.lock();
        ensure_no_flights(&state)?;
        state.reset();
        info!(project = %state.project_id, "new project started");
        Ok(Outcome::Applied)
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<Outcome, WorkbenchError> {
        if !self.confirm.confirm(ConfirmRequest::delete_project(project_id)).await {
            return Ok(Outcome::Aborted);
        }
        if self.library.delete(project_id)? {
            info!(project = %project_id, "project deleted");
            Ok(Outcome::Applied)
        } else {
            Ok(Outcome::Unchanged)
        }
    }

    // ── Export ─────────────────────────────────────────────────────

    /// Chapters in outline order with their present text. Chapters never
    /// opened this session are hydrated from storage first.
    pub fn export_manifest(&self) -> Result<BookManifest, WorkbenchError> {
        let mut state = self.lock();
        let chapter_ids: Vec<ChapterId> =
            state.chapters.iter().map(|chapter| chapter.id.clone()).collect();
        for chapter_id in &chapter_ids {
            self.ensure_hydrated(&mut state, chapter_id)?;
        }
        Ok(BookManifest {
            title: state.book_title().to_string(),
            cover_image: state.cover_image.clone(),
            chapters: state
                .chapters
                .iter()
                .map(|chapter| ExportChapter {
                    chapter_id: chapter.id.clone(),
                    chapter_title: chapter.chapter_title.clone(),
                    present_text: state.contents.get_current(&chapter.id),
                })
                .collect(),
        })
    }

    pub fn export_html(&self) -> Result<String, WorkbenchError> {
        Ok(render_html(&self.export_manifest()?))
    }
}

impl std::fmt::Debug for Workbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("chapters", &self.chapters)
            .field("library", &self.library)
            .field("grounding", &self.grounding)
            .finish_non_exhaustive()
    }
}

fn require_chapter<'a>(
    state: &'a SessionState,
    chapter_id: &ChapterId,
) -> Result<&'a Chapter, WorkbenchError> {
    state.chapter(chapter_id).ok_or_else(|| WorkbenchError::UnknownChapter(chapter_id.clone()))
}

fn ensure_chapter_idle(state: &SessionState, chapter_id: &ChapterId) -> Result<(), WorkbenchError> {
    let current = state.flights.chapter_state(chapter_id);
    if current.is_idle() {
        return Ok(());
    }
    Err(WorkbenchError::Busy { scope: FlightScope::Chapter(chapter_id.clone()), state: current })
}

/// Chapter operations wait while a new idea list or outline is on its way.
fn ensure_outline_settled(state: &SessionState) -> Result<(), WorkbenchError> {
    let current = state.flights.state(&FlightScope::Project);
    match current.kind() {
        Some(OperationKind::GenerateIdeas | OperationKind::GenerateOutline) => {
            Err(WorkbenchError::Busy { scope: FlightScope::Project, state: current })
        }
        _ => Ok(()),
    }
}

fn ensure_no_flights(state: &SessionState) -> Result<(), WorkbenchError> {
    match state.flights.active().next() {
        Some((scope, current)) => {
            Err(WorkbenchError::Busy { scope: scope.clone(), state: current })
        }
        None => Ok(()),
    }
}

fn claim(
    state: &mut SessionState,
    scope: FlightScope,
    kind: OperationKind,
    needs_confirmation: bool,
) -> Result<(), WorkbenchError> {
    state
        .flights
        .try_begin(scope.clone(), kind, needs_confirmation)
        .map_err(|current| WorkbenchError::Busy { scope, state: current })?;
    state.error = None;
    Ok(())
}

fn provider_failure(
    state: &mut SessionState,
    kind: OperationKind,
    error: GenerationError,
) -> WorkbenchError {
    warn!(operation = %kind, kind = error.kind(), error = %error, "generation failed");
    state.error = Some(error.to_string());
    error.into()
}
