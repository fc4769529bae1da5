use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use folio_common::types::{Chapter, ChapterId};
use folio_studio::engine::{
    AlwaysConfirm, Collaborators, ConfirmAction, ConfirmRequest, ConfirmationPrompt,
    OperationKind, OperationState, Outcome, Workbench, WorkbenchError, WorkbenchOptions,
};
use folio_studio::engine::confirm::ConfirmFuture;
use folio_studio::generation::{
    GeneratedImage, GenerationClient, GenerationError, GenerationFuture, GenerationOutput,
    GenerationRequest, GenerationTarget, ModelTier,
};
use folio_studio::store::kv::{KeyValueStore, MemoryStore};
use tokio::sync::Notify;

// ── Fakes ──────────────────────────────────────────────────────────

#[derive(Default)]
struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<GenerationOutput, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn replying(responses: Vec<Result<GenerationOutput, GenerationError>>) -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(responses.into()), requests: Mutex::default() })
    }

    fn text(text: &str) -> Arc<Self> {
        Self::replying(vec![Ok(GenerationOutput::Text(text.into()))])
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().expect("a request should have been sent")
    }
}

impl GenerationClient for ScriptedGenerator {
    fn generate(&self, request: GenerationRequest) -> GenerationFuture {
        self.requests.lock().unwrap().push(request);
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Failure("no scripted response".into())));
        Box::pin(async move { response })
    }
}

/// Holds every request until `release` is notified.
struct GatedGenerator {
    started: Arc<Notify>,
    release: Arc<Notify>,
    text: String,
}

impl GenerationClient for GatedGenerator {
    fn generate(&self, _request: GenerationRequest) -> GenerationFuture {
        let started = Arc::clone(&self.started);
        let release = Arc::clone(&self.release);
        let text = self.text.clone();
        Box::pin(async move {
            started.notify_one();
            release.notified().await;
            Ok(GenerationOutput::Text(text))
        })
    }
}

struct ScriptedConfirm {
    accept: bool,
    requests: Mutex<Vec<ConfirmRequest>>,
}

impl ScriptedConfirm {
    fn answering(accept: bool) -> Arc<Self> {
        Arc::new(Self { accept, requests: Mutex::default() })
    }

    fn prompts(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ConfirmationPrompt for ScriptedConfirm {
    fn confirm(&self, request: ConfirmRequest) -> ConfirmFuture {
        self.requests.lock().unwrap().push(request);
        let accept = self.accept;
        Box::pin(async move { accept })
    }
}

/// Holds the answer until `release` is notified.
struct GatedConfirm {
    asked: Arc<Notify>,
    release: Arc<Notify>,
    accept: bool,
}

impl ConfirmationPrompt for GatedConfirm {
    fn confirm(&self, _request: ConfirmRequest) -> ConfirmFuture {
        let asked = Arc::clone(&self.asked);
        let release = Arc::clone(&self.release);
        let accept = self.accept;
        Box::pin(async move {
            asked.notify_one();
            release.notified().await;
            accept
        })
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn workbench(
    store: Arc<MemoryStore>,
    generator: Arc<dyn GenerationClient>,
    confirm: Arc<dyn ConfirmationPrompt>,
) -> Workbench {
    Workbench::new(Collaborators { store, generator, confirm }, WorkbenchOptions::default())
}

fn chapter(id: &str, title: &str) -> Chapter {
    Chapter {
        id: ChapterId::from(id),
        chapter_title: title.into(),
        chapter_description: format!("{title} description"),
        connections: Vec::new(),
    }
}

fn with_outline(bench: &Workbench, ids: &[&str]) {
    bench
        .replace_outline(ids.iter().map(|id| chapter(id, &format!("Title {id}"))).collect())
        .expect("outline should be accepted");
}

fn id(value: &str) -> ChapterId {
    ChapterId::from(value)
}

// ── Selection, hydration, history ──────────────────────────────────

#[test]
fn first_selection_hydrates_and_undo_restores_saved_text() {
    let store = Arc::new(MemoryStore::with_entries([("folio-chapter-Ch1", "Hello world")]));
    let bench = workbench(store, ScriptedGenerator::text("unused"), Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1"]);

    bench.select_chapter(&id("Ch1")).unwrap();
    assert_eq!(bench.current_content(&id("Ch1")), "Hello world");

    assert!(bench.edit(&id("Ch1"), "Hello world!").unwrap());
    assert!(bench.undo(&id("Ch1")).unwrap());

    let history = bench.history(&id("Ch1")).unwrap();
    assert_eq!(history.present(), "Hello world");
    assert_eq!(history.future().iter().collect::<Vec<_>>(), vec!["Hello world!"]);
    assert!(history.past().is_empty());
}

#[test]
fn durable_record_is_read_at_most_once_per_session() {
    let store = Arc::new(MemoryStore::with_entries([("folio-chapter-Ch1", "saved")]));
    let bench = workbench(store.clone(), ScriptedGenerator::text("unused"), Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1", "Ch2"]);

    bench.select_chapter(&id("Ch1")).unwrap();
    bench.edit(&id("Ch1"), "changed").unwrap();
    bench.select_chapter(&id("Ch2")).unwrap();
    bench.select_chapter(&id("Ch1")).unwrap();
    bench.export_manifest().unwrap();

    assert_eq!(store.reads_of("folio-chapter-Ch1"), 1);
    assert_eq!(store.reads_of("folio-chapter-Ch2"), 1);
    // Memory stays authoritative even though storage still has the old text.
    assert_eq!(bench.current_content(&id("Ch1")), "changed");
}

#[test]
fn missing_record_hydrates_as_empty() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        Arc::new(AlwaysConfirm),
    );
    with_outline(&bench, &["Ch1"]);

    bench.select_chapter(&id("Ch1")).unwrap();

    let view = bench.snapshot();
    assert_eq!(view.active_chapter, Some(id("Ch1")));
    assert_eq!(view.active_content.as_deref(), Some(""));
    assert!(!view.can_undo);
}

#[test]
fn selecting_unknown_chapter_is_rejected() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        Arc::new(AlwaysConfirm),
    );
    assert!(matches!(
        bench.select_chapter(&id("nope")),
        Err(WorkbenchError::UnknownChapter(_))
    ));
}

#[test]
fn snapshots_do_not_observe_later_edits() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        Arc::new(AlwaysConfirm),
    );
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "first").unwrap();

    let before = bench.contents();
    bench.edit(&id("Ch1"), "second").unwrap();

    assert_eq!(before[&id("Ch1")].present(), "first");
    assert_eq!(bench.contents()[&id("Ch1")].present(), "second");
}

#[tokio::test]
async fn selection_clears_previous_analysis() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        Arc::new(AlwaysConfirm),
    );
    with_outline(&bench, &["Ch1", "Ch2"]);
    bench.select_chapter(&id("Ch1")).unwrap();

    let outcome = bench.suggest_edits(&id("Ch1")).await.unwrap();
    assert_eq!(outcome, Outcome::NoContent("There is no content to edit.".into()));
    assert!(bench.snapshot().analysis.is_some());

    bench.select_chapter(&id("Ch2")).unwrap();
    assert!(bench.snapshot().analysis.is_none());
}

// ── Save / revert / delete ─────────────────────────────────────────

#[tokio::test]
async fn save_then_revert_discards_unsaved_history() {
    let store = Arc::new(MemoryStore::new());
    let confirm = ScriptedConfirm::answering(true);
    let bench = workbench(store.clone(), ScriptedGenerator::text("unused"), confirm.clone());
    with_outline(&bench, &["Ch1"]);

    bench.select_chapter(&id("Ch1")).unwrap();
    bench.edit(&id("Ch1"), "kept").unwrap();
    bench.save(&id("Ch1")).unwrap();
    bench.edit(&id("Ch1"), "kept, then scribbled").unwrap();

    assert_eq!(bench.revert(&id("Ch1")).await.unwrap(), Outcome::Applied);

    let history = bench.history(&id("Ch1")).unwrap();
    assert_eq!(history.present(), "kept");
    assert!(history.past().is_empty() && history.future().is_empty());
    assert_eq!(confirm.prompts(), 1);
    assert_eq!(store.get("folio-chapter-Ch1").unwrap().as_deref(), Some("kept"));
}

#[tokio::test]
async fn declined_revert_leaves_history_alone() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        ScriptedConfirm::answering(false),
    );
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "draft").unwrap();

    assert_eq!(bench.revert(&id("Ch1")).await.unwrap(), Outcome::Aborted);
    assert_eq!(bench.current_content(&id("Ch1")), "draft");
    assert!(bench.operation_state(&id("Ch1")).is_idle());
}

#[test]
fn delete_chapter_removes_every_trace() {
    let store = Arc::new(MemoryStore::with_entries([("folio-chapter-Ch2", "saved")]));
    let bench = workbench(store.clone(), ScriptedGenerator::text("unused"), Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1", "Ch2", "Ch3"]);
    bench.connect_chapters(&id("Ch1"), &id("Ch2"), "foreshadows").unwrap();
    bench.connect_chapters(&id("Ch3"), &id("Ch2"), "callback").unwrap();
    bench.connect_chapters(&id("Ch3"), &id("Ch1"), "echo").unwrap();
    bench.select_chapter(&id("Ch2")).unwrap();

    assert!(bench.delete_chapter(&id("Ch2")).unwrap());

    let view = bench.snapshot();
    assert!(view.active_chapter.is_none());
    assert!(!view.contents.contains_key(&id("Ch2")));
    assert!(!store.contains("folio-chapter-Ch2"));
    assert_eq!(view.chapters.len(), 2);
    assert!(view.chapters[0].connections.is_empty());
    assert_eq!(view.chapters[1].connections.len(), 1);
    assert_eq!(view.chapters[1].connections[0].target_id, id("Ch1"));
}

#[test]
fn connections_reject_self_and_duplicates() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        Arc::new(AlwaysConfirm),
    );
    with_outline(&bench, &["Ch1", "Ch2"]);

    assert!(matches!(
        bench.connect_chapters(&id("Ch1"), &id("Ch1"), ""),
        Err(WorkbenchError::Connection(_))
    ));
    bench.connect_chapters(&id("Ch1"), &id("Ch2"), "a").unwrap();
    assert!(matches!(
        bench.connect_chapters(&id("Ch1"), &id("Ch2"), "b"),
        Err(WorkbenchError::Connection(_))
    ));
    assert!(matches!(
        bench.connect_chapters(&id("Ch1"), &id("Missing"), "c"),
        Err(WorkbenchError::UnknownChapter(_))
    ));
    assert!(bench.disconnect_chapters(&id("Ch1"), &id("Ch2")).unwrap());
}

// ── AI operations ──────────────────────────────────────────────────

const SEED_PROJECT: &str = r#"[{
    "id": "seed",
    "name": "Seed",
    "lastModified": 1,
    "genre": "Fantasy",
    "ideas": [{"id": "i1", "title": "The Tide Clock", "synopsis": "A keeper winds the sea."}],
    "idea": {"id": "i1", "title": "The Tide Clock", "synopsis": "A keeper winds the sea."}
}]"#;

/// Loads a saved project with a selected idea.
fn seed_idea(bench: &Workbench) {
    bench.import_projects(SEED_PROJECT).unwrap();
    bench.open_project("seed").unwrap();
}

#[tokio::test]
async fn drafting_requires_a_selected_idea() {
    let generator = ScriptedGenerator::text("new chapter");
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1"]);

    assert!(matches!(bench.generate_chapter(&id("Ch1")).await, Err(WorkbenchError::NoIdea)));
    assert_eq!(generator.calls(), 0);
    assert!(bench.operation_state(&id("Ch1")).is_idle());
}

#[tokio::test]
async fn declined_overwrite_makes_no_provider_call() {
    let generator = ScriptedGenerator::text("new chapter");
    let confirm = ScriptedConfirm::answering(false);
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), confirm.clone());
    seed_idea(&bench);
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "draft text").unwrap();

    assert_eq!(bench.generate_chapter(&id("Ch1")).await.unwrap(), Outcome::Aborted);
    assert_eq!(generator.calls(), 0);
    assert_eq!(confirm.prompts(), 1);
    assert_eq!(bench.current_content(&id("Ch1")), "draft text");
    assert!(bench.operation_state(&id("Ch1")).is_idle());
}

#[tokio::test]
async fn whitespace_only_chapter_still_asks_before_drafting() {
    let generator = ScriptedGenerator::text("new chapter");
    let confirm = ScriptedConfirm::answering(false);
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), confirm.clone());
    seed_idea(&bench);
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "  \n\n").unwrap();

    assert_eq!(bench.generate_chapter(&id("Ch1")).await.unwrap(), Outcome::Aborted);
    assert_eq!(confirm.prompts(), 1);
    assert_eq!(generator.calls(), 0);
    assert_eq!(bench.current_content(&id("Ch1")), "  \n\n");

    // Rewrites of blank text still stop before the prompt.
    assert!(matches!(bench.humanize(&id("Ch1")).await.unwrap(), Outcome::NoContent(_)));
    assert_eq!(confirm.prompts(), 1);
}

#[tokio::test]
async fn generating_into_empty_chapter_skips_confirmation_and_is_undoable() {
    let generator = ScriptedGenerator::text("# Chapter One\n\nIt began.");
    let confirm = ScriptedConfirm::answering(false);
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), confirm.clone());
    seed_idea(&bench);
    with_outline(&bench, &["Ch1"]);

    assert_eq!(bench.generate_chapter(&id("Ch1")).await.unwrap(), Outcome::Applied);
    assert_eq!(confirm.prompts(), 0);
    assert_eq!(bench.current_content(&id("Ch1")), "# Chapter One\n\nIt began.");

    let request = generator.last_request();
    assert!(request.prompt.contains("The Tide Clock"));
    assert!(request.prompt.contains("Title Ch1"));
    assert_eq!(request.target, GenerationTarget::Text(ModelTier::Quality));

    assert!(bench.undo(&id("Ch1")).unwrap());
    assert_eq!(bench.current_content(&id("Ch1")), "");
}

#[tokio::test]
async fn accepted_overwrite_commits_through_history() {
    let generator = ScriptedGenerator::text("Polished prose.");
    let confirm = ScriptedConfirm::answering(true);
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), confirm.clone());
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "robotic prose").unwrap();

    assert_eq!(bench.humanize(&id("Ch1")).await.unwrap(), Outcome::Applied);

    let history = bench.history(&id("Ch1")).unwrap();
    assert_eq!(history.present(), "Polished prose.");
    assert_eq!(history.past().back().map(String::as_str), Some("robotic prose"));
    let prompts = confirm.requests.lock().unwrap().clone();
    assert_eq!(
        prompts[0].action,
        ConfirmAction::Operation { kind: OperationKind::Humanize, chapter_id: id("Ch1") }
    );
    assert!(generator.last_request().prompt.contains("robotic prose"));
}

#[tokio::test]
async fn rewrites_on_empty_text_return_no_content() {
    let generator = ScriptedGenerator::text("unused");
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1"]);

    assert!(matches!(bench.humanize(&id("Ch1")).await.unwrap(), Outcome::NoContent(_)));
    assert!(matches!(bench.fix_grammar(&id("Ch1")).await.unwrap(), Outcome::NoContent(_)));
    assert!(matches!(bench.suggest_edits(&id("Ch1")).await.unwrap(), Outcome::NoContent(_)));
    assert!(matches!(
        bench.analyze(&id("Ch1"), vec!["Pacing".into()]).await.unwrap(),
        Outcome::NoContent(_)
    ));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn analysis_requires_an_aspect_and_uses_the_fast_model() {
    let generator = ScriptedGenerator::text("Pacing is brisk.");
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1"]);
    bench.select_chapter(&id("Ch1")).unwrap();

    // Empty text is reported before a missing aspect.
    assert_eq!(
        bench.analyze(&id("Ch1"), Vec::new()).await.unwrap(),
        Outcome::NoContent("There is no content to analyze.".into())
    );

    bench.edit(&id("Ch1"), "Some text.").unwrap();
    assert_eq!(
        bench.analyze(&id("Ch1"), Vec::new()).await.unwrap(),
        Outcome::NoContent("Please select at least one aspect to analyze.".into())
    );

    let outcome = bench
        .analyze(&id("Ch1"), vec!["Pacing".into(), "Plot Consistency".into()])
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Feedback("Pacing is brisk.".into()));
    assert_eq!(bench.snapshot().analysis.as_deref(), Some("Pacing is brisk."));
    assert_eq!(bench.current_content(&id("Ch1")), "Some text.");

    let request = generator.last_request();
    assert_eq!(request.target, GenerationTarget::Text(ModelTier::Fast));
    assert!(request.prompt.contains("Pacing and Plot Consistency"));
    assert!(request.prompt.contains("Chapter Description: \"Title Ch1 description\""));
}

#[tokio::test]
async fn provider_failure_sets_banner_without_mutation() {
    let generator = ScriptedGenerator::replying(vec![Err(GenerationError::RateLimited)]);
    let bench = workbench(Arc::new(MemoryStore::new()), generator, Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "teh text").unwrap();

    let err = bench.fix_grammar(&id("Ch1")).await.unwrap_err();

    assert!(matches!(err, WorkbenchError::Generation(GenerationError::RateLimited)));
    assert_eq!(bench.current_content(&id("Ch1")), "teh text");
    assert!(bench.operation_state(&id("Ch1")).is_idle());
    assert!(bench.error().unwrap().contains("rate limiting"));

    bench.dismiss_error();
    assert!(bench.error().is_none());
}

#[tokio::test]
async fn one_operation_per_chapter_while_others_stay_responsive() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let generator = Arc::new(GatedGenerator {
        started: Arc::clone(&started),
        release: Arc::clone(&release),
        text: "Humanized.".into(),
    });
    let bench = workbench(Arc::new(MemoryStore::new()), generator, Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1", "Ch2"]);
    bench.edit(&id("Ch1"), "stiff").unwrap();

    let task = {
        let bench = bench.clone();
        tokio::spawn(async move { bench.humanize(&id("Ch1")).await })
    };
    started.notified().await;

    assert_eq!(
        bench.operation_state(&id("Ch1")),
        OperationState::Pending(OperationKind::Humanize)
    );
    assert!(matches!(
        bench.fix_grammar(&id("Ch1")).await,
        Err(WorkbenchError::Busy { .. })
    ));
    assert!(matches!(bench.edit(&id("Ch1"), "typing"), Err(WorkbenchError::Busy { .. })));
    assert!(matches!(bench.undo(&id("Ch1")), Err(WorkbenchError::Busy { .. })));
    assert!(matches!(bench.delete_chapter(&id("Ch1")), Err(WorkbenchError::Busy { .. })));
    assert!(matches!(bench.new_project().await, Err(WorkbenchError::Busy { .. })));

    // Other chapters, selection and the layout keep working.
    assert!(bench.edit(&id("Ch2"), "unaffected").unwrap());
    bench.select_chapter(&id("Ch1")).unwrap();
    assert!(bench.begin_drag(0, 500.0));
    assert!(bench.drag_to(600.0, 1000.0));
    bench.end_drag();

    release.notify_one();
    assert_eq!(task.await.unwrap().unwrap(), Outcome::Applied);
    assert_eq!(bench.current_content(&id("Ch1")), "Humanized.");
    assert!(bench.operation_state(&id("Ch1")).is_idle());
}

#[tokio::test]
async fn aborted_task_still_releases_its_chapter() {
    let started = Arc::new(Notify::new());
    let generator = Arc::new(GatedGenerator {
        started: Arc::clone(&started),
        release: Arc::new(Notify::new()),
        text: "never".into(),
    });
    let bench = workbench(Arc::new(MemoryStore::new()), generator, Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "text").unwrap();

    let task = {
        let bench = bench.clone();
        tokio::spawn(async move { bench.fix_grammar(&id("Ch1")).await })
    };
    started.notified().await;
    assert!(!bench.operation_state(&id("Ch1")).is_idle());

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert!(bench.operation_state(&id("Ch1")).is_idle());
    assert_eq!(bench.current_content(&id("Ch1")), "text");
}

#[tokio::test]
async fn feedback_for_a_chapter_no_longer_active_is_not_displayed() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let generator = Arc::new(GatedGenerator {
        started: Arc::clone(&started),
        release: Arc::clone(&release),
        text: "Too slow.".into(),
    });
    let bench = workbench(Arc::new(MemoryStore::new()), generator, Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1", "Ch2"]);
    bench.select_chapter(&id("Ch1")).unwrap();
    bench.edit(&id("Ch1"), "text").unwrap();

    let task = {
        let bench = bench.clone();
        tokio::spawn(async move { bench.suggest_edits(&id("Ch1")).await })
    };
    started.notified().await;
    bench.select_chapter(&id("Ch2")).unwrap();
    release.notify_one();

    assert_eq!(task.await.unwrap().unwrap(), Outcome::Feedback("Too slow.".into()));
    assert!(bench.snapshot().analysis.is_none());
}

#[tokio::test]
async fn ideas_then_outline_replace_previous_state() {
    let generator = ScriptedGenerator::replying(vec![
        Ok(GenerationOutput::Text(
            r#"[{"title":"A","synopsis":"one"},{"title":"B","synopsis":"two"},{"title":"C","synopsis":"three"}]"#
                .into(),
        )),
        Ok(GenerationOutput::Text(
            r#"[{"chapterTitle":"Start","chapterDescription":"It starts."},{"chapterTitle":"End","chapterDescription":"It ends."}]"#
                .into(),
        )),
    ]);
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), Arc::new(AlwaysConfirm));
    bench.set_genre("Mystery");
    with_outline(&bench, &["Old"]);
    bench.edit(&id("Old"), "stale").unwrap();

    assert_eq!(bench.generate_ideas().await.unwrap(), Outcome::Applied);
    let view = bench.snapshot();
    assert_eq!(view.ideas.len(), 3);
    assert!(view.chapters.is_empty());
    assert!(view.contents.is_empty());
    assert!(generator.last_request().prompt.contains("Mystery genre"));
    assert!(generator.last_request().schema.is_some());

    assert!(matches!(bench.generate_outline().await, Err(WorkbenchError::NoIdea)));
    let idea_id = view.ideas[1].id.clone();
    bench.select_idea(&idea_id).unwrap();
    assert_eq!(bench.generate_outline().await.unwrap(), Outcome::Applied);

    let view = bench.snapshot();
    assert_eq!(view.selected_idea.as_ref().map(|idea| idea.title.as_str()), Some("B"));
    assert_eq!(view.chapters.len(), 2);
    assert_eq!(view.chapters[0].chapter_title, "Start");
    assert!(generator.last_request().prompt.contains("\"B\""));
}

const NEW_OUTLINE: &str = r#"[{"chapterTitle":"New","chapterDescription":"Fresh start."}]"#;

#[tokio::test]
async fn revert_waits_for_a_pending_outline() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let generator = Arc::new(GatedGenerator {
        started: Arc::clone(&started),
        release: Arc::clone(&release),
        text: NEW_OUTLINE.into(),
    });
    let store = Arc::new(MemoryStore::new());
    let bench = workbench(Arc::clone(&store), generator, Arc::new(AlwaysConfirm));
    seed_idea(&bench);
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "draft").unwrap();
    bench.save(&id("Ch1")).unwrap();

    let task = {
        let bench = bench.clone();
        tokio::spawn(async move { bench.generate_outline().await })
    };
    started.notified().await;

    assert!(matches!(bench.revert(&id("Ch1")).await, Err(WorkbenchError::Busy { .. })));
    assert!(bench.operation_state(&id("Ch1")).is_idle());

    release.notify_one();
    assert_eq!(task.await.unwrap().unwrap(), Outcome::Applied);
    let view = bench.snapshot();
    assert_eq!(view.chapters.len(), 1);
    assert_eq!(view.chapters[0].chapter_title, "New");
    assert!(view.contents.is_empty());
}

#[tokio::test]
async fn revert_awaiting_confirmation_blocks_outline_replacement() {
    let asked = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let confirm =
        Arc::new(GatedConfirm { asked: Arc::clone(&asked), release: Arc::clone(&release), accept: true });
    let generator = ScriptedGenerator::text(NEW_OUTLINE);
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), confirm);
    seed_idea(&bench);
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "unsaved").unwrap();

    let task = {
        let bench = bench.clone();
        tokio::spawn(async move { bench.revert(&id("Ch1")).await })
    };
    asked.notified().await;
    assert_eq!(
        bench.operation_state(&id("Ch1")),
        OperationState::ConfirmPending(OperationKind::Revert)
    );

    assert!(matches!(bench.generate_outline().await, Err(WorkbenchError::Busy { .. })));
    assert!(matches!(bench.generate_ideas().await, Err(WorkbenchError::Busy { .. })));
    assert_eq!(generator.calls(), 0);

    release.notify_one();
    assert_eq!(task.await.unwrap().unwrap(), Outcome::Applied);

    let view = bench.snapshot();
    assert_eq!(view.chapters.len(), 1);
    assert_eq!(view.chapters[0].id, id("Ch1"));
    assert_eq!(view.contents.keys().collect::<Vec<_>>(), vec![&id("Ch1")]);
    assert_eq!(bench.current_content(&id("Ch1")), "");
}

#[tokio::test]
async fn failed_outline_keeps_the_existing_one() {
    let generator = ScriptedGenerator::replying(vec![Ok(GenerationOutput::Text("nonsense".into()))]);
    let bench = workbench(Arc::new(MemoryStore::new()), generator, Arc::new(AlwaysConfirm));
    seed_idea(&bench);
    with_outline(&bench, &["Ch1"]);

    assert!(matches!(
        bench.generate_outline().await,
        Err(WorkbenchError::Generation(GenerationError::Failure(_)))
    ));
    assert_eq!(bench.snapshot().chapters.len(), 1);
    assert!(bench.project_operation_state().is_idle());
    assert!(bench.error().is_some());
}

#[tokio::test]
async fn cover_is_stored_as_data_url() {
    let generator = ScriptedGenerator::replying(vec![Ok(GenerationOutput::Images(vec![
        GeneratedImage { mime_type: "image/jpeg".into(), data_base64: "/9j/".into() },
    ]))]);
    let bench = workbench(Arc::new(MemoryStore::new()), generator.clone(), Arc::new(AlwaysConfirm));
    seed_idea(&bench);

    assert_eq!(bench.generate_cover().await.unwrap(), Outcome::Applied);
    assert!(bench.snapshot().has_cover);
    assert_eq!(generator.last_request().target, GenerationTarget::Images { count: 1 });
    assert_eq!(
        bench.export_manifest().unwrap().cover_image.as_deref(),
        Some("data:image/jpeg;base64,/9j/")
    );
}

// ── Projects and export ────────────────────────────────────────────

#[tokio::test]
async fn save_new_and_load_project_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let bench = workbench(store, ScriptedGenerator::text("unused"), Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1"]);
    bench.edit(&id("Ch1"), "v1").unwrap();
    bench.edit(&id("Ch1"), "v2").unwrap();
    bench.undo(&id("Ch1")).unwrap();
    bench.select_chapter(&id("Ch1")).unwrap();

    let saved = bench.save_project(Some("  My Book  ")).unwrap();
    assert_eq!(saved.name, "My Book");

    assert_eq!(bench.new_project().await.unwrap(), Outcome::Applied);
    let fresh = bench.snapshot();
    assert_ne!(fresh.project_id, saved.id);
    assert!(fresh.chapters.is_empty());

    assert_eq!(bench.load_project(&saved.id).await.unwrap(), Outcome::Applied);
    let view = bench.snapshot();
    assert_eq!(view.project_id, saved.id);
    assert!(view.active_chapter.is_none());
    let history = bench.history(&id("Ch1")).unwrap();
    assert_eq!(history.present(), "v1");
    assert_eq!(history.future().front().map(String::as_str), Some("v2"));
}

#[tokio::test]
async fn declined_project_switches_change_nothing() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        ScriptedConfirm::answering(false),
    );
    with_outline(&bench, &["Ch1"]);
    let saved = bench.save_project(None).unwrap();
    assert_eq!(saved.name, "Untitled Book");

    assert_eq!(bench.new_project().await.unwrap(), Outcome::Aborted);
    assert_eq!(bench.load_project(&saved.id).await.unwrap(), Outcome::Aborted);
    assert_eq!(bench.delete_project(&saved.id).await.unwrap(), Outcome::Aborted);
    assert_eq!(bench.snapshot().chapters.len(), 1);
    assert_eq!(bench.list_projects().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_and_load_unknown_projects() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        Arc::new(AlwaysConfirm),
    );
    let saved = bench.save_project(Some("Gone")).unwrap();

    assert_eq!(bench.delete_project(&saved.id).await.unwrap(), Outcome::Applied);
    assert_eq!(bench.delete_project(&saved.id).await.unwrap(), Outcome::Unchanged);
    assert!(matches!(
        bench.load_project(&saved.id).await,
        Err(WorkbenchError::UnknownProject(_))
    ));
}

#[test]
fn export_uses_present_text_in_outline_order() {
    let store = Arc::new(MemoryStore::with_entries([("folio-chapter-Ch2", "Saved two")]));
    let bench = workbench(store, ScriptedGenerator::text("unused"), Arc::new(AlwaysConfirm));
    with_outline(&bench, &["Ch1", "Ch2", "Ch3"]);
    bench.edit(&id("Ch1"), "One, old").unwrap();
    bench.edit(&id("Ch1"), "One").unwrap();

    let manifest = bench.export_manifest().unwrap();
    assert_eq!(manifest.title, "Untitled Book");
    let texts: Vec<_> = manifest.chapters.iter().map(|c| c.present_text.as_str()).collect();
    assert_eq!(texts, vec!["One", "Saved two", ""]);

    let html = bench.export_html().unwrap();
    assert!(html.contains("Chapter 2: Title Ch2"));
    assert!(html.contains("<p>Saved two</p>"));
}

#[test]
fn pane_drag_scenario_through_workbench() {
    let bench = workbench(
        Arc::new(MemoryStore::new()),
        ScriptedGenerator::text("unused"),
        Arc::new(AlwaysConfirm),
    );

    assert!(bench.begin_drag(0, 250.0));
    bench.drag_to(-5000.0, 1000.0);
    assert_eq!(bench.end_drag(), Some(0));
    assert_eq!(bench.pane_widths(), vec![25.0, 35.0, 40.0]);

    assert!(bench.begin_drag(1, 600.0));
    assert!(bench.drag_to(650.0, 1000.0));
    bench.end_drag();
    let widths = bench.pane_widths();
    assert_eq!(widths[0], 25.0);
    assert!((widths[1] - 40.0).abs() < 1e-9);
    assert!((widths[2] - 35.0).abs() < 1e-9);

    bench.reset_layout();
    assert_eq!(bench.pane_widths(), vec![25.0, 35.0, 40.0]);
}
