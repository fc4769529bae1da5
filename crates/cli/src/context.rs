// Per-invocation wiring: config, folio.db, the generation provider, the
// confirmation prompt and the project a command works on.
//
// Each invocation reopens the most recently modified project (or the one
// named by `--project`) and upserts it back after mutating commands, so
// chapter histories carry over between runs.

use std::future::Future;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use folio_common::types::{BookIdea, Chapter, ChapterId};
use folio_studio::config::FolioConfig;
use folio_studio::engine::confirm::ConfirmFuture;
use folio_studio::engine::{
    AlwaysConfirm, Collaborators, ConfirmRequest, ConfirmationPrompt, Workbench, WorkbenchOptions,
};
use folio_studio::generation::gemini::GeminiClient;
use folio_studio::generation::{
    GenerationClient, GenerationError, GenerationFuture, GenerationRequest,
};
use folio_studio::secrets::{resolve_api_key, KeyringSecretStore, API_KEY_ENV};
use folio_studio::store::kv::SqliteStore;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::output::OutputFormat;

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Project id to work on (defaults to the most recently saved one).
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Force JSON output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Accept every confirmation prompt.
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

pub struct Context {
    pub workbench: Workbench,
    pub format: OutputFormat,
    runtime: Runtime,
}

impl Context {
    pub fn open(globals: &GlobalArgs) -> Result<Self> {
        let config = FolioConfig::load().context("invalid ~/.folio/config.toml")?;
        let db_path = config
            .storage
            .resolved_db_path()
            .context("could not determine a location for folio.db; set [storage] db_path")?;
        let store = Arc::new(SqliteStore::open(&db_path)?);
        debug!(path = %db_path.display(), "opened folio.db");

        let confirm: Arc<dyn ConfirmationPrompt> =
            if globals.yes { Arc::new(AlwaysConfirm) } else { Arc::new(StdinConfirm) };
        let options =
            WorkbenchOptions::from_config(&config).context("invalid [layout] section in config")?;
        let workbench = Workbench::new(
            Collaborators { store, generator: generator(&config)?, confirm },
            options,
        );
        open_project(&workbench, globals.project.as_deref())?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the async runtime")?;

        Ok(Self { workbench, format: OutputFormat::detect(globals.json), runtime })
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Upsert the session into the project library.
    pub fn persist(&self) -> Result<()> {
        self.workbench.save_project(None)?;
        Ok(())
    }

    pub fn chapter_id(&self, reference: &str) -> Result<ChapterId> {
        resolve_chapter(&self.workbench.snapshot().chapters, reference)
    }
}

fn generator(config: &FolioConfig) -> Result<Arc<dyn GenerationClient>> {
    match resolve_api_key(&KeyringSecretStore) {
        Ok(Some(key)) => {
            let client = GeminiClient::new(&config.generation, key)
                .context("invalid [generation] endpoint in config")?;
            Ok(Arc::new(client))
        }
        Ok(None) => Ok(Arc::new(MissingApiKey)),
        Err(error) => {
            warn!(error = %format!("{error:#}"), "API key lookup failed");
            Ok(Arc::new(MissingApiKey))
        }
    }
}

fn open_project(workbench: &Workbench, project: Option<&str>) -> Result<()> {
    if let Some(project_id) = project {
        workbench.open_project(project_id)?;
        return Ok(());
    }
    if let Some(latest) = workbench.list_projects()?.into_iter().next() {
        debug!(project = %latest.id, "resuming most recent project");
        workbench.open_project(&latest.id)?;
    }
    Ok(())
}

/// `n` (1-based outline position) or a chapter id.
pub fn resolve_chapter(chapters: &[Chapter], reference: &str) -> Result<ChapterId> {
    if let Ok(position) = reference.parse::<usize>() {
        if let Some(chapter) = position.checked_sub(1).and_then(|index| chapters.get(index)) {
            return Ok(chapter.id.clone());
        }
    }
    match chapters.iter().find(|chapter| chapter.id.as_str() == reference) {
        Some(chapter) => Ok(chapter.id.clone()),
        None => bail!("chapter `{reference}` not found. Run: folio outline show"),
    }
}

/// `n` (1-based list position) or an idea id.
pub fn resolve_idea(ideas: &[BookIdea], reference: &str) -> Result<String> {
    if let Ok(position) = reference.parse::<usize>() {
        if let Some(idea) = position.checked_sub(1).and_then(|index| ideas.get(index)) {
            return Ok(idea.id.clone());
        }
    }
    match ideas.iter().find(|idea| idea.id == reference) {
        Some(idea) => Ok(idea.id.clone()),
        None => bail!("idea `{reference}` not found. Run: folio ideas ls"),
    }
}

/// Stand-in provider when no API key is configured; fails every request.
struct MissingApiKey;

impl GenerationClient for MissingApiKey {
    fn generate(&self, _request: GenerationRequest) -> GenerationFuture {
        Box::pin(async {
            Err(GenerationError::Failure(format!(
                "no API key configured. Run: folio key set, or set {API_KEY_ENV}"
            )))
        })
    }
}

/// Asks on stderr and reads the answer from stdin. Anything but `y`/`yes`
/// declines, and so does a non-interactive stdin.
struct StdinConfirm;

impl ConfirmationPrompt for StdinConfirm {
    fn confirm(&self, request: ConfirmRequest) -> ConfirmFuture {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || ask(&request.message)).await.unwrap_or(false)
        })
    }
}

fn ask(message: &str) -> bool {
    if !io::stdin().is_terminal() {
        eprintln!("{message} (not a terminal; pass --yes to accept)");
        return false;
    }
    let mut err = io::stderr().lock();
    let _ = write!(err, "{message} [y/N] ");
    let _ = err.flush();
    drop(err);

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
