// `folio projects` — saved projects and JSON backups.

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{TimeZone, Utc};
use clap::{Args, Subcommand};
use folio_studio::engine::Outcome;
use folio_studio::store::projects::{ImportSummary, Project};
use serde::Serialize;

use super::describe_outcome;
use crate::context::{Context, GlobalArgs};
use crate::output;

#[derive(Debug, Args)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    action: ProjectsAction,
}

#[derive(Debug, Subcommand)]
enum ProjectsAction {
    /// List saved projects, newest first
    Ls,
    /// Save the current project, optionally renaming it
    Save {
        #[arg(long)]
        name: Option<String>,
    },
    /// Start an empty project
    New,
    /// Make a saved project the current one
    Open { project: String },
    /// Delete a saved project
    Rm { project: String },
    /// Write every project to a JSON backup
    Export {
        /// Backup file (stdout when omitted).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Merge a JSON backup into the library
    Import { file: PathBuf },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub last_modified: i64,
    pub chapters: usize,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectsReport {
    List { projects: Vec<ProjectEntry> },
    Changed { project_id: String, outcome: Outcome },
    Imported { summary: ImportSummary },
    Exported { path: PathBuf, projects: usize },
}

pub fn run(args: ProjectsArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let ctx = Context::open(globals)?;
    let bench = &ctx.workbench;

    let report = match args.action {
        ProjectsAction::Ls => list(&ctx)?,
        ProjectsAction::Save { name } => {
            let project = bench.save_project(name.as_deref())?;
            ProjectsReport::Changed { project_id: project.id, outcome: Outcome::Applied }
        }
        ProjectsAction::New => {
            let outcome = ctx.block_on(bench.new_project())?;
            if outcome == Outcome::Applied {
                ctx.persist()?;
            }
            ProjectsReport::Changed { project_id: bench.snapshot().project_id, outcome }
        }
        ProjectsAction::Open { project } => {
            // Every command saves its work, so there is nothing to confirm
            // discarding. Saving bumps lastModified so later runs resume it.
            bench.open_project(&project)?;
            ctx.persist()?;
            ProjectsReport::Changed { project_id: project, outcome: Outcome::Applied }
        }
        ProjectsAction::Rm { project } => {
            let outcome = ctx.block_on(bench.delete_project(&project))?;
            ProjectsReport::Changed { project_id: project, outcome }
        }
        ProjectsAction::Export { out } => {
            let backup = bench.export_projects()?;
            let projects = bench.list_projects()?.len();
            match out {
                Some(path) => {
                    std::fs::write(&path, backup)
                        .with_context(|| format!("failed to write backup `{}`", path.display()))?;
                    ProjectsReport::Exported { path, projects }
                }
                None => {
                    println!("{backup}");
                    return Ok(());
                }
            }
        }
        ProjectsAction::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read backup `{}`", file.display()))?;
            let summary = bench.import_projects(&raw)?;
            ProjectsReport::Imported { summary }
        }
    };

    output::print_output(ctx.format, &report, format_human)?;
    Ok(())
}

fn list(ctx: &Context) -> anyhow::Result<ProjectsReport> {
    let current = ctx.workbench.snapshot().project_id;
    let projects = ctx
        .workbench
        .list_projects()?
        .into_iter()
        .map(|project| entry(project, &current))
        .collect();
    Ok(ProjectsReport::List { projects })
}

fn entry(project: Project, current: &str) -> ProjectEntry {
    ProjectEntry {
        current: project.id == current,
        chapters: project.chapters.len(),
        id: project.id,
        name: project.name,
        last_modified: project.last_modified,
    }
}

fn format_human(report: &ProjectsReport) -> String {
    match report {
        ProjectsReport::List { projects } if projects.is_empty() => {
            "No saved projects. Run: folio ideas generate".to_string()
        }
        ProjectsReport::List { projects } => {
            let mut lines = vec![format!("{} project(s)", projects.len())];
            for project in projects {
                let marker = if project.current { "*" } else { " " };
                lines.push(format!(
                    "{marker} {}  {} ({} chapters, saved {})",
                    project.id,
                    project.name,
                    project.chapters,
                    format_timestamp(project.last_modified)
                ));
            }
            lines.join("\n")
        }
        ProjectsReport::Changed { project_id, outcome } => {
            format!("{} ({project_id})", describe_outcome(outcome))
        }
        ProjectsReport::Imported { summary } => format!(
            "Imported {} new, updated {}, skipped {} invalid.",
            summary.imported, summary.updated, summary.skipped
        ),
        ProjectsReport::Exported { path, projects } => {
            format!("Wrote {projects} project(s) to {}", path.display())
        }
    }
}

fn format_timestamp(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}
