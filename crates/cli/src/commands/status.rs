// `folio status` — current project, selection and operations.

use clap::Args;
use folio_studio::engine::session::{ActiveOperation, UNTITLED_BOOK};
use serde::Serialize;

use crate::context::{Context, GlobalArgs};
use crate::output;

#[derive(Debug, Args)]
pub struct StatusArgs {}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub project_id: String,
    pub project_name: Option<String>,
    pub genre: String,
    pub idea: Option<String>,
    pub ideas: usize,
    pub chapters: usize,
    pub active_chapter: Option<String>,
    pub has_cover: bool,
    pub operations: Vec<ActiveOperation>,
    pub error: Option<String>,
}

pub fn run(_args: StatusArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let ctx = Context::open(globals)?;
    let view = ctx.workbench.snapshot();
    let active_chapter = view.active_chapter.as_ref().and_then(|id| {
        view.chapters.iter().find(|chapter| &chapter.id == id).map(|c| c.chapter_title.clone())
    });

    let report = StatusReport {
        project_id: view.project_id,
        project_name: view.project_name,
        genre: view.genre,
        idea: view.selected_idea.map(|idea| idea.title),
        ideas: view.ideas.len(),
        chapters: view.chapters.len(),
        active_chapter,
        has_cover: view.has_cover,
        operations: view.operations,
        error: view.error,
    };
    output::print_output(ctx.format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &StatusReport) -> String {
    let name = report.project_name.as_deref().unwrap_or(UNTITLED_BOOK);
    let mut lines = vec![
        format!("Project:  {name} ({})", report.project_id),
        format!("Genre:    {}", report.genre),
        format!(
            "Idea:     {}",
            report.idea.as_deref().unwrap_or(match report.ideas {
                0 => "none",
                _ => "none selected",
            })
        ),
        format!("Chapters: {}", report.chapters),
    ];
    if let Some(chapter) = &report.active_chapter {
        lines.push(format!("Editing:  {chapter}"));
    }
    if report.has_cover {
        lines.push("Cover:    generated".to_string());
    }
    for operation in &report.operations {
        lines.push(format!("Running:  {} ({})", operation.scope, operation.state));
    }
    if let Some(error) = &report.error {
        lines.push(format!("Error:    {error}"));
    }
    lines.join("\n")
}
