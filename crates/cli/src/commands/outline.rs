// `folio outline` — generate and edit the chapter outline.

use clap::{Args, Subcommand};
use folio_common::types::ChapterId;
use folio_studio::engine::session::UNTITLED_BOOK;
use serde::Serialize;

use crate::context::{Context, GlobalArgs};
use crate::output;

#[derive(Debug, Args)]
pub struct OutlineArgs {
    #[command(subcommand)]
    action: OutlineAction,
}

#[derive(Debug, Subcommand)]
enum OutlineAction {
    /// Generate an outline for the selected idea (replaces chapters and histories)
    Generate,
    /// Show the outline
    Show,
    /// Append a chapter
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Link one chapter to another
    Connect {
        source: String,
        target: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Remove a link between two chapters
    Disconnect { source: String, target: String },
    /// Delete a chapter, its history and its saved text
    Rm { chapter: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineReport {
    pub title: String,
    pub chapters: Vec<OutlineEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineEntry {
    pub position: usize,
    pub chapter_id: String,
    pub title: String,
    pub description: String,
    /// Positions of connected chapters.
    pub connections: Vec<usize>,
    /// Words in the present text, when the chapter has been opened.
    pub words: Option<usize>,
}

pub fn run(args: OutlineArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let ctx = Context::open(globals)?;
    let mutates = !matches!(args.action, OutlineAction::Show);
    match args.action {
        OutlineAction::Generate => {
            ctx.block_on(ctx.workbench.generate_outline())?;
        }
        OutlineAction::Show => {}
        OutlineAction::Add { title, description } => {
            ctx.workbench.add_chapter(title, description);
        }
        OutlineAction::Connect { source, target, description } => {
            let source = ctx.chapter_id(&source)?;
            let target = ctx.chapter_id(&target)?;
            ctx.workbench.connect_chapters(&source, &target, description)?;
        }
        OutlineAction::Disconnect { source, target } => {
            let source = ctx.chapter_id(&source)?;
            let target = ctx.chapter_id(&target)?;
            if !ctx.workbench.disconnect_chapters(&source, &target)? {
                output::print_warning(ctx.format, "NOT_CONNECTED", "those chapters were not linked");
            }
        }
        OutlineAction::Rm { chapter } => {
            let chapter_id = ctx.chapter_id(&chapter)?;
            ctx.workbench.delete_chapter(&chapter_id)?;
        }
    }
    if mutates {
        ctx.persist()?;
    }

    output::print_output(ctx.format, &report(&ctx), format_human)?;
    Ok(())
}

fn report(ctx: &Context) -> OutlineReport {
    let view = ctx.workbench.snapshot();
    let position_of = |id: &ChapterId| {
        view.chapters.iter().position(|chapter| &chapter.id == id).map(|index| index + 1)
    };
    let chapters = view
        .chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| OutlineEntry {
            position: index + 1,
            chapter_id: chapter.id.to_string(),
            title: chapter.chapter_title.clone(),
            description: chapter.chapter_description.clone(),
            connections: chapter
                .connections
                .iter()
                .filter_map(|connection| position_of(&connection.target_id))
                .collect(),
            words: view
                .contents
                .get(&chapter.id)
                .map(|history| history.present().split_whitespace().count()),
        })
        .collect();
    let title = view.selected_idea.map_or_else(|| UNTITLED_BOOK.to_string(), |idea| idea.title);
    OutlineReport { title, chapters }
}

fn format_human(report: &OutlineReport) -> String {
    if report.chapters.is_empty() {
        return format!("{}: no chapters yet. Run: folio outline generate", report.title);
    }

    let mut lines = vec![format!("{} ({} chapters)", report.title, report.chapters.len())];
    for entry in &report.chapters {
        let words = entry.words.map(|w| format!(" [{w} words]")).unwrap_or_default();
        lines.push(format!("{:>3}. {}{words}", entry.position, entry.title));
        if !entry.description.is_empty() {
            lines.push(format!("     {}", entry.description));
        }
        if !entry.connections.is_empty() {
            let targets: Vec<String> =
                entry.connections.iter().map(|position| position.to_string()).collect();
            lines.push(format!("     -> {}", targets.join(", ")));
        }
    }
    lines.join("\n")
}
