// `folio ideas` — generate, list and select book ideas.

use clap::{Args, Subcommand};
use folio_common::types::{BookIdea, GENRES};
use serde::Serialize;

use crate::context::{resolve_idea, Context, GlobalArgs};
use crate::output;

#[derive(Debug, Args)]
pub struct IdeasArgs {
    #[command(subcommand)]
    action: IdeasAction,
}

#[derive(Debug, Subcommand)]
enum IdeasAction {
    /// Ask the model for fresh ideas (replaces the list and the outline)
    Generate {
        /// Genre to write in.
        #[arg(long)]
        genre: Option<String>,

        /// Comma-separated topics to remember with the project.
        #[arg(long, value_delimiter = ',')]
        topics: Vec<String>,
    },
    /// List the current ideas
    Ls,
    /// Choose the idea to outline (by list position or id)
    Select { idea: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct IdeasReport {
    pub genre: String,
    pub ideas: Vec<BookIdea>,
    pub selected: Option<String>,
}

pub fn run(args: IdeasArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let ctx = Context::open(globals)?;
    match args.action {
        IdeasAction::Generate { genre, topics } => {
            if let Some(genre) = genre {
                if !GENRES.contains(&genre.as_str()) {
                    output::print_warning(
                        ctx.format,
                        "UNKNOWN_GENRE",
                        &format!("`{genre}` is not one of: {}", GENRES.join(", ")),
                    );
                }
                ctx.workbench.set_genre(genre);
            }
            if !topics.is_empty() {
                ctx.workbench.set_topics(topics);
            }
            ctx.block_on(ctx.workbench.generate_ideas())?;
            ctx.persist()?;
        }
        IdeasAction::Ls => {}
        IdeasAction::Select { idea } => {
            let idea_id = resolve_idea(&ctx.workbench.snapshot().ideas, &idea)?;
            ctx.workbench.select_idea(&idea_id)?;
            ctx.persist()?;
        }
    }

    let view = ctx.workbench.snapshot();
    let report = IdeasReport {
        genre: view.genre,
        ideas: view.ideas,
        selected: view.selected_idea.map(|idea| idea.id),
    };
    output::print_output(ctx.format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &IdeasReport) -> String {
    if report.ideas.is_empty() {
        return format!("No {} ideas yet. Run: folio ideas generate", report.genre);
    }

    let mut lines = vec![format!("{} idea(s) ({})", report.ideas.len(), report.genre)];
    for (index, idea) in report.ideas.iter().enumerate() {
        let marker = if report.selected.as_deref() == Some(idea.id.as_str()) { "*" } else { " " };
        lines.push(format!("{marker} {}. {}", index + 1, idea.title));
        lines.push(format!("     {}", idea.synopsis));
    }
    lines.join("\n")
}
