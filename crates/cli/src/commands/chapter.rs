// `folio chapter` — read, write and revise one chapter.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Subcommand};
use folio_studio::engine::Outcome;
use folio_studio::generation::prompt::ANALYSIS_ASPECTS;
use serde::Serialize;

use super::describe_outcome;
use crate::context::{Context, GlobalArgs};
use crate::output;

#[derive(Debug, Args)]
pub struct ChapterArgs {
    #[command(subcommand)]
    action: ChapterAction,
}

#[derive(Debug, Subcommand)]
enum ChapterAction {
    /// Print the chapter's current text
    Show { chapter: String },
    /// Replace the chapter text (recorded in its undo history)
    Write {
        chapter: String,

        /// New chapter text.
        #[arg(long, group = "content_source")]
        content: Option<String>,

        /// Read the new text from a file.
        #[arg(long, group = "content_source")]
        file: Option<PathBuf>,

        /// Also persist the text as the chapter's saved version.
        #[arg(long)]
        save: bool,
    },
    /// Draft the chapter from its outline entry
    Draft { chapter: String },
    /// Rewrite the chapter so it reads less mechanically
    Humanize { chapter: String },
    /// Correct grammar, spelling and punctuation
    Grammar { chapter: String },
    /// Editorial analysis of the chapter
    Analyze {
        chapter: String,

        /// Aspect to analyze; repeat for several (defaults to all).
        #[arg(long = "aspect")]
        aspects: Vec<String>,
    },
    /// Suggested edits, without changing the text
    Suggest { chapter: String },
    /// Step back one version
    Undo { chapter: String },
    /// Step forward one version
    Redo { chapter: String },
    /// Persist the current text as the saved version
    Save { chapter: String },
    /// Discard the history and reload the saved version
    Revert { chapter: String },
}

impl ChapterAction {
    fn chapter(&self) -> &str {
        match self {
            Self::Show { chapter }
            | Self::Write { chapter, .. }
            | Self::Draft { chapter }
            | Self::Humanize { chapter }
            | Self::Grammar { chapter }
            | Self::Analyze { chapter, .. }
            | Self::Suggest { chapter }
            | Self::Undo { chapter }
            | Self::Redo { chapter }
            | Self::Save { chapter }
            | Self::Revert { chapter } => chapter,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterReport {
    pub chapter_id: String,
    pub title: String,
    pub text: String,
    pub can_undo: bool,
    pub can_redo: bool,
    /// What the command did; absent for plain reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

pub fn run(args: ChapterArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let ctx = Context::open(globals)?;
    let chapter_id = ctx.chapter_id(args.action.chapter())?;
    let bench = &ctx.workbench;

    let outcome = match args.action {
        ChapterAction::Show { .. } => None,
        ChapterAction::Write { content, file, save, .. } => {
            let text = read_content(content, file)?;
            let changed = bench.edit(&chapter_id, text)?;
            if save {
                bench.save(&chapter_id)?;
            }
            Some(if changed { Outcome::Applied } else { Outcome::Unchanged })
        }
        ChapterAction::Draft { .. } => Some(ctx.block_on(bench.generate_chapter(&chapter_id))?),
        ChapterAction::Humanize { .. } => Some(ctx.block_on(bench.humanize(&chapter_id))?),
        ChapterAction::Grammar { .. } => Some(ctx.block_on(bench.fix_grammar(&chapter_id))?),
        ChapterAction::Analyze { aspects, .. } => {
            let aspects = if aspects.is_empty() {
                ANALYSIS_ASPECTS.iter().map(|aspect| aspect.to_string()).collect()
            } else {
                aspects
            };
            Some(ctx.block_on(bench.analyze(&chapter_id, aspects))?)
        }
        ChapterAction::Suggest { .. } => Some(ctx.block_on(bench.suggest_edits(&chapter_id))?),
        ChapterAction::Undo { .. } => Some(moved(bench.undo(&chapter_id)?)),
        ChapterAction::Redo { .. } => Some(moved(bench.redo(&chapter_id)?)),
        ChapterAction::Save { .. } => {
            bench.save(&chapter_id)?;
            Some(Outcome::Applied)
        }
        ChapterAction::Revert { .. } => Some(ctx.block_on(bench.revert(&chapter_id))?),
    };

    // Selecting after the operation shows the result and hydrates plain reads.
    bench.select_chapter(&chapter_id)?;
    if outcome.is_some() {
        ctx.persist()?;
    }

    let view = bench.snapshot();
    let title = view
        .chapters
        .iter()
        .find(|chapter| chapter.id == chapter_id)
        .map(|chapter| chapter.chapter_title.clone())
        .unwrap_or_default();
    let report = ChapterReport {
        chapter_id: chapter_id.to_string(),
        title,
        text: view.active_content.unwrap_or_default(),
        can_undo: view.can_undo,
        can_redo: view.can_redo,
        outcome,
    };
    output::print_output(ctx.format, &report, format_human)?;
    Ok(())
}

fn moved(changed: bool) -> Outcome {
    if changed {
        Outcome::Applied
    } else {
        Outcome::Unchanged
    }
}

fn read_content(content: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    match (content, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read content file `{}`", path.display())),
        (None, None) => anyhow::bail!("either --content or --file is required"),
    }
}

fn format_human(report: &ChapterReport) -> String {
    let mut out = String::new();
    match &report.outcome {
        // Feedback is the interesting part; the chapter text is unchanged.
        Some(Outcome::Feedback(feedback)) => return feedback.clone(),
        Some(outcome) => {
            out.push_str(&describe_outcome(outcome));
            out.push('\n');
        }
        None => {}
    }

    out.push_str(&format!("# {}\n\n", report.title));
    if report.text.is_empty() {
        out.push_str("(empty)");
    } else {
        out.push_str(report.text.trim_end());
    }

    let mut hints = Vec::new();
    if report.can_undo {
        hints.push("undo");
    }
    if report.can_redo {
        hints.push("redo");
    }
    if !hints.is_empty() {
        out.push_str(&format!("\n\n[{} available]", hints.join(", ")));
    }
    out
}
