// CLI subcommand dispatch.

use clap::Subcommand;
use folio_studio::engine::Outcome;

use crate::context::GlobalArgs;

pub mod chapter;
pub mod cover;
pub mod export;
pub mod ideas;
pub mod key;
pub mod layout;
pub mod outline;
pub mod projects;
pub mod status;

#[derive(Subcommand)]
pub enum Command {
    /// Generate, list and select book ideas
    Ideas(ideas::IdeasArgs),
    /// Generate and edit the chapter outline
    Outline(outline::OutlineArgs),
    /// Read, write and revise one chapter
    Chapter(chapter::ChapterArgs),
    /// Generate a cover image for the selected idea
    Cover(cover::CoverArgs),
    /// Manage saved projects and backups
    Projects(projects::ProjectsArgs),
    /// Render the book as a printable HTML document
    Export(export::ExportArgs),
    /// Simulate a pane-resize drag
    Layout(layout::LayoutArgs),
    /// Store or clear the generation API key
    Key(key::KeyArgs),
    /// Show the current project and any running operations
    Status(status::StatusArgs),
}

pub fn run(cmd: Command, globals: &GlobalArgs) -> anyhow::Result<()> {
    match cmd {
        Command::Ideas(args) => ideas::run(args, globals),
        Command::Outline(args) => outline::run(args, globals),
        Command::Chapter(args) => chapter::run(args, globals),
        Command::Cover(args) => cover::run(args, globals),
        Command::Projects(args) => projects::run(args, globals),
        Command::Export(args) => export::run(args, globals),
        Command::Layout(args) => layout::run(args, globals),
        Command::Key(args) => key::run(args, globals),
        Command::Status(args) => status::run(args, globals),
    }
}

/// One-line human summary shared by commands that report an `Outcome`.
pub(crate) fn describe_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Applied => "Done.".to_string(),
        Outcome::Unchanged => "No change.".to_string(),
        Outcome::Aborted => "Cancelled.".to_string(),
        Outcome::NoContent(message) | Outcome::Feedback(message) => message.clone(),
    }
}
