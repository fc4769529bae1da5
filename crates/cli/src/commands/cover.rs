// `folio cover` — generate a cover image for the selected idea.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use serde::Serialize;

use crate::context::{Context, GlobalArgs};
use crate::output;

#[derive(Debug, Args)]
pub struct CoverArgs {
    /// Also write the image's data URL to this file.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverReport {
    pub title: String,
    pub bytes: usize,
    pub written_to: Option<PathBuf>,
}

pub fn run(args: CoverArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let ctx = Context::open(globals)?;
    ctx.block_on(ctx.workbench.generate_cover())?;
    ctx.persist()?;

    let manifest = ctx.workbench.export_manifest()?;
    let cover = manifest.cover_image.unwrap_or_default();
    if let Some(path) = &args.out {
        std::fs::write(path, &cover)
            .with_context(|| format!("failed to write cover to `{}`", path.display()))?;
    }

    let report = CoverReport { title: manifest.title, bytes: cover.len(), written_to: args.out };
    output::print_output(ctx.format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &CoverReport) -> String {
    let mut line = format!("Cover generated for \"{}\"", report.title);
    if let Some(path) = &report.written_to {
        line.push_str(&format!(" (written to {})", path.display()));
    }
    line
}
