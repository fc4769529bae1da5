// `folio export` — render the book as printable HTML.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use folio_studio::export::render_html;
use serde::Serialize;

use crate::context::{Context, GlobalArgs};
use crate::output;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// HTML file to write (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also compose a `mailto:` link announcing the manuscript to this
    /// address. Without `--out` only the link is produced.
    #[arg(long, value_name = "RECIPIENT")]
    email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub title: String,
    pub path: Option<PathBuf>,
    pub chapters: usize,
    pub word_count: usize,
    pub has_cover: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailto: Option<String>,
}

pub fn run(args: ExportArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let ctx = Context::open(globals)?;
    let manifest = ctx.workbench.export_manifest()?;

    let mailto = args.email.as_deref().map(|recipient| {
        let synopsis =
            ctx.workbench.snapshot().selected_idea.map(|idea| idea.synopsis).unwrap_or_default();
        manifest.mailto_link(recipient, &synopsis)
    });

    let path = match args.out {
        Some(path) => {
            std::fs::write(&path, render_html(&manifest))
                .with_context(|| format!("failed to write export `{}`", path.display()))?;
            Some(path)
        }
        None if mailto.is_none() => {
            print!("{}", render_html(&manifest));
            return Ok(());
        }
        None => None,
    };

    let report = ExportReport {
        word_count: manifest.word_count(),
        chapters: manifest.chapters.len(),
        has_cover: manifest.cover_image.is_some(),
        title: manifest.title,
        path,
        mailto,
    };
    output::print_output(ctx.format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &ExportReport) -> String {
    let mut lines = Vec::new();
    if let Some(path) = &report.path {
        let cover = if report.has_cover { ", with cover" } else { "" };
        lines.push(format!(
            "Exported \"{}\" to {} ({} chapters, {} words{cover})",
            report.title,
            path.display(),
            report.chapters,
            report.word_count
        ));
    }
    if let Some(link) = &report.mailto {
        lines.push(format!("Email draft: {link}"));
    }
    lines.join("\n")
}
