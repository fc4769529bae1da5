// `folio layout` — simulate a pane-resize drag against the configured layout.

use clap::Args;
use serde::Serialize;

use crate::context::{Context, GlobalArgs};
use crate::output;

#[derive(Debug, Args)]
pub struct LayoutArgs {
    /// Handle to drag (0 sits between the first two panes).
    #[arg(long, default_value_t = 0)]
    handle: usize,

    /// Pointer x where the drag starts, in pixels.
    #[arg(long, default_value_t = 0.0)]
    from: f64,

    /// Pointer x where the drag is released, in pixels.
    #[arg(long)]
    to: Option<f64>,

    /// Container width in pixels.
    #[arg(long, default_value_t = 1200.0)]
    container: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub container_px: f64,
    /// Pane widths in percent of the container.
    pub widths: Vec<f64>,
    pub changed: bool,
}

pub fn run(args: LayoutArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let ctx = Context::open(globals)?;
    let bench = &ctx.workbench;

    let mut changed = false;
    if let Some(to) = args.to {
        if !bench.begin_drag(args.handle, args.from) {
            let panes = bench.pane_widths().len();
            anyhow::bail!(
                "no handle {} in a {panes}-pane layout (handles are 0..{})",
                args.handle,
                panes.saturating_sub(1)
            );
        }
        changed = bench.drag_to(to, args.container);
        bench.end_drag();
    }

    let report =
        LayoutReport { container_px: args.container, widths: bench.pane_widths(), changed };
    output::print_output(ctx.format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &LayoutReport) -> String {
    let panes: Vec<String> = report
        .widths
        .iter()
        .map(|percent| {
            format!("{percent:.1}% ({:.0}px)", percent / 100.0 * report.container_px)
        })
        .collect();
    let suffix = if report.changed { "" } else { " (unchanged)" };
    format!("{}{suffix}", panes.join(" | "))
}
