// folio CLI entry point.

use std::process;

use clap::Parser;

mod commands;
mod context;
mod exit_code;
mod output;

use context::GlobalArgs;
use exit_code::ExitCode;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "folio", about = "AI-assisted book writing workbench")]
struct Cli {
    #[command(flatten)]
    globals: GlobalArgs,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::detect(cli.globals.json);
    match commands::run(cli.command, &cli.globals) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => {
            output::print_anyhow_error(format, &error);
            ExitCode::from_error(&error).into()
        }
    }
}
