// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use std::io::{self, IsTerminal, Write};

use folio_studio::config::ConfigError;
use folio_studio::engine::WorkbenchError;
use folio_studio::generation::GenerationError;
use serde::Serialize;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    print_diagnostic(format, "error", ANSI_RED, code, message);
}

/// Write a warning to stderr in the selected format.
pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    print_diagnostic(format, "warning", ANSI_YELLOW, code, message);
}

fn print_diagnostic(format: OutputFormat, label: &str, color: &str, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line(label, message, io::stderr().is_terminal(), color);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                label: {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");

    if let Some(workbench_err) = error.chain().find_map(|c| c.downcast_ref::<WorkbenchError>()) {
        match workbench_err {
            WorkbenchError::Busy { .. } => {
                return ("BUSY", format!("{message}. Wait for it to finish, then retry."));
            }
            WorkbenchError::NoIdea => {
                return (
                    "NO_IDEA",
                    "No book idea is selected. Run: folio ideas select <n>".to_string(),
                );
            }
            WorkbenchError::UnknownChapter(_) => {
                return ("CHAPTER_NOT_FOUND", format!("{message}. Run: folio outline show"));
            }
            WorkbenchError::UnknownIdea(_) => {
                return ("IDEA_NOT_FOUND", format!("{message}. Run: folio ideas ls"));
            }
            WorkbenchError::UnknownProject(_) => {
                return ("PROJECT_NOT_FOUND", format!("{message}. Run: folio projects ls"));
            }
            WorkbenchError::Import(_) => return ("INVALID_BACKUP", message),
            WorkbenchError::Connection(_) => return ("INVALID_CONNECTION", message),
            WorkbenchError::Generation(generation_err) => {
                return actionable_generation_error(generation_err, message);
            }
            WorkbenchError::Storage(_) => {}
        }
    }

    if error.chain().any(|c| c.downcast_ref::<ConfigError>().is_some()) {
        return (
            "CONFIG_ERROR",
            format!("{message}. Fix the file or move it aside to use defaults."),
        );
    }

    if let Some(generation_err) = error.chain().find_map(|c| c.downcast_ref::<GenerationError>()) {
        return actionable_generation_error(generation_err, message);
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("folio.db") {
        return ("STORAGE_ERROR", message);
    }
    if lower.contains("keychain") {
        return (
            "KEYCHAIN_ERROR",
            format!("{message}. Set FOLIO_API_KEY instead if no keychain is available."),
        );
    }

    ("ERROR", message)
}

fn actionable_generation_error(
    error: &GenerationError,
    message: String,
) -> (&'static str, String) {
    match error {
        GenerationError::RateLimited => ("RATE_LIMITED", message),
        GenerationError::InvalidCredentials => {
            ("INVALID_CREDENTIALS", format!("{message} Run: folio key set"))
        }
        GenerationError::Failure(detail) if detail.contains("no API key") => {
            ("NO_API_KEY", detail.clone())
        }
        GenerationError::Failure(_) => ("GENERATION_FAILED", message),
    }
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}
