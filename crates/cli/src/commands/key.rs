// `folio key` — manage the generation API key in the OS keychain.

use std::io::{self, BufRead};

use anyhow::Context as _;
use clap::{Args, Subcommand};
use folio_studio::secrets::{
    clear_api_key, resolve_api_key, store_api_key, KeyringSecretStore, API_KEY_ENV,
};
use serde::Serialize;

use crate::context::GlobalArgs;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    action: KeyAction,
}

#[derive(Debug, Subcommand)]
enum KeyAction {
    /// Store the key (read from stdin when not given)
    Set { value: Option<String> },
    /// Remove the stored key
    Clear,
    /// Report where the key would come from
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Environment,
    Keychain,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyReport {
    pub action: &'static str,
    pub source: KeySource,
}

pub fn run(args: KeyArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(globals.json);
    let store = KeyringSecretStore;

    let action = match args.action {
        KeyAction::Set { value } => {
            let value = match value {
                Some(value) => value,
                None => read_key(io::stdin().lock())?,
            };
            store_api_key(&store, &value)?;
            "stored"
        }
        KeyAction::Clear => {
            clear_api_key(&store)?;
            "cleared"
        }
        KeyAction::Status => "checked",
    };

    let env_set = std::env::var(API_KEY_ENV).is_ok_and(|value| !value.trim().is_empty());
    let source = key_source(env_set, resolve_api_key(&store)?.is_some());
    if action == "cleared" && source == KeySource::Environment {
        output::print_warning(
            format,
            "KEY_FROM_ENVIRONMENT",
            &format!("{API_KEY_ENV} is still set and takes precedence"),
        );
    }

    output::print_output(format, &KeyReport { action, source }, format_human)?;
    Ok(())
}

fn read_key(reader: impl BufRead) -> anyhow::Result<String> {
    let mut lines = reader.lines();
    let line = lines.next().transpose().context("failed to read API key from stdin")?;
    match line.map(|line| line.trim().to_string()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => anyhow::bail!("no API key given. Run: folio key set <KEY>"),
    }
}

fn key_source(env_set: bool, resolved: bool) -> KeySource {
    match (env_set, resolved) {
        (true, _) => KeySource::Environment,
        (false, true) => KeySource::Keychain,
        (false, false) => KeySource::Missing,
    }
}

fn format_human(report: &KeyReport) -> String {
    let source = match report.source {
        KeySource::Environment => format!("using {API_KEY_ENV}"),
        KeySource::Keychain => "using the keychain".to_string(),
        KeySource::Missing => "no key configured".to_string(),
    };
    match report.action {
        "checked" => format!("API key: {source}"),
        action => format!("API key {action} ({source})"),
    }
}
