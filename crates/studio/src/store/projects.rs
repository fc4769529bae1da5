// Saved projects, kept as one JSON list under a single key.
//
// `chapterContents` is stored as a list of `[chapterId, history]` pairs.

use std::sync::Arc;

use anyhow::{Context, Result};
use folio_common::types::{BookIdea, Chapter, ChapterId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::kv::KeyValueStore;
use crate::history::ContentHistory;

pub const PROJECTS_KEY: &str = "folio-projects";

/// One saved book project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified: i64,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub ideas: Vec<BookIdea>,
    #[serde(default)]
    pub idea: Option<BookIdea>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub chapter_contents: Vec<(ChapterId, ContentHistory)>,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// Counts reported after merging an imported backup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid project file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid project file: the file should contain a list of projects")]
    NotAList,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct ProjectLibrary {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl ProjectLibrary {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv, key: PROJECTS_KEY.to_string() }
    }

    /// Saved projects, most recently modified first.
    pub fn list(&self) -> Result<Vec<Project>> {
        let mut projects = self.load_all()?;
        projects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(projects)
    }

    pub fn get(&self, project_id: &str) -> Result<Option<Project>> {
        Ok(self.load_all()?.into_iter().find(|project| project.id == project_id))
    }

    /// Insert or replace by id.
    pub fn upsert(&self, project: Project) -> Result<()> {
        let mut projects = self.load_all()?;
        match projects.iter_mut().find(|existing| existing.id == project.id) {
            Some(existing) => *existing = project,
            None => projects.push(project),
        }
        self.store_all(&projects)
    }

    pub fn delete(&self, project_id: &str) -> Result<bool> {
        let mut projects = self.load_all()?;
        let before = projects.len();
        projects.retain(|project| project.id != project_id);
        if projects.len() == before {
            return Ok(false);
        }
        self.store_all(&projects)?;
        Ok(true)
    }

    /// The whole library as a JSON backup document.
    pub fn export_all(&self) -> Result<String> {
        let projects = self.load_all()?;
        serde_json::to_string_pretty(&projects).context("failed to serialize project backup")
    }

    /// Merge a backup into the library by project id. Entries without a
    /// string `id`, a string `name` and a numeric `lastModified` are skipped.
    pub fn import(&self, json: &str) -> Result<ImportSummary, ImportError> {
        let document: Value = serde_json::from_str(json)?;
        let Value::Array(entries) = document else {
            return Err(ImportError::NotAList);
        };

        let mut projects = self.load_all()?;
        let mut summary = ImportSummary::default();
        for entry in entries {
            let Some(project) = parse_import_entry(entry) else {
                summary.skipped += 1;
                continue;
            };
            match projects.iter_mut().find(|existing| existing.id == project.id) {
                Some(existing) => {
                    *existing = project;
                    summary.updated += 1;
                }
                None => {
                    projects.push(project);
                    summary.imported += 1;
                }
            }
        }

        self.store_all(&projects)?;
        Ok(summary)
    }

    fn load_all(&self) -> Result<Vec<Project>> {
        match self.kv.get(&self.key).context("failed to read project library")? {
            Some(raw) => serde_json::from_str(&raw).context("project library is corrupted"),
            None => Ok(Vec::new()),
        }
    }

    fn store_all(&self, projects: &[Project]) -> Result<()> {
        let raw = serde_json::to_string(projects).context("failed to serialize project library")?;
        self.kv.set(&self.key, &raw).context("failed to write project library")
    }
}

fn parse_import_entry(entry: Value) -> Option<Project> {
    let well_formed = entry.get("id").is_some_and(Value::is_string)
        && entry.get("name").is_some_and(Value::is_string)
        && entry.get("lastModified").is_some_and(Value::is_number);
    if !well_formed {
        return None;
    }
    serde_json::from_value(entry).ok()
}

impl std::fmt::Debug for ProjectLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectLibrary").field("key", &self.key).finish_non_exhaustive()
    }
}
