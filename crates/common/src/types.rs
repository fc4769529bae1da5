// Core domain types shared across all Folio crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Genres offered by the idea picker. Free-form genres are accepted too.
pub const GENRES: &[&str] =
    &["Fantasy", "Sci-Fi", "Mystery", "Thriller", "Romance", "Historical Fiction"];

pub const DEFAULT_GENRE: &str = "Fantasy";

/// Opaque chapter identifier, stable for the lifetime of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(String);

impl ChapterId {
    /// Fresh random id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChapterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ChapterId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A generated (or hand-written) book idea.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookIdea {
    pub id: String,
    pub title: String,
    pub synopsis: String,
}

impl BookIdea {
    pub fn new(title: impl Into<String>, synopsis: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), title: title.into(), synopsis: synopsis.into() }
    }
}

/// A directed link from one chapter to another (foreshadowing, callbacks).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterConnection {
    pub target_id: ChapterId,
    #[serde(default)]
    pub description: String,
}

/// One entry of the book outline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub chapter_title: String,
    pub chapter_description: String,
    #[serde(default)]
    pub connections: Vec<ChapterConnection>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("a chapter cannot be connected to itself")]
    SelfReference,

    #[error("chapter is already connected to {0}")]
    Duplicate(ChapterId),
}

impl Chapter {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: ChapterId::generate(),
            chapter_title: title.into(),
            chapter_description: description.into(),
            connections: Vec::new(),
        }
    }

    /// Add a connection to `target`. Each target appears at most once.
    pub fn connect(
        &mut self,
        target: ChapterId,
        description: impl Into<String>,
    ) -> Result<(), ConnectionError> {
        if target == self.id {
            return Err(ConnectionError::SelfReference);
        }
        if self.connections.iter().any(|conn| conn.target_id == target) {
            return Err(ConnectionError::Duplicate(target));
        }
        self.connections.push(ChapterConnection {
            target_id: target,
            description: description.into().trim().to_string(),
        });
        Ok(())
    }

    /// Remove the connection to `target`, returning whether one existed.
    pub fn disconnect(&mut self, target: &ChapterId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|conn| &conn.target_id != target);
        self.connections.len() != before
    }
}
