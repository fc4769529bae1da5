// Confirmation capability supplied by the presentation layer.

use std::future::Future;
use std::pin::Pin;

use folio_common::types::ChapterId;
use serde::Serialize;

use super::flight::OperationKind;

/// What the user is being asked to accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConfirmAction {
    Operation { kind: OperationKind, chapter_id: ChapterId },
    NewProject,
    LoadProject { project_id: String },
    DeleteProject { project_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmRequest {
    #[serde(flatten)]
    pub action: ConfirmAction,
    pub message: String,
}

impl ConfirmRequest {
    pub fn operation(kind: OperationKind, chapter_id: ChapterId) -> Self {
        let message = match kind {
            OperationKind::GenerateChapter => {
                "This will replace the current chapter text with a new draft. Continue?"
            }
            OperationKind::Humanize => {
                "This will rewrite the current chapter text. You can undo it afterwards. Continue?"
            }
            OperationKind::FixGrammar => {
                "This will replace the chapter text with a corrected version. Continue?"
            }
            OperationKind::Revert => {
                "Discard the edit history and restore the last saved version of this chapter?"
            }
            _ => "Continue?",
        };
        Self { action: ConfirmAction::Operation { kind, chapter_id }, message: message.into() }
    }

    pub fn new_project() -> Self {
        Self {
            action: ConfirmAction::NewProject,
            message: "Are you sure you want to start a new project? Any unsaved changes will be \
                      lost."
                .into(),
        }
    }

    pub fn load_project(project_id: impl Into<String>) -> Self {
        Self {
            action: ConfirmAction::LoadProject { project_id: project_id.into() },
            message: "Loading a project will discard any unsaved changes to your current work. \
                      Continue?"
                .into(),
        }
    }

    pub fn delete_project(project_id: impl Into<String>) -> Self {
        Self {
            action: ConfirmAction::DeleteProject { project_id: project_id.into() },
            message: "Are you sure you want to delete this project? This cannot be undone.".into(),
        }
    }
}

pub type ConfirmFuture = Pin<Box<dyn Future<Output = bool> + Send>>;

/// Resolves to `true` when the user accepts.
pub trait ConfirmationPrompt: Send + Sync {
    fn confirm(&self, request: ConfirmRequest) -> ConfirmFuture;
}

/// Accepts everything. Used for non-interactive runs (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmationPrompt for AlwaysConfirm {
    fn confirm(&self, _request: ConfirmRequest) -> ConfirmFuture {
        Box::pin(async { true })
    }
}
