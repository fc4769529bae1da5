// Single-flight bookkeeping for AI-backed operations.
//
// Each scope (one chapter, or the project as a whole) is either idle,
// waiting on the user's confirmation, or waiting on the provider. A scope
// with no table entry is idle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use folio_common::types::ChapterId;
use serde::Serialize;

use super::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    GenerateChapter,
    Humanize,
    FixGrammar,
    Analyze,
    SuggestEdits,
    Revert,
    GenerateIdeas,
    GenerateOutline,
    GenerateCover,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerateChapter => "generate_chapter",
            Self::Humanize => "humanize",
            Self::FixGrammar => "fix_grammar",
            Self::Analyze => "analyze",
            Self::SuggestEdits => "suggest_edits",
            Self::Revert => "revert",
            Self::GenerateIdeas => "generate_ideas",
            Self::GenerateOutline => "generate_outline",
            Self::GenerateCover => "generate_cover",
        }
    }

    /// Whether a successful run overwrites the chapter's present text.
    pub fn replaces_content(self) -> bool {
        matches!(self, Self::GenerateChapter | Self::Humanize | Self::FixGrammar | Self::Revert)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "operation", rename_all = "snake_case")]
pub enum OperationState {
    #[default]
    Idle,
    ConfirmPending(OperationKind),
    Pending(OperationKind),
}

impl OperationState {
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn kind(self) -> Option<OperationKind> {
        match self {
            Self::Idle => None,
            Self::ConfirmPending(kind) | Self::Pending(kind) => Some(kind),
        }
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::ConfirmPending(kind) => write!(f, "awaiting confirmation for {kind}"),
            Self::Pending(kind) => write!(f, "running {kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlightScope {
    Project,
    Chapter(ChapterId),
}

impl std::fmt::Display for FlightScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => f.write_str("project"),
            Self::Chapter(chapter_id) => write!(f, "chapter {chapter_id}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlightTable {
    states: HashMap<FlightScope, OperationState>,
}

impl FlightTable {
    pub fn state(&self, scope: &FlightScope) -> OperationState {
        self.states.get(scope).copied().unwrap_or_default()
    }

    pub fn chapter_state(&self, chapter_id: &ChapterId) -> OperationState {
        self.state(&FlightScope::Chapter(chapter_id.clone()))
    }

    pub fn is_busy(&self, scope: &FlightScope) -> bool {
        !self.state(scope).is_idle()
    }

    pub fn any_busy(&self) -> bool {
        !self.states.is_empty()
    }

    /// Claim `scope` for `kind`. Starts in `ConfirmPending` when the user
    /// must accept first. Returns the current state when already claimed.
    pub fn try_begin(
        &mut self,
        scope: FlightScope,
        kind: OperationKind,
        needs_confirmation: bool,
    ) -> Result<(), OperationState> {
        let current = self.state(&scope);
        if !current.is_idle() {
            return Err(current);
        }
        let next = if needs_confirmation {
            OperationState::ConfirmPending(kind)
        } else {
            OperationState::Pending(kind)
        };
        self.states.insert(scope, next);
        Ok(())
    }

    /// `ConfirmPending(kind)` -> `Pending(kind)`. Returns false otherwise.
    pub fn confirm(&mut self, scope: &FlightScope) -> bool {
        let Some(state) = self.states.get_mut(scope) else {
            return false;
        };
        if let OperationState::ConfirmPending(kind) = *state {
            *state = OperationState::Pending(kind);
            return true;
        }
        false
    }

    pub fn finish(&mut self, scope: &FlightScope) {
        self.states.remove(scope);
    }

    /// Busy scopes, for status displays.
    pub fn active(&self) -> impl Iterator<Item = (&FlightScope, OperationState)> {
        self.states.iter().map(|(scope, state)| (scope, *state))
    }
}

/// Returns a claimed scope to `Idle` exactly once.
///
/// The happy path calls [`FlightGuard::complete`] while already holding the
/// session lock; if the owning future is dropped or unwinds first, `Drop`
/// takes the lock itself.
pub(crate) struct FlightGuard {
    state: Arc<Mutex<SessionState>>,
    scope: Option<FlightScope>,
}

impl FlightGuard {
    pub(crate) fn new(state: Arc<Mutex<SessionState>>, scope: FlightScope) -> Self {
        Self { state, scope: Some(scope) }
    }

    pub(crate) fn scope(&self) -> Option<&FlightScope> {
        self.scope.as_ref()
    }

    pub(crate) fn complete(mut self, state: &mut SessionState) {
        if let Some(scope) = self.scope.take() {
            state.flights.finish(&scope);
        }
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.take() {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.flights.finish(&scope);
        }
    }
}
