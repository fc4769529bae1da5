// Session coordination: selection, edits, AI operations and projects.

pub mod confirm;
pub mod flight;
pub mod session;
pub mod workbench;

pub use confirm::{AlwaysConfirm, ConfirmAction, ConfirmRequest, ConfirmationPrompt};
pub use flight::{FlightScope, OperationKind, OperationState};
pub use session::SessionView;
pub use workbench::{Collaborators, Outcome, Workbench, WorkbenchError, WorkbenchOptions};
