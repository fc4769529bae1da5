// folio-studio: chapter history, pane layout, storage and the AI-assisted
// writing session that ties them together.

pub mod config;
pub mod engine;
pub mod export;
pub mod generation;
pub mod history;
pub mod layout;
pub mod secrets;
pub mod store;
