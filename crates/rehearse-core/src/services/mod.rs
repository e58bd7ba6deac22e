//! Core services - the application's business logic layer.
//!
//! Services orchestrate between ports (trait interfaces) and domain logic.
//! They don't know about concrete implementations.

mod progress_service;
mod settings_service;

pub use progress_service::ProgressService;
pub use settings_service::SettingsService;
