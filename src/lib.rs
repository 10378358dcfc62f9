// cleandeck - Desktop client core for previewing and running system cleaners
//
// This is the library crate containing the orchestration logic and data structures.
// The binary crate (main.rs) provides a console front end over it.

pub mod config;
pub mod console;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{
    Cleaner, OperationError, OperationKind, OperationResult, OperationStatus, SelectionEntry,
    Settings,
};
pub use services::{CleanerBackend, HttpCatalogClient};
pub use state::SelectionTracker;
pub use ui::{OperationOrchestrator, StatusObserver, UiEventQueue};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
