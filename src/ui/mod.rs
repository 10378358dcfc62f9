// UI module - Orchestration layer between the presentation thread and the backend
//
// This module contains:
// - UiEventQueue: Hands worker results over to the single UI thread
// - OperationOrchestrator: Single-flight dispatch and the status state machine
// - StatusObserver: Callbacks the presentation layer implements

pub mod observer;
pub mod orchestrator;
pub mod queue;

pub use observer::{LoggingObserver, StatusObserver};
pub use orchestrator::{DEFAULT_STATUS_RESET_DELAY, OperationOrchestrator, UiEvent};
pub use queue::{UiEventPoster, UiEventQueue};
