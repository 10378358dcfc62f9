use crate::models::{Cleaner, OperationError, OperationStatus};

/// Narrow interface through which the orchestrator talks to the presentation layer.
///
/// Every callback runs on the UI thread, from inside a call into the orchestrator
/// (`dispatch`, `abort`, `tick`, ...). Observers only read what they are given; they never
/// mutate orchestrator state.
pub trait StatusObserver {
    /// A catalog fetch succeeded; `cleaners` replaces any previous catalog
    fn on_catalog_loaded(&mut self, cleaners: &[Cleaner]);

    /// A catalog fetch failed; the catalog is now empty
    fn on_catalog_load_failed(&mut self, error: &OperationError);

    /// The live operation status changed
    fn on_status_changed(&mut self, status: &OperationStatus);

    /// The selection was emptied after a completed operation or on request
    fn on_selection_cleared(&mut self);

    /// A dispatch or abort was refused before any worker was involved
    fn on_operation_rejected(&mut self, error: &OperationError);
}

/// Observer that only logs, for headless use
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl StatusObserver for LoggingObserver {
    fn on_catalog_loaded(&mut self, cleaners: &[Cleaner]) {
        tracing::info!("Catalog loaded: {} cleaners", cleaners.len());
    }

    fn on_catalog_load_failed(&mut self, error: &OperationError) {
        tracing::error!("Catalog load failed: {}", error);
    }

    fn on_status_changed(&mut self, status: &OperationStatus) {
        tracing::info!("Status: {}", status.describe(None));
    }

    fn on_selection_cleared(&mut self) {
        tracing::debug!("Selection cleared");
    }

    fn on_operation_rejected(&mut self, error: &OperationError) {
        tracing::warn!("Operation rejected: {}", error);
    }
}
