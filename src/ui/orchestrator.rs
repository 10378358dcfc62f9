// OperationOrchestrator - Single-flight dispatch of backend operations
//
// This module coordinates between:
// - SelectionTracker (what the user ticked)
// - CleanerBackend (the blocking preview/clean/abort calls)
// - UiEventQueue (worker → UI thread handoff)
// - StatusObserver (the presentation layer)
//
// It handles:
// - Dispatching at most one operation at a time on a tokio worker
// - Applying terminal events on the UI thread, keyed by request id
// - Aborting without waiting for the worker
// - The status state machine and its timed return to idle

use crate::metrics::Metrics;
use crate::models::{
    Cleaner, OperationError, OperationKind, OperationRequest, OperationResult, OperationStatus,
    RequestId,
};
use crate::services::CleanerBackend;
use crate::state::{SelectionTracker, SingleFlightGuard};
use crate::ui::observer::StatusObserver;
use crate::ui::queue::UiEventQueue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Default delay before a finished operation's status falls back to idle
pub const DEFAULT_STATUS_RESET_DELAY: Duration = Duration::from_millis(1500);

/// Events posted by workers and applied on the UI thread
#[derive(Debug)]
pub enum UiEvent {
    /// A catalog worker finished. Only the latest `generation` is applied.
    CatalogFetched {
        generation: u64,
        result: Result<Vec<Cleaner>, OperationError>,
    },

    /// Terminal event of a dispatched operation. Exactly one is posted per request.
    OperationFinished {
        request_id: RequestId,
        outcome: Result<OperationResult, OperationError>,
    },
}

/// Orchestrates preview/clean/abort for the UI thread.
///
/// Owns the selection, the catalog snapshot and the live [`OperationStatus`]. All of these
/// are touched only from the thread that owns the orchestrator; workers reach it solely by
/// posting [`UiEvent`]s, which are applied on the next [`tick`](Self::tick).
///
/// # Invariants
///
/// - At most one operation worker exists at a time. The [`SingleFlightGuard`] holds the id
///   of the in-flight request and is the single source of truth for "busy".
/// - A terminal event is applied only if its request id still holds the guard. Events for
///   aborted requests are drained and dropped, so they can never overwrite a newer
///   dispatch.
/// - Only a completed (full or partial) operation clears the selection.
///
/// # Example
/// ```ignore
/// let runtime = tokio::runtime::Runtime::new()?;
/// let backend = Arc::new(HttpCatalogClient::new(&settings.backend)?);
/// let mut orchestrator =
///     OperationOrchestrator::new(backend, runtime.handle().clone(), Box::new(LoggingObserver));
///
/// orchestrator.load_catalog();
/// orchestrator.toggle_option("browser-cache", "cookies", true);
/// orchestrator.dispatch(OperationKind::Preview)?;
///
/// loop {
///     orchestrator.tick();
///     std::thread::sleep(settings.ui.tick_interval());
/// }
/// ```
pub struct OperationOrchestrator<B: CleanerBackend> {
    backend: Arc<B>,

    /// Handle to the tokio runtime that runs workers
    runtime: tokio::runtime::Handle,

    queue: UiEventQueue<UiEvent>,

    ui: UiSide,
}

/// Everything the UI thread owns, kept apart from the queue so a drain can borrow both
struct UiSide {
    observer: Box<dyn StatusObserver>,
    selection: SelectionTracker,
    catalog: Vec<Cleaner>,

    /// Bumped by every catalog load; results of older loads are dropped
    catalog_generation: u64,

    status: OperationStatus,

    /// Kind of the most recent accepted dispatch, for status lines
    last_kind: Option<OperationKind>,

    guard: SingleFlightGuard,

    /// Cancellation sender of the in-flight worker.
    /// Send `true` to make the worker stop waiting for the backend.
    cancel_tx: Option<watch::Sender<bool>>,

    reset_at: Option<Instant>,
    reset_delay: Duration,

    metrics: Arc<Metrics>,
}

impl<B: CleanerBackend> OperationOrchestrator<B> {
    /// Create an orchestrator on the current (UI) thread
    ///
    /// # Arguments
    /// * `backend` - Backend the workers call
    /// * `runtime` - Handle to the tokio runtime for spawning workers
    /// * `observer` - Presentation layer callbacks
    pub fn new(
        backend: Arc<B>,
        runtime: tokio::runtime::Handle,
        observer: Box<dyn StatusObserver>,
    ) -> Self {
        Self {
            backend,
            runtime,
            queue: UiEventQueue::new(),
            ui: UiSide {
                observer,
                selection: SelectionTracker::new(),
                catalog: Vec::new(),
                catalog_generation: 0,
                status: OperationStatus::Idle,
                last_kind: None,
                guard: SingleFlightGuard::new(),
                cancel_tx: None,
                reset_at: None,
                reset_delay: DEFAULT_STATUS_RESET_DELAY,
                metrics: Arc::new(Metrics::new()),
            },
        }
    }

    /// Override the delay before a finished status returns to idle
    pub fn with_status_reset_delay(mut self, delay: Duration) -> Self {
        self.ui.reset_delay = delay;
        self
    }

    // ===== Queries =====

    pub fn status(&self) -> &OperationStatus {
        &self.ui.status
    }

    /// Status line for display, naming the action of the latest dispatch
    pub fn status_line(&self) -> String {
        self.ui.status.describe(self.ui.last_kind)
    }

    pub fn is_busy(&self) -> bool {
        self.ui.guard.active().is_some()
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.ui.selection
    }

    /// Catalog snapshot from the last fetch (empty until loaded or after a failed fetch)
    pub fn catalog(&self) -> &[Cleaner] {
        &self.ui.catalog
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.ui.metrics
    }

    /// Events waiting for the next tick
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Nothing in flight and nothing left to apply
    pub fn is_quiescent(&self) -> bool {
        !self.is_busy() && self.queue.is_empty()
    }

    // ===== Selection =====

    /// Tick or untick one option
    pub fn toggle_option(&mut self, cleaner_id: &str, option_id: &str, selected: bool) -> bool {
        self.ui.selection.toggle(cleaner_id, option_id, selected)
    }

    /// Explicit "clear options" from the user
    pub fn clear_selection(&mut self) {
        self.ui.clear_selection();
    }

    // ===== Operations =====

    /// Fetch the catalog on a one-shot worker.
    ///
    /// The result is applied on a later tick: the catalog is replaced wholesale, or emptied
    /// and reported if the fetch failed. Failures are not retried. When loads overlap, only
    /// the most recent one is applied.
    pub fn load_catalog(&mut self) {
        let backend = Arc::clone(&self.backend);
        let poster = self.queue.poster();
        self.ui.catalog_generation += 1;
        let generation = self.ui.catalog_generation;

        tracing::info!("Loading cleaner catalog (generation {})", generation);
        self.runtime.spawn(async move {
            let result = backend.fetch_catalog().await;
            poster.post(UiEvent::CatalogFetched { generation, result });
        });
    }

    /// Start a preview or clean of the current selection.
    ///
    /// Refusals are returned and also reported through
    /// [`StatusObserver::on_operation_rejected`]; they never change the status.
    ///
    /// # Errors
    /// - [`OperationError::AlreadyRunning`] while another operation is in flight
    /// - [`OperationError::NoSelection`] if nothing is selected
    pub fn dispatch(&mut self, kind: OperationKind) -> Result<RequestId, OperationError> {
        if let Some(active) = self.ui.guard.active() {
            tracing::warn!("{} requested while request {} is running", kind, active);
            return Err(self.ui.reject_dispatch(OperationError::AlreadyRunning));
        }

        let request = OperationRequest::new(kind, self.ui.selection.snapshot())
            .map_err(|e| self.ui.reject_dispatch(e))?;

        let Some(request_id) = self.ui.guard.try_acquire() else {
            return Err(self.ui.reject_dispatch(OperationError::AlreadyRunning));
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.ui.cancel_tx = Some(cancel_tx);
        self.ui.reset_at = None;
        self.ui.last_kind = Some(kind);
        self.ui.metrics.record_dispatch_accepted();

        tracing::info!(
            "Dispatching {} (request {}) for {} options",
            kind,
            request_id,
            request.selection.len()
        );

        self.ui.set_status(OperationStatus::Busy {
            kind,
            request_id,
            started_at: Instant::now(),
        });
        self.spawn_worker(request_id, request, cancel_rx);

        Ok(request_id)
    }

    /// Abort the in-flight operation.
    ///
    /// Returns the UI to idle immediately, without waiting for the worker: the worker is told
    /// to stop waiting for its response, the backend is sent an abort on a one-shot worker,
    /// and any result that still arrives for this request is dropped.
    ///
    /// # Errors
    /// [`OperationError::NotRunning`] if nothing is in flight
    pub fn abort(&mut self) -> Result<(), OperationError> {
        let Some(request_id) = self.ui.guard.active() else {
            return Err(self.ui.reject(OperationError::NotRunning));
        };

        tracing::info!("Aborting request {}", request_id);

        if let Some(cancel_tx) = self.ui.cancel_tx.take() {
            // The worker may already have finished; then nobody is listening
            let _ = cancel_tx.send(true);
        }

        let backend = Arc::clone(&self.backend);
        self.runtime.spawn(async move {
            match backend.abort().await {
                Ok(message) => tracing::info!("Backend acknowledged abort: {}", message),
                Err(e) => tracing::warn!("Backend abort failed: {}", e),
            }
        });

        self.ui.guard.release(request_id);
        self.ui.reset_at = None;
        self.ui.metrics.record_aborted();
        self.ui.set_status(OperationStatus::Aborted);
        self.ui.set_status(OperationStatus::Idle);

        Ok(())
    }

    /// Abort whatever is running; called when the front end shuts down
    pub fn shutdown(&mut self) {
        if self.is_busy() {
            tracing::warn!("Shutting down during an operation - aborting");
            let _ = self.abort();
        }
    }

    /// Drain the event queue and apply timed status resets. Call once per UI tick.
    ///
    /// # Returns
    /// Number of events applied
    pub fn tick(&mut self) -> usize {
        self.tick_at(Instant::now())
    }

    /// [`tick`](Self::tick) with an explicit clock
    pub fn tick_at(&mut self, now: Instant) -> usize {
        let ui = &mut self.ui;
        let handled = self.queue.drain_once(|event| ui.apply(event, now));

        self.ui.metrics.record_events_drained(handled);
        self.ui.apply_pending_reset(now);
        handled
    }

    fn spawn_worker(
        &self,
        request_id: RequestId,
        request: OperationRequest,
        mut cancel_rx: watch::Receiver<bool>,
    ) {
        let backend = Arc::clone(&self.backend);
        let poster = self.queue.poster();
        let guard = self.ui.guard.clone();
        let kind = request.kind;

        self.runtime.spawn(async move {
            // Race the backend call against cancellation; losing the race drops the
            // in-flight request so the worker stops waiting for it
            let outcome = tokio::select! {
                result = backend.run(request) => result,
                _ = cancel_rx.changed() => {
                    tracing::warn!("{} (request {}) cancelled while waiting for backend", kind, request_id);
                    Err(OperationError::Cancelled)
                }
            };

            match &outcome {
                Ok(result) => tracing::info!(
                    "{} (request {}) returned {} files, {} bytes{}",
                    kind,
                    request_id,
                    result.total_files,
                    result.total_size,
                    if result.partial { " (partial)" } else { "" }
                ),
                Err(e) => tracing::warn!("{} (request {}) failed: {}", kind, request_id, e),
            }

            if !guard.is_current(request_id) {
                tracing::debug!("Request {} is no longer current; result will be dropped", request_id);
            }

            poster.post(UiEvent::OperationFinished {
                request_id,
                outcome,
            });
        });
    }
}

impl UiSide {
    fn set_status(&mut self, status: OperationStatus) {
        tracing::debug!("Status -> {:?}", status);
        self.status = status;
        self.observer.on_status_changed(&self.status);
    }

    fn reject(&mut self, error: OperationError) -> OperationError {
        tracing::warn!("Rejected: {}", error);
        self.observer.on_operation_rejected(&error);
        error
    }

    fn reject_dispatch(&mut self, error: OperationError) -> OperationError {
        self.metrics.record_dispatch_rejected();
        self.reject(error)
    }

    fn clear_selection(&mut self) {
        let removed = self.selection.clear();
        tracing::debug!("Cleared {} selected options", removed);
        self.observer.on_selection_cleared();
    }

    fn apply(&mut self, event: UiEvent, now: Instant) {
        match event {
            UiEvent::CatalogFetched { generation, .. }
                if generation != self.catalog_generation =>
            {
                tracing::debug!(
                    "Dropping superseded catalog (generation {}, current {})",
                    generation,
                    self.catalog_generation
                );
                self.metrics.record_stale_event();
            }
            UiEvent::CatalogFetched {
                result: Ok(cleaners),
                ..
            } => {
                tracing::info!("Catalog replaced: {} cleaners", cleaners.len());
                self.catalog = cleaners;
                self.observer.on_catalog_loaded(&self.catalog);
            }
            UiEvent::CatalogFetched {
                result: Err(error), ..
            } => {
                tracing::error!("Failed to load catalog: {}", error);
                self.catalog.clear();
                self.observer.on_catalog_load_failed(&error);
            }
            UiEvent::OperationFinished {
                request_id,
                outcome,
            } => self.finish(request_id, outcome, now),
        }
    }

    fn finish(
        &mut self,
        request_id: RequestId,
        outcome: Result<OperationResult, OperationError>,
        now: Instant,
    ) {
        if !self.guard.release(request_id) {
            tracing::debug!("Dropping stale result for request {}", request_id);
            self.metrics.record_stale_event();
            return;
        }

        self.cancel_tx = None;
        if let OperationStatus::Busy { started_at, .. } = &self.status {
            self.metrics.record_operation_time(now.saturating_duration_since(*started_at));
        }

        match outcome {
            Ok(result) => {
                self.metrics.record_completed(result.partial);
                let status = if result.partial {
                    OperationStatus::PartiallyCompleted(result)
                } else {
                    OperationStatus::Completed(result)
                };
                self.set_status(status);
                self.clear_selection();
            }
            Err(error) => {
                // Selection is kept so the user can retry without re-selecting
                self.metrics.record_failed();
                self.set_status(OperationStatus::Failed(error));
            }
        }

        self.reset_at = Some(now + self.reset_delay);
    }

    fn apply_pending_reset(&mut self, now: Instant) {
        let Some(reset_at) = self.reset_at else {
            return;
        };
        if now < reset_at {
            return;
        }

        self.reset_at = None;
        if matches!(
            self.status,
            OperationStatus::Completed(_)
                | OperationStatus::PartiallyCompleted(_)
                | OperationStatus::Failed(_)
        ) {
            self.set_status(OperationStatus::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectionEntry;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that answers immediately with a fixed result
    struct InstantBackend {
        calls: AtomicUsize,
        result: Result<OperationResult, OperationError>,
    }

    impl InstantBackend {
        fn new(result: Result<OperationResult, OperationError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result,
            })
        }
    }

    impl CleanerBackend for InstantBackend {
        async fn fetch_catalog(&self) -> Result<Vec<Cleaner>, OperationError> {
            Ok(Vec::new())
        }

        async fn preview(
            &self,
            _selection: Vec<SelectionEntry>,
        ) -> Result<OperationResult, OperationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }

        async fn clean(
            &self,
            selection: Vec<SelectionEntry>,
        ) -> Result<OperationResult, OperationError> {
            self.preview(selection).await
        }

        async fn abort(&self) -> Result<String, OperationError> {
            Ok("Operation cancelled".to_string())
        }
    }

    #[derive(Default)]
    struct Recorded {
        statuses: Vec<OperationStatus>,
        rejections: Vec<OperationError>,
        cleared: usize,
    }

    struct RecordingObserver(Arc<Mutex<Recorded>>);

    impl StatusObserver for RecordingObserver {
        fn on_catalog_loaded(&mut self, _cleaners: &[Cleaner]) {}
        fn on_catalog_load_failed(&mut self, _error: &OperationError) {}

        fn on_status_changed(&mut self, status: &OperationStatus) {
            self.0.lock().unwrap().statuses.push(status.clone());
        }

        fn on_selection_cleared(&mut self) {
            self.0.lock().unwrap().cleared += 1;
        }

        fn on_operation_rejected(&mut self, error: &OperationError) {
            self.0.lock().unwrap().rejections.push(error.clone());
        }
    }

    fn sample_result() -> OperationResult {
        OperationResult {
            total_size: 2048,
            total_files: 2,
            items: Vec::new(),
            partial: false,
        }
    }

    fn wait_for_event<B: CleanerBackend>(orchestrator: &OperationOrchestrator<B>) {
        for _ in 0..200 {
            if orchestrator.pending_events() > 0 {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("Timed out waiting for a worker event");
    }

    fn setup(
        backend: Arc<InstantBackend>,
    ) -> (
        tokio::runtime::Runtime,
        OperationOrchestrator<InstantBackend>,
        Arc<Mutex<Recorded>>,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let orchestrator = OperationOrchestrator::new(
            backend,
            rt.handle().clone(),
            Box::new(RecordingObserver(recorded.clone())),
        );
        (rt, orchestrator, recorded)
    }

    #[test]
    fn test_no_selection_is_reported_not_dispatched() {
        let backend = InstantBackend::new(Ok(sample_result()));
        let (_rt, mut orchestrator, recorded) = setup(backend.clone());

        let err = orchestrator.dispatch(OperationKind::Preview).unwrap_err();

        assert_eq!(err, OperationError::NoSelection);
        assert_eq!(orchestrator.status(), &OperationStatus::Idle);
        assert!(!orchestrator.is_busy());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.rejections, vec![OperationError::NoSelection]);
        assert!(recorded.statuses.is_empty());
    }

    #[test]
    fn test_abort_when_idle_is_rejected() {
        let backend = InstantBackend::new(Ok(sample_result()));
        let (_rt, mut orchestrator, recorded) = setup(backend);

        assert_eq!(orchestrator.abort(), Err(OperationError::NotRunning));
        assert_eq!(
            recorded.lock().unwrap().rejections,
            vec![OperationError::NotRunning]
        );
    }

    #[test]
    fn test_status_resets_to_idle_after_delay() {
        let backend = InstantBackend::new(Ok(sample_result()));
        let (_rt, orchestrator, _recorded) = setup(backend);
        let mut orchestrator = orchestrator.with_status_reset_delay(Duration::from_millis(1500));

        orchestrator.toggle_option("browser-cache", "cookies", true);
        orchestrator.dispatch(OperationKind::Preview).unwrap();
        wait_for_event(&orchestrator);

        let finished_at = Instant::now();
        assert_eq!(orchestrator.tick_at(finished_at), 1);
        assert!(matches!(orchestrator.status(), OperationStatus::Completed(_)));

        orchestrator.tick_at(finished_at + Duration::from_millis(1000));
        assert!(matches!(orchestrator.status(), OperationStatus::Completed(_)));

        orchestrator.tick_at(finished_at + Duration::from_millis(1500));
        assert_eq!(orchestrator.status(), &OperationStatus::Idle);
    }

    #[test]
    fn test_failure_keeps_selection_for_retry() {
        let backend = InstantBackend::new(Err(OperationError::Timeout(Duration::from_secs(3))));
        let (_rt, mut orchestrator, recorded) = setup(backend.clone());

        orchestrator.toggle_option("browser-cache", "cookies", true);
        let first = orchestrator.dispatch(OperationKind::Preview).unwrap();
        wait_for_event(&orchestrator);
        orchestrator.tick();

        assert_eq!(
            orchestrator.status(),
            &OperationStatus::Failed(OperationError::Timeout(Duration::from_secs(3)))
        );
        assert!(orchestrator.selection().is_selected("browser-cache", "cookies"));
        assert_eq!(recorded.lock().unwrap().cleared, 0);

        // A retry goes straight out with the same selection and a fresh request id
        let retry = orchestrator.dispatch(OperationKind::Preview).unwrap();
        assert!(retry > first);
        wait_for_event(&orchestrator);
        orchestrator.tick();

        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_superseded_catalog_is_dropped() {
        let backend = InstantBackend::new(Ok(sample_result()));
        let (_rt, mut orchestrator, _recorded) = setup(backend);
        let named = |id: &str| Cleaner {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            running: false,
            options: Vec::new(),
        };

        // Two overlapping loads whose results arrive newest first
        orchestrator.ui.catalog_generation = 2;
        let poster = orchestrator.queue.poster();
        poster.post(UiEvent::CatalogFetched {
            generation: 2,
            result: Ok(vec![named("fresh")]),
        });
        poster.post(UiEvent::CatalogFetched {
            generation: 1,
            result: Ok(vec![named("old-a"), named("old-b")]),
        });
        poster.post(UiEvent::CatalogFetched {
            generation: 1,
            result: Err(OperationError::Timeout(Duration::from_secs(3))),
        });

        assert_eq!(orchestrator.tick(), 3);
        assert_eq!(orchestrator.catalog().len(), 1);
        assert_eq!(orchestrator.catalog()[0].id, "fresh");
        assert_eq!(
            orchestrator.metrics().stale_events_dropped.load(Ordering::Relaxed),
            2
        );
    }

    #[test]
    fn test_partial_result_clears_selection() {
        let backend = InstantBackend::new(Ok(OperationResult {
            partial: true,
            ..sample_result()
        }));
        let (_rt, mut orchestrator, recorded) = setup(backend);

        orchestrator.toggle_option("browser-cache", "cookies", true);
        orchestrator.dispatch(OperationKind::Clean).unwrap();
        wait_for_event(&orchestrator);
        orchestrator.tick();

        assert!(matches!(
            orchestrator.status(),
            OperationStatus::PartiallyCompleted(_)
        ));
        assert!(orchestrator.selection().is_empty());
        assert_eq!(recorded.lock().unwrap().cleared, 1);
        assert_eq!(
            orchestrator.metrics().operations_partial.load(Ordering::Relaxed),
            1
        );
    }
}
