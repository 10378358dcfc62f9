// State owned by the orchestration layer
//
// - SelectionTracker: the user's ticked (cleaner, option) pairs, UI thread only
// - SingleFlightGuard: the request-id keyed guard, the one value shared with workers

pub mod guard;
pub mod selection;

pub use guard::SingleFlightGuard;
pub use selection::SelectionTracker;
