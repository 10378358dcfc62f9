//! Data models for cleandeck.
//!
//! - [`Cleaner`], [`CleanerOption`], [`Action`]: the catalog served by the backend
//! - [`SelectionEntry`]: one user-chosen (cleaner, option) pair
//! - [`OperationRequest`], [`OperationResult`], [`OperationStatus`]: the dispatch lifecycle
//! - [`OperationError`]: every fault the orchestration layer reports
//! - [`Settings`]: client settings loaded from `cleandeck.yaml`
//!
//! Catalog and result types derive `Serialize`/`Deserialize` because they are the JSON
//! wire format of the backend. Unknown backend fields are ignored.

pub mod catalog;
pub mod config;
pub mod operation;

pub use catalog::{Action, Cleaner, CleanerOption, SelectionEntry, find_cleaner};
pub use config::{BackendSettings, LoggingSettings, Settings, UiSettings};
pub use operation::{
    OperationError, OperationKind, OperationRequest, OperationResult, OperationStatus, RequestId,
    ResultItem, format_size_mb,
};
