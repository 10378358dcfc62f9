//! Services module - The cleaner backend call contract.
//!
//! # Components
//!
//! - [`CleanerBackend`]: The trait the orchestrator drives. Every call blocks its caller until
//!   the backend answers or the request deadline expires, so it is only ever awaited on a
//!   worker task.
//!
//! - [`HttpCatalogClient`]: The production implementation over the backend's JSON API:
//!   - `GET /api/cleaners` for the catalog
//!   - `POST /api/analyze` (configurable) for previews
//!   - `POST /api/clean` for cleaning
//!   - `POST /api/abort` to stop the backend's current run
//!
//! # Fault mapping
//!
//! Transport and protocol faults are mapped onto [`OperationError`](crate::models::OperationError):
//! connection failures become `Unreachable`, an expired deadline, HTTP 408 or an empty body
//! becomes `Timeout`, and any other non-2xx status, non-JSON body or schema mismatch becomes
//! `MalformedResponse`. Nothing is retried automatically.

pub mod catalog_client;

pub use catalog_client::{
    ABORT_PATH, CLEAN_PATH, CLEANERS_PATH, CleanerBackend, HttpCatalogClient,
};
