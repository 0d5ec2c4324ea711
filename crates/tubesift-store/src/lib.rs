//! Tubesift Store - Record sinks and reconciliation.
//!
//! This crate provides the durable side of the pipeline: the [`RecordSink`]
//! capability (read existing keys, append a batch), the reconciler that
//! computes the genuinely-new subsequence of a collected batch, and three
//! concrete sinks (JSON file, CSV mirror, remote spreadsheet).
//!
//! Stores are append-only and keyed by url; no two stored records may share
//! one. An append is all-or-nothing per batch: a partial write surfaces as
//! an error and the run is not considered committed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod local;
pub mod reconcile;
#[allow(missing_docs)]
pub mod sheets;
pub mod sink;

// Re-export commonly used types
pub use error::{Result, StoreError};
pub use local::{CsvFileSink, JsonFileSink};
pub use reconcile::{reconcile, ReconcileOutcome};
pub use sheets::SheetsSink;
pub use sink::{RecordSink, COLUMNS};
