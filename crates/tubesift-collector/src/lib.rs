//! Search-result collection and persistence pipeline.
//!
//! Drives a [`tubesift_browser::SearchPage`] through an infinite-scroll
//! results page, parses the rendered cards, normalizes view counts, and
//! reconciles the batch into every configured [`tubesift_store::RecordSink`].
//!
//! The crate is split along its seams: [`CardParser`] is pure HTML-in,
//! cards-out; [`Collector`] owns the bounded scroll loop; [`Pipeline`] ties
//! browsing to persistence and owns the session lifecycle.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod card_parser;
pub mod collector;
pub mod error;
pub mod pipeline;

pub use card_parser::{CardParser, CardSelectors, MissingFieldLog};
pub use collector::{Collected, Collector, CollectorConfig, StopReason};
pub use error::{CollectError, PipelineError, PipelineResult, Result};
pub use pipeline::{persist_batch, Pipeline, RunOutcome};
