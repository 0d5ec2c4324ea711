//! Tubesift Core - Foundation crate for the tubesift scraping pipeline.
//!
//! This crate provides the shared types, error handling, configuration
//! management and text normalization that the browser, collector and store
//! crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Domain types (`VideoUrl`, `RawResultCard`, `NormalizedRecord`)
//! - [`views`] - Pure parser for human-readable view-count strings
//!
//! # Example
//!
//! ```rust
//! use tubesift_core::{parse_views, AppConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.search.max_results, 50);
//!
//! assert_eq!(parse_views("1.2M"), Some(1_200_000));
//! assert_eq!(parse_views("not a number"), None);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;
pub mod views;

// Re-export commonly used types
pub use config::{AppConfig, BrowserSettings, RetrySettings, SearchSettings, StorageSettings};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use types::{NormalizedRecord, RawResultCard, RunSummary, VideoUrl};
pub use views::parse_views;
