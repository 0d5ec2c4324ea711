//! Browser session management for dynamic, infinite-scroll pages.
//!
//! Provides scoped headless browser sessions over a local launch or a
//! remote CDP endpoint, with retry/backoff and guaranteed teardown.

pub mod actions;
pub mod error;
pub mod fingerprint;
pub mod session;

pub use actions::{LivePage, SearchPage};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
pub use session::{BrowserSession, RetryPolicy, SessionMode};
