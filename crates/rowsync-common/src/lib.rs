//! Rowsync Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the rowsync workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`SyncError`] taxonomy and [`Result`] alias
//! - **Logging**: centralized tracing setup via [`logging::init_logging`]
//!
//! # Example
//!
//! ```no_run
//! use rowsync_common::{Result, SyncError};
//!
//! fn require(var: &str) -> Result<String> {
//!     std::env::var(var).map_err(|_| SyncError::config(format!("{var} is not set")))
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, SyncError};
