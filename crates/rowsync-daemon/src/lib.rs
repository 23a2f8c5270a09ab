//! Rowsync Daemon Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Watches a source sheet in a tabular store, copies rows whose approval
//! cell matches a configured token into a destination sheet, and keeps a
//! persisted signature set so each row is copied at most once.
//!
//! # Components
//!
//! - [`config`]: explicit daemon configuration loaded from the environment
//! - [`row`]: sparse rows, signatures, and key projections
//! - [`state`]: persisted signature set with atomic saves and reconciliation
//! - [`transform`]: column-mapping projection and serial-date normalization
//! - [`store`]: the `TabularStore` seam plus CSV and in-memory backends
//! - [`engine`]: one poll cycle over the source sheet
//! - [`scheduler`]: the fixed-interval loop with per-cycle error containment
//!
//! # Example
//!
//! ```no_run
//! use rowsync_daemon::{config::SyncConfig, engine::SyncEngine, store::CsvStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::from_env()?;
//!     let store = CsvStore::new("./sheets");
//!     let mut engine = SyncEngine::new(config, store)?;
//!     let copied = engine.poll().await?;
//!     println!("copied {copied} rows");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod row;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod transform;
