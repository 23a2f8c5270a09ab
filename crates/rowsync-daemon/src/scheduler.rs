//! The polling loop
//!
//! Runs one poll cycle at a time on a fixed interval. The loop is the
//! containment barrier: a failed cycle is logged and retried after a longer
//! backoff, and only the shutdown signal ends the loop. Cycles are never
//! interrupted mid-row; shutdown is observed between cycles.

use crate::engine::SyncEngine;
use crate::store::TabularStore;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Run the engine until the shutdown signal fires
///
/// `interval` is the wait after a successful cycle, `backoff` the wait
/// after a failed one (so a failing dependency is not hammered).
pub async fn run<S: TabularStore>(
    engine: &mut SyncEngine<S>,
    interval: Duration,
    backoff: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_secs = interval.as_secs(), "Polling loop started");

    loop {
        let wait = match engine.poll().await {
            Ok(0) => interval,
            Ok(copied) => {
                info!(copied, "Poll cycle finished");
                interval
            },
            Err(e) => {
                error!(error = %e, "Poll cycle failed, will retry");
                backoff
            },
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {},
            _ = shutdown.changed() => {
                info!("Shutdown requested, stopping polling loop");
                break;
            },
        }
    }
}
