//! Background catalog sync and revoked-token housekeeping.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::main_lib::AppState;

/// Initial delay before first sync (60 seconds to let server fully start)
const INITIAL_DELAY_SECS: u64 = 60;

const REVOCATION_PURGE_SECS: u64 = 60 * 60;

/// Starts the periodic category + event sync. A zero interval disables it.
pub fn start_catalog_sync_scheduler(state: Arc<AppState>, every: Duration) {
    if every.is_zero() {
        info!("Catalog sync scheduler disabled");
        return;
    }

    tokio::spawn(async move {
        info!("Catalog sync scheduler started ({}s interval)", every.as_secs());
        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        // First tick is immediate
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            run_catalog_sync(&state).await;
        }
    });
}

/// Runs one scheduled sync. Categories go first so events can resolve them.
pub async fn run_catalog_sync(state: &AppState) {
    info!("Running scheduled catalog sync...");

    match state.category_service.sync_categories().await {
        Ok(summary) => info!(
            "Scheduled category sync: {} external, {} created, {} updated, {} failed",
            summary.total_external, summary.created, summary.updated, summary.failed
        ),
        Err(e) => warn!("Scheduled category sync failed: {}", e),
    }

    match state.event_service.sync_events().await {
        Ok(summary) => info!(
            "Scheduled event sync: {} external, {} created, {} updated, {} failed, {} orphans deleted",
            summary.total_external,
            summary.created,
            summary.updated,
            summary.failed,
            summary.orphans_deleted
        ),
        Err(e) => warn!("Scheduled event sync failed: {}", e),
    }
}

/// Periodically drops revoked token ids whose tokens have expired anyway.
pub fn start_revocation_purge(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(REVOCATION_PURGE_SECS));
        loop {
            ticker.tick().await;
            let purged = state.auth.purge_revoked();
            if purged > 0 {
                debug!("Purged {} expired token revocations", purged);
            }
        }
    });
}
