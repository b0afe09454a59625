use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use giftcoin_api::AppState;

/// Background task that refunds or expires gifts past their expiry.
///
/// The first tick fires immediately so a restart catches up on anything
/// that lapsed while the server was down.
pub async fn run_sweep_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let sweeper = Arc::clone(&state);
        match tokio::task::spawn_blocking(move || sweeper.gifts.sweep()).await {
            Ok(Ok(report)) => {
                if report.refunded > 0 || report.expired > 0 {
                    info!(
                        "Sweep: refunded {} and expired {} gifts",
                        report.refunded, report.expired
                    );
                }
            }
            Ok(Err(e)) => warn!("Sweep error: {}", e),
            Err(e) => warn!("Sweep task failed: {}", e),
        }
    }
}
