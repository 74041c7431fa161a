//! Periodic storage hygiene

use crate::responder::Responder;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Start the background sweep.
///
/// Expired sessions are already ignored on read, so this only keeps the
/// store and the in-memory maps from growing. Abort the handle to stop it.
pub fn spawn_housekeeping(responder: Arc<Responder>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Housekeeping task started (every {:?})", every);
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match responder.sweep(Utc::now()).await {
                Ok(purged) => debug!("Purged {} expired sessions", purged),
                Err(e) => error!("Housekeeping sweep failed: {}", e),
            }
        }
    })
}
