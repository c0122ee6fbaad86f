//! Periodic expired-item cleanup
//!
//! A detached worker that sweeps the adapter at a fixed interval and
//! deletes every expired item. Expiry is otherwise enforced lazily on
//! read; the sweep reclaims space for keys nobody asks for anymore.

use crate::engine::CacheEngine;
use crate::storage::Paging;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Keys loaded per sweep chunk
const SWEEP_CHUNK: usize = 256;

/// Expired-item sweeper
pub struct CleanupService;

impl CleanupService {
    /// Spawn the sweep loop; it stops when the engine shuts down
    pub fn spawn(engine: CacheEngine, interval: Duration) -> JoinHandle<()> {
        let token = engine.shutdown_token();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick fires immediately; skip it
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!("cleanup worker stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match Self::run_once(&engine).await {
                            Ok(0) => {}
                            Ok(removed) => info!(removed, "cleanup sweep removed expired items"),
                            Err(e) => warn!(error = %e, "cleanup sweep failed"),
                        }
                    }
                }
            }
        })
    }

    /// One full sweep; returns the number of expired items removed
    pub async fn run_once(engine: &CacheEngine) -> crate::Result<usize> {
        let keys = engine.adapter().get_keys(Paging::all()).await?;
        let mut removed = 0;

        for chunk in keys.chunks(SWEEP_CHUNK) {
            let loaded = engine.adapter().get_all(chunk).await?;
            let doomed: Vec<String> = loaded
                .into_iter()
                .filter_map(|(key, item)| item.filter(|i| i.is_expired()).map(|_| key))
                .collect();

            if !doomed.is_empty() {
                engine.adapter().delete_all(&doomed).await?;
                for key in &doomed {
                    engine.analytics().record_delete(key);
                }
                removed += doomed.len();
            }
        }
        Ok(removed)
    }
}
