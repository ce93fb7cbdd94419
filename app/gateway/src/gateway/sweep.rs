//! Periodic eviction of runners that stopped sending updates.

use crate::gateway::Gateway;
use std::time::Duration;
use tokio::{sync::broadcast, task::JoinHandle, time};

/// Start the stale sweeper.
///
/// Every `every`, runners idle for longer than `max_idle` are evicted and
/// announced with `runner-left`. The task stops when `shutdown` fires or
/// its sender is dropped.
pub fn start(
    gateway: Gateway,
    max_idle: Duration,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            "stale sweeper started (idle limit {}s, every {}s)",
            max_idle.as_secs(),
            every.as_secs()
        );
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = gateway.sweep_stale(max_idle);
                    if evicted > 0 {
                        tracing::debug!(evicted, "stale sweep finished");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("stale sweeper stopped");
                    return;
                }
            }
        }
    })
}
