use crate::registry::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Spawns the periodic liveness sweep.
///
/// Runs `Registry::sweep_once` on a fixed interval until the shutdown
/// signal flips. Independent of every connection task.
pub fn spawn_sweeper(
    registry: Arc<Registry>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a freshly started
        // coordinator never sweeps before nodes have had a chance to
        // heartbeat.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let demoted = registry.sweep_once();
                    if demoted > 0 {
                        tracing::debug!(demoted, "liveness sweep demoted stale nodes");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("liveness sweeper stopped");
    })
}
