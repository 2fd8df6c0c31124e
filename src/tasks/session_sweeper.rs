use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::services::authoring::SessionRegistry;

/// Periodically drops authoring sessions that have been idle too long.
pub(crate) async fn run(
    sessions: SessionRegistry,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let evicted = sessions.evict_idle().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "Session sweep finished");
                }
            }
        }
    }
    tracing::info!("Session sweeper stopped");
}
