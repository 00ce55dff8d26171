use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::debug;

use super::Memoizer;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

impl Memoizer {
    /// Spawns a task on the current tokio runtime that purges expired entries
    /// every `every`. The task keeps only a weak handle and ends once the
    /// cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let every = every.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(cache) = cache.upgrade() else {
                    debug!("cache dropped, sweeper stopping");
                    break;
                };

                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(removed, "swept expired entries");
                }
            }
        })
    }
}
