//! Periodic expiry sweep

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::store::ConversationStore;

/// Owns the background sweep task; aborting or dropping it stops the sweep
pub struct SweepHandle {
    handle: JoinHandle<()>,
}

impl SweepHandle {
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run [`ConversationStore::sweep_expired`] every `interval`.
///
/// The first sweep happens one full interval after spawning. Intervals
/// shorter than a second are raised to one second.
pub fn spawn_sweeper(store: Arc<ConversationStore>, interval: Duration) -> SweepHandle {
    let interval = interval.max(Duration::from_secs(1));
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let removed = store.sweep_expired();
            debug!(removed, "Expiry sweep finished");
        }
    });

    SweepHandle { handle }
}
