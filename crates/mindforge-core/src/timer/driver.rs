//! Real-time driver for the store's virtual clock.

use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::store::DomainStore;

/// Advance `store` in step with wall-clock time for `total`, checking for due
/// timers every `period`.
///
/// Runs on the caller's task; the store is borrowed mutably for the whole
/// run, so no other mutation can interleave with a timer fire.
pub async fn drive(store: &mut DomainStore, period: Duration, total: Duration) {
    let started = Instant::now();
    let mut last = started;
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let now = ticker.tick().await;
        let elapsed = now.saturating_duration_since(last);
        last = now;
        store.advance(elapsed.as_millis() as u64);
        if now.saturating_duration_since(started) >= total {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collaborators, DomainStore};
    use crate::storage::Config;

    #[tokio::test(start_paused = true)]
    async fn drive_advances_virtual_clock() {
        let mut store = DomainStore::new(Config::default(), Collaborators::in_memory());
        drive(
            &mut store,
            Duration::from_millis(100),
            Duration::from_millis(1_000),
        )
        .await;
        assert!(store.now_ms() >= 1_000);
    }
}
