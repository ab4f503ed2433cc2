use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Source of one-second timer ticks for the session controller.
#[async_trait]
pub trait TickSource: Send {
    /// Resolves when the next tick is due.
    async fn next_tick(&mut self);
}

/// Wall-clock ticks backed by a `tokio` interval.
#[derive(Debug)]
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    #[must_use]
    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) {
        self.interval.tick().await;
    }
}
