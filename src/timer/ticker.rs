use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// The one-second tick that drives a running countdown.
///
/// The interval only exists while armed. Disarming drops it, so no tick
/// scheduled before a stop, pause or expiry can be delivered afterwards.
#[derive(Debug, Default)]
pub struct TickSchedule {
    interval: Option<Interval>,
}

impl TickSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking one period from now. No-op if already armed.
    pub fn arm(&mut self) {
        if self.interval.is_some() {
            return;
        }

        let mut interval = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        // Catch up on ticks missed while the loop was busy
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        self.interval = Some(interval);
        tracing::debug!("Tick schedule armed");
    }

    pub fn disarm(&mut self) {
        if self.interval.take().is_some() {
            tracing::debug!("Tick schedule disarmed");
        }
    }

    /// Arm or disarm to match whether the countdown is running
    pub fn sync(&mut self, running: bool) {
        if running {
            self.arm();
        } else {
            self.disarm();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick. Never completes while disarmed.
    pub async fn next(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_armed_schedule_ticks_every_second() {
        let mut schedule = TickSchedule::new();
        schedule.arm();

        let start = Instant::now();
        schedule.next().await;
        schedule.next().await;

        assert_eq!(Instant::now() - start, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_schedule_never_ticks() {
        let mut schedule = TickSchedule::new();
        schedule.arm();
        schedule.disarm();
        assert!(!schedule.is_armed());

        let result = time::timeout(Duration::from_secs(10), schedule.next()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_follows_running_state() {
        let mut schedule = TickSchedule::new();
        schedule.sync(true);
        assert!(schedule.is_armed());
        schedule.sync(true);
        assert!(schedule.is_armed());
        schedule.sync(false);
        assert!(!schedule.is_armed());
    }
}
