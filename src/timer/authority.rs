use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::TimerConfig;
use crate::error::ControlError;
use crate::store::{self, RecordKey, Store};
use crate::timer::snapshot::{TimerEvent, TimerPhase, TimerSnapshot, TimerStatus};

/// Countdown settings
#[derive(Debug, Clone, Copy)]
pub struct TimerOptions {
    pub max_minutes: u32,
    pub restore_paused: bool,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self::from(&TimerConfig::default())
    }
}

impl From<&TimerConfig> for TimerOptions {
    fn from(config: &TimerConfig) -> Self {
        Self {
            max_minutes: config.max_minutes,
            restore_paused: config.restore_paused,
        }
    }
}

/// Owner of the screen-time countdown and the lock trigger.
///
/// Every transition queues [`TimerEvent`]s; the owner drains them with
/// [`drain_events`](Self::drain_events) after each call.
pub struct TimerAuthority {
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    options: TimerOptions,
    time_left: u32,
    duration: u32,
    is_active: bool,
    is_paused: bool,
    events: Vec<TimerEvent>,
}

impl TimerAuthority {
    /// Rehydrate from the last snapshot, catching up on time spent not running
    pub fn load(clock: Arc<dyn Clock>, store: Arc<dyn Store>, options: TimerOptions) -> Self {
        let mut timer = Self {
            clock,
            store,
            options,
            time_left: 0,
            duration: 0,
            is_active: false,
            is_paused: false,
            events: Vec::new(),
        };

        if let Some(snapshot) =
            store::load_or_discard::<TimerSnapshot>(timer.store.as_ref(), RecordKey::Timer)
        {
            timer.rehydrate(snapshot);
        }

        timer
    }

    fn rehydrate(&mut self, snapshot: TimerSnapshot) {
        if let Some(reason) = snapshot.inconsistency() {
            warn!(
                "{}",
                ControlError::MalformedPersistedState {
                    record: RecordKey::Timer,
                    reason: reason.to_string(),
                }
            );
            self.clear_snapshot();
            return;
        }

        if !snapshot.is_active {
            debug!("Discarding inactive timer snapshot");
            self.clear_snapshot();
            return;
        }

        if snapshot.is_paused {
            if self.options.restore_paused {
                info!("Restored paused timer with {}s left", snapshot.time_left);
                self.set_running(snapshot.time_left, snapshot.duration);
                self.is_paused = true;
                self.emit_update();
            } else {
                info!("Discarding paused timer snapshot");
                self.clear_snapshot();
            }
            return;
        }

        let elapsed = (self.clock.now() - snapshot.started_at).num_seconds().max(0);
        let remaining = snapshot.time_left as i64 - elapsed;

        if remaining > 0 {
            info!(
                "Resuming timer with {}s left ({}s elapsed while not running)",
                remaining, elapsed
            );
            self.set_running(remaining as u32, snapshot.duration);
            self.save_snapshot();
            self.emit_update();
        } else {
            info!("Screen time ran out while not running");
            self.expire();
        }
    }

    /// Start a countdown of `minutes`. Only allowed while idle.
    pub fn start(&mut self, minutes: u32) -> Result<(), ControlError> {
        if minutes == 0 || minutes > self.options.max_minutes {
            return Err(ControlError::InvalidDuration(minutes));
        }

        if self.phase() != TimerPhase::Idle {
            return Err(ControlError::TimerBusy);
        }

        let seconds = minutes
            .checked_mul(60)
            .ok_or(ControlError::InvalidDuration(minutes))?;
        self.set_running(seconds, seconds);
        self.save_snapshot();
        self.emit_update();

        info!("Timer started for {} minutes", minutes);
        Ok(())
    }

    /// Advance the countdown by one elapsed second.
    ///
    /// Ignored unless running, so a tick arriving after stop, pause or
    /// expiry has no effect.
    pub fn tick(&mut self) {
        if self.phase() != TimerPhase::Running {
            debug!("Ignoring tick while {}", self.phase().label());
            return;
        }

        self.time_left = self.time_left.saturating_sub(1);

        if self.time_left == 0 {
            info!("Screen time limit reached");
            self.expire();
        } else {
            self.save_snapshot();
            self.emit_update();
        }
    }

    pub fn pause(&mut self) {
        if !self.is_active || self.is_paused {
            return;
        }

        self.is_paused = true;
        self.save_snapshot();
        self.emit_update();
        info!("Timer paused with {}s left", self.time_left);
    }

    pub fn resume(&mut self) {
        if !self.is_active || !self.is_paused {
            return;
        }

        self.is_paused = false;
        self.save_snapshot();
        self.emit_update();
        info!("Timer resumed with {}s left", self.time_left);
    }

    /// Stop the countdown and release the lock
    pub fn stop(&mut self) {
        self.clear();
        info!("Timer stopped");
    }

    /// Discard all countdown state, paused or not, and release the lock
    pub fn reset(&mut self) {
        self.clear();
        info!("Timer reset");
    }

    pub fn phase(&self) -> TimerPhase {
        match (self.is_active, self.is_paused) {
            (false, _) => TimerPhase::Idle,
            (true, false) => TimerPhase::Running,
            (true, true) => TimerPhase::Paused,
        }
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            phase: self.phase(),
            time_left: self.time_left,
            duration: self.duration,
        }
    }

    /// Take the events queued since the last call
    pub fn drain_events(&mut self) -> Vec<TimerEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_running(&mut self, time_left: u32, duration: u32) {
        self.time_left = time_left;
        self.duration = duration;
        self.is_active = true;
        self.is_paused = false;
    }

    fn expire(&mut self) {
        self.time_left = 0;
        self.is_active = false;
        self.is_paused = false;
        self.clear_snapshot();
        self.emit_update();
        self.events.push(TimerEvent::Lock(true));
    }

    fn clear(&mut self) {
        self.time_left = 0;
        self.duration = 0;
        self.is_active = false;
        self.is_paused = false;
        self.clear_snapshot();
        self.emit_update();
        self.events.push(TimerEvent::Lock(false));
    }

    fn emit_update(&mut self) {
        self.events.push(TimerEvent::Update {
            time_left: self.time_left,
            active: self.is_active && !self.is_paused,
        });
    }

    fn save_snapshot(&self) {
        store::save_record(
            self.store.as_ref(),
            RecordKey::Timer,
            &TimerSnapshot {
                time_left: self.time_left,
                is_active: self.is_active,
                is_paused: self.is_paused,
                started_at: self.clock.now(),
                duration: self.duration,
            },
        );
    }

    fn clear_snapshot(&self) {
        store::clear_record(self.store.as_ref(), RecordKey::Timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use chrono::TimeDelta;

    fn make_timer() -> (Arc<ManualClock>, Arc<MemoryStore>, TimerAuthority) {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        let timer = TimerAuthority::load(clock.clone(), store.clone(), TimerOptions::default());
        (clock, store, timer)
    }

    fn write_snapshot(store: &MemoryStore, snapshot: &TimerSnapshot) {
        store
            .write(RecordKey::Timer, &serde_json::to_string(snapshot).unwrap())
            .unwrap();
    }

    fn lock_events(events: &[TimerEvent]) -> Vec<bool> {
        events
            .iter()
            .filter_map(|e| match e {
                TimerEvent::Lock(locked) => Some(*locked),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_fresh_timer_is_idle() {
        let (_clock, _store, mut timer) = make_timer();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.time_left(), 0);
        assert!(timer.drain_events().is_empty());
    }

    #[test]
    fn test_one_minute_runs_out_after_sixty_ticks() {
        let (clock, store, mut timer) = make_timer();
        timer.start(1).unwrap();
        assert_eq!(timer.time_left(), 60);
        timer.drain_events();

        let mut events = Vec::new();
        for _ in 0..60 {
            clock.advance_secs(1);
            timer.tick();
            events.extend(timer.drain_events());
        }

        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.time_left(), 0);
        assert_eq!(lock_events(&events), vec![true]);
        assert_eq!(
            events.iter().filter(|e| matches!(e, TimerEvent::Update { .. })).count(),
            60
        );
        assert!(!store.contains(RecordKey::Timer));
    }

    #[test]
    fn test_tick_reports_effective_activity() {
        let (_clock, _store, mut timer) = make_timer();
        timer.start(2).unwrap();
        timer.drain_events();

        timer.tick();
        assert_eq!(
            timer.drain_events(),
            vec![TimerEvent::Update { time_left: 119, active: true }]
        );

        timer.pause();
        assert_eq!(
            timer.drain_events(),
            vec![TimerEvent::Update { time_left: 119, active: false }]
        );
    }

    #[test]
    fn test_start_rejects_bad_durations() {
        let (_clock, _store, mut timer) = make_timer();
        assert_eq!(timer.start(0), Err(ControlError::InvalidDuration(0)));
        assert_eq!(timer.start(481), Err(ControlError::InvalidDuration(481)));
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_start_rejects_minutes_that_overflow_seconds() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        let options = TimerOptions {
            max_minutes: u32::MAX,
            restore_paused: true,
        };
        let mut timer = TimerAuthority::load(clock, store, options);

        assert_eq!(
            timer.start(80_000_000),
            Err(ControlError::InvalidDuration(80_000_000))
        );
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn test_start_only_from_idle() {
        let (_clock, _store, mut timer) = make_timer();
        timer.start(5).unwrap();
        assert_eq!(timer.start(10), Err(ControlError::TimerBusy));

        timer.pause();
        assert_eq!(timer.start(10), Err(ControlError::TimerBusy));

        timer.stop();
        assert!(timer.start(10).is_ok());
        assert_eq!(timer.time_left(), 600);
    }

    #[test]
    fn test_pause_then_resume_keeps_time_left() {
        let (_clock, _store, mut timer) = make_timer();
        timer.start(3).unwrap();
        timer.tick();

        timer.pause();
        assert_eq!(timer.phase(), TimerPhase::Paused);
        timer.resume();

        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.time_left(), 179);
    }

    #[test]
    fn test_ticks_ignored_while_paused_or_idle() {
        let (_clock, _store, mut timer) = make_timer();
        timer.tick();
        assert_eq!(timer.time_left(), 0);

        timer.start(1).unwrap();
        timer.pause();
        timer.tick();
        timer.tick();
        assert_eq!(timer.time_left(), 60);
    }

    #[test]
    fn test_pause_and_resume_noop_when_idle() {
        let (_clock, _store, mut timer) = make_timer();
        timer.pause();
        timer.resume();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(timer.drain_events().is_empty());
    }

    #[test]
    fn test_stop_releases_lock_and_clears_snapshot() {
        let (_clock, store, mut timer) = make_timer();
        timer.start(5).unwrap();
        assert!(store.contains(RecordKey::Timer));
        timer.drain_events();

        timer.stop();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.time_left(), 0);
        assert_eq!(lock_events(&timer.drain_events()), vec![false]);
        assert!(!store.contains(RecordKey::Timer));

        timer.tick();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(timer.drain_events().is_empty());
    }

    #[test]
    fn test_reset_clears_paused_timer() {
        let (_clock, store, mut timer) = make_timer();
        timer.start(5).unwrap();
        timer.pause();

        timer.reset();
        assert_eq!(timer.status().phase, TimerPhase::Idle);
        assert_eq!(timer.status().duration, 0);
        assert!(!store.contains(RecordKey::Timer));
    }

    #[test]
    fn test_rehydrate_expired_snapshot_locks_immediately() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        write_snapshot(
            &store,
            &TimerSnapshot {
                time_left: 60,
                is_active: true,
                is_paused: false,
                started_at: clock.now() - TimeDelta::seconds(70),
                duration: 600,
            },
        );

        let mut timer = TimerAuthority::load(clock, store.clone(), TimerOptions::default());
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.time_left(), 0);
        assert_eq!(lock_events(&timer.drain_events()), vec![true]);
        assert!(!store.contains(RecordKey::Timer));
    }

    #[test]
    fn test_rehydrate_running_snapshot_subtracts_gap() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        write_snapshot(
            &store,
            &TimerSnapshot {
                time_left: 60,
                is_active: true,
                is_paused: false,
                started_at: clock.now() - TimeDelta::seconds(10),
                duration: 600,
            },
        );

        let mut timer = TimerAuthority::load(clock, store, TimerOptions::default());
        assert_eq!(timer.phase(), TimerPhase::Running);
        assert_eq!(timer.time_left(), 50);
        assert!(lock_events(&timer.drain_events()).is_empty());
    }

    #[test]
    fn test_restart_mid_countdown_does_not_double_count() {
        let (clock, store, mut timer) = make_timer();
        timer.start(1).unwrap();
        for _ in 0..20 {
            clock.advance_secs(1);
            timer.tick();
        }
        assert_eq!(timer.time_left(), 40);

        clock.advance_secs(5);
        let restored = TimerAuthority::load(clock.clone(), store.clone(), TimerOptions::default());
        assert_eq!(restored.time_left(), 35);
    }

    #[test]
    fn test_paused_snapshot_restored_without_adjustment() {
        let (clock, store, mut timer) = make_timer();
        timer.start(10).unwrap();
        timer.tick();
        timer.pause();

        clock.advance_secs(3600);
        let restored = TimerAuthority::load(clock.clone(), store.clone(), TimerOptions::default());
        assert_eq!(restored.phase(), TimerPhase::Paused);
        assert_eq!(restored.time_left(), 599);
    }

    #[test]
    fn test_paused_snapshot_discarded_when_configured() {
        let (clock, store, mut timer) = make_timer();
        timer.start(10).unwrap();
        timer.pause();

        let options = TimerOptions {
            restore_paused: false,
            ..TimerOptions::default()
        };
        let restored = TimerAuthority::load(clock, store.clone(), options);
        assert_eq!(restored.phase(), TimerPhase::Idle);
        assert!(!store.contains(RecordKey::Timer));
    }

    #[test]
    fn test_malformed_snapshot_falls_back_to_idle() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        store.write(RecordKey::Timer, "{\"timeLeft\": -5}").unwrap();

        let mut timer = TimerAuthority::load(clock.clone(), store.clone(), TimerOptions::default());
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(timer.drain_events().is_empty());
        assert!(!store.contains(RecordKey::Timer));

        write_snapshot(
            &store,
            &TimerSnapshot {
                time_left: 900,
                is_active: true,
                is_paused: false,
                started_at: clock.now(),
                duration: 60,
            },
        );
        let timer = TimerAuthority::load(clock, store.clone(), TimerOptions::default());
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert!(!store.contains(RecordKey::Timer));
    }
}
