use chrono::TimeDelta;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::error::ControlError;
use crate::security::{AuthMethod, SessionAuthority, SessionPolicy, UnlockThrottle};
use crate::store::Store;
use crate::timer::{TimerAuthority, TimerEvent, TimerOptions, TimerPhase};

/// Who the device is currently serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Parent,
    Child,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => f.write_str("parent"),
            Self::Child => f.write_str("child"),
        }
    }
}

/// Derived device state. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    pub locked: bool,
    pub effective_mode: Mode,
}

/// Receiver of countdown notifications (display, warnings, ...)
pub trait EventSink {
    fn on_update(&mut self, _time_left: u32, _active: bool) {}
    fn on_lock(&mut self, _locked: bool) {}
}

/// Composes the session and timer authorities into the lock/mode projection
/// and gates every parent-only control.
pub struct LockCoordinator {
    session: SessionAuthority,
    timer: TimerAuthority,
    throttle: UnlockThrottle,
    emergency_code: String,
    locked: bool,
    sinks: Vec<Box<dyn EventSink>>,
    startup_events: Vec<TimerEvent>,
}

impl LockCoordinator {
    pub fn new(
        session: SessionAuthority,
        timer: TimerAuthority,
        throttle: UnlockThrottle,
        emergency_code: impl Into<String>,
    ) -> Self {
        let mut coordinator = Self {
            session,
            timer,
            throttle,
            emergency_code: emergency_code.into(),
            locked: false,
            sinks: Vec::new(),
            startup_events: Vec::new(),
        };

        // A budget that ran out while not running locks right away
        coordinator.startup_events = coordinator.dispatch();
        coordinator
    }

    /// Rehydrate both authorities from `store` using the configured policies
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>, store: Arc<dyn Store>) -> Self {
        let session = SessionAuthority::load(
            clock.clone(),
            store.clone(),
            SessionPolicy::from(&config.session),
        );
        let timer = TimerAuthority::load(clock.clone(), store, TimerOptions::from(&config.timer));
        let throttle = UnlockThrottle::new(clock, config.lock.max_attempts, config.lock.cooldown());

        Self::new(session, timer, throttle, config.lock.emergency_code.clone())
    }

    /// Register a receiver for countdown notifications.
    ///
    /// The sink first receives the events produced while rehydrating.
    pub fn add_sink(&mut self, mut sink: Box<dyn EventSink>) {
        for event in &self.startup_events {
            deliver(sink.as_mut(), *event);
        }
        self.sinks.push(sink);
    }

    /// Current lock/mode projection. May end an expired parent session.
    pub fn state(&mut self) -> LockState {
        let effective_mode = if self.session.is_session_valid() {
            Mode::Parent
        } else {
            Mode::Child
        };

        LockState {
            locked: self.locked,
            effective_mode,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Clear the lock without touching the session or the timer
    pub fn on_unlock(&mut self) {
        if self.locked {
            info!("Device unlocked");
        }
        self.locked = false;
    }

    /// Lock-surface unlock with a parent credential
    pub fn unlock(&mut self, method: AuthMethod, input: &str) -> Result<(), ControlError> {
        self.login(method, input)?;
        self.on_unlock();
        Ok(())
    }

    /// Lock-surface emergency access
    pub fn emergency_unlock(&mut self, code: &str) -> Result<(), ControlError> {
        self.throttle.check()?;

        if code.trim() != self.emergency_code {
            warn!("Invalid emergency code entered");
            return Err(match self.throttle.record_failure() {
                ControlError::InvalidCredential { .. } => ControlError::InvalidEmergencyCode,
                other => other,
            });
        }

        self.throttle.record_success();
        self.session.emergency_unlock();
        self.on_unlock();
        Ok(())
    }

    /// Switch to parent mode. Throttled like the lock surface, but does not unlock.
    pub fn login(&mut self, method: AuthMethod, input: &str) -> Result<(), ControlError> {
        self.throttle.check()?;

        if !self.session.authenticate(method, input) {
            return Err(self.throttle.record_failure());
        }

        self.throttle.record_success();
        Ok(())
    }

    /// Return to child mode
    pub fn logout(&mut self) {
        self.session.logout();
    }

    /// Time left on the unlock cool-down, if one is active
    pub fn retry_after(&mut self) -> Option<TimeDelta> {
        self.throttle.time_until_allowed()
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) {
        self.timer.tick();
        self.dispatch();
    }

    pub fn start_timer(&mut self, minutes: u32) -> Result<(), ControlError> {
        self.session.require_parent()?;
        let result = self.timer.start(minutes);
        self.dispatch();
        result
    }

    pub fn pause_timer(&mut self) -> Result<(), ControlError> {
        self.session.require_parent()?;
        self.timer.pause();
        self.dispatch();
        Ok(())
    }

    pub fn resume_timer(&mut self) -> Result<(), ControlError> {
        self.session.require_parent()?;
        self.timer.resume();
        self.dispatch();
        Ok(())
    }

    pub fn stop_timer(&mut self) -> Result<(), ControlError> {
        self.session.require_parent()?;
        self.timer.stop();
        self.dispatch();
        Ok(())
    }

    pub fn reset_timer(&mut self) -> Result<(), ControlError> {
        self.session.require_parent()?;
        self.timer.reset();
        self.dispatch();
        Ok(())
    }

    pub fn change_pin(
        &mut self,
        current: Option<&str>,
        new_pin: &str,
        confirm: &str,
    ) -> Result<(), ControlError> {
        self.session.require_parent()?;
        self.throttle.check()?;
        let result = self.session.change_pin(current, new_pin, confirm);
        self.account_reauthentication(result)
    }

    pub fn reset_pin(&mut self, current: Option<&str>) -> Result<(), ControlError> {
        self.session.require_parent()?;
        self.throttle.check()?;
        let result = self.session.reset_pin(current);
        self.account_reauthentication(result)
    }

    /// Count a wrong current PIN against the same limit as the lock surface
    fn account_reauthentication(
        &mut self,
        result: Result<(), ControlError>,
    ) -> Result<(), ControlError> {
        match result {
            Err(ControlError::InvalidCredential { .. }) => Err(self.throttle.record_failure()),
            Ok(()) => {
                self.throttle.record_success();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn session(&self) -> &SessionAuthority {
        &self.session
    }

    pub fn timer(&self) -> &TimerAuthority {
        &self.timer
    }

    pub fn timer_running(&self) -> bool {
        self.timer.phase() == TimerPhase::Running
    }

    /// Apply and fan out queued timer events. Returns what was delivered.
    fn dispatch(&mut self) -> Vec<TimerEvent> {
        let events = self.timer.drain_events();

        for &event in &events {
            if let TimerEvent::Lock(locked) = event {
                if locked {
                    warn!("Screen time exhausted, locking device");
                }
                self.locked = locked;
            }

            for sink in &mut self.sinks {
                deliver(sink.as_mut(), event);
            }
        }

        events
    }
}

fn deliver(sink: &mut dyn EventSink, event: TimerEvent) {
    match event {
        TimerEvent::Update { time_left, active } => sink.on_update(time_left, active),
        TimerEvent::Lock(locked) => sink.on_lock(locked),
    }
}
