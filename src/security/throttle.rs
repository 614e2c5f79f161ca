use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::ControlError;

/// Consecutive-failure limiter for the lock surface.
///
/// After `max_attempts` failures in a row, every attempt is refused until the
/// cool-down has elapsed, at which point the counter starts again from zero.
pub struct UnlockThrottle {
    clock: Arc<dyn Clock>,
    failures: u32,
    blocked_until: Option<DateTime<Utc>>,
    max_attempts: u32,
    cooldown: TimeDelta,
}

impl UnlockThrottle {
    pub fn new(clock: Arc<dyn Clock>, max_attempts: u32, cooldown: TimeDelta) -> Self {
        Self {
            clock,
            failures: 0,
            blocked_until: None,
            max_attempts,
            cooldown,
        }
    }

    /// Check whether an attempt may be made right now
    pub fn check(&mut self) -> Result<(), ControlError> {
        match self.time_until_allowed() {
            Some(remaining) => Err(ControlError::RateLimited {
                retry_after_secs: ceil_secs(remaining),
            }),
            None => Ok(()),
        }
    }

    /// Record a failed attempt. Returns the error to show the user.
    pub fn record_failure(&mut self) -> ControlError {
        self.failures += 1;

        if self.failures >= self.max_attempts {
            self.blocked_until = Some(self.clock.now() + self.cooldown);
            tracing::warn!(
                "{} failed unlock attempts, blocking for {} seconds",
                self.failures,
                self.cooldown.num_seconds()
            );
            ControlError::RateLimited {
                retry_after_secs: self.cooldown.num_seconds(),
            }
        } else {
            ControlError::InvalidCredential {
                attempts_remaining: self.max_attempts - self.failures,
            }
        }
    }

    /// Record a successful attempt
    pub fn record_success(&mut self) {
        self.reset();
    }

    /// Time until the next attempt is allowed, clearing an elapsed cool-down
    pub fn time_until_allowed(&mut self) -> Option<TimeDelta> {
        let until = self.blocked_until?;
        let now = self.clock.now();

        if now < until {
            Some(until - now)
        } else {
            tracing::debug!("Unlock cool-down elapsed");
            self.reset();
            None
        }
    }

    fn reset(&mut self) {
        self.failures = 0;
        self.blocked_until = None;
    }
}

fn ceil_secs(delta: TimeDelta) -> i64 {
    let millis = delta.num_milliseconds();
    (millis + 999) / 1000
}
