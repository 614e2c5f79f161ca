use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted countdown snapshot.
///
/// `started_at` is the instant at which `time_left` was measured. It is
/// re-anchored on every refresh, so on reload the gap since `started_at` is
/// exactly the time the process was not counting.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub time_left: u32,
    pub is_active: bool,
    pub is_paused: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    pub duration: u32,
}

impl TimerSnapshot {
    /// Reason the snapshot cannot describe a countdown, if any
    pub fn inconsistency(&self) -> Option<&'static str> {
        if self.duration == 0 {
            Some("duration is zero")
        } else if self.time_left > self.duration {
            Some("time left exceeds duration")
        } else {
            None
        }
    }

    /// Seconds left as of `now`, without mutating anything
    pub fn remaining_at(&self, now: DateTime<Utc>) -> u32 {
        if !self.is_active || self.is_paused {
            return self.time_left;
        }

        let elapsed = (now - self.started_at).num_seconds().max(0);
        (self.time_left as i64 - elapsed).max(0) as u32
    }
}

/// Externally visible timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

impl TimerPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

/// Notifications produced by the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Time left and whether the countdown is effectively running
    Update { time_left: u32, active: bool },
    /// Lock requested (`true`) or released (`false`)
    Lock(bool),
}

/// Read-only view of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerStatus {
    pub phase: TimerPhase,
    pub time_left: u32,
    pub duration: u32,
}

/// Format seconds as MM:SS, or H:MM:SS from one hour up
pub fn format_time_left(seconds: u32) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}
