/// Screen-time countdown
///
/// This module provides:
/// - The persistent countdown state machine (idle, running, paused)
/// - Catch-up of time that passed while the process was not running
/// - The cancellable one-second tick schedule
/// - Remaining-time warnings for presentation

pub mod authority;
pub mod snapshot;
pub mod ticker;
pub mod warnings;

pub use authority::{TimerAuthority, TimerOptions};
pub use snapshot::{TimerEvent, TimerPhase, TimerSnapshot, TimerStatus, format_time_left};
pub use ticker::TickSchedule;
pub use warnings::{TimeWarning, WarningTracker};
