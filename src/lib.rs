//! Parental screen-time control: parent sessions, a persistent countdown
//! and the device lock derived from both.

pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod security;
pub mod store;
pub mod timer;

pub use error::ControlError;
pub use lock::{EventSink, LockCoordinator, LockState, Mode};
