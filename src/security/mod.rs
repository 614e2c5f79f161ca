/// Parent authentication for the screen-time guard
///
/// - PIN and voice-keyword credential checks
/// - Time-limited parent and emergency sessions
/// - Custom PIN management
/// - Lock-surface attempt throttling

pub mod credentials;
pub mod session;
pub mod throttle;

pub use credentials::{AuthMethod, ParentCredentials, DEFAULT_PINS, VOICE_KEYWORDS};
pub use session::{SessionAuthority, SessionPolicy, SessionRecord};
pub use throttle::UnlockThrottle;
