use crate::store::RecordKey;

/// Errors surfaced by the session, timer and lock state machines.
///
/// None of these are fatal. Callers either show them to the user as a retry
/// prompt or fall back to the safe default (child mode, idle timer).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("Incorrect credential ({attempts_remaining} attempts remaining)")]
    InvalidCredential { attempts_remaining: u32 },

    #[error("Parent session expired, please authenticate again")]
    SessionExpired,

    #[error("Parent authentication required")]
    ParentRequired,

    #[error("Too many failed attempts, try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: i64 },

    #[error("Discarding malformed {record} record: {reason}")]
    MalformedPersistedState { record: RecordKey, reason: String },

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("PINs do not match")]
    PinMismatch,

    #[error("Invalid timer duration: {0} minutes")]
    InvalidDuration(u32),

    #[error("A timer is already running, stop it first")]
    TimerBusy,

    #[error("Invalid emergency code")]
    InvalidEmergencyCode,

    #[error("Credential error: {0}")]
    Credential(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message_includes_remaining_time() {
        let err = ControlError::RateLimited { retry_after_secs: 240 };
        assert_eq!(
            err.to_string(),
            "Too many failed attempts, try again in 240 seconds"
        );
    }

    #[test]
    fn test_invalid_credential_reports_attempts() {
        let err = ControlError::InvalidCredential { attempts_remaining: 2 };
        assert!(err.to_string().contains("2 attempts remaining"));
    }

    #[test]
    fn test_malformed_state_names_record() {
        let err = ControlError::MalformedPersistedState {
            record: RecordKey::Timer,
            reason: "expected value".to_string(),
        };
        assert!(err.to_string().contains("timer"));
    }
}
