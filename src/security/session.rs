use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::ControlError;
use crate::security::credentials::{AuthMethod, ParentCredentials};
use crate::store::{self, RecordKey, Store};

/// Persisted parent session
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub authenticated_at: DateTime<Utc>,
    pub authenticated: bool,
    #[serde(default)]
    pub emergency: bool,
}

/// Session validity windows
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub timeout: TimeDelta,
    pub emergency_timeout: TimeDelta,
}

impl SessionPolicy {
    pub fn timeout_for(&self, emergency: bool) -> TimeDelta {
        if emergency {
            self.emergency_timeout
        } else {
            self.timeout
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self {
            timeout: config.timeout(),
            emergency_timeout: config.emergency_timeout(),
        }
    }
}

/// Owner of parent authentication, session expiry and the PIN credential
pub struct SessionAuthority {
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    policy: SessionPolicy,
    authenticated: bool,
    authenticated_at: Option<DateTime<Utc>>,
    emergency: bool,
    custom_pin: Option<String>,
}

impl SessionAuthority {
    /// Rehydrate from the store. Stale or malformed records are discarded.
    pub fn load(clock: Arc<dyn Clock>, store: Arc<dyn Store>, policy: SessionPolicy) -> Self {
        let custom_pin = load_custom_pin(store.as_ref());
        ParentCredentials::warm_up();

        let mut authority = Self {
            clock,
            store,
            policy,
            authenticated: false,
            authenticated_at: None,
            emergency: false,
            custom_pin,
        };

        if let Some(record) =
            store::load_or_discard::<SessionRecord>(authority.store.as_ref(), RecordKey::Session)
        {
            let age = authority.clock.now() - record.authenticated_at;
            let timeout = authority.policy.timeout_for(record.emergency);

            // A timestamp from the future would stretch the session past its timeout
            if record.authenticated && age >= TimeDelta::zero() && age < timeout {
                debug!("Restored parent session ({}s old)", age.num_seconds());
                authority.authenticated = true;
                authority.authenticated_at = Some(record.authenticated_at);
                authority.emergency = record.emergency;
            } else {
                debug!("Discarding stale parent session");
                store::clear_record(authority.store.as_ref(), RecordKey::Session);
            }
        }

        authority
    }

    /// Check a credential and, on success, start a fresh parent session
    pub fn authenticate(&mut self, method: AuthMethod, input: &str) -> bool {
        let valid = match method {
            AuthMethod::Pin => ParentCredentials::check_pin(input, self.custom_pin.as_deref()),
            AuthMethod::Voice => ParentCredentials::check_voice(input),
        };

        if !valid {
            info!("Parent authentication failed ({:?})", method);
            return false;
        }

        self.begin_session(false);
        info!("Parent authenticated ({:?})", method);
        true
    }

    /// End the parent session. Idempotent.
    pub fn logout(&mut self) {
        if self.authenticated {
            info!("Parent session ended");
        }

        self.authenticated = false;
        self.authenticated_at = None;
        self.emergency = false;
        store::clear_record(self.store.as_ref(), RecordKey::Session);
    }

    /// Whether a parent session is currently valid.
    ///
    /// Expiry is detected here: a session found past its timeout is logged
    /// out before this returns `false`.
    pub fn is_session_valid(&mut self) -> bool {
        if !self.authenticated {
            return false;
        }

        if self.peek_session_valid() {
            return true;
        }

        info!(
            "{} session expired",
            if self.emergency { "Emergency" } else { "Parent" }
        );
        self.logout();
        false
    }

    /// Same check as [`is_session_valid`](Self::is_session_valid) without the logout
    pub fn peek_session_valid(&self) -> bool {
        match (self.authenticated, self.authenticated_at) {
            (true, Some(at)) => self.clock.now() - at < self.policy.timeout_for(self.emergency),
            _ => false,
        }
    }

    /// Authorization decision for parent-only controls
    pub fn require_parent(&mut self) -> Result<(), ControlError> {
        let was_authenticated = self.authenticated;

        if self.is_session_valid() {
            Ok(())
        } else if was_authenticated {
            Err(ControlError::SessionExpired)
        } else {
            Err(ControlError::ParentRequired)
        }
    }

    /// Grant a short-lived emergency session
    pub fn emergency_unlock(&mut self) {
        self.begin_session(true);
        warn!(
            "Emergency access granted for {} minutes",
            self.policy.emergency_timeout.num_minutes()
        );
    }

    pub fn is_emergency(&self) -> bool {
        self.authenticated && self.emergency
    }

    pub fn authenticated_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
    }

    /// When the current session lapses, if there is one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at
            .filter(|_| self.authenticated)
            .map(|at| at + self.policy.timeout_for(self.emergency))
    }

    /// Replace the custom PIN.
    ///
    /// Callers must have re-authenticated with the current custom PIN first;
    /// see [`change_pin`](Self::change_pin).
    pub fn set_custom_pin(&mut self, pin: &str) -> Result<(), ControlError> {
        ParentCredentials::validate_new_pin(pin)?;

        let hash = ParentCredentials::hash_pin(pin.trim())?;
        store::save_record(self.store.as_ref(), RecordKey::Pin, &hash);
        self.custom_pin = Some(hash);

        info!("Custom parent PIN set");
        Ok(())
    }

    pub fn has_custom_pin(&self) -> bool {
        self.custom_pin.is_some()
    }

    /// The stored custom credential (an Argon2 hash), for internal comparison only
    pub fn custom_pin(&self) -> Option<&str> {
        self.custom_pin.as_deref()
    }

    /// Forget the custom PIN and fall back to the default set.
    ///
    /// Callers must gate this like [`set_custom_pin`](Self::set_custom_pin).
    pub fn reset_to_default(&mut self) {
        self.custom_pin = None;
        store::clear_record(self.store.as_ref(), RecordKey::Pin);
        info!("Parent PIN reset to defaults");
    }

    /// Gated PIN change: re-authenticate with the current custom PIN (if any),
    /// then set the new one.
    pub fn change_pin(
        &mut self,
        current: Option<&str>,
        new_pin: &str,
        confirm: &str,
    ) -> Result<(), ControlError> {
        ParentCredentials::validate_new_pin(new_pin)?;

        if new_pin.trim() != confirm.trim() {
            return Err(ControlError::PinMismatch);
        }

        self.reauthenticate(current)?;
        self.set_custom_pin(new_pin)
    }

    /// Gated reset to the default PINs
    pub fn reset_pin(&mut self, current: Option<&str>) -> Result<(), ControlError> {
        self.reauthenticate(current)?;
        self.reset_to_default();
        Ok(())
    }

    fn reauthenticate(&mut self, current: Option<&str>) -> Result<(), ControlError> {
        if !self.has_custom_pin() {
            return Ok(());
        }

        match current {
            Some(pin) if self.authenticate(AuthMethod::Pin, pin) => Ok(()),
            // Attempt accounting belongs to the lock surface's throttle
            _ => Err(ControlError::InvalidCredential {
                attempts_remaining: 0,
            }),
        }
    }

    fn begin_session(&mut self, emergency: bool) {
        let now = self.clock.now();
        self.authenticated = true;
        self.authenticated_at = Some(now);
        self.emergency = emergency;

        store::save_record(
            self.store.as_ref(),
            RecordKey::Session,
            &SessionRecord {
                authenticated_at: now,
                authenticated: true,
                emergency,
            },
        );
    }
}

/// Load the custom PIN hash, discarding a record that is not a usable hash
fn load_custom_pin(store: &dyn Store) -> Option<String> {
    let hash = store::load_or_discard::<String>(store, RecordKey::Pin)?;

    if ParentCredentials::is_valid_hash(&hash) {
        return Some(hash);
    }

    warn!(
        "{}",
        ControlError::MalformedPersistedState {
            record: RecordKey::Pin,
            reason: "not a PIN hash".to_string(),
        }
    );
    store::clear_record(store, RecordKey::Pin);
    None
}
