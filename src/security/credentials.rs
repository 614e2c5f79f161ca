use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::OnceLock;

use crate::error::ControlError;

/// PINs accepted while no custom PIN is configured
pub const DEFAULT_PINS: [&str; 3] = ["1234", "0000", "9999"];

/// Phrases accepted by the voice check (case-insensitive substring match)
pub const VOICE_KEYWORDS: [&str; 5] = ["parent", "unlock", "emergency", "homework", "adult"];

pub const MIN_PIN_LENGTH: usize = 4;
pub const MAX_PIN_LENGTH: usize = 32;

/// How the parent is proving who they are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Pin,
    Voice,
}

/// PIN hashing and the credential checks behind parent authentication
pub struct ParentCredentials;

impl ParentCredentials {
    /// Hash a PIN using Argon2id
    pub fn hash_pin(pin: &str) -> Result<String, ControlError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(pin.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ControlError::Credential(format!("Failed to hash PIN: {}", e)))
    }

    /// Verify a PIN against a stored hash. An unparseable hash never matches.
    pub fn verify_pin(pin: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(pin.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Whether a stored value is a PHC hash string this module can verify against
    pub fn is_valid_hash(hash: &str) -> bool {
        PasswordHash::new(hash).is_ok_and(|parsed| parsed.salt.is_some() && parsed.hash.is_some())
    }

    /// Check a PIN against the custom credential if one exists, else the defaults.
    ///
    /// Both paths run exactly one Argon2 verification and compare every
    /// default, so timing does not reveal which credential is configured.
    pub fn check_pin(input: &str, custom: Option<&str>) -> bool {
        let input = input.trim();

        match custom {
            Some(hash) => {
                let _ = matches_default(input);
                Self::verify_pin(input, hash)
            }
            None => {
                let decoy = decoy_hash();
                let _ = Self::verify_pin(input, decoy);
                matches_default(input)
            }
        }
    }

    /// Prepare the decoy hash used when no custom PIN is set
    pub fn warm_up() {
        let _ = decoy_hash();
    }

    /// Keyword stand-in for voice recognition
    pub fn check_voice(phrase: &str) -> bool {
        let phrase = phrase.to_lowercase();
        VOICE_KEYWORDS.iter().any(|keyword| phrase.contains(keyword))
    }

    /// Validate a new custom PIN
    pub fn validate_new_pin(pin: &str) -> Result<(), ControlError> {
        let length = pin.trim().chars().count();

        if length < MIN_PIN_LENGTH {
            return Err(ControlError::InvalidPin(format!(
                "PIN must be at least {} characters long",
                MIN_PIN_LENGTH
            )));
        }

        if length > MAX_PIN_LENGTH {
            return Err(ControlError::InvalidPin(format!(
                "PIN must be at most {} characters long",
                MAX_PIN_LENGTH
            )));
        }

        Ok(())
    }
}

/// Hash of a random secret, verified against when no custom PIN exists
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();

    DECOY.get_or_init(|| {
        let secret = SaltString::generate(&mut OsRng);
        // An empty string never parses, so verification simply fails
        ParentCredentials::hash_pin(secret.as_str()).unwrap_or_default()
    })
}

fn matches_default(input: &str) -> bool {
    DEFAULT_PINS
        .iter()
        .fold(false, |found, pin| found | constant_time_eq(pin.as_bytes(), input.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = u8::from(a.len() != b.len());

    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
    }

    diff == 0
}
