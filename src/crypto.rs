//! Token generation and comparison primitives.
//!
//! Every secret this crate hands out comes from [`generate_token`], which
//! draws from the OS cryptographically secure random source and reports
//! entropy failure as an error instead of degrading to a weaker generator.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;

use crate::SessionError;

// 20 characters over a 62-symbol alphabet: log2(62^20) is ~119 bits of
// entropy. OWASP's session management guidance asks for at least 64, so this
// is a deliberate margin, not a number to trim.
pub const SESSION_TOKEN_LENGTH: usize = 20;

/// Length of the short opaque identifier used in URLs and lock ownership.
pub const UNIQUE_ID_LENGTH: usize = 10;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

// Largest multiple of 62 that fits in a byte. Bytes at or above this are
// rejected; reducing them modulo 62 would skew the first four symbols.
const REJECTION_LIMIT: u8 = 248;

/// Generates a cryptographically secure random token.
///
/// The token is drawn uniformly from the 62-symbol alphanumeric alphabet
/// (`0-9`, `A-Z`, `a-z`).
///
/// # Errors
///
/// Returns [`SessionError::EntropyExhausted`] if the OS random source fails.
/// Callers must abort the operation that requested the token; retrying
/// against a degraded entropy source is not safe.
pub fn generate_token(length: usize) -> Result<String, SessionError> {
    let mut token = String::with_capacity(length);
    let mut buf = [0u8; 64];

    while token.len() < length {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|_| SessionError::EntropyExhausted)?;

        for &byte in &buf {
            if byte >= REJECTION_LIMIT {
                continue;
            }
            token.push(char::from(ALPHABET[usize::from(byte % 62)]));
            if token.len() == length {
                break;
            }
        }
    }

    Ok(token)
}

/// Compares two strings in constant time.
///
/// A length mismatch short-circuits; for equal lengths the runtime does not
/// depend on where the first differing byte falls, so an attacker cannot
/// probe a stored secret position by position.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// A wrapper for sensitive string data that prevents accidental logging.
///
/// `SecretString` implements `Debug` and `Display` to show `[REDACTED]`
/// instead of the actual content. Session and CSRF tokens are stored behind
/// this type so a stray debug line never leaks a live credential.
///
/// # Example
///
/// ```rust
/// use airlock::SecretString;
///
/// let token = SecretString::new("kjN2pQ7rT0vXw4yZa1bC");
///
/// assert_eq!(format!("{:?}", token), "SecretString([REDACTED])");
/// assert_eq!(token.expose_secret(), "kjN2pQ7rT0vXw4yZa1bC");
/// ```
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new `SecretString` from any type that can be converted to a `String`.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the secret value.
    ///
    /// Use this method only when the actual secret is required, such as when
    /// returning a freshly created token to the client.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns true if the wrapped value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl Eq for SecretString {}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Expose the actual value for serialization; the durable store needs it.
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretString(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_length() {
        let token = generate_token(SESSION_TOKEN_LENGTH).unwrap();
        assert_eq!(token.len(), SESSION_TOKEN_LENGTH);

        let token = generate_token(UNIQUE_ID_LENGTH).unwrap();
        assert_eq!(token.len(), UNIQUE_ID_LENGTH);

        let token = generate_token(0).unwrap();
        assert!(token.is_empty());
    }

    #[test]
    fn test_generate_token_alphanumeric() {
        let token = generate_token(200).unwrap();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_token_unique() {
        let token1 = generate_token(SESSION_TOKEN_LENGTH).unwrap();
        let token2 = generate_token(SESSION_TOKEN_LENGTH).unwrap();
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abcdef", "abcdef"));
        assert!(!constant_time_eq("abcdef", "abcdeg"));
        assert!(!constant_time_eq("abcdef", "abcde"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_secret_string_debug_redacted() {
        let secret = SecretString::new("token-value");
        assert_eq!(format!("{secret:?}"), "SecretString([REDACTED])");
    }

    #[test]
    fn test_secret_string_display_redacted() {
        let secret = SecretString::new("token-value");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn test_secret_string_expose_secret() {
        let secret = SecretString::new("token-value");
        assert_eq!(secret.expose_secret(), "token-value");
    }

    #[test]
    fn test_secret_string_serde_round_trip() {
        let secret = SecretString::new("token-value");
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, "\"token-value\"");

        let back: SecretString = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expose_secret(), "token-value");
    }
}
