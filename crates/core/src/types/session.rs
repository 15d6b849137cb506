//! Client session token.

use core::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing a [`SessionToken`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionTokenError {
    /// The input string is empty.
    #[error("session token cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("session token must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters that cannot travel in an HTTP header.
    #[error("session token contains invalid characters")]
    InvalidCharacters,
}

/// Opaque per-installation token that scopes a client's cart.
///
/// Created once (`session_<unix millis>_<random>`), persisted in durable
/// client storage, and reused for the lifetime of the installation. The
/// random suffix keeps clients created in the same millisecond apart.
///
/// ## Examples
///
/// ```
/// use eazybuy_core::SessionToken;
///
/// let token = SessionToken::parse("session_1718000000000").unwrap();
/// assert_eq!(token.as_str(), "session_1718000000000");
///
/// assert!(SessionToken::parse("").is_err());
/// assert!(SessionToken::parse("bad\ntoken").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Maximum accepted token length.
    pub const MAX_LENGTH: usize = 128;

    /// Prefix of generated tokens.
    pub const PREFIX: &'static str = "session_";

    /// Generate a fresh token from the current time.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate a token for a specific instant.
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        Self(format!(
            "{}{}_{}",
            Self::PREFIX,
            now.timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    /// Parse a previously persisted token.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 128 characters,
    /// or contains anything other than visible ASCII.
    pub fn parse(s: &str) -> Result<Self, SessionTokenError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SessionTokenError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SessionTokenError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(SessionTokenError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionToken {
    type Err = SessionTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionToken {
    type Error = SessionTokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_generate_is_timestamp_derived() {
        let now = Utc
            .timestamp_millis_opt(1_718_000_000_123)
            .single()
            .unwrap_or_else(|| panic!("valid timestamp"));
        let token = SessionToken::generate_at(now);

        let suffix = token
            .as_str()
            .strip_prefix("session_1718000000123_")
            .unwrap_or_else(|| panic!("unexpected token {token}"));
        assert_eq!(suffix.len(), 32);
        assert!(suffix.bytes().all(|b| b.is_ascii_hexdigit()));
        assert!(SessionToken::parse(token.as_str()).is_ok());
    }

    #[test]
    fn test_same_instant_tokens_differ() {
        let now = Utc::now();
        assert_ne!(SessionToken::generate_at(now), SessionToken::generate_at(now));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(
            SessionToken::parse("  session_1  ").map(|t| t.to_string()),
            Ok("session_1".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert_eq!(SessionToken::parse("   "), Err(SessionTokenError::Empty));
        assert_eq!(
            SessionToken::parse(&"x".repeat(129)),
            Err(SessionTokenError::TooLong { max: 128 })
        );
        assert_eq!(
            SessionToken::parse("has space"),
            Err(SessionTokenError::InvalidCharacters)
        );
    }

    #[test]
    fn test_serde_validates() {
        assert!(serde_json::from_str::<SessionToken>(r#""""#).is_err());
        let token: Result<SessionToken, _> = serde_json::from_str(r#""session_5""#);
        assert_eq!(token.map(String::from).ok().as_deref(), Some("session_5"));
    }
}
