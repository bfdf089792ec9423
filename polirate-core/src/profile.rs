//! Profile fields: nicknames and email addresses

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validation::{bounded_text, ValidationError};

/// Letters of any script, digits, underscore and hyphen
static NICKNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}_-]+$").expect("invalid nickname regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex")
});

const MIN_NICKNAME_LEN: usize = 2;
const MAX_NICKNAME_LEN: usize = 20;
const MAX_EMAIL_LEN: usize = 254;

/// Validated public nickname
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nickname(String);

impl Nickname {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let name = bounded_text("nickname", s, MIN_NICKNAME_LEN, MAX_NICKNAME_LEN)?;

        if !NICKNAME_RE.is_match(&name) {
            return Err(ValidationError::InvalidFormat {
                field: "nickname",
                reason: "only letters, digits, '_' and '-' are allowed",
            });
        }

        Ok(Self(name))
    }

    /// Derive a nickname from the local part of an email address.
    ///
    /// Falls back to `user-<first 8 hex of id>` when the local part is not a
    /// usable nickname.
    pub fn from_email_or_id(email: Option<&str>, id: &uuid::Uuid) -> Self {
        let fallback = || Self(format!("user-{}", &id.simple().to_string()[..8]));

        let Some(local) = email.and_then(|e| e.split('@').next()) else {
            return fallback();
        };

        let cleaned: String = local
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .take(MAX_NICKNAME_LEN)
            .collect();

        Self::new(&cleaned).unwrap_or_else(|_| fallback())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lower-cased email address with a minimal shape check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        if trimmed.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }
        if !EMAIL_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "expected an address like name@example.com",
            });
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn valid_nicknames() {
        assert!(Nickname::new("citizen_01").is_ok());
        assert!(Nickname::new("시민기자").is_ok());
        assert!(Nickname::new("a-b").is_ok());
    }

    #[test]
    fn rejects_bad_nicknames() {
        assert!(matches!(
            Nickname::new("a").unwrap_err(),
            ValidationError::TooShort { .. }
        ));
        assert!(matches!(
            Nickname::new("has space").unwrap_err(),
            ValidationError::InvalidFormat { .. }
        ));
        assert!(Nickname::new(&"n".repeat(21)).is_err());
    }

    #[test]
    fn nickname_from_email() {
        let id = Uuid::nil();
        let nick = Nickname::from_email_or_id(Some("jane.doe@example.com"), &id);
        assert_eq!(nick.as_str(), "janedoe");
    }

    #[test]
    fn nickname_fallback() {
        let id = Uuid::parse_str("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(
            Nickname::from_email_or_id(None, &id).as_str(),
            "user-01234567"
        );
        // Local part too short after cleaning
        assert_eq!(
            Nickname::from_email_or_id(Some("x@example.com"), &id).as_str(),
            "user-01234567"
        );
    }

    #[test]
    fn email_shape() {
        assert_eq!(
            Email::new(" Jane@Example.COM ").unwrap().as_str(),
            "jane@example.com"
        );
        assert!(Email::new("not-an-email").is_err());
        assert!(Email::new("a@b").is_err());
        assert!(Email::new("").is_err());
    }
}
