//! Repository error type

use polirate_core::report::{CodeRejection, InvalidTransition};
use polirate_core::ValidationError;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Operation not allowed in the row's current state
    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl DbError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Friendly message for a unique constraint, keyed by constraint name
fn conflict_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("likes_user_target_key") => "already liked".to_string(),
        Some("bookmarks_pkey") => "politician already bookmarked".to_string(),
        Some("follows_pkey") => "already following this user".to_string(),
        Some("profiles_nickname_key") => "nickname is already taken".to_string(),
        Some("politician_evaluations_pkey") => "evaluation already exists".to_string(),
        Some(other) => format!("duplicate value violates {}", other),
        None => "duplicate value".to_string(),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return Self::Conflict(conflict_message(db.constraint())),
                Some(FOREIGN_KEY_VIOLATION) => {
                    return Self::NotFound {
                        resource: "referenced resource",
                        id: db.constraint().unwrap_or("unknown").to_string(),
                    }
                }
                _ => {}
            }
        }
        Self::Sqlx(e)
    }
}

impl From<InvalidTransition> for DbError {
    fn from(e: InvalidTransition) -> Self {
        Self::InvalidState(e.to_string())
    }
}

impl From<CodeRejection> for DbError {
    fn from(e: CodeRejection) -> Self {
        Self::Invalid(ValidationError::InvalidFormat {
            field: "code",
            reason: match e {
                CodeRejection::Expired => "verification code has expired, request a new one",
                CodeRejection::Locked => "too many failed attempts, request a new code",
                CodeRejection::Mismatch => "verification code does not match",
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polirate_core::{PurchaseAction, PurchaseStatus};

    #[test]
    fn conflict_messages() {
        assert_eq!(conflict_message(Some("likes_user_target_key")), "already liked");
        assert_eq!(
            conflict_message(Some("some_key")),
            "duplicate value violates some_key"
        );
        assert_eq!(conflict_message(None), "duplicate value");
    }

    #[test]
    fn row_not_found_stays_sqlx() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Sqlx(_)));
    }

    #[test]
    fn transition_becomes_invalid_state() {
        let err: DbError = PurchaseStatus::Completed
            .apply(PurchaseAction::Cancel)
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::InvalidState(_)));
        assert_eq!(err.to_string(), "cannot cancel a purchase that is completed");
    }

    #[test]
    fn code_rejection_is_validation() {
        let err: DbError = CodeRejection::Expired.into();
        assert!(matches!(err, DbError::Invalid(_)));
    }
}
