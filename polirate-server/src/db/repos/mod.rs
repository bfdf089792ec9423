//! Repository layer
//!
//! One repo per aggregate. Writes that touch more than one table (counters,
//! points, notifications) run inside a single transaction.

pub mod bookmarks;
pub mod comments;
pub mod evaluations;
pub mod follows;
pub mod likes;
pub mod notifications;
pub mod politicians;
pub mod posts;
pub mod profiles;
pub mod ratings;
pub mod reports;

pub use bookmarks::{Bookmark, BookmarkRepo};
pub use comments::{Comment, CommentRepo, DeleteOutcome};
pub use evaluations::{Evaluation, EvaluationInput, EvaluationRepo, EvaluationSummary};
pub use follows::{FollowDirection, FollowRepo, FollowUser};
pub use likes::{LikeRepo, LikeState};
pub use notifications::{Notification, NotificationFilter, NotificationRepo};
pub use politicians::{
    NewPolitician, PoliticianDetail, PoliticianFilter, PoliticianPatch, PoliticianRepo,
    PoliticianSummary,
};
pub use posts::{NewPost, Post, PostFilter, PostPatch, PostRepo};
pub use profiles::{Profile, ProfilePatch, ProfileRepo, UserStats};
pub use ratings::{Rating, RatingRepo};
pub use reports::{NewPurchase, PaymentInput, PurchaseQuote, ReportPurchase, ReportRepo};

use polirate_core::Pagination;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use super::DbError;

/// Read the `COUNT(*) OVER() AS total` column from the first row of a page.
pub(crate) fn window_total(rows: &[PgRow]) -> i64 {
    rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0)
}

/// Fetch one page of a query that selects `COUNT(*) OVER() AS total`.
///
/// `query` binds the given `LIMIT` and `OFFSET` as its last two parameters.
/// A page past the end has no row to carry the window count, so the total is
/// read again from the first row.
pub(crate) async fn fetch_page<'q, F>(
    pool: &PgPool,
    page: Pagination,
    query: F,
) -> Result<(Vec<PgRow>, i64), DbError>
where
    F: Fn(i64, i64) -> Query<'q, Postgres, PgArguments>,
{
    let rows = query(page.limit(), page.offset()).fetch_all(pool).await?;
    if rows.is_empty() && page.offset() > 0 {
        let first = query(1, 0).fetch_optional(pool).await?;
        return Ok((rows, window_total(first.as_slice())));
    }
    let total = window_total(&rows);
    Ok((rows, total))
}

/// Escape `%`, `_` and `\` so user search text matches literally in ILIKE.
pub(crate) fn like_pattern(q: &str) -> String {
    let mut out = String::with_capacity(q.len() + 2);
    out.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("kim"), "%kim%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn empty_page_total_is_zero() {
        assert_eq!(window_total(&[]), 0);
    }
}
