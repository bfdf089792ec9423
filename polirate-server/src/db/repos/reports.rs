//! Report purchases
//!
//! Checkout runs pending_verification -> verified -> paid -> completed. The
//! price depends on how many reports this buyer already paid for on the same
//! politician, so it is quoted at creation and settled again at payment
//! under a per-(buyer, politician) advisory lock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use polirate_core::report::{check_code, CodeRejection, VerificationCode};
use polirate_core::{
    BuyerType, Email, NotificationDraft, Paginated, Pagination, PriceSchedule, PurchaseAction,
    PurchaseStatus,
};

use super::super::DbError;
use super::notifications::insert_draft;
use super::profiles::ensure_profile;
use super::fetch_page;
use crate::auth::AuthUser;

/// Purchase as shown to the buyer. The verification code is never exposed.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReportPurchase {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub politician_id: Uuid,
    pub politician_name: String,
    pub buyer_type: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub organization: Option<String>,
    pub status: String,
    pub price: i64,
    pub purchase_number: i64,
    pub verification_expires_at: Option<DateTime<Utc>>,
    pub verification_attempts: i32,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub report_url: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportPurchase {
    pub fn status(&self) -> Option<PurchaseStatus> {
        PurchaseStatus::parse(&self.status)
    }
}

/// Validated checkout request
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub politician_id: Uuid,
    pub buyer_type: BuyerType,
    pub buyer_name: String,
    pub buyer_email: Email,
    pub organization: Option<String>,
}

/// Payment confirmation from the checkout page
#[derive(Debug, Clone)]
pub struct PaymentInput {
    /// Amount the buyer saw and agreed to
    pub amount: i64,
    pub method: String,
    pub reference: Option<String>,
}

/// Price of the buyer's next report on a politician
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurchaseQuote {
    pub politician_id: Uuid,
    /// Reports already paid for
    pub purchase_count: i64,
    pub purchase_number: i64,
    pub next_price: i64,
}

const SELECT_PURCHASE: &str = r#"
    SELECT
        r.id, r.buyer_id, r.politician_id, p.name AS politician_name,
        r.buyer_type, r.buyer_name, r.buyer_email, r.organization, r.status,
        r.price, r.purchase_number, r.verification_expires_at, r.verification_attempts,
        r.payment_method, r.payment_reference, r.paid_at, r.report_url, r.completed_at,
        r.created_at, r.updated_at
    FROM report_purchases r
    JOIN politicians p ON p.id = r.politician_id
"#;

/// Row state needed to drive a transition
struct Locked {
    buyer_id: Uuid,
    politician_id: Uuid,
    status: PurchaseStatus,
    code: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    attempts: i32,
}

/// Lock a purchase. With `buyer`, other buyers' purchases are not found.
async fn lock(conn: &mut PgConnection, id: Uuid, buyer: Option<Uuid>) -> Result<Locked, DbError> {
    #[allow(clippy::type_complexity)]
    let row: Option<(Uuid, Uuid, String, Option<String>, Option<DateTime<Utc>>, i32)> =
        sqlx::query_as(
            r#"
            SELECT buyer_id, politician_id, status, verification_code,
                   verification_expires_at, verification_attempts
            FROM report_purchases
            WHERE id = $1 AND ($2::uuid IS NULL OR buyer_id = $2)
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(buyer)
        .fetch_optional(&mut *conn)
        .await?;

    let (buyer_id, politician_id, status, code, expires_at, attempts) =
        row.ok_or_else(|| DbError::not_found("report purchase", id))?;

    let status = PurchaseStatus::parse(&status)
        .ok_or_else(|| DbError::InvalidState(format!("unknown purchase status '{}'", status)))?;

    Ok(Locked {
        buyer_id,
        politician_id,
        status,
        code,
        expires_at,
        attempts,
    })
}

/// Serialize pricing for one (buyer, politician) pair until commit.
async fn pricing_lock(conn: &mut PgConnection, buyer: Uuid, politician: Uuid) -> Result<(), DbError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("report-price:{}:{}", buyer, politician))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Paid or completed purchases by `buyer` for `politician`.
async fn prior_purchases<'c, E>(executor: E, buyer: Uuid, politician: Uuid) -> Result<i64, DbError>
where
    E: sqlx::Executor<'c, Database = sqlx::Postgres>,
{
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM report_purchases
        WHERE buyer_id = $1 AND politician_id = $2 AND status = ANY($3)
        "#,
    )
    .bind(buyer)
    .bind(politician)
    .bind(PurchaseStatus::pricing_statuses())
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Report purchase repository
pub struct ReportRepo<'a> {
    pool: &'a PgPool,
    prices: PriceSchedule,
}

impl<'a> ReportRepo<'a> {
    pub fn new(pool: &'a PgPool, prices: PriceSchedule) -> Self {
        Self { pool, prices }
    }

    pub async fn quote(&self, buyer: Uuid, politician_id: Uuid) -> Result<PurchaseQuote, DbError> {
        let count = prior_purchases(self.pool, buyer, politician_id).await?;
        Ok(PurchaseQuote {
            politician_id,
            purchase_count: count,
            purchase_number: count + 1,
            next_price: self.prices.next_price(count),
        })
    }

    /// Buyer's purchase, or any purchase for the service role.
    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<ReportPurchase, DbError> {
        let buyer = (!user.is_service()).then_some(user.id);
        sqlx::query_as::<_, ReportPurchase>(&format!(
            "{SELECT_PURCHASE} WHERE r.id = $1 AND ($2::uuid IS NULL OR r.buyer_id = $2)"
        ))
        .bind(id)
        .bind(buyer)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("report purchase", id))
    }

    async fn get_any(&self, id: Uuid) -> Result<ReportPurchase, DbError> {
        sqlx::query_as::<_, ReportPurchase>(&format!("{SELECT_PURCHASE} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("report purchase", id))
    }

    pub async fn list_for_buyer(
        &self,
        buyer: Uuid,
        status: Option<PurchaseStatus>,
        page: Pagination,
    ) -> Result<Paginated<ReportPurchase>, DbError> {
        let sql = format!(
            r#"
            SELECT page.*, COUNT(*) OVER() AS total FROM ({SELECT_PURCHASE}
                WHERE r.buyer_id = $1 AND ($2::text IS NULL OR r.status = $2)
            ) page
            ORDER BY page.created_at DESC, page.id DESC
            LIMIT $3 OFFSET $4
            "#
        );
        let (rows, total) = fetch_page(self.pool, page, |limit, offset| {
            sqlx::query(&sql)
                .bind(buyer)
                .bind(status.map(|s| s.as_str()))
                .bind(limit)
                .bind(offset)
        })
        .await?;
        let items = rows
            .iter()
            .map(ReportPurchase::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    /// Start a checkout. Returns the purchase and the code to send to the
    /// buyer's email.
    pub async fn create(
        &self,
        user: &AuthUser,
        new: NewPurchase,
    ) -> Result<(ReportPurchase, VerificationCode), DbError> {
        let mut tx = self.pool.begin().await?;
        ensure_profile(&mut tx, user).await?;

        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM politicians WHERE id = $1)")
                .bind(new.politician_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(DbError::not_found("politician", new.politician_id));
        }

        let prior = prior_purchases(&mut *tx, user.id, new.politician_id).await?;
        let price = self.prices.next_price(prior);
        let code = VerificationCode::generate(Utc::now());

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO report_purchases (
                buyer_id, politician_id, buyer_type, buyer_name, buyer_email, organization,
                price, purchase_number, verification_code, verification_expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(user.id)
        .bind(new.politician_id)
        .bind(new.buyer_type.as_str())
        .bind(&new.buyer_name)
        .bind(new.buyer_email.as_str())
        .bind(new.organization.as_deref())
        .bind(price)
        .bind(prior + 1)
        .bind(&code.code)
        .bind(code.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(purchase_id = %id, buyer = %user.id, price, number = prior + 1, "report purchase started");

        Ok((self.get_any(id).await?, code))
    }

    /// Check the emailed code. Wrong guesses are counted even though the
    /// request fails.
    pub async fn verify(&self, user: &AuthUser, id: Uuid, submitted: &str) -> Result<ReportPurchase, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = lock(&mut tx, id, Some(user.id)).await?;
        let next = row.status.apply(PurchaseAction::Verify)?;

        let (Some(stored), Some(expires_at)) = (row.code.as_deref(), row.expires_at) else {
            return Err(DbError::InvalidState(
                "no verification code issued, request a new one".to_string(),
            ));
        };

        match check_code(submitted, stored, expires_at, row.attempts, Utc::now()) {
            Ok(()) => {}
            Err(CodeRejection::Mismatch) => {
                sqlx::query(
                    "UPDATE report_purchases SET verification_attempts = verification_attempts + 1 WHERE id = $1",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                tracing::warn!(purchase_id = %id, attempts = row.attempts + 1, "verification code mismatch");
                return Err(CodeRejection::Mismatch.into());
            }
            Err(other) => return Err(other.into()),
        }

        sqlx::query(
            r#"
            UPDATE report_purchases SET
                status = $2,
                verification_code = NULL,
                verification_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_any(id).await
    }

    /// Issue a fresh code and reset the attempt counter.
    pub async fn resend_code(
        &self,
        user: &AuthUser,
        id: Uuid,
    ) -> Result<(ReportPurchase, VerificationCode), DbError> {
        let mut tx = self.pool.begin().await?;
        let row = lock(&mut tx, id, Some(user.id)).await?;
        row.status.apply(PurchaseAction::ResendCode)?;

        let code = VerificationCode::generate(Utc::now());
        sqlx::query(
            r#"
            UPDATE report_purchases SET
                verification_code = $2,
                verification_expires_at = $3,
                verification_attempts = 0,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&code.code)
        .bind(code.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((self.get_any(id).await?, code))
    }

    /// Record payment at the current price.
    ///
    /// If another purchase was paid since this one was quoted, the price
    /// will have moved and the payment is rejected with the new amount.
    pub async fn pay(&self, user: &AuthUser, id: Uuid, payment: PaymentInput) -> Result<ReportPurchase, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = lock(&mut tx, id, Some(user.id)).await?;
        let next = row.status.apply(PurchaseAction::Pay)?;

        pricing_lock(&mut tx, row.buyer_id, row.politician_id).await?;
        let prior = prior_purchases(&mut *tx, row.buyer_id, row.politician_id).await?;
        let price = self.prices.next_price(prior);

        if payment.amount != price {
            return Err(DbError::Conflict(format!(
                "price is now {} (purchase #{}), confirm the new amount",
                price,
                prior + 1
            )));
        }

        sqlx::query(
            r#"
            UPDATE report_purchases SET
                status = $2,
                price = $3,
                purchase_number = $4,
                payment_method = $5,
                payment_reference = $6,
                paid_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(price)
        .bind(prior + 1)
        .bind(&payment.method)
        .bind(payment.reference.as_deref())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(purchase_id = %id, price, number = prior + 1, "report purchase paid");

        self.get_any(id).await
    }

    /// Attach the delivered report and notify the buyer (service role).
    pub async fn complete(&self, id: Uuid, report_url: &str) -> Result<ReportPurchase, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = lock(&mut tx, id, None).await?;
        let next = row.status.apply(PurchaseAction::Complete)?;

        let (politician_name,): (String,) =
            sqlx::query_as("SELECT name FROM politicians WHERE id = $1")
                .bind(row.politician_id)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            UPDATE report_purchases SET
                status = $2,
                report_url = $3,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(report_url)
        .execute(&mut *tx)
        .await?;

        insert_draft(
            &mut tx,
            &NotificationDraft::report_ready(row.buyer_id, &politician_name, id),
        )
        .await?;

        tx.commit().await?;
        tracing::info!(purchase_id = %id, "report delivered");

        self.get_any(id).await
    }

    /// Cancel before payment.
    pub async fn cancel(&self, user: &AuthUser, id: Uuid) -> Result<ReportPurchase, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = lock(&mut tx, id, Some(user.id)).await?;
        let next = row.status.apply(PurchaseAction::Cancel)?;

        sqlx::query(
            r#"
            UPDATE report_purchases SET
                status = $2,
                verification_code = NULL,
                verification_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_any(id).await
    }

    /// Stored code for a purchase. Test helper for driving checkout without
    /// an inbox.
    #[cfg(test)]
    async fn stored_code(&self, id: Uuid) -> Option<String> {
        sqlx::query_as::<_, (Option<String>,)>(
            "SELECT verification_code FROM report_purchases WHERE id = $1",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await
        .ok()
        .and_then(|(c,)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::NotificationRepo;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();
        pool
    }

    fn buyer() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: Some("buyer@example.com".into()),
            role: None,
        }
    }

    fn service() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: None,
            role: Some(crate::auth::SERVICE_ROLE.into()),
        }
    }

    async fn politician(pool: &PgPool) -> Uuid {
        let (id,): (Uuid,) =
            sqlx::query_as("INSERT INTO politicians (name) VALUES ('Reported') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        id
    }

    fn request(politician_id: Uuid) -> NewPurchase {
        NewPurchase {
            politician_id,
            buyer_type: BuyerType::Individual,
            buyer_name: "Hong Gildong".into(),
            buyer_email: Email::new("buyer@example.com").unwrap(),
            organization: None,
        }
    }

    async fn checkout(repo: &ReportRepo<'_>, user: &AuthUser, politician_id: Uuid) -> ReportPurchase {
        let (purchase, _) = repo.create(user, request(politician_id)).await.unwrap();
        let code = repo.stored_code(purchase.id).await.unwrap();
        repo.verify(user, purchase.id, &code).await.unwrap();
        repo.pay(
            user,
            purchase.id,
            PaymentInput {
                amount: purchase.price,
                method: "card".into(),
                reference: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn price_drops_per_purchase() {
        let pool = pool().await;
        let repo = ReportRepo::new(&pool, PriceSchedule::default());
        let user = buyer();
        let pid = politician(&pool).await;

        let first = checkout(&repo, &user, pid).await;
        assert_eq!(first.price, 2_000_000);
        assert_eq!(first.purchase_number, 1);

        let second = checkout(&repo, &user, pid).await;
        assert_eq!(second.price, 1_900_000);

        let quote = repo.quote(user.id, pid).await.unwrap();
        assert_eq!(quote.purchase_count, 2);
        assert_eq!(quote.next_price, 1_800_000);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unsettled_purchases_do_not_lower_price() {
        let pool = pool().await;
        let repo = ReportRepo::new(&pool, PriceSchedule::default());
        let user = buyer();
        let pid = politician(&pool).await;

        let (pending, _) = repo.create(&user, request(pid)).await.unwrap();
        let (dropped, _) = repo.create(&user, request(pid)).await.unwrap();
        repo.cancel(&user, dropped.id).await.unwrap();

        let quote = repo.quote(user.id, pid).await.unwrap();
        assert_eq!(quote.purchase_count, 0);
        assert_eq!(quote.next_price, 2_000_000);

        let code = repo.stored_code(pending.id).await.unwrap();
        repo.verify(&user, pending.id, &code).await.unwrap();
        assert_eq!(repo.quote(user.id, pid).await.unwrap().purchase_count, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn stale_quote_rejected_at_payment() {
        let pool = pool().await;
        let repo = ReportRepo::new(&pool, PriceSchedule::default());
        let user = buyer();
        let pid = politician(&pool).await;

        // Two checkouts quoted at the first-purchase price
        let (a, _) = repo.create(&user, request(pid)).await.unwrap();
        let (b, _) = repo.create(&user, request(pid)).await.unwrap();
        assert_eq!(a.price, b.price);

        for p in [&a, &b] {
            let code = repo.stored_code(p.id).await.unwrap();
            repo.verify(&user, p.id, &code).await.unwrap();
        }

        let pay = |amount| PaymentInput {
            amount,
            method: "card".into(),
            reference: None,
        };
        repo.pay(&user, a.id, pay(a.price)).await.unwrap();
        let err = repo.pay(&user, b.id, pay(b.price)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let paid = repo.pay(&user, b.id, pay(1_900_000)).await.unwrap();
        assert_eq!(paid.purchase_number, 2);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn wrong_code_counts_attempts() {
        let pool = pool().await;
        let repo = ReportRepo::new(&pool, PriceSchedule::default());
        let user = buyer();
        let pid = politician(&pool).await;

        let (p, _) = repo.create(&user, request(pid)).await.unwrap();
        let stored = repo.stored_code(p.id).await.unwrap();
        let wrong = if stored == "000000" { "111111" } else { "000000" };

        assert!(matches!(
            repo.verify(&user, p.id, wrong).await,
            Err(DbError::Invalid(_))
        ));
        let reloaded = repo.get(&user, p.id).await.unwrap();
        assert_eq!(reloaded.verification_attempts, 1);

        // Resend resets the counter
        let (resent, _) = repo.resend_code(&user, p.id).await.unwrap();
        assert_eq!(resent.verification_attempts, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn complete_notifies_buyer() {
        let pool = pool().await;
        let repo = ReportRepo::new(&pool, PriceSchedule::default());
        let user = buyer();
        let pid = politician(&pool).await;

        let paid = checkout(&repo, &user, pid).await;
        let done = repo
            .complete(paid.id, "https://reports.example.com/r.pdf")
            .await
            .unwrap();
        assert_eq!(done.status(), Some(PurchaseStatus::Completed));
        assert_eq!(
            NotificationRepo::new(&pool).unread_count(user.id).await.unwrap(),
            1
        );

        // Completed purchases can't be cancelled
        assert!(matches!(
            repo.cancel(&user, paid.id).await,
            Err(DbError::InvalidState(_))
        ));
        // Service role can read any purchase
        assert_eq!(repo.get(&service(), paid.id).await.unwrap().id, paid.id);
        // Other buyers can't
        assert!(matches!(
            repo.get(&buyer(), paid.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
