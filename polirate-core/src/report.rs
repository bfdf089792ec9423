//! Detailed report purchases
//!
//! Pricing is a step function of how many reports the buyer has already
//! bought for the same politician; checkout moves through
//! info → verify → payment → complete.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Price tiers in KRW
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSchedule {
    /// Price of the first purchase
    pub base: i64,
    /// Discount per additional purchase
    pub step: i64,
    /// Lowest price ever charged
    pub floor: i64,
}

impl Default for PriceSchedule {
    fn default() -> Self {
        Self {
            base: 2_000_000,
            step: 100_000,
            floor: 1_000_000,
        }
    }
}

impl PriceSchedule {
    /// Price of the `n`-th purchase (1-indexed; 0 is treated as 1).
    ///
    /// `price(n) = max(base - (n - 1) * step, floor)`
    pub fn price(&self, n: i64) -> i64 {
        let n = n.max(1);
        self.base
            .saturating_sub((n - 1).saturating_mul(self.step))
            .max(self.floor)
    }

    /// Price of the next purchase given how many were already made.
    pub fn next_price(&self, prior_purchases: i64) -> i64 {
        self.price(prior_purchases.max(0) + 1)
    }
}

/// Who is buying the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyerType {
    Individual,
    Politician,
    Party,
    Organization,
}

impl BuyerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Politician => "politician",
            Self::Party => "party",
            Self::Organization => "organization",
        }
    }

    /// Party and organization buyers must name the organization.
    pub fn requires_organization(&self) -> bool {
        matches!(self, Self::Party | Self::Organization)
    }
}

impl std::str::FromStr for BuyerType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "individual" => Ok(Self::Individual),
            "politician" => Ok(Self::Politician),
            "party" => Ok(Self::Party),
            "organization" => Ok(Self::Organization),
            _ => Err(ValidationError::InvalidVariant {
                field: "buyer_type",
                value: s.to_owned(),
            }),
        }
    }
}

/// Purchase lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    PendingVerification,
    Verified,
    Paid,
    Completed,
    Cancelled,
}

/// Checkout actions that move a purchase between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseAction {
    Verify,
    ResendCode,
    Pay,
    Complete,
    Cancel,
}

impl PurchaseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::ResendCode => "resend code",
            Self::Pay => "pay",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

/// Rejected state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {} a purchase that is {}", .action.as_str(), .from.as_str())]
pub struct InvalidTransition {
    pub from: PurchaseStatus,
    pub action: PurchaseAction,
}

impl PurchaseStatus {
    pub const ALL: [Self; 5] = [
        Self::PendingVerification,
        Self::Verified,
        Self::Paid,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingVerification => "pending_verification",
            Self::Verified => "verified",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_verification" => Some(Self::PendingVerification),
            "verified" => Some(Self::Verified),
            "paid" => Some(Self::Paid),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Wizard step shown to the buyer for this status
    pub fn step(&self) -> u8 {
        match self {
            Self::PendingVerification => 2,
            Self::Verified => 3,
            Self::Paid | Self::Completed => 4,
            Self::Cancelled => 0,
        }
    }

    /// Counts toward the buyer's purchase number for pricing
    pub fn counts_for_pricing(&self) -> bool {
        matches!(self, Self::Paid | Self::Completed)
    }

    /// Stored names of every status that [`counts_for_pricing`](Self::counts_for_pricing).
    pub fn pricing_statuses() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.counts_for_pricing())
            .map(|s| s.as_str())
            .collect()
    }

    /// Apply `action`, returning the resulting status.
    pub fn apply(self, action: PurchaseAction) -> Result<Self, InvalidTransition> {
        use PurchaseAction as A;
        use PurchaseStatus as S;

        match (self, action) {
            (S::PendingVerification, A::Verify) => Ok(S::Verified),
            (S::PendingVerification, A::ResendCode) => Ok(S::PendingVerification),
            (S::Verified, A::Pay) => Ok(S::Paid),
            (S::Paid, A::Complete) => Ok(S::Completed),
            (S::PendingVerification | S::Verified, A::Cancel) => Ok(S::Cancelled),
            (from, action) => Err(InvalidTransition { from, action }),
        }
    }
}

/// Verification codes expire after this long
pub const CODE_TTL_MINUTES: i64 = 10;

/// Wrong guesses allowed before a code is locked
pub const MAX_CODE_ATTEMPTS: i32 = 5;

/// A one-time verification code with its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    /// Six random digits valid for [`CODE_TTL_MINUTES`] from `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
        Self {
            code: format!("{:06}", n),
            expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
        }
    }
}

/// Why a submitted code was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodeRejection {
    #[error("verification code has expired, request a new one")]
    Expired,
    #[error("too many failed attempts, request a new code")]
    Locked,
    #[error("verification code does not match")]
    Mismatch,
}

/// Check a submitted code against the stored one.
pub fn check_code(
    submitted: &str,
    stored: &str,
    expires_at: DateTime<Utc>,
    attempts: i32,
    now: DateTime<Utc>,
) -> Result<(), CodeRejection> {
    if attempts >= MAX_CODE_ATTEMPTS {
        return Err(CodeRejection::Locked);
    }
    if now > expires_at {
        return Err(CodeRejection::Expired);
    }
    if submitted.trim() != stored {
        return Err(CodeRejection::Mismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_table() {
        let p = PriceSchedule::default();
        assert_eq!(p.price(1), 2_000_000);
        assert_eq!(p.price(2), 1_900_000);
        assert_eq!(p.price(5), 1_600_000);
        assert_eq!(p.price(11), 1_000_000);
        assert_eq!(p.price(12), 1_000_000);
        assert_eq!(p.price(1000), 1_000_000);
    }

    #[test]
    fn price_zero_is_first() {
        let p = PriceSchedule::default();
        assert_eq!(p.price(0), p.price(1));
        assert_eq!(p.price(-3), p.price(1));
    }

    #[test]
    fn next_price_from_count() {
        let p = PriceSchedule::default();
        assert_eq!(p.next_price(0), 2_000_000);
        assert_eq!(p.next_price(3), 1_700_000);
    }

    #[test]
    fn only_settled_purchases_count_for_pricing() {
        assert_eq!(PurchaseStatus::pricing_statuses(), ["paid", "completed"]);
        for status in PurchaseStatus::ALL {
            assert_eq!(PurchaseStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn happy_path_transitions() {
        let s = PurchaseStatus::PendingVerification;
        let s = s.apply(PurchaseAction::Verify).unwrap();
        assert_eq!(s, PurchaseStatus::Verified);
        let s = s.apply(PurchaseAction::Pay).unwrap();
        assert_eq!(s, PurchaseStatus::Paid);
        let s = s.apply(PurchaseAction::Complete).unwrap();
        assert_eq!(s, PurchaseStatus::Completed);
    }

    #[test]
    fn illegal_transitions() {
        assert!(PurchaseStatus::PendingVerification
            .apply(PurchaseAction::Pay)
            .is_err());
        assert!(PurchaseStatus::Paid.apply(PurchaseAction::Cancel).is_err());
        assert!(PurchaseStatus::Completed
            .apply(PurchaseAction::Complete)
            .is_err());
        assert!(PurchaseStatus::Cancelled.apply(PurchaseAction::Verify).is_err());

        let err = PurchaseStatus::Verified
            .apply(PurchaseAction::Verify)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot verify a purchase that is verified");
    }

    #[test]
    fn status_names_parse_back() {
        for s in [
            PurchaseStatus::PendingVerification,
            PurchaseStatus::Verified,
            PurchaseStatus::Paid,
            PurchaseStatus::Completed,
            PurchaseStatus::Cancelled,
        ] {
            assert_eq!(PurchaseStatus::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn organization_required_for_groups() {
        assert!(BuyerType::Party.requires_organization());
        assert!(!"individual".parse::<BuyerType>().unwrap().requires_organization());
        assert!("company".parse::<BuyerType>().is_err());
    }

    #[test]
    fn generated_code_shape() {
        let now = Utc::now();
        let code = VerificationCode::generate(now);
        assert_eq!(code.code.len(), 6);
        assert!(code.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(code.expires_at - now, Duration::minutes(CODE_TTL_MINUTES));
    }

    #[test]
    fn code_checks() {
        let now = Utc::now();
        let later = now + Duration::minutes(5);
        assert!(check_code("123456", "123456", later, 0, now).is_ok());
        assert!(check_code(" 123456 ", "123456", later, 0, now).is_ok());
        assert_eq!(
            check_code("000000", "123456", later, 0, now),
            Err(CodeRejection::Mismatch)
        );
        assert_eq!(
            check_code("123456", "123456", now - Duration::seconds(1), 0, now),
            Err(CodeRejection::Expired)
        );
        assert_eq!(
            check_code("123456", "123456", later, MAX_CODE_ATTEMPTS, now),
            Err(CodeRejection::Locked)
        );
    }
}
