use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{BookingRecord, BookingStatus, PaymentStatus};

/// Outcome of a cancellation eligibility check. Not-eligible is a normal
/// result, never an error: the `reason` is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundEligibility {
    pub is_eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub user_refund_percentage: u8,
}

impl RefundEligibility {
    fn not_eligible(reason: String) -> Self {
        Self {
            is_eligible: false,
            reason: Some(reason),
            user_refund_percentage: 0,
        }
    }
}

/// Maps "days until the event" to a refund percentage. A strategy trait so
/// the business can tune tiers without touching call sites.
pub trait RefundPolicy: Send + Sync {
    fn refund_percentage(&self, days_until_event: i64) -> u8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundTier {
    /// Tier applies when at least this many days remain before the event.
    pub min_days_before: i64,
    pub percentage: u8,
}

/// Tier-table policy. Anything below the lowest tier refunds 0%.
#[derive(Debug, Clone)]
pub struct TieredRefundPolicy {
    tiers: Vec<RefundTier>,
}

impl TieredRefundPolicy {
    pub fn new(mut tiers: Vec<RefundTier>) -> Self {
        tiers.sort_by(|a, b| b.min_days_before.cmp(&a.min_days_before));
        Self { tiers }
    }

    /// Parses the `REFUND_TIERS` format: `"30:100,15:75,7:50,1:25"`.
    pub fn from_spec(spec: &str) -> Option<Self> {
        let mut tiers = Vec::new();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (days, pct) = part.split_once(':')?;
            let days: i64 = days.trim().parse().ok()?;
            let pct: u8 = pct.trim().parse().ok()?;
            if pct > 100 {
                return None;
            }
            tiers.push(RefundTier {
                min_days_before: days,
                percentage: pct,
            });
        }
        if tiers.is_empty() {
            return None;
        }
        Some(Self::new(tiers))
    }
}

impl Default for TieredRefundPolicy {
    fn default() -> Self {
        Self::new(vec![
            RefundTier { min_days_before: 30, percentage: 100 },
            RefundTier { min_days_before: 15, percentage: 75 },
            RefundTier { min_days_before: 7, percentage: 50 },
            RefundTier { min_days_before: 1, percentage: 25 },
        ])
    }
}

impl RefundPolicy for TieredRefundPolicy {
    fn refund_percentage(&self, days_until_event: i64) -> u8 {
        self.tiers
            .iter()
            .find(|t| days_until_event >= t.min_days_before)
            .map(|t| t.percentage)
            .unwrap_or(0)
    }
}

/// Decides whether a booking may be cancelled by the client right now, and
/// what fraction of the advance payment comes back.
///
/// Pure: no I/O, no clock reads. The server re-runs this before mutating
/// anything, so a stale UI snapshot can never force a cancellation through.
///
/// An event-day cancellation (zero days remaining) is still eligible, at a
/// 0% refund; eligibility and percentage are deliberately decoupled.
pub fn calculate_refund_eligibility(
    booking: &BookingRecord,
    today: NaiveDate,
    policy: &dyn RefundPolicy,
) -> RefundEligibility {
    if booking.status != BookingStatus::Confirmed {
        return RefundEligibility::not_eligible(format!(
            "only confirmed bookings can be cancelled (current status: {})",
            booking.status
        ));
    }
    if booking.advance.status != PaymentStatus::Completed {
        return RefundEligibility::not_eligible(
            "advance payment has not been completed".to_string(),
        );
    }
    if booking.final_payment.status == PaymentStatus::Completed {
        return RefundEligibility::not_eligible("booking is already fully paid".to_string());
    }
    if today > booking.final_payment.due_date {
        return RefundEligibility::not_eligible(format!(
            "the cancellation window closed on {}",
            booking.final_payment.due_date
        ));
    }

    let days_until_event = (booking.starting_date - today).num_days();
    RefundEligibility {
        is_eligible: true,
        reason: None,
        user_refund_percentage: policy.refund_percentage(days_until_event),
    }
}

/// Refund amount in minor units, rounded down. Widens through i128 so the
/// intermediate product cannot wrap for any i64 advance.
pub fn refund_amount(advance_amount: i64, percentage: u8) -> i64 {
    (i128::from(advance_amount) * i128::from(percentage) / 100) as i64
}
