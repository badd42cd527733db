use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Snapshot of a booking's commercial state. Amounts are in currency minor
/// units; dates are calendar-day granular.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub reference_id: String,
    pub client_id: String,
    pub vendor_id: String,
    pub status: BookingStatus,
    pub starting_date: NaiveDate,
    pub no_of_days: i32,
    pub total_amount: i64,
    pub advance: AdvancePayment,
    pub final_payment: FinalPayment,
    pub reject_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BookingRecord {
    /// Last day of the event window. A one-day booking ends on its starting date.
    pub fn end_date(&self) -> NaiveDate {
        let extra = self.no_of_days.saturating_sub(1).max(0) as u64;
        self.starting_date
            .checked_add_days(Days::new(extra))
            .unwrap_or(self.starting_date)
    }

    /// Creation-time consistency checks. The final amount is derived from
    /// total minus advance, so the split invariant holds by construction;
    /// this guards the inputs that derivation relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.no_of_days < 1 {
            return Err("noOfDays must be at least 1".to_string());
        }
        if self.total_amount <= 0 {
            return Err("totalAmount must be positive".to_string());
        }
        if self.advance.amount <= 0 || self.advance.amount >= self.total_amount {
            return Err("advance amount must be between 0 and the total amount".to_string());
        }
        if self.advance.amount + self.final_payment.amount != self.total_amount {
            return Err("advance and final amounts must sum to the total".to_string());
        }
        if self.final_payment.due_date > self.starting_date {
            return Err("final payment due date must not fall after the starting date".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Requested,
    Accepted,
    Rejected,
    Revoked,
    Overdue,
    Confirmed,
    Ongoing,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 9] = [
        BookingStatus::Requested,
        BookingStatus::Accepted,
        BookingStatus::Rejected,
        BookingStatus::Revoked,
        BookingStatus::Overdue,
        BookingStatus::Confirmed,
        BookingStatus::Ongoing,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Revoked => "revoked",
            BookingStatus::Overdue => "overdue",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Ongoing => "ongoing",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected
                | BookingStatus::Revoked
                | BookingStatus::Completed
                | BookingStatus::Cancelled
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// First partial payment securing a booking after vendor acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancePayment {
    pub amount: i64,
    pub status: PaymentStatus,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<NaiveDateTime>,
    pub refunded_at: Option<NaiveDateTime>,
    pub payment_id: Option<String>,
}

/// Remaining balance, due on or before the event date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalPayment {
    pub amount: i64,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub paid_at: Option<NaiveDateTime>,
    pub payment_id: Option<String>,
}

/// Which side of the marketplace the acting user is on. Session issuance is
/// handled upstream; handlers only see the forwarded identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Vendor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Vendor => "vendor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Role::Client),
            "vendor" => Some(Role::Vendor),
            _ => None,
        }
    }
}
