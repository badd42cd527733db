use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{BookingRecord, BookingStatus, Role};
use crate::policy::refund::{calculate_refund_eligibility, RefundPolicy};
use crate::policy::schedule;

/// Facade answering the portal's button queries for one booking snapshot,
/// one acting role and one day. Everything underneath is pure, so the gate
/// is too.
pub struct ActionGate<'a> {
    booking: &'a BookingRecord,
    role: Role,
    today: NaiveDate,
    refund_policy: &'a dyn RefundPolicy,
}

/// Serialized alongside booking detail responses so the UI never derives
/// button state on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingActions {
    pub can_pay_advance: bool,
    pub can_pay_final: bool,
    pub can_cancel: bool,
    pub can_revoke: bool,
    pub can_accept_or_reject: bool,
    pub can_confirm_completion: bool,
}

impl<'a> ActionGate<'a> {
    pub fn new(
        booking: &'a BookingRecord,
        role: Role,
        today: NaiveDate,
        refund_policy: &'a dyn RefundPolicy,
    ) -> Self {
        Self {
            booking,
            role,
            today,
            refund_policy,
        }
    }

    /// Advance is collectable once the vendor has accepted.
    pub fn can_pay_advance(&self) -> bool {
        self.role == Role::Client
            && self.booking.status == BookingStatus::Accepted
            && schedule::is_advance_payment_payable(self.booking, self.today)
    }

    pub fn can_pay_final(&self) -> bool {
        self.role == Role::Client
            && self.booking.status == BookingStatus::Confirmed
            && schedule::is_final_payment_payable(self.booking, self.today)
    }

    pub fn can_cancel(&self) -> bool {
        self.role == Role::Client
            && calculate_refund_eligibility(self.booking, self.today, self.refund_policy)
                .is_eligible
    }

    pub fn can_revoke(&self) -> bool {
        self.role == Role::Client && self.booking.status == BookingStatus::Requested
    }

    pub fn can_accept_or_reject(&self) -> bool {
        self.role == Role::Vendor && self.booking.status == BookingStatus::Requested
    }

    pub fn can_confirm_completion(&self) -> bool {
        self.role == Role::Vendor && self.booking.status == BookingStatus::Ongoing
    }

    pub fn actions(&self) -> BookingActions {
        BookingActions {
            can_pay_advance: self.can_pay_advance(),
            can_pay_final: self.can_pay_final(),
            can_cancel: self.can_cancel(),
            can_revoke: self.can_revoke(),
            can_accept_or_reject: self.can_accept_or_reject(),
            can_confirm_completion: self.can_confirm_completion(),
        }
    }
}
