use chrono::NaiveDate;

use crate::models::{BookingRecord, PaymentStatus};

/// Payment-schedule checks. Pure functions of the booking snapshot and an
/// injected "today"; due-date boundaries are inclusive, so same-day payment
/// is always permitted.

pub fn is_advance_payment_payable(booking: &BookingRecord, today: NaiveDate) -> bool {
    booking.advance.status != PaymentStatus::Completed
        && booking.advance.due_date.map_or(true, |due| today <= due)
}

pub fn is_final_payment_payable(booking: &BookingRecord, today: NaiveDate) -> bool {
    booking.advance.status == PaymentStatus::Completed
        && booking.final_payment.status != PaymentStatus::Completed
        && today <= booking.final_payment.due_date
}

pub fn is_final_payment_overdue(booking: &BookingRecord, today: NaiveDate) -> bool {
    booking.advance.status == PaymentStatus::Completed
        && booking.final_payment.status != PaymentStatus::Completed
        && today > booking.final_payment.due_date
}
