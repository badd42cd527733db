use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::BookingStatus;
use crate::policy::{schedule, transitions};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub marked_overdue: usize,
    pub marked_ongoing: usize,
    pub marked_completed: usize,
}

/// One pass of the scheduled lifecycle job over confirmed/ongoing bookings.
///
/// Overdue detection wins over starting the event: a booking whose final
/// payment lapsed does not go ongoing. Date edges are calendar-day granular,
/// matching the payment schedule: due dates are inclusive (overdue starts the
/// day after), the starting date flips confirmed bookings to ongoing, and
/// completion happens the day after the event window ends.
pub fn run_sweep(conn: &Connection, today: NaiveDate) -> anyhow::Result<SweepOutcome> {
    let mut outcome = SweepOutcome::default();
    let now = chrono::Utc::now().naive_utc();

    for booking in queries::get_sweepable_bookings(conn)? {
        let next = if schedule::is_final_payment_overdue(&booking, today) {
            BookingStatus::Overdue
        } else if booking.status == BookingStatus::Confirmed && today >= booking.starting_date {
            BookingStatus::Ongoing
        } else if booking.status == BookingStatus::Ongoing && today > booking.end_date() {
            BookingStatus::Completed
        } else {
            continue;
        };

        if let Err(e) = transitions::transition(booking.status, next) {
            tracing::warn!(booking_id = %booking.id, error = %e, "sweep skipped booking");
            continue;
        }

        queries::update_booking_status(conn, &booking.id, next, None, now)?;
        tracing::info!(booking_id = %booking.id, from = %booking.status, to = %next, "sweep moved booking");

        match next {
            BookingStatus::Overdue => outcome.marked_overdue += 1,
            BookingStatus::Ongoing => outcome.marked_ongoing += 1,
            BookingStatus::Completed => outcome.marked_completed += 1,
            _ => {}
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{
        AdvancePayment, BookingRecord, FinalPayment, PaymentStatus,
    };
    use chrono::NaiveDateTime;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn insert_booking(
        conn: &Connection,
        id: &str,
        status: BookingStatus,
        starting: &str,
        no_of_days: i32,
        final_status: PaymentStatus,
        final_due: &str,
    ) {
        let now =
            NaiveDateTime::parse_from_str("2025-05-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let booking = BookingRecord {
            id: id.to_string(),
            reference_id: format!("GB-{id}"),
            client_id: "c-1".to_string(),
            vendor_id: "v-1".to_string(),
            status,
            starting_date: date(starting),
            no_of_days,
            total_amount: 100_000,
            advance: AdvancePayment {
                amount: 30_000,
                status: PaymentStatus::Completed,
                due_date: None,
                paid_at: Some(now),
                refunded_at: None,
                payment_id: Some(format!("pay_{id}")),
            },
            final_payment: FinalPayment {
                amount: 70_000,
                due_date: date(final_due),
                status: final_status,
                paid_at: None,
                payment_id: None,
            },
            reject_reason: None,
            created_at: now,
            updated_at: now,
        };
        queries::create_booking(conn, &booking).unwrap();
    }

    fn status_of(conn: &Connection, id: &str) -> BookingStatus {
        queries::get_booking(conn, id).unwrap().unwrap().status
    }

    #[test]
    fn confirmed_goes_overdue_day_after_final_due() {
        let conn = setup_db();
        insert_booking(
            &conn, "b-1", BookingStatus::Confirmed, "2025-08-01", 1,
            PaymentStatus::Pending, "2025-07-20",
        );

        // On the due date itself nothing happens.
        let outcome = run_sweep(&conn, date("2025-07-20")).unwrap();
        assert_eq!(outcome, SweepOutcome::default());
        assert_eq!(status_of(&conn, "b-1"), BookingStatus::Confirmed);

        let outcome = run_sweep(&conn, date("2025-07-21")).unwrap();
        assert_eq!(outcome.marked_overdue, 1);
        assert_eq!(status_of(&conn, "b-1"), BookingStatus::Overdue);
    }

    #[test]
    fn confirmed_goes_ongoing_on_starting_date() {
        let conn = setup_db();
        insert_booking(
            &conn, "b-1", BookingStatus::Confirmed, "2025-08-01", 2,
            PaymentStatus::Completed, "2025-07-20",
        );

        let outcome = run_sweep(&conn, date("2025-07-31")).unwrap();
        assert_eq!(outcome.marked_ongoing, 0);

        let outcome = run_sweep(&conn, date("2025-08-01")).unwrap();
        assert_eq!(outcome.marked_ongoing, 1);
        assert_eq!(status_of(&conn, "b-1"), BookingStatus::Ongoing);
    }

    #[test]
    fn overdue_wins_over_ongoing() {
        let conn = setup_db();
        // Final unpaid and due before the event; by the starting date the
        // booking must be flagged overdue, not started.
        insert_booking(
            &conn, "b-1", BookingStatus::Confirmed, "2025-08-01", 1,
            PaymentStatus::Pending, "2025-07-20",
        );

        let outcome = run_sweep(&conn, date("2025-08-01")).unwrap();
        assert_eq!(outcome.marked_overdue, 1);
        assert_eq!(outcome.marked_ongoing, 0);
        assert_eq!(status_of(&conn, "b-1"), BookingStatus::Overdue);
    }

    #[test]
    fn ongoing_completes_after_event_window() {
        let conn = setup_db();
        insert_booking(
            &conn, "b-1", BookingStatus::Ongoing, "2025-08-01", 3,
            PaymentStatus::Completed, "2025-07-20",
        );

        // Event runs Aug 1-3; still ongoing on the last day.
        let outcome = run_sweep(&conn, date("2025-08-03")).unwrap();
        assert_eq!(outcome.marked_completed, 0);

        let outcome = run_sweep(&conn, date("2025-08-04")).unwrap();
        assert_eq!(outcome.marked_completed, 1);
        assert_eq!(status_of(&conn, "b-1"), BookingStatus::Completed);
    }

    #[test]
    fn terminal_and_early_statuses_untouched() {
        let conn = setup_db();
        insert_booking(
            &conn, "b-1", BookingStatus::Requested, "2025-08-01", 1,
            PaymentStatus::Pending, "2025-07-20",
        );
        insert_booking(
            &conn, "b-2", BookingStatus::Cancelled, "2025-08-01", 1,
            PaymentStatus::Pending, "2025-07-20",
        );

        let outcome = run_sweep(&conn, date("2025-09-01")).unwrap();
        assert_eq!(outcome, SweepOutcome::default());
        assert_eq!(status_of(&conn, "b-1"), BookingStatus::Requested);
        assert_eq!(status_of(&conn, "b-2"), BookingStatus::Cancelled);
    }

    #[test]
    fn sweep_is_idempotent_within_a_day() {
        let conn = setup_db();
        insert_booking(
            &conn, "b-1", BookingStatus::Confirmed, "2025-08-01", 1,
            PaymentStatus::Pending, "2025-07-20",
        );

        let first = run_sweep(&conn, date("2025-07-25")).unwrap();
        assert_eq!(first.marked_overdue, 1);
        let second = run_sweep(&conn, date("2025-07-25")).unwrap();
        assert_eq!(second, SweepOutcome::default());
    }
}
