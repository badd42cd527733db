use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};

use crate::models::{
    AdvancePayment, BookingRecord, BookingStatus, FinalPayment, PaymentStatus, Role,
};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, reference_id, client_id, vendor_id, status, starting_date, \
     no_of_days, total_amount, advance_amount, advance_status, advance_due_date, \
     advance_paid_at, advance_refunded_at, advance_payment_id, final_amount, final_due_date, \
     final_status, final_paid_at, final_payment_id, reject_reason, created_at, updated_at";

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).with_context(|| format!("malformed date: {s}"))
}

fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .with_context(|| format!("malformed timestamp: {s}"))
}

fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn fmt_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

/// Stored fields are TEXT; malformed values are a programming error and fail
/// loudly here rather than leaking a half-parsed booking into the policy
/// layer.
fn row_to_booking(row: &Row<'_>) -> anyhow::Result<BookingRecord> {
    let status_str: String = row.get(4)?;
    let starting_date: String = row.get(5)?;
    let advance_status: String = row.get(9)?;
    let advance_due_date: Option<String> = row.get(10)?;
    let advance_paid_at: Option<String> = row.get(11)?;
    let advance_refunded_at: Option<String> = row.get(12)?;
    let final_due_date: String = row.get(15)?;
    let final_status: String = row.get(16)?;
    let final_paid_at: Option<String> = row.get(17)?;
    let created_at: String = row.get(20)?;
    let updated_at: String = row.get(21)?;

    Ok(BookingRecord {
        id: row.get(0)?,
        reference_id: row.get(1)?,
        client_id: row.get(2)?,
        vendor_id: row.get(3)?,
        status: BookingStatus::parse(&status_str)
            .with_context(|| format!("unknown booking status: {status_str}"))?,
        starting_date: parse_date(&starting_date)?,
        no_of_days: row.get(6)?,
        total_amount: row.get(7)?,
        advance: AdvancePayment {
            amount: row.get(8)?,
            status: PaymentStatus::parse(&advance_status)
                .with_context(|| format!("unknown payment status: {advance_status}"))?,
            due_date: advance_due_date.as_deref().map(parse_date).transpose()?,
            paid_at: advance_paid_at.as_deref().map(parse_datetime).transpose()?,
            refunded_at: advance_refunded_at
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
            payment_id: row.get(13)?,
        },
        final_payment: FinalPayment {
            amount: row.get(14)?,
            due_date: parse_date(&final_due_date)?,
            status: PaymentStatus::parse(&final_status)
                .with_context(|| format!("unknown payment status: {final_status}"))?,
            paid_at: final_paid_at.as_deref().map(parse_datetime).transpose()?,
            payment_id: row.get(18)?,
        },
        reject_reason: row.get(19)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

pub fn create_booking(conn: &Connection, booking: &BookingRecord) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, reference_id, client_id, vendor_id, status, starting_date,
            no_of_days, total_amount, advance_amount, advance_status, advance_due_date,
            advance_paid_at, advance_refunded_at, advance_payment_id, final_amount,
            final_due_date, final_status, final_paid_at, final_payment_id, reject_reason,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21, ?22)",
        params![
            booking.id,
            booking.reference_id,
            booking.client_id,
            booking.vendor_id,
            booking.status.as_str(),
            fmt_date(booking.starting_date),
            booking.no_of_days,
            booking.total_amount,
            booking.advance.amount,
            booking.advance.status.as_str(),
            booking.advance.due_date.map(fmt_date),
            booking.advance.paid_at.map(fmt_datetime),
            booking.advance.refunded_at.map(fmt_datetime),
            booking.advance.payment_id,
            booking.final_payment.amount,
            fmt_date(booking.final_payment.due_date),
            booking.final_payment.status.as_str(),
            booking.final_payment.paid_at.map(fmt_datetime),
            booking.final_payment.payment_id,
            booking.reject_reason,
            fmt_datetime(booking.created_at),
            fmt_datetime(booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingRecord>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"))?;
    let mut rows = stmt.query(params![id])?;

    match rows.next()? {
        Some(row) => Ok(Some(row_to_booking(row)?)),
        None => Ok(None),
    }
}

fn collect_bookings(
    conn: &Connection,
    sql: &str,
    bind: &[&dyn rusqlite::ToSql],
) -> anyhow::Result<Vec<BookingRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(bind)?;
    let mut bookings = Vec::new();
    while let Some(row) = rows.next()? {
        bookings.push(row_to_booking(row)?);
    }
    Ok(bookings)
}

/// Bookings belonging to one side of the marketplace, newest first.
pub fn get_bookings_for_actor(
    conn: &Connection,
    role: Role,
    actor_id: &str,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<BookingRecord>> {
    let owner_column = match role {
        Role::Client => "client_id",
        Role::Vendor => "vendor_id",
    };

    match status_filter {
        Some(status) => collect_bookings(
            conn,
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE {owner_column} = ?1 AND status = ?2
                 ORDER BY created_at DESC LIMIT ?3"
            ),
            &[&actor_id, &status, &limit],
        ),
        None => collect_bookings(
            conn,
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE {owner_column} = ?1
                 ORDER BY created_at DESC LIMIT ?2"
            ),
            &[&actor_id, &limit],
        ),
    }
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<BookingRecord>> {
    match status_filter {
        Some(status) => collect_bookings(
            conn,
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
            ),
            &[&status, &limit],
        ),
        None => collect_bookings(
            conn,
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT ?1"
            ),
            &[&limit],
        ),
    }
}

/// Non-terminal bookings the overdue/start/completion sweep cares about.
pub fn get_sweepable_bookings(conn: &Connection) -> anyhow::Result<Vec<BookingRecord>> {
    collect_bookings(
        conn,
        &format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE status IN ('confirmed', 'ongoing') ORDER BY starting_date"
        ),
        &[],
    )
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    reject_reason: Option<&str>,
    updated_at: NaiveDateTime,
) -> anyhow::Result<bool> {
    let changed = conn.execute(
        "UPDATE bookings SET status = ?1,
            reject_reason = COALESCE(?2, reject_reason),
            updated_at = ?3
         WHERE id = ?4",
        params![status.as_str(), reject_reason, fmt_datetime(updated_at), id],
    )?;
    Ok(changed > 0)
}

pub fn update_advance_payment(
    conn: &Connection,
    id: &str,
    advance: &AdvancePayment,
    updated_at: NaiveDateTime,
) -> anyhow::Result<bool> {
    let changed = conn.execute(
        "UPDATE bookings SET advance_status = ?1, advance_paid_at = ?2,
            advance_refunded_at = ?3, advance_payment_id = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            advance.status.as_str(),
            advance.paid_at.map(fmt_datetime),
            advance.refunded_at.map(fmt_datetime),
            advance.payment_id,
            fmt_datetime(updated_at),
            id,
        ],
    )?;
    Ok(changed > 0)
}

pub fn update_final_payment(
    conn: &Connection,
    id: &str,
    final_payment: &FinalPayment,
    updated_at: NaiveDateTime,
) -> anyhow::Result<bool> {
    let changed = conn.execute(
        "UPDATE bookings SET final_status = ?1, final_paid_at = ?2, final_payment_id = ?3,
            updated_at = ?4
         WHERE id = ?5",
        params![
            final_payment.status.as_str(),
            final_payment.paid_at.map(fmt_datetime),
            final_payment.payment_id,
            fmt_datetime(updated_at),
            id,
        ],
    )?;
    Ok(changed > 0)
}
