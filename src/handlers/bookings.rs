use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    AdvancePayment, BookingEvent, BookingEventKind, BookingRecord, BookingStatus, FinalPayment,
    PaymentStatus, Role,
};
use crate::policy::{
    calculate_refund_eligibility, refund_amount, transition, ActionGate, BookingActions,
    RefundEligibility,
};
use crate::state::AppState;

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Upper bound on request amounts, in minor units. Generous for any real
/// booking while keeping derived arithmetic far from i64 overflow.
const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Identity forwarded by the upstream auth gateway. Session issuance and
/// verification live there; we only read the result.
pub struct Actor {
    pub id: String,
    pub role: Role,
}

fn extract_actor(headers: &HeaderMap) -> Result<Actor, AppError> {
    let id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_string();
    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse);

    match (id.is_empty(), role) {
        (false, Some(role)) => Ok(Actor { id, role }),
        _ => Err(AppError::Unauthorized),
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_date_field(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, DATE_FMT)
        .map_err(|_| AppError::Validation(format!("{field} must be a YYYY-MM-DD date")))
}

fn load_booking(state: &AppState, id: &str) -> Result<BookingRecord, AppError> {
    let db = state.db.lock().unwrap();
    queries::get_booking(&db, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

/// The acting party must be on the booking; clients own client actions,
/// vendors own vendor actions.
fn require_party(booking: &BookingRecord, actor: &Actor, role: Role) -> Result<(), AppError> {
    let owner = match role {
        Role::Client => &booking.client_id,
        Role::Vendor => &booking.vendor_id,
    };
    if actor.role != role || actor.id != *owner {
        return Err(AppError::Forbidden(format!(
            "only the booking's {} may perform this action",
            role.as_str()
        )));
    }
    Ok(())
}

pub(crate) fn publish(state: &AppState, booking: &BookingRecord, kind: BookingEventKind) {
    let _ = state.events_tx.send(BookingEvent {
        booking_id: booking.id.clone(),
        reference_id: booking.reference_id.clone(),
        kind,
        status: booking.status,
        at: Utc::now().naive_utc(),
    });
}

// ── Response shapes ──

#[derive(Serialize)]
pub struct PaymentView {
    amount: i64,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paid_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refunded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_id: Option<String>,
}

#[derive(Serialize)]
pub struct BookingView {
    id: String,
    reference_id: String,
    client_id: String,
    vendor_id: String,
    status: String,
    starting_date: String,
    no_of_days: i32,
    total_amount: i64,
    advance_payment: PaymentView,
    final_payment: PaymentView,
    #[serde(skip_serializing_if = "Option::is_none")]
    reject_reason: Option<String>,
    created_at: String,
    updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    actions: Option<BookingActions>,
}

fn fmt_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

pub(crate) fn booking_view(booking: BookingRecord, actions: Option<BookingActions>) -> BookingView {
    BookingView {
        id: booking.id,
        reference_id: booking.reference_id,
        client_id: booking.client_id,
        vendor_id: booking.vendor_id,
        status: booking.status.as_str().to_string(),
        starting_date: booking.starting_date.format(DATE_FMT).to_string(),
        no_of_days: booking.no_of_days,
        total_amount: booking.total_amount,
        advance_payment: PaymentView {
            amount: booking.advance.amount,
            status: booking.advance.status.as_str().to_string(),
            due_date: booking.advance.due_date.map(|d| d.format(DATE_FMT).to_string()),
            paid_at: booking.advance.paid_at.map(fmt_datetime),
            refunded_at: booking.advance.refunded_at.map(fmt_datetime),
            payment_id: booking.advance.payment_id,
        },
        final_payment: PaymentView {
            amount: booking.final_payment.amount,
            status: booking.final_payment.status.as_str().to_string(),
            due_date: Some(booking.final_payment.due_date.format(DATE_FMT).to_string()),
            paid_at: booking.final_payment.paid_at.map(fmt_datetime),
            refunded_at: None,
            payment_id: booking.final_payment.payment_id,
        },
        reject_reason: booking.reject_reason,
        created_at: fmt_datetime(booking.created_at),
        updated_at: fmt_datetime(booking.updated_at),
        actions,
    }
}

// ── POST /api/bookings ──

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub vendor_id: String,
    pub starting_date: String,
    pub no_of_days: i32,
    pub total_amount: i64,
    pub advance_amount: i64,
    pub advance_due_date: Option<String>,
    pub final_due_date: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingView>, AppError> {
    let actor = extract_actor(&headers)?;
    if actor.role != Role::Client {
        return Err(AppError::Forbidden(
            "only clients may request bookings".to_string(),
        ));
    }
    if req.vendor_id.trim().is_empty() {
        return Err(AppError::Validation("vendorId is required".to_string()));
    }

    // Amounts are attacker-controlled; bound them before any arithmetic so
    // deriving the final share cannot overflow.
    if req.total_amount <= 0 || req.total_amount > MAX_AMOUNT {
        return Err(AppError::Validation(format!(
            "totalAmount must be between 1 and {MAX_AMOUNT}"
        )));
    }
    if req.advance_amount <= 0 || req.advance_amount >= req.total_amount {
        return Err(AppError::Validation(
            "advance amount must be between 0 and the total amount".to_string(),
        ));
    }

    let starting_date = parse_date_field(&req.starting_date, "startingDate")?;
    let final_due_date = parse_date_field(&req.final_due_date, "finalPayment.dueDate")?;
    let advance_due_date = req
        .advance_due_date
        .as_deref()
        .map(|v| parse_date_field(v, "advancePayment.dueDate"))
        .transpose()?;

    let now = Utc::now().naive_utc();
    let id = Uuid::new_v4().to_string();
    let reference_id = format!(
        "GB-{}",
        &id.replace('-', "").to_uppercase()[..8]
    );

    let booking = BookingRecord {
        id,
        reference_id,
        client_id: actor.id,
        vendor_id: req.vendor_id.trim().to_string(),
        status: BookingStatus::Requested,
        starting_date,
        no_of_days: req.no_of_days,
        total_amount: req.total_amount,
        advance: AdvancePayment {
            amount: req.advance_amount,
            status: PaymentStatus::Pending,
            due_date: advance_due_date,
            paid_at: None,
            refunded_at: None,
            payment_id: None,
        },
        final_payment: FinalPayment {
            // Derived, so the advance + final == total invariant holds by
            // construction.
            amount: req.total_amount - req.advance_amount,
            due_date: final_due_date,
            status: PaymentStatus::Pending,
            paid_at: None,
            payment_id: None,
        },
        reject_reason: None,
        created_at: now,
        updated_at: now,
    };

    booking.validate().map_err(AppError::Validation)?;

    {
        let db = state.db.lock().unwrap();
        queries::create_booking(&db, &booking)?;
    }

    tracing::info!(booking_id = %booking.id, client = %booking.client_id, vendor = %booking.vendor_id, "booking requested");
    publish(&state, &booking, BookingEventKind::StatusChanged);
    Ok(Json(booking_view(booking, None)))
}

// ── GET /api/bookings ──

#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let actor = extract_actor(&headers)?;
    let limit = query.limit.unwrap_or(50);

    if let Some(status) = query.status.as_deref() {
        if BookingStatus::parse(status).is_none() {
            return Err(AppError::Validation(format!("unknown status: {status}")));
        }
    }

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_actor(
            &db,
            actor.role,
            &actor.id,
            query.status.as_deref(),
            limit,
        )?
    };

    Ok(Json(
        bookings.into_iter().map(|b| booking_view(b, None)).collect(),
    ))
}

// ── GET /api/bookings/:id ──

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingView>, AppError> {
    let actor = extract_actor(&headers)?;
    let booking = load_booking(&state, &id)?;

    let is_party = match actor.role {
        Role::Client => booking.client_id == actor.id,
        Role::Vendor => booking.vendor_id == actor.id,
    };
    if !is_party {
        return Err(AppError::Forbidden(
            "booking belongs to another account".to_string(),
        ));
    }

    let actions = ActionGate::new(&booking, actor.role, today(), state.refund_policy.as_ref())
        .actions();
    Ok(Json(booking_view(booking, Some(actions))))
}

// ── POST /api/bookings/:id/accept ──

pub async fn accept_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = extract_actor(&headers)?;
    let mut booking = load_booking(&state, &id)?;
    require_party(&booking, &actor, Role::Vendor)?;

    booking.status = transition(booking.status, BookingStatus::Accepted)?;
    {
        let db = state.db.lock().unwrap();
        queries::update_booking_status(&db, &id, booking.status, None, Utc::now().naive_utc())?;
    }

    tracing::info!(booking_id = %id, "booking accepted");
    publish(&state, &booking, BookingEventKind::StatusChanged);
    Ok(Json(serde_json::json!({ "ok": true, "status": "accepted" })))
}

// ── POST /api/bookings/:id/reject ──

#[derive(Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = extract_actor(&headers)?;

    let reason = req.reason.trim();
    if reason.chars().count() < 10 {
        return Err(AppError::Validation(
            "rejection reason must be at least 10 characters".to_string(),
        ));
    }

    let mut booking = load_booking(&state, &id)?;
    require_party(&booking, &actor, Role::Vendor)?;

    booking.status = transition(booking.status, BookingStatus::Rejected)?;
    {
        let db = state.db.lock().unwrap();
        queries::update_booking_status(
            &db,
            &id,
            booking.status,
            Some(reason),
            Utc::now().naive_utc(),
        )?;
    }

    tracing::info!(booking_id = %id, "booking rejected");
    publish(&state, &booking, BookingEventKind::StatusChanged);
    Ok(Json(serde_json::json!({ "ok": true, "status": "rejected" })))
}

// ── POST /api/bookings/:id/revoke ──

pub async fn revoke_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = extract_actor(&headers)?;
    let mut booking = load_booking(&state, &id)?;
    require_party(&booking, &actor, Role::Client)?;

    booking.status = transition(booking.status, BookingStatus::Revoked)?;
    {
        let db = state.db.lock().unwrap();
        queries::update_booking_status(&db, &id, booking.status, None, Utc::now().naive_utc())?;
    }

    tracing::info!(booking_id = %id, "booking revoked");
    publish(&state, &booking, BookingEventKind::StatusChanged);
    Ok(Json(serde_json::json!({ "ok": true, "status": "revoked" })))
}

// ── POST /api/bookings/:id/cancel ──

#[derive(Serialize)]
pub struct CancelResponse {
    pub ok: bool,
    pub status: String,
    pub refund: RefundEligibility,
    pub refund_amount: i64,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let actor = extract_actor(&headers)?;
    let mut booking = load_booking(&state, &id)?;
    require_party(&booking, &actor, Role::Client)?;

    // The portal computed eligibility for its buttons already; recompute
    // here because the snapshot it saw may be stale.
    let eligibility =
        calculate_refund_eligibility(&booking, today(), state.refund_policy.as_ref());
    if !eligibility.is_eligible {
        let reason = eligibility
            .reason
            .unwrap_or_else(|| "booking is not eligible for cancellation".to_string());
        return Err(AppError::Conflict(reason));
    }

    booking.status = transition(booking.status, BookingStatus::Cancelled)?;

    let amount = refund_amount(booking.advance.amount, eligibility.user_refund_percentage);
    if amount > 0 {
        match booking.advance.payment_id.as_deref() {
            Some(payment_id) => {
                // Refund instruction goes out before the status flips; the
                // gateway confirms settlement later via webhook.
                state
                    .gateway
                    .create_refund(
                        payment_id,
                        amount,
                        &format!("cancellation of booking {}", booking.reference_id),
                    )
                    .await
                    .map_err(|e| AppError::Gateway(e.to_string()))?;
            }
            None => {
                return Err(AppError::Conflict(
                    "advance payment has no gateway reference to refund".to_string(),
                ));
            }
        }
    }

    {
        let db = state.db.lock().unwrap();
        queries::update_booking_status(&db, &id, booking.status, None, Utc::now().naive_utc())?;
    }

    tracing::info!(
        booking_id = %id,
        refund_percentage = eligibility.user_refund_percentage,
        refund_amount = amount,
        "booking cancelled"
    );
    publish(&state, &booking, BookingEventKind::StatusChanged);

    Ok(Json(CancelResponse {
        ok: true,
        status: booking.status.as_str().to_string(),
        refund: eligibility,
        refund_amount: amount,
    }))
}

// ── POST /api/bookings/:id/complete ──

pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = extract_actor(&headers)?;
    let mut booking = load_booking(&state, &id)?;
    require_party(&booking, &actor, Role::Vendor)?;

    booking.status = transition(booking.status, BookingStatus::Completed)?;
    {
        let db = state.db.lock().unwrap();
        queries::update_booking_status(&db, &id, booking.status, None, Utc::now().naive_utc())?;
    }

    tracing::info!(booking_id = %id, "booking completed by vendor");
    publish(&state, &booking, BookingEventKind::StatusChanged);
    Ok(Json(serde_json::json!({ "ok": true, "status": "completed" })))
}
