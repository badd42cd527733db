use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingEventKind, BookingStatus, PaymentStatus};
use crate::policy::transition;
use crate::state::AppState;

use super::bookings::publish;

#[derive(Deserialize)]
pub struct GatewayWebhook {
    pub event: String,
    pub booking_id: String,
    pub payment_id: Option<String>,
    /// "advance" or "final"; refunds always settle against the advance.
    pub step: Option<String>,
}

fn valid_signature(secret: &str, signature: &str, body: &str) -> bool {
    let mut mac = match Hmac::<Sha1>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body.as_bytes());
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    expected == signature
}

/// Gateway notifications. Signature is HMAC-SHA1 over the raw body; an empty
/// configured secret skips verification (dev mode).
pub async fn payments_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.config.gateway_webhook_secret.is_empty() {
        let signature = headers
            .get("x-gateway-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if signature.is_empty()
            || !valid_signature(&state.config.gateway_webhook_secret, signature, &body)
        {
            tracing::warn!("rejected payment webhook with bad signature");
            return Err(AppError::Unauthorized);
        }
    }

    let payload: GatewayWebhook = serde_json::from_str(&body)
        .map_err(|e| AppError::Validation(format!("malformed webhook payload: {e}")))?;

    tracing::info!(event = %payload.event, booking_id = %payload.booking_id, "payment webhook");

    let mut booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking(&db, &payload.booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {}", payload.booking_id)))?
    };
    let now = Utc::now().naive_utc();

    match (payload.event.as_str(), payload.step.as_deref()) {
        ("payment.completed", Some("advance")) => {
            if booking.advance.status == PaymentStatus::Completed {
                // Gateways redeliver; completion is idempotent.
                return Ok(Json(serde_json::json!({ "ok": true, "duplicate": true })));
            }
            booking.advance.status = PaymentStatus::Completed;
            booking.advance.paid_at = Some(now);
            booking.advance.payment_id = payload.payment_id.clone();

            {
                let db = state.db.lock().unwrap();
                queries::update_advance_payment(&db, &booking.id, &booking.advance, now)?;
            }
            publish(&state, &booking, BookingEventKind::PaymentUpdated);

            // The cleared advance is what turns an acceptance into a
            // confirmed booking.
            if booking.status == BookingStatus::Accepted {
                booking.status = transition(booking.status, BookingStatus::Confirmed)?;
                let db = state.db.lock().unwrap();
                queries::update_booking_status(&db, &booking.id, booking.status, None, now)?;
                drop(db);
                publish(&state, &booking, BookingEventKind::StatusChanged);
            }
        }
        ("payment.completed", Some("final")) => {
            if booking.advance.status != PaymentStatus::Completed {
                return Err(AppError::Conflict(
                    "final payment cannot complete before the advance payment".to_string(),
                ));
            }
            if booking.final_payment.status == PaymentStatus::Completed {
                return Ok(Json(serde_json::json!({ "ok": true, "duplicate": true })));
            }
            booking.final_payment.status = PaymentStatus::Completed;
            booking.final_payment.paid_at = Some(now);
            booking.final_payment.payment_id = payload.payment_id.clone();

            {
                let db = state.db.lock().unwrap();
                queries::update_final_payment(&db, &booking.id, &booking.final_payment, now)?;
            }
            publish(&state, &booking, BookingEventKind::PaymentUpdated);
        }
        ("payment.failed", Some("advance")) => {
            if booking.advance.status != PaymentStatus::Completed {
                booking.advance.status = PaymentStatus::Failed;
                let db = state.db.lock().unwrap();
                queries::update_advance_payment(&db, &booking.id, &booking.advance, now)?;
                drop(db);
                publish(&state, &booking, BookingEventKind::PaymentUpdated);
            }
        }
        ("payment.failed", Some("final")) => {
            if booking.final_payment.status != PaymentStatus::Completed {
                booking.final_payment.status = PaymentStatus::Failed;
                let db = state.db.lock().unwrap();
                queries::update_final_payment(&db, &booking.id, &booking.final_payment, now)?;
                drop(db);
                publish(&state, &booking, BookingEventKind::PaymentUpdated);
            }
        }
        ("refund.processed", _) => {
            // Only a completed advance can settle as refunded; anything else
            // is a redelivery or a stray notification.
            if booking.advance.status != PaymentStatus::Completed {
                tracing::warn!(
                    booking_id = %booking.id,
                    advance_status = booking.advance.status.as_str(),
                    "ignoring refund notification for non-completed advance"
                );
                return Ok(Json(serde_json::json!({ "ok": true, "ignored": true })));
            }
            booking.advance.status = PaymentStatus::Refunded;
            booking.advance.refunded_at = Some(now);
            {
                let db = state.db.lock().unwrap();
                queries::update_advance_payment(&db, &booking.id, &booking.advance, now)?;
            }
            publish(&state, &booking, BookingEventKind::PaymentUpdated);
        }
        (event, step) => {
            tracing::warn!(event, ?step, "unrecognized payment webhook event");
            return Err(AppError::Validation(format!(
                "unrecognized webhook event: {event}"
            )));
        }
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}
