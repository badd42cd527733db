use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::booking::BookingStatus;

/// Pushed over the broadcast channel whenever a booking changes, so portal
/// dashboards can refresh without polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    pub booking_id: String,
    pub reference_id: String,
    pub kind: BookingEventKind,
    pub status: BookingStatus,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    StatusChanged,
    PaymentUpdated,
}
