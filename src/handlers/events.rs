use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::errors::AppError;
use crate::state::AppState;

use super::admin::check_auth;

// GET /api/bookings/events
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let rx = state.events_tx.subscribe();
    let stream = BroadcastStream::new(rx)
        // Lagged receivers drop missed events; dashboards refetch on demand.
        .filter_map(|ev| ev.ok())
        .map(|ev| {
            let data = serde_json::to_string(&ev).unwrap_or_else(|_| "{}".to_string());
            Ok(Event::default().event("booking").data(data))
        });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
