use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use gigbook::config::AppConfig;
use gigbook::db;
use gigbook::handlers;
use gigbook::policy::{RefundPolicy, TieredRefundPolicy};
use gigbook::services::payments::razorpay::RazorpayGateway;
use gigbook::services::payments::{LogOnlyGateway, PaymentGateway};
use gigbook::services::sweeper;
use gigbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let gateway: Box<dyn PaymentGateway> = match config.payment_provider.as_str() {
        "razorpay" => {
            anyhow::ensure!(
                !config.razorpay_key_id.is_empty() && !config.razorpay_key_secret.is_empty(),
                "RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET must be set when PAYMENT_PROVIDER=razorpay"
            );
            tracing::info!("using Razorpay payment gateway");
            Box::new(RazorpayGateway::new(
                config.razorpay_key_id.clone(),
                config.razorpay_key_secret.clone(),
            ))
        }
        _ => {
            tracing::info!("using log-only payment gateway (dev mode)");
            Box::new(LogOnlyGateway)
        }
    };

    let refund_policy: Box<dyn RefundPolicy> =
        match TieredRefundPolicy::from_spec(&config.refund_tiers) {
            Some(policy) => Box::new(policy),
            None => {
                tracing::warn!(
                    tiers = %config.refund_tiers,
                    "REFUND_TIERS is malformed, falling back to defaults"
                );
                Box::new(TieredRefundPolicy::default())
            }
        };

    let (events_tx, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        gateway,
        refund_policy,
        events_tx,
    });

    // Lifecycle sweep: overdue detection, event start, event completion.
    let sweep_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(sweep_state.config.sweep_interval_secs));
        loop {
            ticker.tick().await;
            let today = chrono::Utc::now().date_naive();
            let outcome = {
                let db = sweep_state.db.lock().unwrap();
                sweeper::run_sweep(&db, today)
            };
            match outcome {
                Ok(o) => tracing::debug!(
                    overdue = o.marked_overdue,
                    ongoing = o.marked_ongoing,
                    completed = o.marked_completed,
                    "lifecycle sweep finished"
                ),
                Err(e) => tracing::error!(error = %e, "lifecycle sweep failed"),
            }
        }
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/payments", post(handlers::webhook::payments_webhook))
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route("/api/bookings/events", get(handlers::events::events_stream))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/accept",
            post(handlers::bookings::accept_booking),
        )
        .route(
            "/api/bookings/:id/reject",
            post(handlers::bookings::reject_booking),
        )
        .route(
            "/api/bookings/:id/revoke",
            post(handlers::bookings::revoke_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/complete",
            post(handlers::bookings::complete_booking),
        )
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
