use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub payment_provider: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub gateway_webhook_secret: String,
    pub refund_tiers: String,
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "gigbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            payment_provider: env::var("PAYMENT_PROVIDER").unwrap_or_else(|_| "log".to_string()),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            gateway_webhook_secret: env::var("GATEWAY_WEBHOOK_SECRET").unwrap_or_default(),
            refund_tiers: env::var("REFUND_TIERS")
                .unwrap_or_else(|_| "30:100,15:75,7:50,1:25".to_string()),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }
}
