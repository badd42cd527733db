use anyhow::Context;
use async_trait::async_trait;

use super::PaymentGateway;

pub struct RazorpayGateway {
    key_id: String,
    key_secret: String,
    client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self {
            key_id,
            key_secret,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_refund(
        &self,
        payment_id: &str,
        amount: i64,
        note: &str,
    ) -> anyhow::Result<()> {
        let url = format!("https://api.razorpay.com/v1/payments/{payment_id}/refund");

        self.client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": amount,
                "notes": { "reason": note },
            }))
            .send()
            .await
            .context("failed to reach Razorpay")?
            .error_for_status()
            .context("Razorpay refund API returned error")?;

        Ok(())
    }
}
