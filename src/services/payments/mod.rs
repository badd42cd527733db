pub mod razorpay;

use async_trait::async_trait;

/// Outbound refund boundary. Settlement is asynchronous: the gateway accepts
/// the instruction here and reports completion later through the webhook.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_refund(
        &self,
        payment_id: &str,
        amount: i64,
        note: &str,
    ) -> anyhow::Result<()>;
}

/// Dev-mode gateway: logs the instruction and does nothing else.
pub struct LogOnlyGateway;

#[async_trait]
impl PaymentGateway for LogOnlyGateway {
    async fn create_refund(
        &self,
        payment_id: &str,
        amount: i64,
        note: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(payment_id, amount, note, "refund requested (log-only gateway)");
        Ok(())
    }
}
