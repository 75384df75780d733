use crate::domain::ports::{GatewayOrder, PaymentGateway};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_CURRENCY: &str = "INR";

/// Razorpay-style sandbox gateway.
///
/// Orders are minted locally; a callback signature is the hex HMAC-SHA256 of
/// `"{order_id}|{payment_id}"` keyed with the merchant secret.
#[derive(Clone)]
pub struct HmacGateway {
    key_secret: String,
    currency: String,
}

impl HmacGateway {
    pub fn new(key_secret: impl Into<String>) -> Self {
        Self {
            key_secret: key_secret.into(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Computes the signature the provider would attach to a capture.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|_| MarketError::Gateway("Invalid gateway secret".to_string()))?;
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl PaymentGateway for HmacGateway {
    async fn create_order(&self, amount: Decimal, receipt: &str) -> Result<GatewayOrder> {
        if amount <= Decimal::ZERO {
            return Err(MarketError::Gateway(format!(
                "Order amount must be positive, got {}",
                amount
            )));
        }
        let order_id = format!("order_{}", Uuid::new_v4().simple());
        tracing::debug!(%order_id, %amount, receipt, "Gateway order created");
        Ok(GatewayOrder {
            order_id,
            amount,
            currency: self.currency.clone(),
            receipt: receipt.to_string(),
        })
    }

    async fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<bool> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|_| MarketError::Gateway("Invalid gateway secret".to_string()))?;
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        let Ok(provided) = hex::decode(signature) else {
            return Ok(false);
        };
        Ok(mac.verify_slice(&provided).is_ok())
    }
}
