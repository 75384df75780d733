use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },
    #[error("Payment verification failed")]
    PaymentVerificationFailed,
    #[error("Invalid interval: start must be before end")]
    InvalidInterval,
    #[error("Pricing not configured for service {0}")]
    PricingNotConfigured(uuid::Uuid),
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, MarketError>;

impl MarketError {
    pub fn status_code(&self) -> u16 {
        match self {
            MarketError::ValidationError(_)
            | MarketError::InvalidInterval
            | MarketError::InsufficientFunds { .. }
            | MarketError::PaymentVerificationFailed
            | MarketError::PricingNotConfigured(_)
            | MarketError::InvalidStatus(_)
            | MarketError::JsonError(_) => 400,
            MarketError::Unauthorized(_) => 401,
            MarketError::Forbidden(_) => 403,
            MarketError::NotFound(_) => 404,
            MarketError::Conflict(_) => 409,
            MarketError::Gateway(_) => 502,
            _ => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MarketError::ValidationError(_) | MarketError::JsonError(_) => "VALIDATION_ERROR",
            MarketError::NotFound(_) => "NOT_FOUND",
            MarketError::Unauthorized(_) => "UNAUTHORIZED",
            MarketError::Forbidden(_) => "FORBIDDEN",
            MarketError::Conflict(_) => "CONFLICT",
            MarketError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            MarketError::PaymentVerificationFailed => "PAYMENT_VERIFICATION_FAILED",
            MarketError::InvalidInterval => "INVALID_INTERVAL",
            MarketError::PricingNotConfigured(_) => "PRICING_NOT_CONFIGURED",
            MarketError::InvalidStatus(_) => "INVALID_STATUS",
            MarketError::Gateway(_) => "GATEWAY_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is a business-rule rejection rather than a fault.
    pub fn is_business(&self) -> bool {
        self.status_code() < 500
    }

    /// Message safe to hand to a caller. Faults hide their detail in production.
    pub fn public_message(&self, production: bool) -> String {
        if production && !self.is_business() {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        }
    }

    pub(crate) fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        MarketError::InternalError(format!("{}: {}", context, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(MarketError::ValidationError("x".into()).status_code(), 400);
        assert_eq!(MarketError::NotFound("x".into()).status_code(), 404);
        assert_eq!(MarketError::Conflict("x".into()).status_code(), 409);
        assert_eq!(
            MarketError::InsufficientFunds {
                requested: dec!(5),
                available: dec!(4)
            }
            .status_code(),
            400
        );
        assert_eq!(MarketError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(MarketError::InternalError("x".into()).status_code(), 500);
    }

    #[test]
    fn test_public_message_hides_internal_detail_in_production() {
        let err = MarketError::InternalError("disk on fire".into());
        assert_eq!(err.public_message(true), "An unexpected error occurred");
        assert!(err.public_message(false).contains("disk on fire"));

        let business = MarketError::Conflict("slot taken".into());
        assert!(business.public_message(true).contains("slot taken"));
    }
}
