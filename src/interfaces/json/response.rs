use crate::error::MarketError;
use serde::Serialize;
use serde_json::Value;

/// One output line per command, shaped like the HTTP API's bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success {
        success: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Failure {
        success: bool,
        message: String,
        code: &'static str,
        status: u16,
    },
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Option<Value>) -> Self {
        Envelope::Success {
            success: true,
            message: message.into(),
            data,
        }
    }

    /// Error envelope. In production, faults carry a generic message and the
    /// detail goes to the log only.
    pub fn failure(err: &MarketError, production: bool) -> Self {
        if !err.is_business() {
            tracing::error!(error = %err, "command failed");
        }
        Envelope::Failure {
            success: false,
            message: err.public_message(production),
            code: err.code(),
            status: err.status_code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Envelope::Success { data, .. } => data.as_ref(),
            Envelope::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_omits_missing_data() {
        let env = Envelope::success("Block deleted", None);
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"success": true, "message": "Block deleted"})
        );
    }

    #[test]
    fn test_failure_carries_code_and_status() {
        let env = Envelope::failure(&MarketError::Conflict("slot taken".into()), true);
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({
                "success": false,
                "message": "Conflict: slot taken",
                "code": "CONFLICT",
                "status": 409
            })
        );
    }

    #[test]
    fn test_production_hides_fault_detail() {
        let env = Envelope::failure(&MarketError::InternalError("db gone".into()), true);
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["message"], "An unexpected error occurred");
        assert_eq!(value["status"], 500);
    }
}
