use super::money::Amount;
use super::wallet::Owner;
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    #[default]
    Pending,
    Rejected,
    Processed,
}

/// Payout destination captured at request time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_holder: Option<String>,
    pub account_number: Option<String>,
    pub bank_name: Option<String>,
    pub ifsc_code: Option<String>,
    pub upi_id: Option<String>,
}

impl BankDetails {
    pub fn is_empty(&self) -> bool {
        self.account_number.is_none() && self.upi_id.is_none()
    }

    /// Either a complete bank account or a UPI id.
    pub fn is_complete(&self) -> bool {
        let filled = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());
        let account = filled(&self.account_holder)
            && filled(&self.account_number)
            && filled(&self.bank_name)
            && filled(&self.ifsc_code);
        account || filled(&self.upi_id)
    }
}

/// Payout destination kept on file by a wallet owner. At most one entry per
/// owner is primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedBankDetails {
    pub id: Uuid,
    pub owner: Owner,
    #[serde(flatten)]
    pub details: BankDetails,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedBankDetails {
    pub fn new(owner: Owner, details: BankDetails, is_primary: bool, now: DateTime<Utc>) -> Result<Self, MarketError> {
        if !details.is_complete() {
            return Err(MarketError::ValidationError(
                "Provide either full bank account details or a UPI id".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            owner,
            details,
            is_primary,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial edit of saved bank details. Absent fields keep their value.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BankDetailsPatch {
    #[serde(flatten)]
    pub details: BankDetails,
    #[serde(default)]
    pub is_primary: Option<bool>,
}

impl SavedBankDetails {
    pub fn apply(&mut self, patch: BankDetailsPatch, now: DateTime<Utc>) -> Result<(), MarketError> {
        let BankDetails {
            account_holder,
            account_number,
            bank_name,
            ifsc_code,
            upi_id,
        } = patch.details;
        let current = &self.details;
        let merged = BankDetails {
            account_holder: account_holder.or_else(|| current.account_holder.clone()),
            account_number: account_number.or_else(|| current.account_number.clone()),
            bank_name: bank_name.or_else(|| current.bank_name.clone()),
            ifsc_code: ifsc_code.or_else(|| current.ifsc_code.clone()),
            upi_id: upi_id.or_else(|| current.upi_id.clone()),
        };
        if !merged.is_complete() {
            return Err(MarketError::ValidationError(
                "Provide either full bank account details or a UPI id".to_string(),
            ));
        }
        self.details = merged;
        if let Some(primary) = patch.is_primary {
            self.is_primary = primary;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub owner: Owner,
    pub amount: Amount,
    pub status: WithdrawalStatus,
    pub bank_details: BankDetails,
    pub admin_note: Option<String>,
    pub transaction_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin verdict on a pending withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum WithdrawalDecision {
    Processed { note: Option<String> },
    Rejected { note: String },
}

impl WithdrawalDecision {
    pub fn status(&self) -> WithdrawalStatus {
        match self {
            WithdrawalDecision::Processed { .. } => WithdrawalStatus::Processed,
            WithdrawalDecision::Rejected { .. } => WithdrawalStatus::Rejected,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            WithdrawalDecision::Processed { note } => note.as_deref(),
            WithdrawalDecision::Rejected { note } => Some(note.as_str()),
        }
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if let WithdrawalDecision::Rejected { note } = self
            && note.trim().is_empty()
        {
            return Err(MarketError::ValidationError(
                "A rejection requires an admin note".to_string(),
            ));
        }
        Ok(())
    }
}

impl WithdrawalRequest {
    /// Moves a pending request into its terminal state.
    pub fn decide(&mut self, decision: &WithdrawalDecision, now: DateTime<Utc>) -> Result<(), MarketError> {
        decision.validate()?;
        if self.status != WithdrawalStatus::Pending {
            return Err(MarketError::InvalidStatus(format!(
                "Withdrawal {} is already {:?}",
                self.id, self.status
            )));
        }
        self.status = decision.status();
        self.admin_note = decision.note().map(str::to_string);
        self.updated_at = now;
        Ok(())
    }
}
