use super::money::{Amount, Balance, percentage_of};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who a wallet belongs to. One ledger code path serves every payout target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Owner {
    Artist(Uuid),
    Planner(Uuid),
}

impl Owner {
    pub fn id(&self) -> Uuid {
        match self {
            Owner::Artist(id) | Owner::Planner(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Owner::Artist(_) => "artist",
            Owner::Planner(_) => "planner",
        }
    }

    /// Stable byte key: one discriminant byte followed by the UUID.
    pub fn key(&self) -> [u8; 17] {
        let mut key = [0u8; 17];
        key[0] = match self {
            Owner::Artist(_) => 1,
            Owner::Planner(_) => 2,
        };
        key[1..].copy_from_slice(self.id().as_bytes());
        key
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    Booking,
    Withdraw,
    Refund,
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Completed,
    Failed,
}

/// One line of the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub owner: Owner,
    pub r#type: EntryType,
    pub amount: Amount,
    pub source: EntrySource,
    pub reference_id: Option<String>,
    pub description: String,
    pub status: EntryStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn new(
        owner: Owner,
        r#type: EntryType,
        amount: Amount,
        source: EntrySource,
        status: EntryStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            r#type,
            amount,
            source,
            reference_id: None,
            description: String::new(),
            status,
            admin_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Signed contribution of this entry to the settled balance.
    pub fn settled_delta(&self) -> Decimal {
        match (self.status, self.r#type) {
            (EntryStatus::Completed, EntryType::Credit) => self.amount.value(),
            (EntryStatus::Completed, EntryType::Debit) => -self.amount.value(),
            _ => Decimal::ZERO,
        }
    }
}

/// Cached wallet figures for one owner.
///
/// `balance` tracks settled money; `pending_amount` is the part of it
/// reserved by open withdrawal requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub owner: Owner,
    pub balance: Balance,
    pub pending_amount: Balance,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(owner: Owner, now: DateTime<Utc>) -> Self {
        Self {
            owner,
            balance: Balance::ZERO,
            pending_amount: Balance::ZERO,
            updated_at: now,
        }
    }

    /// Balance not already promised to a pending withdrawal.
    pub fn available(&self) -> Balance {
        self.balance - self.pending_amount
    }

    pub fn ensure_available(&self, amount: Amount) -> Result<(), MarketError> {
        let available = self.available();
        if available >= amount.into() {
            Ok(())
        } else {
            Err(MarketError::InsufficientFunds {
                requested: amount.value(),
                available: available.value(),
            })
        }
    }

    pub fn credit(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), MarketError> {
        self.balance = self.balance.checked_add(amount.into())?;
        self.updated_at = now;
        Ok(())
    }

    pub fn debit(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), MarketError> {
        self.ensure_available(amount)?;
        self.balance -= amount.into();
        self.updated_at = now;
        Ok(())
    }

    /// Earmarks funds for a withdrawal without moving them.
    pub fn reserve(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), MarketError> {
        self.ensure_available(amount)?;
        self.pending_amount += amount.into();
        self.updated_at = now;
        Ok(())
    }

    /// Drops a reservation, leaving the balance untouched.
    pub fn release(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.pending_amount < amount.into() {
            return Err(MarketError::InternalError(format!(
                "Wallet {} releases {} but only {} is reserved",
                self.owner,
                amount.value(),
                self.pending_amount.value()
            )));
        }
        self.pending_amount -= amount.into();
        self.updated_at = now;
        Ok(())
    }

    /// Turns a reservation into an actual deduction.
    pub fn settle_reserved(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.balance < amount.into() {
            return Err(MarketError::InsufficientFunds {
                requested: amount.value(),
                available: self.balance.value(),
            });
        }
        self.release(amount, now)?;
        self.balance -= amount.into();
        Ok(())
    }
}

/// Platform commission settings. The most recently created record wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub id: Uuid,
    pub artist_booking_commission: Decimal,
    pub ticket_sell_commission: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Split of a payout between the platform and the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub commission: Decimal,
    pub net_credit: Decimal,
}

impl Payout {
    /// Commission is taken on the full price but collected from whatever was
    /// actually paid, so deposits front-load the platform's cut.
    pub fn split(total_price: Decimal, paid_amount: Decimal, pct: Decimal) -> Result<Self, MarketError> {
        let commission = percentage_of(total_price, pct)?;
        Ok(Self {
            commission,
            net_credit: paid_amount - commission,
        })
    }
}
