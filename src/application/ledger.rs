use super::locks::Locks;
use crate::domain::money::{Amount, Balance, percent};
use crate::domain::ports::{Changeset, SharedStore};
use crate::domain::wallet::{
    Commission, EntrySource, EntryStatus, EntryType, Owner, Payout, Wallet, WalletTransaction,
};
use crate::domain::withdrawal::{
    BankDetails, BankDetailsPatch, SavedBankDetails, WithdrawalDecision, WithdrawalRequest,
    WithdrawalStatus,
};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Which commission percentage applies to a payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissionKind {
    ArtistBooking,
    TicketSale,
}

/// Result of comparing a wallet's cached figures against its ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub owner: Owner,
    pub cached_balance: Decimal,
    pub ledger_balance: Decimal,
    pub cached_pending: Decimal,
    pub ledger_pending: Decimal,
    pub drift: bool,
    pub repaired: bool,
}

/// A single ledger posting with its optional reference and description.
#[derive(Debug, Clone)]
pub struct Posting {
    pub owner: Owner,
    pub amount: Decimal,
    pub source: EntrySource,
    pub reference: Option<String>,
    pub description: String,
}

/// Append-only wallet ledger with cached balances.
///
/// Every mutation takes the owner's wallet lock and commits the wallet and
/// its ledger entries in one changeset.
#[derive(Clone)]
pub struct WalletLedger {
    store: SharedStore,
    locks: Arc<Locks>,
}

impl WalletLedger {
    pub fn new(store: SharedStore, locks: Arc<Locks>) -> Self {
        Self { store, locks }
    }

    async fn ensure_owner(&self, owner: Owner) -> Result<()> {
        let exists = match owner {
            Owner::Artist(id) => self.store.artist(id).await?.is_some(),
            Owner::Planner(id) => self.store.planner(id).await?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(MarketError::NotFound(format!("Wallet owner {}", owner)))
        }
    }

    /// The owner's wallet, or a fresh zero wallet if nothing was posted yet.
    pub(crate) async fn load(&self, owner: Owner, now: DateTime<Utc>) -> Result<Wallet> {
        Ok(self
            .store
            .wallet(owner)
            .await?
            .unwrap_or_else(|| Wallet::new(owner, now)))
    }

    pub async fn current_commission(&self) -> Result<Option<Commission>> {
        let commissions = self.store.commissions().await?;
        Ok(commissions.into_iter().max_by_key(|c| c.created_at))
    }

    /// Percentage for `kind` from the current record; 0 when none exists.
    pub(crate) async fn commission_rate(&self, kind: CommissionKind) -> Result<Decimal> {
        Ok(match self.current_commission().await? {
            Some(c) => match kind {
                CommissionKind::ArtistBooking => c.artist_booking_commission,
                CommissionKind::TicketSale => c.ticket_sell_commission,
            },
            None => Decimal::ZERO,
        })
    }

    pub async fn set_commission(
        &self,
        artist_booking_commission: Decimal,
        ticket_sell_commission: Decimal,
    ) -> Result<Commission> {
        let commission = Commission {
            id: Uuid::new_v4(),
            artist_booking_commission: percent(artist_booking_commission)?,
            ticket_sell_commission: percent(ticket_sell_commission)?,
            created_at: Utc::now(),
        };
        let mut changes = Changeset::new();
        changes.commissions.push(commission.clone());
        self.store.commit(changes).await?;
        info!(
            artist_booking = %commission.artist_booking_commission,
            ticket_sale = %commission.ticket_sell_commission,
            "commission updated"
        );
        Ok(commission)
    }

    /// Every commission record, newest first. The head is the one in force.
    pub async fn commission_history(&self) -> Result<Vec<Commission>> {
        let mut commissions = self.store.commissions().await?;
        commissions.sort_by_key(|c| Reverse(c.created_at));
        Ok(commissions)
    }

    /// Drops a commission record; the next newest one takes over.
    pub async fn delete_commission(&self, commission_id: Uuid) -> Result<Commission> {
        let commission = self
            .store
            .commissions()
            .await?
            .into_iter()
            .find(|c| c.id == commission_id)
            .ok_or_else(|| MarketError::NotFound(format!("Commission {}", commission_id)))?;

        let mut changes = Changeset::new();
        changes.removed_commissions.push(commission.id);
        self.store.commit(changes).await?;
        info!(commission = %commission.id, "commission deleted");
        Ok(commission)
    }

    /// Stages a completed credit. Caller holds the wallet lock.
    pub(crate) fn stage_credit(
        wallet: &mut Wallet,
        posting: Posting,
        now: DateTime<Utc>,
        changes: &mut Changeset,
    ) -> Result<WalletTransaction> {
        let amount = Amount::new(posting.amount)?;
        wallet.credit(amount, now)?;
        let entry = Self::entry(EntryType::Credit, amount, posting, EntryStatus::Completed, now);
        changes.transactions.push(entry.clone());
        Ok(entry)
    }

    /// Stages a completed debit against the available balance. Caller holds
    /// the wallet lock.
    pub(crate) fn stage_debit(
        wallet: &mut Wallet,
        posting: Posting,
        now: DateTime<Utc>,
        changes: &mut Changeset,
    ) -> Result<WalletTransaction> {
        let amount = Amount::new(posting.amount)?;
        wallet.debit(amount, now)?;
        let entry = Self::entry(EntryType::Debit, amount, posting, EntryStatus::Completed, now);
        changes.transactions.push(entry.clone());
        Ok(entry)
    }

    fn entry(
        r#type: EntryType,
        amount: Amount,
        posting: Posting,
        status: EntryStatus,
        now: DateTime<Utc>,
    ) -> WalletTransaction {
        let mut entry = WalletTransaction::new(posting.owner, r#type, amount, posting.source, status, now)
            .describe(posting.description);
        entry.reference_id = posting.reference;
        entry
    }

    /// Stages the provider's share of a payment: commission is computed on
    /// `total` and taken out of `paid`. Caller holds the wallet lock.
    ///
    /// A non-positive net share posts nothing.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn stage_payout(
        &self,
        owner: Owner,
        kind: CommissionKind,
        total: Decimal,
        paid: Decimal,
        reference: String,
        description: String,
        now: DateTime<Utc>,
        changes: &mut Changeset,
    ) -> Result<Payout> {
        let pct = self.commission_rate(kind).await?;
        let payout = Payout::split(total, paid, pct)?;
        if payout.net_credit <= Decimal::ZERO {
            warn!(%owner, %total, %paid, commission = %payout.commission, "payout nets to nothing, no credit posted");
            return Ok(payout);
        }

        let mut wallet = self.load(owner, now).await?;
        let posting = Posting {
            owner,
            amount: payout.net_credit,
            source: EntrySource::Booking,
            reference: Some(reference),
            description,
        };
        Self::stage_credit(&mut wallet, posting, now, changes)?;
        changes.wallets.push(wallet);
        Ok(payout)
    }

    pub async fn credit(&self, posting: Posting) -> Result<WalletTransaction> {
        let owner = posting.owner;
        self.ensure_owner(owner).await?;
        let _guard = self.locks.wallets.lock(owner).await;
        let now = Utc::now();

        let mut wallet = self.load(owner, now).await?;
        let mut changes = Changeset::new();
        let entry = Self::stage_credit(&mut wallet, posting, now, &mut changes)?;
        changes.wallets.push(wallet);
        self.store.commit(changes).await?;

        info!(%owner, amount = %entry.amount.value(), "wallet credited");
        Ok(entry)
    }

    pub async fn debit(&self, posting: Posting) -> Result<WalletTransaction> {
        let owner = posting.owner;
        self.ensure_owner(owner).await?;
        let _guard = self.locks.wallets.lock(owner).await;
        let now = Utc::now();

        let mut wallet = self.load(owner, now).await?;
        let mut changes = Changeset::new();
        let entry = Self::stage_debit(&mut wallet, posting, now, &mut changes)?;
        changes.wallets.push(wallet);
        self.store.commit(changes).await?;

        info!(%owner, amount = %entry.amount.value(), "wallet debited");
        Ok(entry)
    }

    /// Reserves `amount` and opens a pending withdrawal with its pending
    /// debit entry.
    pub async fn request_withdrawal(
        &self,
        owner: Owner,
        amount: Decimal,
        bank_details: BankDetails,
    ) -> Result<WithdrawalRequest> {
        let amount = Amount::new(amount)?;
        if bank_details.is_empty() {
            return Err(MarketError::ValidationError(
                "Bank account number or UPI id is required".to_string(),
            ));
        }
        self.ensure_owner(owner).await?;
        let _guard = self.locks.wallets.lock(owner).await;
        let now = Utc::now();

        let mut wallet = self.load(owner, now).await?;
        wallet.reserve(amount, now)?;

        let request_id = Uuid::new_v4();
        let entry = WalletTransaction::new(
            owner,
            EntryType::Debit,
            amount,
            EntrySource::Withdraw,
            EntryStatus::Pending,
            now,
        )
        .reference(request_id.to_string())
        .describe("Withdrawal request");
        let request = WithdrawalRequest {
            id: request_id,
            owner,
            amount,
            status: WithdrawalStatus::Pending,
            bank_details,
            admin_note: None,
            transaction_id: entry.id,
            created_at: now,
            updated_at: now,
        };

        let mut changes = Changeset::new();
        changes.wallets.push(wallet);
        changes.transactions.push(entry);
        changes.withdrawals.push(request.clone());
        self.store.commit(changes).await?;

        info!(%owner, amount = %amount.value(), withdrawal = %request.id, "withdrawal requested");
        Ok(request)
    }

    /// Approves (deducts the reservation) or rejects (releases it) a pending
    /// withdrawal.
    pub async fn decide_withdrawal(
        &self,
        withdrawal_id: Uuid,
        decision: WithdrawalDecision,
    ) -> Result<WithdrawalRequest> {
        decision.validate()?;
        let owner = self
            .store
            .withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Withdrawal {}", withdrawal_id)))?
            .owner;
        let _guard = self.locks.wallets.lock(owner).await;
        let now = Utc::now();

        // Re-read under the lock so a concurrent decision is seen
        let mut request = self
            .store
            .withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Withdrawal {}", withdrawal_id)))?;
        let mut entry = self
            .store
            .transaction(request.transaction_id)
            .await?
            .ok_or_else(|| {
                MarketError::InternalError(format!(
                    "Withdrawal {} has no ledger entry",
                    withdrawal_id
                ))
            })?;
        let mut wallet = self.load(owner, now).await?;

        request.decide(&decision, now)?;
        match decision {
            WithdrawalDecision::Processed { .. } => {
                wallet.settle_reserved(request.amount, now)?;
                entry.status = EntryStatus::Completed;
            }
            WithdrawalDecision::Rejected { .. } => {
                wallet.release(request.amount, now)?;
                entry.status = EntryStatus::Failed;
            }
        }
        entry.admin_note = request.admin_note.clone();
        entry.updated_at = now;

        let mut changes = Changeset::new();
        changes.wallets.push(wallet);
        changes.transactions.push(entry);
        changes.withdrawals.push(request.clone());
        self.store.commit(changes).await?;

        info!(%owner, withdrawal = %request.id, status = ?request.status, "withdrawal decided");
        Ok(request)
    }

    /// Recomputes balance and reservations from the ledger and reports drift
    /// against the cached wallet. With `repair`, the cache is overwritten.
    pub async fn reconcile(&self, owner: Owner, repair: bool) -> Result<Reconciliation> {
        let _guard = self.locks.wallets.lock(owner).await;
        let now = Utc::now();

        let entries = self.store.transactions_of(owner).await?;
        let ledger_balance: Decimal = entries.iter().map(WalletTransaction::settled_delta).sum();
        let ledger_pending: Decimal = entries
            .iter()
            .filter(|e| {
                e.status == EntryStatus::Pending
                    && e.r#type == EntryType::Debit
                    && e.source == EntrySource::Withdraw
            })
            .map(|e| e.amount.value())
            .sum();

        let mut wallet = self.load(owner, now).await?;
        let mut report = Reconciliation {
            owner,
            cached_balance: wallet.balance.value(),
            ledger_balance,
            cached_pending: wallet.pending_amount.value(),
            ledger_pending,
            drift: wallet.balance.value() != ledger_balance
                || wallet.pending_amount.value() != ledger_pending,
            repaired: false,
        };

        if report.drift {
            warn!(
                %owner,
                cached = %report.cached_balance,
                ledger = %report.ledger_balance,
                "wallet cache drifted from ledger"
            );
            if repair {
                wallet.balance = Balance::new(ledger_balance);
                wallet.pending_amount = Balance::new(ledger_pending);
                wallet.updated_at = now;
                let mut changes = Changeset::new();
                changes.wallets.push(wallet);
                self.store.commit(changes).await?;
                report.repaired = true;
            }
        }
        Ok(report)
    }

    pub async fn wallet(&self, owner: Owner) -> Result<Wallet> {
        self.load(owner, Utc::now()).await
    }

    /// Ledger entries of `owner`, oldest first.
    pub async fn transactions(&self, owner: Owner) -> Result<Vec<WalletTransaction>> {
        let mut entries = self.store.transactions_of(owner).await?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    /// Withdrawal requests, oldest first, optionally for one owner.
    /// Withdraws to payout details the owner keeps on file.
    pub async fn withdraw_to_saved(
        &self,
        owner: Owner,
        amount: Decimal,
        bank_details_id: Uuid,
    ) -> Result<WithdrawalRequest> {
        let saved = self.saved_bank_details(owner, bank_details_id).await?;
        self.request_withdrawal(owner, amount, saved.details).await
    }

    /// Keeps payout details on file. Marking an entry primary demotes the
    /// owner's previous primary in the same commit.
    pub async fn add_bank_details(
        &self,
        owner: Owner,
        details: BankDetails,
        is_primary: bool,
    ) -> Result<SavedBankDetails> {
        self.ensure_owner(owner).await?;
        let _guard = self.locks.wallets.lock(owner).await;
        let now = Utc::now();
        let saved = SavedBankDetails::new(owner, details, is_primary, now)?;

        let mut changes = Changeset::new();
        if saved.is_primary {
            changes.bank_details = self.demote_primary(owner, saved.id, now).await?;
        }
        changes.bank_details.push(saved.clone());
        self.store.commit(changes).await?;
        info!(%owner, bank_details = %saved.id, primary = saved.is_primary, "bank details saved");
        Ok(saved)
    }

    pub async fn update_bank_details(
        &self,
        owner: Owner,
        bank_details_id: Uuid,
        patch: BankDetailsPatch,
    ) -> Result<SavedBankDetails> {
        let _guard = self.locks.wallets.lock(owner).await;
        let now = Utc::now();
        let mut saved = self.saved_bank_details(owner, bank_details_id).await?;
        saved.apply(patch, now)?;

        let mut changes = Changeset::new();
        if saved.is_primary {
            changes.bank_details = self.demote_primary(owner, saved.id, now).await?;
        }
        changes.bank_details.push(saved.clone());
        self.store.commit(changes).await?;
        info!(%owner, bank_details = %saved.id, "bank details updated");
        Ok(saved)
    }

    pub async fn delete_bank_details(&self, owner: Owner, bank_details_id: Uuid) -> Result<()> {
        let _guard = self.locks.wallets.lock(owner).await;
        let saved = self.saved_bank_details(owner, bank_details_id).await?;

        let mut changes = Changeset::new();
        changes.removed_bank_details.push(saved.id);
        self.store.commit(changes).await?;
        info!(%owner, bank_details = %saved.id, "bank details deleted");
        Ok(())
    }

    /// Primary entry first, then newest first.
    pub async fn bank_details(&self, owner: Owner) -> Result<Vec<SavedBankDetails>> {
        let mut saved = self.store.bank_details_of(owner).await?;
        saved.sort_by_key(|d| (Reverse(d.is_primary), Reverse(d.created_at)));
        Ok(saved)
    }

    /// Another owner's entry is reported as missing.
    async fn saved_bank_details(&self, owner: Owner, bank_details_id: Uuid) -> Result<SavedBankDetails> {
        self.store
            .bank_details(bank_details_id)
            .await?
            .filter(|d| d.owner == owner)
            .ok_or_else(|| MarketError::NotFound(format!("Bank details {}", bank_details_id)))
    }

    async fn demote_primary(&self, owner: Owner, keep: Uuid, now: DateTime<Utc>) -> Result<Vec<SavedBankDetails>> {
        Ok(self
            .store
            .bank_details_of(owner)
            .await?
            .into_iter()
            .filter(|d| d.is_primary && d.id != keep)
            .map(|mut d| {
                d.is_primary = false;
                d.updated_at = now;
                d
            })
            .collect())
    }

    pub async fn withdrawals(&self, owner: Option<Owner>) -> Result<Vec<WithdrawalRequest>> {
        let mut requests: Vec<_> = self
            .store
            .withdrawals()
            .await?
            .into_iter()
            .filter(|r| owner.is_none_or(|o| r.owner == o))
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    pub async fn wallets(&self) -> Result<Vec<Wallet>> {
        let mut wallets = self.store.wallets().await?;
        wallets.sort_by_key(|w| w.owner);
        Ok(wallets)
    }
}
