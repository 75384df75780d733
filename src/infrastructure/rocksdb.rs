use crate::domain::artist::{Artist, Planner};
use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::calendar::CalendarBlock;
use crate::domain::ports::{
    CatalogStore, Changeset, LedgerStore, ScheduleStore, Store, TicketStore,
};
use crate::domain::review::Review;
use crate::domain::service::Service;
use crate::domain::ticket::{Event, Ticket, TicketType};
use crate::domain::wallet::{Commission, Owner, Wallet, WalletTransaction};
use crate::domain::withdrawal::{SavedBankDetails, WithdrawalRequest};
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub const CF_ARTISTS: &str = "artists";
pub const CF_PLANNERS: &str = "planners";
pub const CF_SERVICES: &str = "services";
pub const CF_COMMISSIONS: &str = "commissions";
pub const CF_REVIEWS: &str = "reviews";
pub const CF_EVENTS: &str = "events";
pub const CF_BOOKINGS: &str = "bookings";
pub const CF_BLOCKS: &str = "calendar_blocks";
pub const CF_WALLETS: &str = "wallets";
pub const CF_TRANSACTIONS: &str = "wallet_transactions";
pub const CF_WITHDRAWALS: &str = "withdrawals";
pub const CF_BANK_DETAILS: &str = "bank_details";
pub const CF_TICKET_TYPES: &str = "ticket_types";
pub const CF_TICKETS: &str = "tickets";

const COLUMN_FAMILIES: [&str; 14] = [
    CF_ARTISTS,
    CF_PLANNERS,
    CF_SERVICES,
    CF_COMMISSIONS,
    CF_REVIEWS,
    CF_EVENTS,
    CF_BOOKINGS,
    CF_BLOCKS,
    CF_WALLETS,
    CF_TRANSACTIONS,
    CF_WITHDRAWALS,
    CF_BANK_DETAILS,
    CF_TICKET_TYPES,
    CF_TICKETS,
];

/// A persistent store implementation using RocksDB.
///
/// One column family per table, JSON values, UUID keys (wallets are keyed by
/// `Owner::key`). A changeset lands as one `WriteBatch`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| MarketError::InternalError(format!("Column family '{}' not found", name)))
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.handle(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(|e| MarketError::internal("Deserialization error", e))?,
            )),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str, keep: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        let cf = self.handle(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| MarketError::internal("RocksDB iteration error", e))?;
            let row: T = serde_json::from_slice(&value)
                .map_err(|e| MarketError::internal("Deserialization error", e))?;
            if keep(&row) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn put_all<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        rows: &[T],
        key: impl Fn(&T) -> Vec<u8>,
    ) -> Result<()> {
        let cf = self.handle(cf_name)?;
        for row in rows {
            let value = serde_json::to_vec(row).map_err(|e| MarketError::internal("Serialization error", e))?;
            batch.put_cf(cf, key(row), value);
        }
        Ok(())
    }

    fn delete_all(&self, batch: &mut WriteBatch, cf_name: &str, ids: &[Uuid]) -> Result<()> {
        let cf = self.handle(cf_name)?;
        for id in ids {
            batch.delete_cf(cf, id.as_bytes());
        }
        Ok(())
    }
}

fn id_key(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

#[async_trait]
impl CatalogStore for RocksDBStore {
    async fn artist(&self, id: Uuid) -> Result<Option<Artist>> {
        self.get(CF_ARTISTS, id.as_bytes())
    }

    async fn artists(&self) -> Result<Vec<Artist>> {
        self.scan(CF_ARTISTS, |_| true)
    }

    async fn planner(&self, id: Uuid) -> Result<Option<Planner>> {
        self.get(CF_PLANNERS, id.as_bytes())
    }

    async fn service(&self, id: Uuid) -> Result<Option<Service>> {
        self.get(CF_SERVICES, id.as_bytes())
    }

    async fn services_of(&self, artist_id: Uuid) -> Result<Vec<Service>> {
        self.scan(CF_SERVICES, |s: &Service| s.artist_id == artist_id)
    }

    async fn commissions(&self) -> Result<Vec<Commission>> {
        self.scan(CF_COMMISSIONS, |_| true)
    }

    async fn reviews_of(&self, artist_id: Uuid) -> Result<Vec<Review>> {
        self.scan(CF_REVIEWS, |r: &Review| r.artist_id == artist_id)
    }

    async fn event(&self, id: Uuid) -> Result<Option<Event>> {
        self.get(CF_EVENTS, id.as_bytes())
    }

    async fn events(&self) -> Result<Vec<Event>> {
        self.scan(CF_EVENTS, |_| true)
    }
}

#[async_trait]
impl ScheduleStore for RocksDBStore {
    async fn booking(&self, id: Uuid) -> Result<Option<Booking>> {
        self.get(CF_BOOKINGS, id.as_bytes())
    }

    async fn bookings_of_artist(&self, artist_id: Uuid) -> Result<Vec<Booking>> {
        self.scan(CF_BOOKINGS, |b: &Booking| b.artist_id == artist_id)
    }

    async fn bookings_of_client(&self, client_id: Uuid) -> Result<Vec<Booking>> {
        self.scan(CF_BOOKINGS, |b: &Booking| b.client_id == Some(client_id))
    }

    async fn bookings_with_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        self.scan(CF_BOOKINGS, |b: &Booking| b.status == status)
    }

    async fn booking_by_order(&self, order_id: &str) -> Result<Option<Booking>> {
        let mut found = self.scan(CF_BOOKINGS, |b: &Booking| {
            b.gateway_order_id.as_deref() == Some(order_id)
        })?;
        Ok(found.pop())
    }

    async fn block(&self, id: Uuid) -> Result<Option<CalendarBlock>> {
        self.get(CF_BLOCKS, id.as_bytes())
    }

    async fn blocks_of_artist(&self, artist_id: Uuid) -> Result<Vec<CalendarBlock>> {
        self.scan(CF_BLOCKS, |b: &CalendarBlock| b.artist_id == artist_id)
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn wallet(&self, owner: Owner) -> Result<Option<Wallet>> {
        self.get(CF_WALLETS, &owner.key())
    }

    async fn wallets(&self) -> Result<Vec<Wallet>> {
        self.scan(CF_WALLETS, |_| true)
    }

    async fn transaction(&self, id: Uuid) -> Result<Option<WalletTransaction>> {
        self.get(CF_TRANSACTIONS, id.as_bytes())
    }

    async fn transactions_of(&self, owner: Owner) -> Result<Vec<WalletTransaction>> {
        self.scan(CF_TRANSACTIONS, |t: &WalletTransaction| t.owner == owner)
    }

    async fn withdrawal(&self, id: Uuid) -> Result<Option<WithdrawalRequest>> {
        self.get(CF_WITHDRAWALS, id.as_bytes())
    }

    async fn withdrawals(&self) -> Result<Vec<WithdrawalRequest>> {
        self.scan(CF_WITHDRAWALS, |_| true)
    }

    async fn bank_details(&self, id: Uuid) -> Result<Option<SavedBankDetails>> {
        self.get(CF_BANK_DETAILS, id.as_bytes())
    }

    async fn bank_details_of(&self, owner: Owner) -> Result<Vec<SavedBankDetails>> {
        self.scan(CF_BANK_DETAILS, |d: &SavedBankDetails| d.owner == owner)
    }
}

#[async_trait]
impl TicketStore for RocksDBStore {
    async fn ticket_type(&self, id: Uuid) -> Result<Option<TicketType>> {
        self.get(CF_TICKET_TYPES, id.as_bytes())
    }

    async fn ticket_types_of(&self, event_id: Uuid) -> Result<Vec<TicketType>> {
        self.scan(CF_TICKET_TYPES, |t: &TicketType| t.event_id == event_id)
    }

    async fn ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        self.get(CF_TICKETS, id.as_bytes())
    }

    async fn tickets_of_event(&self, event_id: Uuid) -> Result<Vec<Ticket>> {
        self.scan(CF_TICKETS, |t: &Ticket| t.event_id == event_id)
    }
}

#[async_trait]
impl Store for RocksDBStore {
    async fn commit(&self, changes: Changeset) -> Result<()> {
        let mut batch = WriteBatch::default();

        self.put_all(&mut batch, CF_ARTISTS, &changes.artists, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_PLANNERS, &changes.planners, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_SERVICES, &changes.services, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_COMMISSIONS, &changes.commissions, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_REVIEWS, &changes.reviews, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_EVENTS, &changes.events, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_BOOKINGS, &changes.bookings, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_BLOCKS, &changes.blocks, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_WALLETS, &changes.wallets, |r| r.owner.key().to_vec())?;
        self.put_all(&mut batch, CF_TRANSACTIONS, &changes.transactions, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_WITHDRAWALS, &changes.withdrawals, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_BANK_DETAILS, &changes.bank_details, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_TICKET_TYPES, &changes.ticket_types, |r| id_key(r.id))?;
        self.put_all(&mut batch, CF_TICKETS, &changes.tickets, |r| id_key(r.id))?;

        self.delete_all(&mut batch, CF_BOOKINGS, &changes.removed_bookings)?;
        self.delete_all(&mut batch, CF_BLOCKS, &changes.removed_blocks)?;
        self.delete_all(&mut batch, CF_TICKET_TYPES, &changes.removed_ticket_types)?;
        self.delete_all(&mut batch, CF_COMMISSIONS, &changes.removed_commissions)?;
        self.delete_all(&mut batch, CF_BANK_DETAILS, &changes.removed_bank_details)?;

        self.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Balance;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in COLUMN_FAMILIES {
            assert!(store.db.cf_handle(name).is_some(), "missing {}", name);
        }
    }

    #[tokio::test]
    async fn test_rocksdb_wallet_round_trip() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let owner = Owner::Planner(Uuid::new_v4());
        let mut wallet = Wallet::new(owner, Utc::now());
        wallet.balance = Balance::new(dec!(100.0));

        let mut changes = Changeset::new();
        changes.wallets.push(wallet.clone());
        store.commit(changes).await.unwrap();

        assert_eq!(store.wallet(owner).await.unwrap(), Some(wallet));
        assert!(store.wallet(Owner::Artist(owner.id())).await.unwrap().is_none());
        assert_eq!(store.wallets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        let artist = Artist::new(Uuid::new_v4(), "Nina", Utc::now());
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            let mut changes = Changeset::new();
            changes.artists.push(artist.clone());
            store.commit(changes).await.unwrap();
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        assert_eq!(store.artist(artist.id).await.unwrap(), Some(artist));
    }
}
