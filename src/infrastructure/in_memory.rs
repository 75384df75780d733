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
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    artists: HashMap<Uuid, Artist>,
    planners: HashMap<Uuid, Planner>,
    services: HashMap<Uuid, Service>,
    commissions: HashMap<Uuid, Commission>,
    reviews: HashMap<Uuid, Review>,
    events: HashMap<Uuid, Event>,
    bookings: HashMap<Uuid, Booking>,
    blocks: HashMap<Uuid, CalendarBlock>,
    wallets: HashMap<Owner, Wallet>,
    transactions: HashMap<Uuid, WalletTransaction>,
    withdrawals: HashMap<Uuid, WithdrawalRequest>,
    bank_details: HashMap<Uuid, SavedBankDetails>,
    ticket_types: HashMap<Uuid, TicketType>,
    tickets: HashMap<Uuid, Ticket>,
}

fn upsert<K, V>(table: &mut HashMap<K, V>, rows: Vec<V>, key: impl Fn(&V) -> K)
where
    K: std::hash::Hash + Eq,
{
    for row in rows {
        table.insert(key(&row), row);
    }
}

/// A thread-safe in-memory marketplace store.
///
/// All tables sit behind one `RwLock`, so a commit is a single write-locked
/// section and readers never observe half of a changeset.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn artist(&self, id: Uuid) -> Result<Option<Artist>> {
        Ok(self.tables.read().await.artists.get(&id).cloned())
    }

    async fn artists(&self) -> Result<Vec<Artist>> {
        Ok(self.tables.read().await.artists.values().cloned().collect())
    }

    async fn planner(&self, id: Uuid) -> Result<Option<Planner>> {
        Ok(self.tables.read().await.planners.get(&id).cloned())
    }

    async fn service(&self, id: Uuid) -> Result<Option<Service>> {
        Ok(self.tables.read().await.services.get(&id).cloned())
    }

    async fn services_of(&self, artist_id: Uuid) -> Result<Vec<Service>> {
        let tables = self.tables.read().await;
        Ok(tables
            .services
            .values()
            .filter(|s| s.artist_id == artist_id)
            .cloned()
            .collect())
    }

    async fn commissions(&self) -> Result<Vec<Commission>> {
        Ok(self.tables.read().await.commissions.values().cloned().collect())
    }

    async fn reviews_of(&self, artist_id: Uuid) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|r| r.artist_id == artist_id)
            .cloned()
            .collect())
    }

    async fn event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn events(&self) -> Result<Vec<Event>> {
        Ok(self.tables.read().await.events.values().cloned().collect())
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn booking(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn bookings_of_artist(&self, artist_id: Uuid) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.artist_id == artist_id)
            .cloned()
            .collect())
    }

    async fn bookings_of_client(&self, client_id: Uuid) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.client_id == Some(client_id))
            .cloned()
            .collect())
    }

    async fn bookings_with_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect())
    }

    async fn booking_by_order(&self, order_id: &str) -> Result<Option<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .find(|b| b.gateway_order_id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn block(&self, id: Uuid) -> Result<Option<CalendarBlock>> {
        Ok(self.tables.read().await.blocks.get(&id).cloned())
    }

    async fn blocks_of_artist(&self, artist_id: Uuid) -> Result<Vec<CalendarBlock>> {
        let tables = self.tables.read().await;
        Ok(tables
            .blocks
            .values()
            .filter(|b| b.artist_id == artist_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn wallet(&self, owner: Owner) -> Result<Option<Wallet>> {
        Ok(self.tables.read().await.wallets.get(&owner).cloned())
    }

    async fn wallets(&self) -> Result<Vec<Wallet>> {
        Ok(self.tables.read().await.wallets.values().cloned().collect())
    }

    async fn transaction(&self, id: Uuid) -> Result<Option<WalletTransaction>> {
        Ok(self.tables.read().await.transactions.get(&id).cloned())
    }

    async fn transactions_of(&self, owner: Owner) -> Result<Vec<WalletTransaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect())
    }

    async fn withdrawal(&self, id: Uuid) -> Result<Option<WithdrawalRequest>> {
        Ok(self.tables.read().await.withdrawals.get(&id).cloned())
    }

    async fn withdrawals(&self) -> Result<Vec<WithdrawalRequest>> {
        Ok(self.tables.read().await.withdrawals.values().cloned().collect())
    }

    async fn bank_details(&self, id: Uuid) -> Result<Option<SavedBankDetails>> {
        Ok(self.tables.read().await.bank_details.get(&id).cloned())
    }

    async fn bank_details_of(&self, owner: Owner) -> Result<Vec<SavedBankDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bank_details
            .values()
            .filter(|d| d.owner == owner)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn ticket_type(&self, id: Uuid) -> Result<Option<TicketType>> {
        Ok(self.tables.read().await.ticket_types.get(&id).cloned())
    }

    async fn ticket_types_of(&self, event_id: Uuid) -> Result<Vec<TicketType>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ticket_types
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        Ok(self.tables.read().await.tickets.get(&id).cloned())
    }

    async fn tickets_of_event(&self, event_id: Uuid) -> Result<Vec<Ticket>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn commit(&self, changes: Changeset) -> Result<()> {
        let mut tables = self.tables.write().await;

        upsert(&mut tables.artists, changes.artists, |r| r.id);
        upsert(&mut tables.planners, changes.planners, |r| r.id);
        upsert(&mut tables.services, changes.services, |r| r.id);
        upsert(&mut tables.commissions, changes.commissions, |r| r.id);
        upsert(&mut tables.reviews, changes.reviews, |r| r.id);
        upsert(&mut tables.events, changes.events, |r| r.id);
        upsert(&mut tables.bookings, changes.bookings, |r| r.id);
        upsert(&mut tables.blocks, changes.blocks, |r| r.id);
        upsert(&mut tables.wallets, changes.wallets, |r| r.owner);
        upsert(&mut tables.transactions, changes.transactions, |r| r.id);
        upsert(&mut tables.withdrawals, changes.withdrawals, |r| r.id);
        upsert(&mut tables.bank_details, changes.bank_details, |r| r.id);
        upsert(&mut tables.ticket_types, changes.ticket_types, |r| r.id);
        upsert(&mut tables.tickets, changes.tickets, |r| r.id);

        for id in changes.removed_bookings {
            tables.bookings.remove(&id);
        }
        for id in changes.removed_blocks {
            tables.blocks.remove(&id);
        }
        for id in changes.removed_ticket_types {
            tables.ticket_types.remove(&id);
        }
        for id in changes.removed_commissions {
            tables.commissions.remove(&id);
        }
        for id in changes.removed_bank_details {
            tables.bank_details.remove(&id);
        }

        Ok(())
    }
}
