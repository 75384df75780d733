use super::artist::{Artist, Planner};
use super::booking::{Booking, BookingStatus};
use super::calendar::CalendarBlock;
use super::review::Review;
use super::service::Service;
use super::ticket::{Event, Ticket, TicketType};
use super::wallet::{Commission, Owner, Wallet, WalletTransaction};
use super::withdrawal::{SavedBankDetails, WithdrawalRequest};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn artist(&self, id: Uuid) -> Result<Option<Artist>>;
    async fn artists(&self) -> Result<Vec<Artist>>;
    async fn planner(&self, id: Uuid) -> Result<Option<Planner>>;
    async fn service(&self, id: Uuid) -> Result<Option<Service>>;
    async fn services_of(&self, artist_id: Uuid) -> Result<Vec<Service>>;
    async fn commissions(&self) -> Result<Vec<Commission>>;
    async fn reviews_of(&self, artist_id: Uuid) -> Result<Vec<Review>>;
    async fn event(&self, id: Uuid) -> Result<Option<Event>>;
    async fn events(&self) -> Result<Vec<Event>>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn booking(&self, id: Uuid) -> Result<Option<Booking>>;
    async fn bookings_of_artist(&self, artist_id: Uuid) -> Result<Vec<Booking>>;
    async fn bookings_of_client(&self, client_id: Uuid) -> Result<Vec<Booking>>;
    async fn bookings_with_status(&self, status: BookingStatus) -> Result<Vec<Booking>>;
    async fn booking_by_order(&self, order_id: &str) -> Result<Option<Booking>>;
    async fn block(&self, id: Uuid) -> Result<Option<CalendarBlock>>;
    async fn blocks_of_artist(&self, artist_id: Uuid) -> Result<Vec<CalendarBlock>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn wallet(&self, owner: Owner) -> Result<Option<Wallet>>;
    async fn wallets(&self) -> Result<Vec<Wallet>>;
    async fn transaction(&self, id: Uuid) -> Result<Option<WalletTransaction>>;
    async fn transactions_of(&self, owner: Owner) -> Result<Vec<WalletTransaction>>;
    async fn withdrawal(&self, id: Uuid) -> Result<Option<WithdrawalRequest>>;
    async fn withdrawals(&self) -> Result<Vec<WithdrawalRequest>>;
    async fn bank_details(&self, id: Uuid) -> Result<Option<SavedBankDetails>>;
    async fn bank_details_of(&self, owner: Owner) -> Result<Vec<SavedBankDetails>>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn ticket_type(&self, id: Uuid) -> Result<Option<TicketType>>;
    async fn ticket_types_of(&self, event_id: Uuid) -> Result<Vec<TicketType>>;
    async fn ticket(&self, id: Uuid) -> Result<Option<Ticket>>;
    async fn tickets_of_event(&self, event_id: Uuid) -> Result<Vec<Ticket>>;
}

/// Every write an operation makes, applied all-or-nothing by `Store::commit`.
#[derive(Debug, Default, Clone)]
pub struct Changeset {
    pub artists: Vec<Artist>,
    pub planners: Vec<Planner>,
    pub services: Vec<Service>,
    pub commissions: Vec<Commission>,
    pub reviews: Vec<Review>,
    pub events: Vec<Event>,
    pub bookings: Vec<Booking>,
    pub blocks: Vec<CalendarBlock>,
    pub wallets: Vec<Wallet>,
    pub transactions: Vec<WalletTransaction>,
    pub withdrawals: Vec<WithdrawalRequest>,
    pub bank_details: Vec<SavedBankDetails>,
    pub ticket_types: Vec<TicketType>,
    pub tickets: Vec<Ticket>,
    pub removed_bookings: Vec<Uuid>,
    pub removed_blocks: Vec<Uuid>,
    pub removed_ticket_types: Vec<Uuid>,
    pub removed_commissions: Vec<Uuid>,
    pub removed_bank_details: Vec<Uuid>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
            && self.planners.is_empty()
            && self.services.is_empty()
            && self.commissions.is_empty()
            && self.reviews.is_empty()
            && self.events.is_empty()
            && self.bookings.is_empty()
            && self.blocks.is_empty()
            && self.wallets.is_empty()
            && self.transactions.is_empty()
            && self.withdrawals.is_empty()
            && self.bank_details.is_empty()
            && self.ticket_types.is_empty()
            && self.tickets.is_empty()
            && self.removed_bookings.is_empty()
            && self.removed_blocks.is_empty()
            && self.removed_ticket_types.is_empty()
            && self.removed_commissions.is_empty()
            && self.removed_bank_details.is_empty()
    }
}

/// The document store the marketplace core runs against.
#[async_trait]
pub trait Store: CatalogStore + ScheduleStore + LedgerStore + TicketStore {
    /// Applies the changeset atomically: readers see all of it or none of it.
    async fn commit(&self, changes: Changeset) -> Result<()>;
}

pub type SharedStore = Arc<dyn Store>;

/// Handle returned by the payment provider for a new order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub receipt: String,
}

/// Payment provider collaborator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, amount: Decimal, receipt: &str) -> Result<GatewayOrder>;
    async fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<bool>;
}

pub type SharedGateway = Arc<dyn PaymentGateway>;
