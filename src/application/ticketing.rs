use super::ledger::{CommissionKind, WalletLedger};
use super::locks::Locks;
use crate::domain::calendar::Interval;
use crate::domain::money::multiply;
use crate::domain::ports::{Changeset, SharedStore};
use crate::domain::ticket::{Event, Ticket, TicketType};
use crate::domain::wallet::Owner;
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTypeDraft {
    pub title: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub sales_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sales_end: Option<DateTime<Utc>>,
}

/// Editable ticket type fields. `sold` only moves through purchases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketTypePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub sales_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sales_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub ticket_type_id: Uuid,
    pub quantity: u32,
    pub buyer_name: String,
    pub buyer_phone: String,
}

fn validate_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if start >= end => Err(MarketError::ValidationError(
            "Sales window must end after it starts".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Events, ticket stock and admissions.
#[derive(Clone)]
pub struct Ticketing {
    store: SharedStore,
    ledger: WalletLedger,
    locks: Arc<Locks>,
}

impl Ticketing {
    pub fn new(store: SharedStore, ledger: WalletLedger, locks: Arc<Locks>) -> Self {
        Self {
            store,
            ledger,
            locks,
        }
    }

    async fn event_of(&self, planner_id: Uuid, event_id: Uuid) -> Result<Event> {
        let event = self
            .store
            .event(event_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Event {}", event_id)))?;
        if event.planner_id != planner_id {
            return Err(MarketError::Forbidden(format!(
                "Event {} belongs to another planner",
                event_id
            )));
        }
        Ok(event)
    }

    async fn ticket_type_of(&self, planner_id: Uuid, ticket_type_id: Uuid) -> Result<TicketType> {
        let ticket_type = self
            .store
            .ticket_type(ticket_type_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Ticket type {}", ticket_type_id)))?;
        self.event_of(planner_id, ticket_type.event_id).await?;
        Ok(ticket_type)
    }

    pub async fn create_event(
        &self,
        planner_id: Uuid,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Event> {
        Interval::new(start, end)?;
        if title.trim().is_empty() {
            return Err(MarketError::ValidationError("Event title is required".to_string()));
        }
        if self.store.planner(planner_id).await?.is_none() {
            return Err(MarketError::NotFound(format!("Planner {}", planner_id)));
        }

        let event = Event {
            id: Uuid::new_v4(),
            planner_id,
            title: title.trim().to_string(),
            start_at: start,
            end_at: end,
            published: false,
            created_at: Utc::now(),
        };
        let mut changes = Changeset::new();
        changes.events.push(event.clone());
        self.store.commit(changes).await?;

        info!(event = %event.id, %planner_id, "event created");
        Ok(event)
    }

    pub async fn publish_event(&self, planner_id: Uuid, event_id: Uuid) -> Result<Event> {
        let mut event = self.event_of(planner_id, event_id).await?;
        if event.has_ended(Utc::now()) {
            return Err(MarketError::ValidationError(format!(
                "Event {} has already ended",
                event_id
            )));
        }
        event.published = true;
        let mut changes = Changeset::new();
        changes.events.push(event.clone());
        self.store.commit(changes).await?;
        Ok(event)
    }

    pub async fn create_ticket_type(
        &self,
        planner_id: Uuid,
        event_id: Uuid,
        draft: TicketTypeDraft,
    ) -> Result<TicketType> {
        self.event_of(planner_id, event_id).await?;
        if draft.price < Decimal::ZERO {
            return Err(MarketError::ValidationError("Ticket price cannot be negative".to_string()));
        }
        if draft.quantity == 0 {
            return Err(MarketError::ValidationError("Ticket quantity must be positive".to_string()));
        }
        validate_window(draft.sales_start, draft.sales_end)?;

        let ticket_type = TicketType {
            id: Uuid::new_v4(),
            event_id,
            title: draft.title,
            price: draft.price,
            quantity: draft.quantity,
            sold: 0,
            sales_start: draft.sales_start,
            sales_end: draft.sales_end,
            created_at: Utc::now(),
        };
        let mut changes = Changeset::new();
        changes.ticket_types.push(ticket_type.clone());
        self.store.commit(changes).await?;

        info!(ticket_type = %ticket_type.id, %event_id, quantity = ticket_type.quantity, "ticket type created");
        Ok(ticket_type)
    }

    pub async fn update_ticket_type(
        &self,
        planner_id: Uuid,
        ticket_type_id: Uuid,
        patch: TicketTypePatch,
    ) -> Result<TicketType> {
        let _stock = self.locks.ticket_types.lock(ticket_type_id).await;
        let mut ticket_type = self.ticket_type_of(planner_id, ticket_type_id).await?;

        if let Some(title) = patch.title {
            ticket_type.title = title;
        }
        if let Some(price) = patch.price {
            if price < Decimal::ZERO {
                return Err(MarketError::ValidationError("Ticket price cannot be negative".to_string()));
            }
            ticket_type.price = price;
        }
        if let Some(quantity) = patch.quantity {
            ticket_type.resize(quantity)?;
        }
        if patch.sales_start.is_some() {
            ticket_type.sales_start = patch.sales_start;
        }
        if patch.sales_end.is_some() {
            ticket_type.sales_end = patch.sales_end;
        }
        validate_window(ticket_type.sales_start, ticket_type.sales_end)?;

        let mut changes = Changeset::new();
        changes.ticket_types.push(ticket_type.clone());
        self.store.commit(changes).await?;
        Ok(ticket_type)
    }

    pub async fn delete_ticket_type(&self, planner_id: Uuid, ticket_type_id: Uuid) -> Result<()> {
        let _stock = self.locks.ticket_types.lock(ticket_type_id).await;
        let ticket_type = self.ticket_type_of(planner_id, ticket_type_id).await?;
        if ticket_type.sold > 0 {
            return Err(MarketError::Conflict(format!(
                "Ticket type {} already sold {} tickets",
                ticket_type_id, ticket_type.sold
            )));
        }
        let mut changes = Changeset::new();
        changes.removed_ticket_types.push(ticket_type_id);
        self.store.commit(changes).await?;
        Ok(())
    }

    /// Sells `quantity` seats as one ticket and pays the planner their share.
    pub async fn purchase(&self, purchase: Purchase, now: DateTime<Utc>) -> Result<Ticket> {
        if purchase.quantity == 0 {
            return Err(MarketError::ValidationError("Quantity must be positive".to_string()));
        }
        let _stock = self.locks.ticket_types.lock(purchase.ticket_type_id).await;
        let mut ticket_type = self
            .store
            .ticket_type(purchase.ticket_type_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Ticket type {}", purchase.ticket_type_id)))?;
        let event = self
            .store
            .event(ticket_type.event_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Event {}", ticket_type.event_id)))?;

        if !event.published || event.has_ended(now) {
            return Err(MarketError::ValidationError(format!(
                "Event {} is not on sale",
                event.id
            )));
        }
        if !ticket_type.on_sale(now) {
            return Err(MarketError::ValidationError(format!(
                "'{}' is outside its sales window",
                ticket_type.title
            )));
        }
        ticket_type.sell(purchase.quantity)?;

        let planner = Owner::Planner(event.planner_id);
        let _wallet = self.locks.wallets.lock(planner).await;

        let ticket = Ticket::issue(
            &ticket_type,
            purchase.buyer_name,
            purchase.buyer_phone,
            purchase.quantity,
            now,
        )?;
        let gross = multiply(ticket_type.price, Decimal::from(purchase.quantity))?;

        let mut changes = Changeset::new();
        if gross > Decimal::ZERO {
            self.ledger
                .stage_payout(
                    planner,
                    CommissionKind::TicketSale,
                    gross,
                    gross,
                    ticket.id.to_string(),
                    format!("Ticket sale for {}", event.title),
                    now,
                    &mut changes,
                )
                .await?;
        }
        changes.ticket_types.push(ticket_type.clone());
        changes.tickets.push(ticket.clone());
        self.store.commit(changes).await?;

        info!(ticket = %ticket.id, ticket_type = %ticket_type.id, persons = ticket.persons, remaining = ticket_type.remaining(), "ticket sold");
        Ok(ticket)
    }

    /// Admits `persons` on a ticket of one of the planner's events.
    pub async fn scan(
        &self,
        planner_id: Uuid,
        ticket_id: Uuid,
        persons: u32,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let ticket_type_id = self
            .store
            .ticket(ticket_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Ticket {}", ticket_id)))?
            .ticket_type_id;
        let _stock = self.locks.ticket_types.lock(ticket_type_id).await;

        let mut ticket = self
            .store
            .ticket(ticket_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Ticket {}", ticket_id)))?;
        let event = self.event_of(planner_id, ticket.event_id).await?;
        if event.has_ended(now) {
            return Err(MarketError::Conflict(format!(
                "Event {} has already ended",
                event.id
            )));
        }
        ticket.admit(persons, now)?;

        let mut changes = Changeset::new();
        changes.tickets.push(ticket.clone());
        self.store.commit(changes).await?;

        info!(ticket = %ticket.id, admitted = persons, scanned = ticket.scanned_persons, "ticket scanned");
        Ok(ticket)
    }

    /// Events ordered by start time.
    pub async fn events(&self) -> Result<Vec<Event>> {
        let mut events = self.store.events().await?;
        events.sort_by_key(|e| e.start_at);
        Ok(events)
    }

    pub async fn ticket_types(&self, event_id: Uuid) -> Result<Vec<TicketType>> {
        let mut types = self.store.ticket_types_of(event_id).await?;
        types.sort_by_key(|t| t.created_at);
        Ok(types)
    }

    pub async fn tickets(&self, event_id: Uuid) -> Result<Vec<Ticket>> {
        let mut tickets = self.store.tickets_of_event(event_id).await?;
        tickets.sort_by_key(|t| t.issued_at);
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artist::Planner;
    use crate::domain::money::Balance;
    use crate::domain::ports::Store;
    use crate::infrastructure::in_memory::InMemoryStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    struct Fixture {
        ticketing: Ticketing,
        ledger: WalletLedger,
        planner: Uuid,
        event: Event,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let planner = Planner::new(Uuid::new_v4(), "Night Owls", Utc::now());
        let mut changes = Changeset::new();
        changes.planners.push(planner.clone());
        store.commit(changes).await.unwrap();

        let locks = Arc::new(Locks::new());
        let ledger = WalletLedger::new(store.clone(), locks.clone());
        let ticketing = Ticketing::new(store, ledger.clone(), locks);
        let start = Utc::now() + Duration::days(10);
        let event = ticketing
            .create_event(planner.id, "Open Air", start, start + Duration::hours(6))
            .await
            .unwrap();
        Fixture {
            ticketing,
            ledger,
            planner: planner.id,
            event,
        }
    }

    fn draft(quantity: u32) -> TicketTypeDraft {
        TicketTypeDraft {
            title: "Early bird".into(),
            price: dec!(250),
            quantity,
            sales_start: None,
            sales_end: None,
        }
    }

    fn purchase(ticket_type_id: Uuid, quantity: u32) -> Purchase {
        Purchase {
            ticket_type_id,
            quantity,
            buyer_name: "Ana".into(),
            buyer_phone: "+910000000000".into(),
        }
    }

    #[tokio::test]
    async fn test_unpublished_event_is_not_on_sale() {
        let f = fixture().await;
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, draft(10))
            .await
            .unwrap();
        assert!(matches!(
            f.ticketing.purchase(purchase(tt.id, 1), Utc::now()).await,
            Err(MarketError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_purchase_sells_stock_and_credits_planner() {
        let f = fixture().await;
        f.ledger.set_commission(dec!(0), dec!(10)).await.unwrap();
        f.ticketing.publish_event(f.planner, f.event.id).await.unwrap();
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, draft(10))
            .await
            .unwrap();

        let ticket = f
            .ticketing
            .purchase(purchase(tt.id, 4), Utc::now())
            .await
            .unwrap();
        assert_eq!(ticket.persons, 4);
        assert!(ticket.valid);

        let types = f.ticketing.ticket_types(f.event.id).await.unwrap();
        assert_eq!(types[0].sold, 4);

        // 4 x 250 = 1000, minus 10%
        let wallet = f.ledger.wallet(Owner::Planner(f.planner)).await.unwrap();
        assert_eq!(wallet.balance, Balance::new(dec!(900)));
    }

    #[tokio::test]
    async fn test_oversell_is_rejected_and_stock_unchanged() {
        let f = fixture().await;
        f.ticketing.publish_event(f.planner, f.event.id).await.unwrap();
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, draft(5))
            .await
            .unwrap();
        f.ticketing.purchase(purchase(tt.id, 4), Utc::now()).await.unwrap();

        assert!(matches!(
            f.ticketing.purchase(purchase(tt.id, 2), Utc::now()).await,
            Err(MarketError::Conflict(_))
        ));
        let types = f.ticketing.ticket_types(f.event.id).await.unwrap();
        assert_eq!(types[0].sold, 4);
        assert_eq!(f.ticketing.tickets(f.event.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sales_window_is_enforced() {
        let f = fixture().await;
        f.ticketing.publish_event(f.planner, f.event.id).await.unwrap();
        let now = Utc::now();
        let mut d = draft(5);
        d.sales_start = Some(now + Duration::days(1));
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, d)
            .await
            .unwrap();
        assert!(f.ticketing.purchase(purchase(tt.id, 1), now).await.is_err());
        assert!(f
            .ticketing
            .purchase(purchase(tt.id, 1), now + Duration::days(2))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_ticket_type_ownership_and_editing() {
        let f = fixture().await;
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, draft(5))
            .await
            .unwrap();
        assert!(matches!(
            f.ticketing
                .create_ticket_type(Uuid::new_v4(), f.event.id, draft(5))
                .await,
            Err(MarketError::Forbidden(_))
        ));

        let patched = f
            .ticketing
            .update_ticket_type(
                f.planner,
                tt.id,
                TicketTypePatch {
                    quantity: Some(8),
                    price: Some(dec!(300)),
                    ..TicketTypePatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.quantity, 8);
        assert_eq!(patched.price, dec!(300));

        f.ticketing.publish_event(f.planner, f.event.id).await.unwrap();
        f.ticketing.purchase(purchase(tt.id, 3), Utc::now()).await.unwrap();
        assert!(matches!(
            f.ticketing
                .update_ticket_type(
                    f.planner,
                    tt.id,
                    TicketTypePatch {
                        quantity: Some(2),
                        ..TicketTypePatch::default()
                    },
                )
                .await,
            Err(MarketError::Conflict(_))
        ));
        assert!(matches!(
            f.ticketing.delete_ticket_type(f.planner, tt.id).await,
            Err(MarketError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_unsold_ticket_type_can_be_deleted() {
        let f = fixture().await;
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, draft(5))
            .await
            .unwrap();
        f.ticketing.delete_ticket_type(f.planner, tt.id).await.unwrap();
        assert!(f.ticketing.ticket_types(f.event.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_admits_up_to_persons() {
        let f = fixture().await;
        f.ticketing.publish_event(f.planner, f.event.id).await.unwrap();
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, draft(5))
            .await
            .unwrap();
        let ticket = f
            .ticketing
            .purchase(purchase(tt.id, 3), Utc::now())
            .await
            .unwrap();

        let now = Utc::now();
        let scanned = f.ticketing.scan(f.planner, ticket.id, 2, now).await.unwrap();
        assert_eq!(scanned.scanned_persons, 2);
        assert!(!scanned.scanned);
        assert!(matches!(
            f.ticketing.scan(f.planner, ticket.id, 2, now).await,
            Err(MarketError::Conflict(_))
        ));
        assert!(matches!(
            f.ticketing.scan(Uuid::new_v4(), ticket.id, 1, now).await,
            Err(MarketError::Forbidden(_))
        ));
        let done = f.ticketing.scan(f.planner, ticket.id, 1, now).await.unwrap();
        assert!(done.scanned);
    }

    #[tokio::test]
    async fn test_ended_event_neither_sells_nor_admits() {
        let f = fixture().await;
        f.ticketing.publish_event(f.planner, f.event.id).await.unwrap();
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, draft(5))
            .await
            .unwrap();
        let ticket = f
            .ticketing
            .purchase(purchase(tt.id, 2), Utc::now())
            .await
            .unwrap();

        let after = f.event.end_at + Duration::hours(1);
        assert!(matches!(
            f.ticketing.purchase(purchase(tt.id, 1), after).await,
            Err(MarketError::ValidationError(_))
        ));
        assert!(matches!(
            f.ticketing.scan(f.planner, ticket.id, 1, after).await,
            Err(MarketError::Conflict(_))
        ));
        let types = f.ticketing.ticket_types(f.event.id).await.unwrap();
        assert_eq!(types[0].sold, 2);
    }

    #[tokio::test]
    async fn test_gross_beyond_decimal_range_is_rejected() {
        let f = fixture().await;
        f.ticketing.publish_event(f.planner, f.event.id).await.unwrap();
        let mut d = draft(5);
        d.price = Decimal::MAX / dec!(2);
        let tt = f
            .ticketing
            .create_ticket_type(f.planner, f.event.id, d)
            .await
            .unwrap();

        assert!(matches!(
            f.ticketing.purchase(purchase(tt.id, 3), Utc::now()).await,
            Err(MarketError::ValidationError(_))
        ));
        let types = f.ticketing.ticket_types(f.event.id).await.unwrap();
        assert_eq!(types[0].sold, 0);
        assert!(f.ticketing.tickets(f.event.id).await.unwrap().is_empty());
    }
}
