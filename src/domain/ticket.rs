use crate::error::MarketError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub planner_id: Uuid,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_at < now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub quantity: u32,
    pub sold: u32,
    pub sales_start: Option<DateTime<Utc>>,
    pub sales_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TicketType {
    pub fn remaining(&self) -> u32 {
        self.quantity.saturating_sub(self.sold)
    }

    pub fn on_sale(&self, now: DateTime<Utc>) -> bool {
        self.sales_start.is_none_or(|start| start <= now) && self.sales_end.is_none_or(|end| now <= end)
    }

    /// Takes `count` seats out of stock; stock is untouched on failure.
    pub fn sell(&mut self, count: u32) -> Result<(), MarketError> {
        match self.sold.checked_add(count) {
            Some(sold) if sold <= self.quantity => {
                self.sold = sold;
                Ok(())
            }
            _ => Err(MarketError::Conflict(format!(
                "Only {} tickets left for '{}'",
                self.remaining(),
                self.title
            ))),
        }
    }

    pub fn resize(&mut self, quantity: u32) -> Result<(), MarketError> {
        if quantity < self.sold {
            return Err(MarketError::Conflict(format!(
                "Cannot shrink '{}' to {} after {} were sold",
                self.title, quantity, self.sold
            )));
        }
        self.quantity = quantity;
        Ok(())
    }
}

/// Payload encoded into the ticket's QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub ticket_id: Uuid,
    pub event_id: Uuid,
    pub buyer_name: String,
    pub quantity: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_type_id: Uuid,
    pub event_id: Uuid,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub persons: u32,
    pub scanned_persons: u32,
    pub scanned: bool,
    pub valid: bool,
    pub qr_payload: String,
    pub issued_at: DateTime<Utc>,
    pub scanned_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn issue(
        ticket_type: &TicketType,
        buyer_name: String,
        buyer_phone: String,
        persons: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, MarketError> {
        let id = Uuid::new_v4();
        let payload = QrPayload {
            ticket_id: id,
            event_id: ticket_type.event_id,
            buyer_name: buyer_name.clone(),
            quantity: persons,
            timestamp: now.timestamp_millis(),
        };
        Ok(Self {
            id,
            ticket_type_id: ticket_type.id,
            event_id: ticket_type.event_id,
            buyer_name,
            buyer_phone,
            persons,
            scanned_persons: 0,
            scanned: false,
            valid: true,
            qr_payload: serde_json::to_string(&payload)?,
            issued_at: now,
            scanned_at: None,
        })
    }

    /// Admits `persons` more people on this ticket.
    pub fn admit(&mut self, persons: u32, now: DateTime<Utc>) -> Result<(), MarketError> {
        if !self.valid {
            return Err(MarketError::Conflict(format!(
                "Ticket {} is no longer valid",
                self.id
            )));
        }
        if persons == 0 {
            return Err(MarketError::ValidationError(
                "At least one person must be admitted".to_string(),
            ));
        }
        match self.scanned_persons.checked_add(persons) {
            Some(total) if total <= self.persons => {
                self.scanned_persons = total;
                self.scanned = total == self.persons;
                self.scanned_at = Some(now);
                Ok(())
            }
            _ => Err(MarketError::Conflict(format!(
                "Ticket {} admits {} more at most",
                self.id,
                self.persons - self.scanned_persons
            ))),
        }
    }
}
