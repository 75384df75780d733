use super::calendar::Interval;
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingSource {
    User,
    Planner,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Pending and confirmed bookings hold the artist's calendar.
    pub fn occupies_calendar(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(MarketError::InvalidStatus(format!(
                "'{}' is not a booking status",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Advance,
    Authorized,
    Paid,
    Refunded,
}

impl PaymentStatus {
    /// Money has been captured for this booking.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Advance | PaymentStatus::Paid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub artist_id: Uuid,
    pub service_id: Uuid,
    pub event_id: Option<Uuid>,
    pub source: BookingSource,
    pub interval: Interval,
    pub total_price: Decimal,
    pub paid_amount: Decimal,
    pub advance_amount: Decimal,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        client_id: Option<Uuid>,
        artist_id: Uuid,
        service_id: Uuid,
        source: BookingSource,
        interval: Interval,
        total_price: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            artist_id,
            service_id,
            event_id: None,
            source,
            interval,
            total_price,
            paid_amount: Decimal::ZERO,
            advance_amount: Decimal::ZERO,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            gateway_order_id: None,
            gateway_payment_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount collected through the gateway: the advance when one is
    /// configured, otherwise the full price.
    pub fn amount_due_online(&self) -> Decimal {
        if self.advance_amount > Decimal::ZERO {
            self.advance_amount.min(self.total_price)
        } else {
            self.total_price
        }
    }

    pub fn occupies(&self, interval: &Interval) -> bool {
        self.status.occupies_calendar() && self.interval.overlaps(interval)
    }

    /// Applies a manual status change, rejecting anything outside the
    /// lifecycle graph.
    pub fn transition(&mut self, next: BookingStatus, now: DateTime<Utc>) -> Result<(), MarketError> {
        if !self.status.can_transition_to(next) {
            return Err(MarketError::InvalidStatus(format!(
                "Cannot move booking from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Records a captured payment. A capture covering the full price
    /// settles the booking as paid; anything less counts as an advance.
    pub fn record_payment(&mut self, captured: Decimal, payment_id: Option<String>, now: DateTime<Utc>) {
        self.paid_amount = captured;
        self.payment_status = if captured >= self.total_price {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Advance
        };
        self.gateway_payment_id = payment_id;
        self.status = BookingStatus::Confirmed;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn booking() -> Booking {
        let start = Utc.with_ymd_and_hms(2025, 5, 10, 20, 0, 0).unwrap();
        Booking::new(
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
            Uuid::new_v4(),
            BookingSource::User,
            Interval::new(start, start + Duration::hours(3)).unwrap(),
            dec!(3000),
            start,
        )
    }

    #[test]
    fn test_status_parsing_rejects_unknown_values() {
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert!(matches!(
            "archived".parse::<BookingStatus>(),
            Err(MarketError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut b = booking();
        let now = b.created_at;
        assert!(b.transition(BookingStatus::Completed, now).is_err());
        b.transition(BookingStatus::Confirmed, now).unwrap();
        b.transition(BookingStatus::Completed, now).unwrap();
        assert!(b.transition(BookingStatus::Cancelled, now).is_err());
        assert_eq!(b.status, BookingStatus::Completed);
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut b = booking();
        let now = b.created_at;
        b.transition(BookingStatus::Cancelled, now).unwrap();
        assert!(b.transition(BookingStatus::Pending, now).is_err());
        assert!(b.transition(BookingStatus::Confirmed, now).is_err());
        assert!(!b.status.occupies_calendar());
    }

    #[test]
    fn test_record_payment_distinguishes_advance_and_full() {
        let mut advance = booking();
        advance.record_payment(dec!(600), Some("pay_1".into()), advance.created_at);
        assert_eq!(advance.payment_status, PaymentStatus::Advance);
        assert_eq!(advance.status, BookingStatus::Confirmed);

        let mut full = booking();
        full.record_payment(dec!(3000), None, full.created_at);
        assert_eq!(full.payment_status, PaymentStatus::Paid);
    }
}
