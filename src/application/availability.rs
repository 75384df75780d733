use crate::domain::booking::Booking;
use crate::domain::calendar::{CalendarBlock, Interval};
use crate::domain::ports::SharedStore;
use crate::domain::service::{PricingRole, Quote, Service};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Something already holding part of the requested window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Conflict {
    Booking(Booking),
    Block(CalendarBlock),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub available: bool,
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedAvailability {
    #[serde(flatten)]
    pub availability: Availability,
    pub quote: Quote,
}

/// Read-only schedule and price lookups.
///
/// Nothing here takes a lock. Callers that act on an answer must hold the
/// artist lock across the check and their write.
#[derive(Clone)]
pub struct AvailabilityEngine {
    store: SharedStore,
}

impl AvailabilityEngine {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Loads the service, insisting that it belongs to `artist_id`.
    pub(crate) async fn resolve(&self, artist_id: Uuid, service_id: Uuid) -> Result<Service> {
        if self.store.artist(artist_id).await?.is_none() {
            return Err(MarketError::NotFound(format!("Artist {}", artist_id)));
        }
        match self.store.service(service_id).await? {
            Some(service) if service.artist_id == artist_id => Ok(service),
            _ => Err(MarketError::NotFound(format!(
                "Service {} for artist {}",
                service_id, artist_id
            ))),
        }
    }

    /// Every active booking and calendar block overlapping `interval`.
    pub(crate) async fn conflicts(&self, artist_id: Uuid, interval: &Interval) -> Result<Vec<Conflict>> {
        let bookings = self.store.bookings_of_artist(artist_id).await?;
        let blocks = self.store.blocks_of_artist(artist_id).await?;

        let mut conflicts: Vec<Conflict> = bookings
            .into_iter()
            .filter(|b| b.occupies(interval))
            .map(Conflict::Booking)
            .collect();
        conflicts.extend(
            blocks
                .into_iter()
                .filter(|b| b.interval.overlaps(interval))
                .map(Conflict::Block),
        );
        Ok(conflicts)
    }

    pub(crate) async fn ensure_free(&self, artist_id: Uuid, interval: &Interval) -> Result<()> {
        let conflicts = self.conflicts(artist_id, interval).await?;
        if conflicts.is_empty() {
            Ok(())
        } else {
            tracing::debug!(%artist_id, conflicts = conflicts.len(), "slot already taken");
            Err(MarketError::Conflict(format!(
                "Artist {} is not available between {} and {}",
                artist_id, interval.start, interval.end
            )))
        }
    }

    pub async fn check_availability(
        &self,
        artist_id: Uuid,
        service_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Availability> {
        let interval = Interval::new(start, end)?;
        self.resolve(artist_id, service_id).await?;
        let conflicts = self.conflicts(artist_id, &interval).await?;
        Ok(Availability {
            available: conflicts.is_empty(),
            conflicts,
        })
    }

    pub fn compute_price(
        &self,
        service: &Service,
        role: PricingRole,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Quote> {
        let interval = Interval::new(start, end)?;
        service.quote(role, &interval)
    }

    /// Availability and price in one read.
    pub async fn quote(
        &self,
        artist_id: Uuid,
        service_id: Uuid,
        role: PricingRole,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PricedAvailability> {
        let interval = Interval::new(start, end)?;
        let service = self.resolve(artist_id, service_id).await?;
        let quote = service.quote(role, &interval)?;
        let conflicts = self.conflicts(artist_id, &interval).await?;
        Ok(PricedAvailability {
            availability: Availability {
                available: conflicts.is_empty(),
                conflicts,
            },
            quote,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artist::Artist;
    use crate::domain::booking::{BookingSource, BookingStatus};
    use crate::domain::calendar::BlockType;
    use crate::domain::ports::{Changeset, Store};
    use crate::domain::service::BillingUnit;
    use crate::infrastructure::in_memory::InMemoryStore;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Fixture {
        engine: AvailabilityEngine,
        store: Arc<InMemoryStore>,
        artist: Artist,
        service: Service,
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 4, hour, 0, 0).unwrap()
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let artist = Artist::new(Uuid::new_v4(), "Nina", now);
        let service = Service {
            id: Uuid::new_v4(),
            artist_id: artist.id,
            category: "singer".into(),
            unit: BillingUnit::Hour,
            price_for_user: Some(dec!(500)),
            price_for_planner: None,
            advance: Some(dec!(100)),
            created_at: now,
        };
        let mut changes = Changeset::new();
        changes.artists.push(artist.clone());
        changes.services.push(service.clone());
        store.commit(changes).await.unwrap();

        Fixture {
            engine: AvailabilityEngine::new(store.clone()),
            store,
            artist,
            service,
        }
    }

    #[tokio::test]
    async fn test_empty_calendar_is_available() {
        let f = fixture().await;
        let result = f
            .engine
            .check_availability(f.artist.id, f.service.id, at(10), at(12))
            .await
            .unwrap();
        assert!(result.available);
        assert!(result.conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_active_bookings_and_blocks_conflict() {
        let f = fixture().await;
        let now = Utc::now();
        let booking = Booking::new(
            Some(Uuid::new_v4()),
            f.artist.id,
            f.service.id,
            BookingSource::User,
            Interval::new(at(10), at(12)).unwrap(),
            dec!(1000),
            now,
        );
        let mut cancelled = booking.clone();
        cancelled.id = Uuid::new_v4();
        cancelled.status = BookingStatus::Cancelled;
        let block = CalendarBlock::new(
            f.artist.id,
            Interval::new(at(14), at(16)).unwrap(),
            BlockType::Busy,
            "travel",
            now,
        );

        let mut changes = Changeset::new();
        changes.bookings.extend([booking.clone(), cancelled]);
        changes.blocks.push(block.clone());
        f.store.commit(changes).await.unwrap();

        let result = f
            .engine
            .check_availability(f.artist.id, f.service.id, at(11), at(15))
            .await
            .unwrap();
        assert!(!result.available);
        assert_eq!(
            result.conflicts,
            vec![Conflict::Booking(booking), Conflict::Block(block)]
        );

        // Back-to-back with both is fine
        let result = f
            .engine
            .check_availability(f.artist.id, f.service.id, at(12), at(14))
            .await
            .unwrap();
        assert!(result.available);
    }

    #[tokio::test]
    async fn test_service_must_belong_to_artist() {
        let f = fixture().await;
        let err = f
            .engine
            .check_availability(Uuid::new_v4(), f.service.id, at(10), at(11))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));

        let other = Artist::new(Uuid::new_v4(), "Other", Utc::now());
        let mut changes = Changeset::new();
        changes.artists.push(other.clone());
        f.store.commit(changes).await.unwrap();
        let err = f
            .engine
            .check_availability(other.id, f.service.id, at(10), at(11))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_inverted_window_is_rejected() {
        let f = fixture().await;
        let err = f
            .engine
            .check_availability(f.artist.id, f.service.id, at(12), at(10))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidInterval));
    }

    #[tokio::test]
    async fn test_quote_combines_price_and_availability() {
        let f = fixture().await;
        let priced = f
            .engine
            .quote(f.artist.id, f.service.id, PricingRole::User, at(10), at(12) + Duration::minutes(1))
            .await
            .unwrap();
        assert!(priced.availability.available);
        assert_eq!(priced.quote.units, 3);
        assert_eq!(priced.quote.total_price, dec!(1500));

        let err = f
            .engine
            .quote(f.artist.id, f.service.id, PricingRole::Planner, at(10), at(12))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::PricingNotConfigured(_)));
    }
}
