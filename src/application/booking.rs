use super::availability::AvailabilityEngine;
use super::ledger::{CommissionKind, Posting, WalletLedger};
use super::locks::Locks;
use crate::domain::booking::{Booking, BookingSource, BookingStatus, PaymentStatus};
use crate::domain::calendar::{BlockType, CalendarBlock, Interval};
use crate::domain::ports::{Changeset, GatewayOrder, SharedGateway, SharedStore};
use crate::domain::service::PricingRole;
use crate::domain::wallet::{EntrySource, Owner};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A pending booking together with the order the client must pay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnlineBooking {
    pub booking: Booking,
    pub order: GatewayOrder,
}

/// Payment provider callback body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentConfirmation {
    pub booking: Booking,
    /// Net amount credited to the artist by this call.
    pub credited: Decimal,
    /// The callback had already been applied; nothing changed.
    pub replayed: bool,
}

/// Artist-entered booking taken outside the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineBooking {
    pub artist_id: Uuid,
    pub service_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_price: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Owns every booking state change.
///
/// Anything that reads availability and then writes a booking or block does
/// so while holding the artist's lock.
#[derive(Clone)]
pub struct BookingManager {
    store: SharedStore,
    gateway: SharedGateway,
    availability: AvailabilityEngine,
    ledger: WalletLedger,
    locks: Arc<Locks>,
}

impl BookingManager {
    pub fn new(
        store: SharedStore,
        gateway: SharedGateway,
        availability: AvailabilityEngine,
        ledger: WalletLedger,
        locks: Arc<Locks>,
    ) -> Self {
        Self {
            store,
            gateway,
            availability,
            ledger,
            locks,
        }
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking> {
        self.store
            .booking(booking_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Booking {}", booking_id)))
    }

    async fn linked_blocks(&self, booking: &Booking) -> Result<Vec<Uuid>> {
        Ok(self
            .store
            .blocks_of_artist(booking.artist_id)
            .await?
            .into_iter()
            .filter(|b| b.linked_booking_id == Some(booking.id))
            .map(|b| b.id)
            .collect())
    }

    /// Books a slot for a user paying by card.
    ///
    /// The booking is stored pending before the order is requested; if the
    /// gateway fails it is removed again and the error surfaces.
    pub async fn create_online(
        &self,
        client_id: Uuid,
        artist_id: Uuid,
        service_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<OnlineBooking> {
        let interval = Interval::new(start, end)?;
        let service = self.availability.resolve(artist_id, service_id).await?;
        let quote = service.quote(PricingRole::User, &interval)?;

        let _artist = self.locks.artists.lock(artist_id).await;
        self.availability.ensure_free(artist_id, &interval).await?;

        let now = Utc::now();
        let mut booking = Booking::new(
            Some(client_id),
            artist_id,
            service_id,
            BookingSource::User,
            interval,
            quote.total_price,
            now,
        );
        booking.advance_amount = quote.advance;

        let mut changes = Changeset::new();
        changes.bookings.push(booking.clone());
        self.store.commit(changes).await?;

        let order = match self
            .gateway
            .create_order(booking.amount_due_online(), &booking.id.to_string())
            .await
        {
            Ok(order) => order,
            Err(err) => {
                warn!(booking = %booking.id, error = %err, "order creation failed, rolling back booking");
                let mut changes = Changeset::new();
                changes.removed_bookings.push(booking.id);
                self.store.commit(changes).await?;
                return Err(err);
            }
        };

        booking.gateway_order_id = Some(order.order_id.clone());
        booking.updated_at = Utc::now();
        let mut changes = Changeset::new();
        changes.bookings.push(booking.clone());
        self.store.commit(changes).await?;

        info!(booking = %booking.id, %artist_id, order = %order.order_id, total = %booking.total_price, "online booking created");
        Ok(OnlineBooking { booking, order })
    }

    /// Books a slot for a planner paying in full from their wallet. The
    /// artist is credited net of commission in the same commit.
    pub async fn create_wallet_paid(
        &self,
        planner_id: Uuid,
        artist_id: Uuid,
        service_id: Uuid,
        event_id: Option<Uuid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking> {
        let interval = Interval::new(start, end)?;
        if self.store.planner(planner_id).await?.is_none() {
            return Err(MarketError::NotFound(format!("Planner {}", planner_id)));
        }
        let service = self.availability.resolve(artist_id, service_id).await?;
        let quote = service.quote(PricingRole::Planner, &interval)?;

        let planner = Owner::Planner(planner_id);
        let artist = Owner::Artist(artist_id);
        let _artist = self.locks.artists.lock(artist_id).await;
        let _wallets = self.locks.wallets.lock_all(vec![planner, artist]).await;
        self.availability.ensure_free(artist_id, &interval).await?;

        let now = Utc::now();
        let mut booking = Booking::new(
            Some(planner_id),
            artist_id,
            service_id,
            BookingSource::Planner,
            interval,
            quote.total_price,
            now,
        );
        booking.event_id = event_id;
        booking.advance_amount = quote.advance;
        booking.record_payment(quote.total_price, None, now);

        let mut changes = Changeset::new();
        let mut wallet = self.ledger.load(planner, now).await?;
        WalletLedger::stage_debit(
            &mut wallet,
            Posting {
                owner: planner,
                amount: quote.total_price,
                source: EntrySource::Booking,
                reference: Some(booking.id.to_string()),
                description: format!("Booking {}", booking.id),
            },
            now,
            &mut changes,
        )?;
        changes.wallets.push(wallet);

        self.ledger
            .stage_payout(
                artist,
                CommissionKind::ArtistBooking,
                booking.total_price,
                booking.paid_amount,
                booking.id.to_string(),
                format!("Payout for booking {}", booking.id),
                now,
                &mut changes,
            )
            .await?;

        changes.blocks.push(
            CalendarBlock::new(artist_id, interval, BlockType::OnlineBooking, "Planner booking", now)
                .linked_to(booking.id)
                .created_by(Some(planner_id)),
        );
        changes.bookings.push(booking.clone());
        self.store.commit(changes).await?;

        info!(booking = %booking.id, %artist_id, %planner_id, total = %booking.total_price, "wallet-paid booking created");
        Ok(booking)
    }

    /// Records a booking the artist took outside the platform.
    pub async fn create_offline(&self, request: OfflineBooking) -> Result<Booking> {
        let interval = Interval::new(request.start, request.end)?;
        if request.total_price < Decimal::ZERO {
            return Err(MarketError::ValidationError(
                "Total price cannot be negative".to_string(),
            ));
        }
        self.availability
            .resolve(request.artist_id, request.service_id)
            .await?;

        let _artist = self.locks.artists.lock(request.artist_id).await;
        self.availability
            .ensure_free(request.artist_id, &interval)
            .await?;

        let now = Utc::now();
        let mut booking = Booking::new(
            None,
            request.artist_id,
            request.service_id,
            BookingSource::Offline,
            interval,
            request.total_price,
            now,
        );
        booking.status = BookingStatus::Confirmed;
        booking.notes = request.notes;

        let title = booking.notes.clone().unwrap_or_else(|| "Offline booking".to_string());
        let mut changes = Changeset::new();
        changes.blocks.push(
            CalendarBlock::new(request.artist_id, interval, BlockType::OfflineBooking, title, now)
                .linked_to(booking.id),
        );
        changes.bookings.push(booking.clone());
        self.store.commit(changes).await?;

        info!(booking = %booking.id, artist_id = %request.artist_id, "offline booking created");
        Ok(booking)
    }

    /// Applies a verified gateway payment. Replays of an applied callback
    /// return the booking untouched.
    pub async fn confirm_payment(&self, callback: PaymentCallback) -> Result<PaymentConfirmation> {
        let verified = self
            .gateway
            .verify_signature(&callback.order_id, &callback.payment_id, &callback.signature)
            .await?;
        if !verified {
            warn!(order = %callback.order_id, "payment signature rejected");
            return Err(MarketError::PaymentVerificationFailed);
        }

        let artist_id = self
            .store
            .booking_by_order(&callback.order_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Booking for order {}", callback.order_id)))?
            .artist_id;
        let _artist = self.locks.artists.lock(artist_id).await;
        let _wallet = self.locks.wallets.lock(Owner::Artist(artist_id)).await;

        let mut booking = self
            .store
            .booking_by_order(&callback.order_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Booking for order {}", callback.order_id)))?;

        // Keyed by order: once captured, later callbacks never reapply effects,
        // even after a refund
        if booking.payment_status.is_settled() || booking.gateway_payment_id.is_some() {
            info!(booking = %booking.id, order = %callback.order_id, "duplicate payment callback ignored");
            return Ok(PaymentConfirmation {
                booking,
                credited: Decimal::ZERO,
                replayed: true,
            });
        }
        if booking.status != BookingStatus::Pending {
            return Err(MarketError::InvalidStatus(format!(
                "Booking {} is {} and cannot take a payment",
                booking.id, booking.status
            )));
        }

        let now = Utc::now();
        let captured = booking.amount_due_online();
        booking.record_payment(captured, Some(callback.payment_id), now);

        let mut changes = Changeset::new();
        let payout = self
            .ledger
            .stage_payout(
                Owner::Artist(artist_id),
                CommissionKind::ArtistBooking,
                booking.total_price,
                booking.paid_amount,
                booking.id.to_string(),
                format!("Payout for booking {}", booking.id),
                now,
                &mut changes,
            )
            .await?;
        changes.blocks.push(
            CalendarBlock::new(artist_id, booking.interval, BlockType::OnlineBooking, "Online booking", now)
                .linked_to(booking.id)
                .created_by(booking.client_id),
        );
        changes.bookings.push(booking.clone());
        self.store.commit(changes).await?;

        let credited = payout.net_credit.max(Decimal::ZERO);
        info!(booking = %booking.id, captured = %captured, commission = %payout.commission, %credited, "payment confirmed");
        Ok(PaymentConfirmation {
            booking,
            credited,
            replayed: false,
        })
    }

    /// Manual status change by name. Cancelling frees the calendar.
    pub async fn update_status(&self, booking_id: Uuid, status: &str) -> Result<Booking> {
        let next: BookingStatus = status.parse()?;
        self.set_status(booking_id, next).await
    }

    pub async fn cancel(&self, booking_id: Uuid) -> Result<Booking> {
        self.set_status(booking_id, BookingStatus::Cancelled).await
    }

    async fn set_status(&self, booking_id: Uuid, next: BookingStatus) -> Result<Booking> {
        let artist_id = self.load(booking_id).await?.artist_id;
        let _artist = self.locks.artists.lock(artist_id).await;

        let mut booking = self.load(booking_id).await?;
        booking.transition(next, Utc::now())?;

        let mut changes = Changeset::new();
        if next == BookingStatus::Cancelled {
            changes.removed_blocks = self.linked_blocks(&booking).await?;
        }
        changes.bookings.push(booking.clone());
        self.store.commit(changes).await?;

        info!(booking = %booking.id, status = %booking.status, "booking status updated");
        Ok(booking)
    }

    /// Marks the payment refunded. An active booking is cancelled and frees
    /// its calendar slot; a completed or cancelled one keeps its status.
    /// Money movement happens outside the ledger.
    pub async fn mark_refunded(&self, booking_id: Uuid) -> Result<Booking> {
        let artist_id = self.load(booking_id).await?.artist_id;
        let _artist = self.locks.artists.lock(artist_id).await;

        let mut booking = self.load(booking_id).await?;
        if booking.payment_status == PaymentStatus::Refunded {
            return Err(MarketError::InvalidStatus(format!(
                "Booking {} is already refunded",
                booking.id
            )));
        }
        let now = Utc::now();
        let mut changes = Changeset::new();
        if booking.status.occupies_calendar() {
            booking.transition(BookingStatus::Cancelled, now)?;
            changes.removed_blocks = self.linked_blocks(&booking).await?;
        }
        booking.payment_status = PaymentStatus::Refunded;
        booking.updated_at = now;
        changes.bookings.push(booking.clone());
        self.store.commit(changes).await?;

        info!(booking = %booking.id, status = %booking.status, "booking refunded");
        Ok(booking)
    }

    pub async fn booking(&self, booking_id: Uuid) -> Result<Booking> {
        self.load(booking_id).await
    }

    pub async fn bookings_of_artist(&self, artist_id: Uuid) -> Result<Vec<Booking>> {
        let mut bookings = self.store.bookings_of_artist(artist_id).await?;
        bookings.sort_by_key(|b| b.interval.start);
        Ok(bookings)
    }

    pub async fn bookings_of_client(&self, client_id: Uuid) -> Result<Vec<Booking>> {
        let mut bookings = self.store.bookings_of_client(client_id).await?;
        bookings.sort_by_key(|b| b.interval.start);
        Ok(bookings)
    }
}
