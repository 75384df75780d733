use super::locks::Locks;
use crate::domain::booking::{BookingSource, BookingStatus, PaymentStatus};
use crate::domain::ports::{Changeset, SharedStore};
use crate::error::Result;
use crate::infrastructure::otp::OtpStore;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub events_unpublished: usize,
    pub tickets_invalidated: usize,
    pub bookings_cancelled: usize,
    pub otp_codes_purged: usize,
}

/// Periodic cleanup. Every pass is idempotent, so overlapping or repeated
/// runs are harmless.
#[derive(Clone)]
pub struct Sweeper {
    store: SharedStore,
    locks: Arc<Locks>,
    otp: OtpStore,
    pending_ttl: TimeDelta,
}

impl Sweeper {
    pub fn new(store: SharedStore, locks: Arc<Locks>, otp: OtpStore, pending_ttl: TimeDelta) -> Self {
        Self {
            store,
            locks,
            otp,
            pending_ttl,
        }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        self.expire_events(now, &mut report).await?;
        self.cancel_orphans(now, &mut report).await?;
        report.otp_codes_purged = self.otp.purge(now).await;

        if report != SweepReport::default() {
            info!(
                events = report.events_unpublished,
                tickets = report.tickets_invalidated,
                bookings = report.bookings_cancelled,
                otp_codes = report.otp_codes_purged,
                "sweep finished"
            );
        }
        Ok(report)
    }

    /// Unpublishes finished events and voids their outstanding tickets.
    ///
    /// Holds every ticket-type lock of the event while it rewrites tickets,
    /// so a scan or purchase in flight either lands first or sees the event
    /// closed.
    async fn expire_events(&self, now: DateTime<Utc>, report: &mut SweepReport) -> Result<()> {
        for candidate in self.store.events().await? {
            if !candidate.published || !candidate.has_ended(now) {
                continue;
            }
            let stock = self
                .store
                .ticket_types_of(candidate.id)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect();
            let _stock = self.locks.ticket_types.lock_all(stock).await;

            let Some(mut event) = self.store.event(candidate.id).await? else {
                continue;
            };
            if !event.published {
                continue;
            }
            event.published = false;

            let mut changes = Changeset::new();
            for mut ticket in self.store.tickets_of_event(event.id).await? {
                if ticket.valid {
                    ticket.valid = false;
                    changes.tickets.push(ticket);
                }
            }
            report.events_unpublished += 1;
            report.tickets_invalidated += changes.tickets.len();
            changes.events.push(event);
            self.store.commit(changes).await?;
        }
        Ok(())
    }

    /// Cancels user bookings that were never paid within the TTL, which also
    /// covers bookings whose order request died midway.
    async fn cancel_orphans(&self, now: DateTime<Utc>, report: &mut SweepReport) -> Result<()> {
        let cutoff = now - self.pending_ttl;
        let candidates = self.store.bookings_with_status(BookingStatus::Pending).await?;

        for candidate in candidates {
            if candidate.source != BookingSource::User || candidate.created_at > cutoff {
                continue;
            }
            let _artist = self.locks.artists.lock(candidate.artist_id).await;
            let Some(mut booking) = self.store.booking(candidate.id).await? else {
                continue;
            };
            if booking.status != BookingStatus::Pending || booking.payment_status != PaymentStatus::Unpaid {
                continue;
            }
            booking.transition(BookingStatus::Cancelled, now)?;
            booking.notes = Some("Payment not received in time".to_string());

            let mut changes = Changeset::new();
            changes.bookings.push(booking);
            self.store.commit(changes).await?;
            report.bookings_cancelled += 1;
        }
        Ok(())
    }

    /// Runs the sweep every `period` until the handle is aborted. The first
    /// pass happens immediately.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(err) = self.run_once(Utc::now()).await {
                    error!(error = %err, "sweep failed");
                }
            }
        })
    }
}
