use super::availability::AvailabilityEngine;
use super::booking::BookingManager;
use super::calendar::CalendarManager;
use super::catalog::Catalog;
use super::ledger::WalletLedger;
use super::locks::Locks;
use super::sweep::{DEFAULT_SWEEP_INTERVAL, Sweeper};
use super::ticketing::Ticketing;
use crate::domain::ports::{SharedGateway, SharedStore};
use crate::infrastructure::otp::OtpStore;
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Tunables for the marketplace core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSettings {
    /// How long an unpaid online booking may hold its slot.
    pub pending_booking_ttl: TimeDelta,
    pub otp_ttl: TimeDelta,
    pub sweep_interval: Duration,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            pending_booking_ttl: TimeDelta::minutes(30),
            otp_ttl: TimeDelta::minutes(5),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Wires every service over one store, one gateway and one lock table.
#[derive(Clone)]
pub struct Marketplace {
    pub catalog: Catalog,
    pub availability: AvailabilityEngine,
    pub bookings: BookingManager,
    pub calendar: CalendarManager,
    pub ledger: WalletLedger,
    pub ticketing: Ticketing,
    pub sweeper: Sweeper,
    pub otp: OtpStore,
    pub settings: MarketSettings,
}

impl Marketplace {
    pub fn new(store: SharedStore, gateway: SharedGateway, settings: MarketSettings) -> Self {
        let locks = Arc::new(Locks::new());
        let availability = AvailabilityEngine::new(store.clone());
        let ledger = WalletLedger::new(store.clone(), locks.clone());
        let otp = OtpStore::new(settings.otp_ttl);

        Self {
            catalog: Catalog::new(store.clone(), locks.clone()),
            bookings: BookingManager::new(
                store.clone(),
                gateway,
                availability.clone(),
                ledger.clone(),
                locks.clone(),
            ),
            calendar: CalendarManager::new(store.clone(), availability.clone(), locks.clone()),
            ticketing: Ticketing::new(store.clone(), ledger.clone(), locks.clone()),
            sweeper: Sweeper::new(store, locks, otp.clone(), settings.pending_booking_ttl),
            otp,
            availability,
            ledger,
            settings,
        }
    }

    /// Starts the background sweep on the configured interval.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.sweeper.clone().spawn(self.settings.sweep_interval)
    }
}
