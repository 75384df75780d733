#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use stagebook::application::ledger::Posting;
use stagebook::application::marketplace::{MarketSettings, Marketplace};
use stagebook::application::catalog::ServiceDraft;
use stagebook::domain::artist::{Artist, Planner};
use stagebook::domain::service::{BillingUnit, Service};
use stagebook::domain::wallet::{EntrySource, Owner};
use stagebook::infrastructure::gateway::HmacGateway;
use stagebook::infrastructure::in_memory::InMemoryStore;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub const SECRET: &str = "integration_secret";

pub struct World {
    pub market: Marketplace,
    pub gateway: HmacGateway,
    pub artist: Artist,
    pub service: Service,
    pub planner: Planner,
}

/// A marketplace over a fresh in-memory store with one artist offering a
/// day-rate service (1000 for users, 900 for planners, 200 advance) and one
/// planner.
pub async fn world() -> World {
    let gateway = HmacGateway::new(SECRET);
    let market = Marketplace::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(gateway.clone()),
        MarketSettings::default(),
    );
    let artist = market
        .catalog
        .register_artist(Uuid::new_v4(), "The Lanterns", vec!["band".into()], None)
        .await
        .unwrap();
    let service = market
        .catalog
        .add_service(
            artist.id,
            ServiceDraft {
                category: "band".into(),
                unit: BillingUnit::Day,
                price_for_user: Some(dec!(1000)),
                price_for_planner: Some(dec!(900)),
                advance: Some(dec!(200)),
            },
        )
        .await
        .unwrap();
    let planner = market
        .catalog
        .register_planner(Uuid::new_v4(), "Festival Co")
        .await
        .unwrap();
    World {
        market,
        gateway,
        artist,
        service,
        planner,
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

pub async fn fund(market: &Marketplace, owner: Owner, amount: Decimal) {
    market
        .ledger
        .credit(Posting {
            owner,
            amount,
            source: EntrySource::Adjustment,
            reference: None,
            description: "test funding".into(),
        })
        .await
        .unwrap();
}

pub fn write_commands(path: &Path, commands: &[Value]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for command in commands {
        writeln!(file, "{}", command)?;
    }
    Ok(())
}
