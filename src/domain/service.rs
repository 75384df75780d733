use super::calendar::Interval;
use super::money::multiply;
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Time granularity a service's rate is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingUnit {
    Hour,
    #[default]
    Day,
    Event,
}

impl BillingUnit {
    /// Number of billable units in `interval`. Partial periods bill as a
    /// full unit.
    pub fn units(&self, interval: &Interval) -> i64 {
        let millis = interval.duration().num_milliseconds();
        match self {
            BillingUnit::Hour => ceil_div(millis, MILLIS_PER_HOUR),
            BillingUnit::Day => ceil_div(millis, MILLIS_PER_DAY),
            BillingUnit::Event => 1,
        }
    }
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    (value + divisor - 1) / divisor
}

/// Which price list applies to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingRole {
    User,
    Planner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub category: String,
    pub unit: BillingUnit,
    pub price_for_user: Option<Decimal>,
    pub price_for_planner: Option<Decimal>,
    pub advance: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub units: i64,
    pub price_per_unit: Decimal,
    pub total_price: Decimal,
    pub advance: Decimal,
}

impl Service {
    pub fn price_for(&self, role: PricingRole) -> Option<Decimal> {
        match role {
            PricingRole::User => self.price_for_user,
            PricingRole::Planner => self.price_for_planner,
        }
    }

    /// Prices `interval` for the given role.
    ///
    /// The advance scales with units; for per-event services there is one
    /// unit, so the configured advance applies flat.
    pub fn quote(&self, role: PricingRole, interval: &Interval) -> Result<Quote, MarketError> {
        let price_per_unit = match self.price_for(role) {
            Some(price) if price > Decimal::ZERO => price,
            _ => return Err(MarketError::PricingNotConfigured(self.id)),
        };

        let units = self.unit.units(interval);
        let unit_count = Decimal::from(units);
        let advance = self.advance.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);

        Ok(Quote {
            units,
            price_per_unit,
            total_price: multiply(price_per_unit, unit_count)?,
            advance: multiply(advance, unit_count)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn service(unit: BillingUnit) -> Service {
        Service {
            id: Uuid::new_v4(),
            artist_id: Uuid::new_v4(),
            category: "dj".into(),
            unit,
            price_for_user: Some(dec!(1000)),
            price_for_planner: Some(dec!(800)),
            advance: Some(dec!(200)),
            created_at: Utc::now(),
        }
    }

    fn window(duration: Duration) -> Interval {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap();
        Interval::new(start, start + duration).unwrap()
    }

    #[test]
    fn test_day_unit_rounds_partial_days_up() {
        let quote = service(BillingUnit::Day)
            .quote(PricingRole::User, &window(Duration::hours(26)))
            .unwrap();
        assert_eq!(quote.units, 2);
        assert_eq!(quote.total_price, dec!(2000));
        assert_eq!(quote.advance, dec!(400));
    }

    #[test]
    fn test_hour_unit_rounds_partial_hours_up() {
        let svc = service(BillingUnit::Hour);
        let exact = svc
            .quote(PricingRole::User, &window(Duration::hours(3)))
            .unwrap();
        assert_eq!(exact.units, 3);

        let partial = svc
            .quote(PricingRole::User, &window(Duration::minutes(181)))
            .unwrap();
        assert_eq!(partial.units, 4);
        assert_eq!(partial.total_price, dec!(4000));
    }

    #[test]
    fn test_event_unit_is_flat() {
        let svc = service(BillingUnit::Event);
        for hours in [1, 5, 30, 200] {
            let quote = svc
                .quote(PricingRole::User, &window(Duration::hours(hours)))
                .unwrap();
            assert_eq!(quote.units, 1);
            assert_eq!(quote.total_price, dec!(1000));
            assert_eq!(quote.advance, dec!(200));
        }
    }

    #[test]
    fn test_price_is_monotonic_in_duration() {
        for unit in [BillingUnit::Hour, BillingUnit::Day] {
            let svc = service(unit);
            let mut previous = Decimal::ZERO;
            for minutes in (30..=(60 * 24 * 4)).step_by(45) {
                let quote = svc
                    .quote(PricingRole::User, &window(Duration::minutes(minutes)))
                    .unwrap();
                assert!(quote.total_price >= previous);
                previous = quote.total_price;
            }
        }
    }

    #[test]
    fn test_planner_role_uses_planner_price() {
        let quote = service(BillingUnit::Event)
            .quote(PricingRole::Planner, &window(Duration::hours(2)))
            .unwrap();
        assert_eq!(quote.price_per_unit, dec!(800));
    }

    #[test]
    fn test_missing_or_zero_price_is_not_configured() {
        let mut svc = service(BillingUnit::Hour);
        svc.price_for_planner = None;
        assert!(matches!(
            svc.quote(PricingRole::Planner, &window(Duration::hours(1))),
            Err(MarketError::PricingNotConfigured(_))
        ));

        svc.price_for_user = Some(dec!(0));
        assert!(matches!(
            svc.quote(PricingRole::User, &window(Duration::hours(1))),
            Err(MarketError::PricingNotConfigured(_))
        ));
    }

    #[test]
    fn test_price_beyond_decimal_range_is_rejected() {
        let mut svc = service(BillingUnit::Hour);
        svc.price_for_user = Some(Decimal::MAX / dec!(2));
        assert!(matches!(
            svc.quote(PricingRole::User, &window(Duration::hours(3))),
            Err(MarketError::ValidationError(_))
        ));
        // A single unit still fits
        assert!(svc.quote(PricingRole::User, &window(Duration::hours(1))).is_ok());
    }
}
