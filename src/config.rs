use crate::application::marketplace::MarketSettings;
use chrono::TimeDelta;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GATEWAY_SECRET: &str = "sandbox_secret";

/// Command line and environment configuration. A `.env` file in the working
/// directory is loaded before parsing.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Replays marketplace commands and prints wallet balances", long_about = None)]
pub struct Settings {
    /// JSON-lines command file
    pub input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "STAGEBOOK_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Key secret used to verify payment callbacks
    #[arg(long, env = "STAGEBOOK_GATEWAY_SECRET", default_value = DEFAULT_GATEWAY_SECRET, hide_env_values = true)]
    pub gateway_secret: String,

    /// Minutes an unpaid online booking may hold its slot
    #[arg(long, env = "STAGEBOOK_PENDING_BOOKING_TTL_MINS", default_value_t = 30, value_parser = clap::value_parser!(i64).range(1..))]
    pub pending_booking_ttl_mins: i64,

    /// Minutes a one-time code stays valid
    #[arg(long, env = "STAGEBOOK_OTP_TTL_MINS", default_value_t = 5, value_parser = clap::value_parser!(i64).range(1..))]
    pub otp_ttl_mins: i64,

    /// Minutes between background sweeps
    #[arg(long, env = "STAGEBOOK_SWEEP_INTERVAL_MINS", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval_mins: u64,

    /// Hide internal error detail from responses
    #[arg(long, env = "STAGEBOOK_PRODUCTION")]
    pub production: bool,
}

impl Settings {
    pub fn market_settings(&self) -> MarketSettings {
        MarketSettings {
            pending_booking_ttl: TimeDelta::minutes(self.pending_booking_ttl_mins),
            otp_ttl: TimeDelta::minutes(self.otp_ttl_mins),
            sweep_interval: Duration::from_secs(self.sweep_interval_mins * 60),
        }
    }
}
