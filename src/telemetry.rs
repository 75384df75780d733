use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "stagebook=info";

/// Installs the global subscriber. Logs go to stderr so stdout stays
/// machine-readable; `RUST_LOG` overrides the default filter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
