use clap::Parser;
use miette::{IntoDiagnostic, Result};
use stagebook::application::marketplace::Marketplace;
use stagebook::config::Settings;
use stagebook::infrastructure::gateway::HmacGateway;
use stagebook::interfaces::csv::wallet_writer::WalletWriter;
use stagebook::interfaces::json::command_reader::CommandReader;
use stagebook::interfaces::json::session::Session;
use stagebook::{open_store, telemetry};
use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::parse();
    telemetry::init();

    let store = open_store(settings.db_path.as_deref()).into_diagnostic()?;
    let gateway = HmacGateway::new(settings.gateway_secret.clone());
    let market = Marketplace::new(store, Arc::new(gateway.clone()), settings.market_settings());
    let sweeping = market.spawn_sweeper();
    let mut session = Session::new(market, gateway, settings.production);

    // Replay commands, one envelope per line
    let file = File::open(&settings.input).into_diagnostic()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for command in CommandReader::new(file).commands() {
        match command {
            Ok(raw) => {
                let line = raw.line;
                match session.handle(raw).await {
                    Ok(envelope) => {
                        serde_json::to_writer(&mut out, &envelope).into_diagnostic()?;
                        writeln!(out).into_diagnostic()?;
                    }
                    Err(e) => {
                        eprintln!("Error processing command on line {}: {}", line, e);
                    }
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    sweeping.abort();

    // Output final wallet state
    let wallets = session.market().ledger.wallets().await.into_diagnostic()?;
    let mut writer = WalletWriter::new(out);
    writer.write_wallets(&wallets).into_diagnostic()?;

    Ok(())
}
