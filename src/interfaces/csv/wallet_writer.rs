use crate::domain::wallet::Wallet;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct WalletRow {
    owner_type: &'static str,
    owner_id: String,
    balance: Decimal,
    pending: Decimal,
    available: Decimal,
}

impl From<&Wallet> for WalletRow {
    fn from(wallet: &Wallet) -> Self {
        Self {
            owner_type: wallet.owner.kind(),
            owner_id: wallet.owner.id().to_string(),
            balance: wallet.balance.value().normalize(),
            pending: wallet.pending_amount.value().normalize(),
            available: wallet.available().value().normalize(),
        }
    }
}

/// Writes the final wallet summary as CSV.
pub struct WalletWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> WalletWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes a header followed by one row per wallet, then flushes.
    pub fn write_wallets(&mut self, wallets: &[Wallet]) -> Result<()> {
        if wallets.is_empty() {
            self.writer
                .write_record(["owner_type", "owner_id", "balance", "pending", "available"])?;
        }
        for wallet in wallets {
            self.writer.serialize(WalletRow::from(wallet))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Amount, Balance};
    use crate::domain::wallet::Owner;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_writes_header_and_rows() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut wallet = Wallet::new(Owner::Artist(id), now);
        wallet.credit(Amount::new(dec!(1000.00)).unwrap(), now).unwrap();
        wallet.pending_amount = Balance::new(dec!(600));

        let mut out = Vec::new();
        WalletWriter::new(&mut out).write_wallets(&[wallet]).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("owner_type,owner_id,balance,pending,available"));
        assert_eq!(lines.next(), Some(format!("artist,{},1000,600,400", id).as_str()));
    }

    #[test]
    fn test_empty_summary_still_has_header() {
        let mut out = Vec::new();
        WalletWriter::new(&mut out).write_wallets(&[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "owner_type,owner_id,balance,pending,available\n"
        );
    }
}
