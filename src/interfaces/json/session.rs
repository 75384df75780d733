use super::command::Command;
use super::command_reader::RawCommand;
use super::references::ReferenceBook;
use super::response::Envelope;
use crate::application::marketplace::Marketplace;
use crate::error::Result;
use crate::infrastructure::gateway::HmacGateway;
use tracing::Instrument;

/// Replays commands against one marketplace, remembering named results.
pub struct Session {
    market: Marketplace,
    signer: HmacGateway,
    references: ReferenceBook,
    production: bool,
}

impl Session {
    pub fn new(market: Marketplace, signer: HmacGateway, production: bool) -> Self {
        Self {
            market,
            signer,
            references: ReferenceBook::new(),
            production,
        }
    }

    pub fn market(&self) -> &Marketplace {
        &self.market
    }

    /// Runs one command.
    ///
    /// An `Err` means the line itself is unusable, such as an unknown op or a
    /// dangling reference. Business failures come back as a failure envelope.
    pub async fn handle(&mut self, raw: RawCommand) -> Result<Envelope> {
        let body = self.references.resolve(raw.body)?;
        let command: Command = serde_json::from_value(body)?;
        let name = command.name();

        let span = tracing::info_span!("command", line = raw.line, op = name);
        match command
            .execute(&self.market, &self.signer)
            .instrument(span)
            .await
        {
            Ok(outcome) => {
                if let Some(reference) = raw.reference
                    && let Some(data) = &outcome.data
                {
                    self.references.remember(reference, data.clone());
                }
                Ok(Envelope::success(outcome.message, outcome.data))
            }
            Err(err) => {
                tracing::debug!(error = %err, "command rejected");
                Ok(Envelope::failure(&err, self.production))
            }
        }
    }
}
