use super::availability::AvailabilityEngine;
use super::locks::Locks;
use crate::domain::calendar::{BlockType, CalendarBlock, Interval};
use crate::domain::ports::{Changeset, SharedStore};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Manual busy blocks on an artist's calendar.
#[derive(Clone)]
pub struct CalendarManager {
    store: SharedStore,
    availability: AvailabilityEngine,
    locks: Arc<Locks>,
}

impl CalendarManager {
    pub fn new(store: SharedStore, availability: AvailabilityEngine, locks: Arc<Locks>) -> Self {
        Self {
            store,
            availability,
            locks,
        }
    }

    pub async fn create_block(
        &self,
        artist_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: &str,
        created_by: Option<Uuid>,
    ) -> Result<CalendarBlock> {
        let interval = Interval::new(start, end)?;
        if self.store.artist(artist_id).await?.is_none() {
            return Err(MarketError::NotFound(format!("Artist {}", artist_id)));
        }

        let _artist = self.locks.artists.lock(artist_id).await;
        self.availability.ensure_free(artist_id, &interval).await?;

        let block = CalendarBlock::new(artist_id, interval, BlockType::Busy, title, Utc::now())
            .created_by(created_by);
        let mut changes = Changeset::new();
        changes.blocks.push(block.clone());
        self.store.commit(changes).await?;

        info!(block = %block.id, %artist_id, "calendar block created");
        Ok(block)
    }

    /// Blocks of `artist_id` ordered by start.
    pub async fn list_blocks(&self, artist_id: Uuid) -> Result<Vec<CalendarBlock>> {
        let mut blocks = self.store.blocks_of_artist(artist_id).await?;
        blocks.sort_by_key(|b| b.interval.start);
        Ok(blocks)
    }

    /// Deletes a manual block. Blocks held by a booking go away with the
    /// booking, not through here.
    pub async fn delete_block(&self, artist_id: Uuid, block_id: Uuid) -> Result<()> {
        let _artist = self.locks.artists.lock(artist_id).await;
        let block = match self.store.block(block_id).await? {
            Some(block) if block.artist_id == artist_id => block,
            _ => return Err(MarketError::NotFound(format!("Calendar block {}", block_id))),
        };
        if block.linked_booking_id.is_some() || block.r#type != BlockType::Busy {
            return Err(MarketError::Conflict(format!(
                "Calendar block {} belongs to a booking",
                block_id
            )));
        }

        let mut changes = Changeset::new();
        changes.removed_blocks.push(block_id);
        self.store.commit(changes).await?;

        info!(block = %block_id, %artist_id, "calendar block deleted");
        Ok(())
    }
}
