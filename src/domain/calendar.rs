use crate::error::MarketError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, MarketError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(MarketError::InvalidInterval)
        }
    }

    /// Two windows conflict iff `a.start < b.end && a.end > b.start`.
    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    Busy,
    OfflineBooking,
    OnlineBooking,
}

/// An opaque busy marker on an artist's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarBlock {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub interval: Interval,
    pub r#type: BlockType,
    pub title: String,
    pub linked_booking_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CalendarBlock {
    pub fn new(
        artist_id: Uuid,
        interval: Interval,
        r#type: BlockType,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            artist_id,
            interval,
            r#type,
            title: title.into(),
            linked_booking_id: None,
            created_by: None,
            created_at,
        }
    }

    pub fn linked_to(mut self, booking_id: Uuid) -> Self {
        self.linked_booking_id = Some(booking_id);
        self
    }

    pub fn created_by(mut self, user_id: Option<Uuid>) -> Self {
        self.created_by = user_id;
        self
    }
}
