use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

/// A bookable performer. Wallet figures live in the ledger under
/// `Owner::Artist(id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub categories: Vec<String>,
    pub location: Option<String>,
    pub verification: VerificationStatus,
    pub created_at: DateTime<Utc>,
}

impl Artist {
    pub fn new(user_id: Uuid, display_name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            display_name: display_name.into(),
            categories: Vec::new(),
            location: None,
            verification: VerificationStatus::Pending,
            created_at,
        }
    }
}

/// An event organiser who books artists and sells tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planner {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization: String,
    pub verification: VerificationStatus,
    pub created_at: DateTime<Utc>,
}

impl Planner {
    pub fn new(user_id: Uuid, organization: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            organization: organization.into(),
            verification: VerificationStatus::Pending,
            created_at,
        }
    }
}
