use super::locks::Locks;
use crate::domain::artist::{Artist, Planner, VerificationStatus};
use crate::domain::ports::{Changeset, SharedStore};
use crate::domain::review::{Review, average_rating};
use crate::domain::service::{BillingUnit, Service};
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDraft {
    pub category: String,
    #[serde(default)]
    pub unit: BillingUnit,
    #[serde(default)]
    pub price_for_user: Option<Decimal>,
    #[serde(default)]
    pub price_for_planner: Option<Decimal>,
    #[serde(default)]
    pub advance: Option<Decimal>,
}

/// A verified artist as listed on the storefront.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSummary {
    pub artist_id: Uuid,
    pub display_name: String,
    pub location: Option<String>,
    pub category: Option<String>,
    pub specialties: Vec<String>,
    /// Cheapest positive user price across the artist's services.
    pub starting_price: Decimal,
    pub rating: Decimal,
    pub review_count: usize,
    #[serde(skip)]
    created_at: DateTime<Utc>,
}

/// Artist, planner, service and review records.
#[derive(Clone)]
pub struct Catalog {
    store: SharedStore,
    locks: Arc<Locks>,
}

impl Catalog {
    pub fn new(store: SharedStore, locks: Arc<Locks>) -> Self {
        Self { store, locks }
    }

    pub async fn register_artist(
        &self,
        user_id: Uuid,
        display_name: &str,
        categories: Vec<String>,
        location: Option<String>,
    ) -> Result<Artist> {
        if display_name.trim().is_empty() {
            return Err(MarketError::ValidationError("Display name is required".to_string()));
        }
        let mut artist = Artist::new(user_id, display_name.trim(), Utc::now());
        artist.categories = categories;
        artist.location = location;

        let mut changes = Changeset::new();
        changes.artists.push(artist.clone());
        self.store.commit(changes).await?;
        info!(artist = %artist.id, "artist registered");
        Ok(artist)
    }

    pub async fn register_planner(&self, user_id: Uuid, organization: &str) -> Result<Planner> {
        if organization.trim().is_empty() {
            return Err(MarketError::ValidationError("Organization is required".to_string()));
        }
        let planner = Planner::new(user_id, organization.trim(), Utc::now());

        let mut changes = Changeset::new();
        changes.planners.push(planner.clone());
        self.store.commit(changes).await?;
        info!(planner = %planner.id, "planner registered");
        Ok(planner)
    }

    pub async fn set_artist_verification(
        &self,
        artist_id: Uuid,
        status: VerificationStatus,
    ) -> Result<Artist> {
        let mut artist = self.artist(artist_id).await?;
        artist.verification = status;

        let mut changes = Changeset::new();
        changes.artists.push(artist.clone());
        self.store.commit(changes).await?;
        Ok(artist)
    }

    /// Adds a priced service. Prices may be left unset; quoting an unset
    /// price fails later with `PricingNotConfigured`.
    pub async fn add_service(&self, artist_id: Uuid, draft: ServiceDraft) -> Result<Service> {
        self.artist(artist_id).await?;
        for (field, value) in [
            ("price_for_user", draft.price_for_user),
            ("price_for_planner", draft.price_for_planner),
            ("advance", draft.advance),
        ] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(MarketError::ValidationError(format!(
                    "{} cannot be negative",
                    field
                )));
            }
        }

        let service = Service {
            id: Uuid::new_v4(),
            artist_id,
            category: draft.category,
            unit: draft.unit,
            price_for_user: draft.price_for_user,
            price_for_planner: draft.price_for_planner,
            advance: draft.advance,
            created_at: Utc::now(),
        };
        let mut changes = Changeset::new();
        changes.services.push(service.clone());
        self.store.commit(changes).await?;
        info!(service = %service.id, %artist_id, unit = ?service.unit, "service added");
        Ok(service)
    }

    pub async fn artist(&self, artist_id: Uuid) -> Result<Artist> {
        self.store
            .artist(artist_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Artist {}", artist_id)))
    }

    pub async fn planner(&self, planner_id: Uuid) -> Result<Planner> {
        self.store
            .planner(planner_id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Planner {}", planner_id)))
    }

    pub async fn services_of(&self, artist_id: Uuid) -> Result<Vec<Service>> {
        let mut services = self.store.services_of(artist_id).await?;
        services.sort_by_key(|s| s.created_at);
        Ok(services)
    }

    /// Records a client's rating of an artist. A client who already rated
    /// the artist revises that review instead of adding another.
    pub async fn add_review(
        &self,
        artist_id: Uuid,
        client_id: Uuid,
        rating: u8,
        message: Option<String>,
    ) -> Result<Review> {
        self.artist(artist_id).await?;
        let _artist = self.locks.artists.lock(artist_id).await;
        let now = Utc::now();

        let existing = self
            .store
            .reviews_of(artist_id)
            .await?
            .into_iter()
            .find(|r| r.client_id == client_id);
        let review = match existing {
            Some(mut review) => {
                review.revise(rating, message, now)?;
                review
            }
            None => Review::new(artist_id, client_id, rating, message, now)?,
        };

        let mut changes = Changeset::new();
        changes.reviews.push(review.clone());
        self.store.commit(changes).await?;
        info!(review = %review.id, %artist_id, rating, "review recorded");
        Ok(review)
    }

    /// Newest first.
    pub async fn reviews_of(&self, artist_id: Uuid) -> Result<Vec<Review>> {
        self.artist(artist_id).await?;
        let mut reviews = self.store.reviews_of(artist_id).await?;
        reviews.sort_by_key(|r| Reverse(r.updated_at));
        Ok(reviews)
    }

    /// Verified artists ranked by average rating, then by number of
    /// reviews, then newest first.
    pub async fn top_artists(&self, limit: usize) -> Result<Vec<ArtistSummary>> {
        let mut ranked = Vec::new();
        for artist in self.store.artists().await? {
            if artist.verification != VerificationStatus::Verified {
                continue;
            }
            let services = self.services_of(artist.id).await?;
            let reviews = self.store.reviews_of(artist.id).await?;
            ranked.push(summarize(artist, &services, &reviews));
        }
        ranked.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then(b.review_count.cmp(&a.review_count))
                .then(b.created_at.cmp(&a.created_at))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }
}

fn summarize(artist: Artist, services: &[Service], reviews: &[Review]) -> ArtistSummary {
    // Service categories take precedence over the artist's own tags
    let mut categories: Vec<String> = services.iter().map(|s| s.category.clone()).collect();
    if categories.is_empty() {
        categories = artist.categories;
    }
    let mut categories = categories.into_iter();
    let starting_price = services
        .iter()
        .filter_map(|s| s.price_for_user)
        .filter(|p| *p > Decimal::ZERO)
        .min()
        .unwrap_or(Decimal::ZERO);

    ArtistSummary {
        artist_id: artist.id,
        display_name: artist.display_name,
        location: artist.location,
        category: categories.next(),
        specialties: categories.collect(),
        starting_price,
        rating: average_rating(reviews),
        review_count: reviews.len(),
        created_at: artist.created_at,
    }
}
