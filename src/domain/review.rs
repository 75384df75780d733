use crate::error::MarketError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A client's rating of an artist. One per client and artist; a second
/// submission overwrites the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub client_id: Uuid,
    pub rating: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn check_rating(rating: u8) -> Result<(), MarketError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(MarketError::ValidationError(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }
    Ok(())
}

impl Review {
    pub fn new(
        artist_id: Uuid,
        client_id: Uuid,
        rating: u8,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, MarketError> {
        check_rating(rating)?;
        Ok(Self {
            id: Uuid::new_v4(),
            artist_id,
            client_id,
            rating,
            message: message.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the rating; an absent message keeps the previous one.
    pub fn revise(&mut self, rating: u8, message: Option<String>, now: DateTime<Utc>) -> Result<(), MarketError> {
        check_rating(rating)?;
        self.rating = rating;
        if let Some(message) = message {
            self.message = message;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Mean rating to two decimal places, zero when unrated.
pub fn average_rating(reviews: &[Review]) -> Decimal {
    if reviews.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = reviews.iter().map(|r| Decimal::from(r.rating)).sum();
    (total / Decimal::from(reviews.len())).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rating_bounds() {
        let now = Utc::now();
        assert!(Review::new(Uuid::new_v4(), Uuid::new_v4(), 0, None, now).is_err());
        assert!(Review::new(Uuid::new_v4(), Uuid::new_v4(), 6, None, now).is_err());

        let mut review = Review::new(Uuid::new_v4(), Uuid::new_v4(), 5, Some("great".into()), now).unwrap();
        assert!(matches!(
            review.revise(9, None, now),
            Err(MarketError::ValidationError(_))
        ));
        assert_eq!(review.rating, 5);

        review.revise(3, None, now).unwrap();
        assert_eq!(review.rating, 3);
        assert_eq!(review.message, "great");
    }

    #[test]
    fn test_average_rating() {
        let now = Utc::now();
        let artist = Uuid::new_v4();
        assert_eq!(average_rating(&[]), Decimal::ZERO);

        let reviews: Vec<Review> = [5, 4, 4]
            .into_iter()
            .map(|r| Review::new(artist, Uuid::new_v4(), r, None, now).unwrap())
            .collect();
        assert_eq!(average_rating(&reviews), dec!(4.33));
    }
}
