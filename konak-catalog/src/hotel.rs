use chrono::{DateTime, Utc};
use konak_core::bulk::{Exportable, StatusBearing};
use konak_core::query::{FieldValue, Fields};
use konak_core::{CoreError, CoreResult, Record};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_STARS: u8 = 5;
pub const MAX_SCORE: f64 = 10.0;

pub const HOTEL_SEARCH_FIELDS: &[&str] = &["name", "city", "country", "address"];

/// Hotel availability status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HotelStatus {
    #[default]
    Active,
    Inactive,
    FullyBooked,
    Maintenance,
}

impl HotelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HotelStatus::Active => "ACTIVE",
            HotelStatus::Inactive => "INACTIVE",
            HotelStatus::FullyBooked => "FULLY_BOOKED",
            HotelStatus::Maintenance => "MAINTENANCE",
        }
    }
}

/// A property in the hotel inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hotel {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub star_rating: u8,
    pub score: f64,
    pub description: Option<String>,
    pub status: HotelStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Staff form payload for creating or editing a hotel
#[derive(Debug, Clone, Deserialize)]
pub struct HotelDraft {
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub star_rating: u8,
    #[serde(default)]
    pub score: f64,
    pub description: Option<String>,
    #[serde(default)]
    pub status: HotelStatus,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RatingUpdate {
    pub star_rating: u8,
    pub score: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum HotelError {
    #[error("Hotel {0} is required")]
    MissingField(&'static str),

    #[error("Star rating must be between 0 and 5, got {0}")]
    InvalidStars(u8),

    #[error("Score must be between 0.0 and 10.0, got {0}")]
    InvalidScore(f64),
}

impl From<HotelError> for CoreError {
    fn from(err: HotelError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

fn required(value: &str, field: &'static str) -> Result<String, HotelError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(HotelError::MissingField(field));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_rating(stars: u8, score: f64) -> Result<(), HotelError> {
    if stars > MAX_STARS {
        return Err(HotelError::InvalidStars(stars));
    }
    if !score.is_finite() || !(0.0..=MAX_SCORE).contains(&score) {
        return Err(HotelError::InvalidScore(score));
    }
    Ok(())
}

impl Hotel {
    pub fn from_draft(draft: HotelDraft) -> Result<Self, HotelError> {
        let now = Utc::now();
        let mut hotel = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            address: String::new(),
            city: String::new(),
            country: String::new(),
            phone: None,
            email: None,
            website: None,
            star_rating: 0,
            score: 0.0,
            description: None,
            status: HotelStatus::Active,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        hotel.apply(draft)?;
        Ok(hotel)
    }

    /// Replace editable fields from a form submission. Nothing changes if validation fails.
    pub fn apply(&mut self, draft: HotelDraft) -> Result<(), HotelError> {
        let name = required(&draft.name, "name")?;
        let address = required(&draft.address, "address")?;
        let city = required(&draft.city, "city")?;
        let country = required(&draft.country, "country")?;
        check_rating(draft.star_rating, draft.score)?;

        self.name = name;
        self.address = address;
        self.city = city;
        self.country = country;
        self.phone = optional(draft.phone);
        self.email = optional(draft.email);
        self.website = optional(draft.website);
        self.star_rating = draft.star_rating;
        self.score = draft.score;
        self.description = optional(draft.description);
        self.status = draft.status;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn rate(&mut self, rating: RatingUpdate) -> Result<(), HotelError> {
        check_rating(rating.star_rating, rating.score)?;
        self.star_rating = rating.star_rating;
        self.score = rating.score;
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Record for Hotel {
    const KIND: &'static str = "hotels";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

impl Fields for Hotel {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => Some(FieldValue::text(&self.name)),
            "address" => Some(FieldValue::text(&self.address)),
            "city" => Some(FieldValue::text(&self.city)),
            "country" => Some(FieldValue::text(&self.country)),
            "phone" => self.phone.as_deref().map(FieldValue::text),
            "email" => self.email.as_deref().map(FieldValue::text),
            "website" => self.website.as_deref().map(FieldValue::text),
            "star_rating" => Some(FieldValue::Number(f64::from(self.star_rating))),
            "score" => Some(FieldValue::Number(self.score)),
            "status" => Some(FieldValue::text(self.status.as_str())),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

impl Exportable for Hotel {
    const COLUMNS: &'static [&'static str] = &[
        "name", "city", "country", "address", "phone", "email", "star_rating", "score", "status",
    ];
}

impl StatusBearing for Hotel {
    type Status = HotelStatus;

    /// Any status may follow any other.
    fn transition(&mut self, status: HotelStatus) -> CoreResult<()> {
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> HotelDraft {
        HotelDraft {
            name: " Lara Palace ".to_string(),
            address: "Güzeloba Mah. 12".to_string(),
            city: "Antalya".to_string(),
            country: "Türkiye".to_string(),
            phone: Some("".to_string()),
            email: Some("info@larapalace.example".to_string()),
            website: None,
            star_rating: 5,
            score: 8.7,
            description: None,
            status: HotelStatus::Active,
        }
    }

    #[test]
    fn test_hotel_from_draft() {
        let hotel = Hotel::from_draft(draft()).unwrap();
        assert_eq!(hotel.name, "Lara Palace");
        assert_eq!(hotel.phone, None);
        assert_eq!(hotel.version, 1);
        assert_eq!(hotel.field("star_rating"), Some(FieldValue::Number(5.0)));
    }

    #[test]
    fn test_rating_bounds() {
        let mut hotel = Hotel::from_draft(draft()).unwrap();
        assert!(matches!(
            hotel.rate(RatingUpdate { star_rating: 6, score: 5.0 }),
            Err(HotelError::InvalidStars(6))
        ));
        assert!(hotel.rate(RatingUpdate { star_rating: 3, score: 10.5 }).is_err());
        assert!(hotel.rate(RatingUpdate { star_rating: 3, score: f64::NAN }).is_err());

        hotel.rate(RatingUpdate { star_rating: 0, score: 10.0 }).unwrap();
        assert_eq!((hotel.star_rating, hotel.score), (0, 10.0));
    }

    #[test]
    fn test_failed_edit_leaves_hotel_untouched() {
        let mut hotel = Hotel::from_draft(draft()).unwrap();
        let before = hotel.clone();
        let mut bad = draft();
        bad.city = "   ".to_string();
        assert!(matches!(hotel.apply(bad), Err(HotelError::MissingField("city"))));
        assert_eq!(hotel, before);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&HotelStatus::FullyBooked).unwrap();
        assert_eq!(json, "\"FULLY_BOOKED\"");
    }
}
