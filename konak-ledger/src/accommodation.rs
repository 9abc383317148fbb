use chrono::{DateTime, NaiveDate, Utc};
use konak_core::bulk::{Exportable, StatusBearing};
use konak_core::query::{FieldValue, Fields};
use konak_core::{CoreError, CoreResult, Record};
use konak_shared::Masked;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregation;

pub const ACCOMMODATION_SEARCH_FIELDS: &[&str] =
    &["guest_name", "hotel_name", "organization_name", "city", "country", "title"];

pub const INDIVIDUAL_LABEL: &str = "INDIVIDUAL";

/// Meal plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoardType {
    /// Bed and breakfast
    #[default]
    Bb,
    /// Half board
    Hb,
    /// Full board
    Fb,
    /// Ultra all-inclusive
    Uhd,
}

impl BoardType {
    pub fn as_str(self) -> &'static str {
        match self {
            BoardType::Bb => "BB",
            BoardType::Hb => "HB",
            BoardType::Fb => "FB",
            BoardType::Uhd => "UHD",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StayStatus {
    #[default]
    Reserved,
    CheckedIn,
    CheckedOut,
    NoShow,
}

impl StayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StayStatus::Reserved => "RESERVED",
            StayStatus::CheckedIn => "CHECKED_IN",
            StayStatus::CheckedOut => "CHECKED_OUT",
            StayStatus::NoShow => "NO_SHOW",
        }
    }

    pub fn can_transition_to(self, next: StayStatus) -> bool {
        use StayStatus::*;
        matches!(
            (self, next),
            (Reserved, CheckedIn) | (Reserved, NoShow) | (CheckedIn, CheckedOut)
        )
    }
}

/// One guest stay in the bookkeeping ledger.
///
/// `nights` and `total_charge` are derived from the dates and the nightly rate and
/// are recomputed on every write. Once transferred to sales the record is locked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccommodationRecord {
    pub id: Uuid,
    pub guest_name: String,
    pub guest_phone: Option<Masked<String>>,
    pub title: Option<String>,
    pub country: String,
    pub city: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_type: String,
    pub board_type: BoardType,
    pub nightly_rate: Decimal,
    pub nights: i64,
    pub total_charge: Decimal,
    pub organization_id: Option<Uuid>,
    pub organization_name: Option<String>,
    pub hotel_name: String,
    pub billing_party: Option<String>,
    pub individual: bool,
    pub status: StayStatus,
    pub transferred: bool,
    pub sale_id: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccommodationDraft {
    pub guest_name: String,
    pub guest_phone: Option<Masked<String>>,
    pub title: Option<String>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub room_type: String,
    #[serde(default)]
    pub board_type: BoardType,
    pub nightly_rate: Decimal,
    pub organization_id: Option<Uuid>,
    pub organization_name: Option<String>,
    pub hotel_name: String,
    pub billing_party: Option<String>,
    #[serde(default)]
    pub individual: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AccommodationError {
    #[error("Accommodation {0} is required")]
    MissingField(&'static str),

    #[error("Check-out {check_out} is before check-in {check_in}")]
    InvalidDateRange { check_in: NaiveDate, check_out: NaiveDate },

    #[error("Nightly rate cannot be negative: {0}")]
    NegativeRate(Decimal),

    #[error("Accommodation {0} was transferred to sales and can no longer be changed")]
    Transferred(Uuid),

    #[error("Invalid stay status transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

impl From<AccommodationError> for CoreError {
    fn from(err: AccommodationError) -> Self {
        match err {
            AccommodationError::Transferred(_) | AccommodationError::InvalidTransition { .. } => {
                CoreError::Conflict(err.to_string())
            }
            _ => CoreError::Validation(err.to_string()),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AccommodationDraft {
    fn validate(&self) -> Result<(), AccommodationError> {
        if self.guest_name.trim().is_empty() {
            return Err(AccommodationError::MissingField("guest_name"));
        }
        if self.hotel_name.trim().is_empty() {
            return Err(AccommodationError::MissingField("hotel_name"));
        }
        if self.check_out < self.check_in {
            return Err(AccommodationError::InvalidDateRange {
                check_in: self.check_in,
                check_out: self.check_out,
            });
        }
        if self.nightly_rate < Decimal::ZERO {
            return Err(AccommodationError::NegativeRate(self.nightly_rate));
        }
        Ok(())
    }
}

impl AccommodationRecord {
    pub fn from_draft(draft: AccommodationDraft) -> Result<Self, AccommodationError> {
        draft.validate()?;
        let now = Utc::now();
        let mut record = Self {
            id: Uuid::new_v4(),
            guest_name: String::new(),
            guest_phone: None,
            title: None,
            country: String::new(),
            city: String::new(),
            check_in: draft.check_in,
            check_out: draft.check_out,
            room_type: String::new(),
            board_type: BoardType::Bb,
            nightly_rate: Decimal::ZERO,
            nights: 0,
            total_charge: Decimal::ZERO,
            organization_id: None,
            organization_name: None,
            hotel_name: String::new(),
            billing_party: None,
            individual: false,
            status: StayStatus::Reserved,
            transferred: false,
            sale_id: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        record.fill(draft);
        Ok(record)
    }

    /// Replace editable fields and recompute the derived ones.
    pub fn apply(&mut self, draft: AccommodationDraft) -> Result<(), AccommodationError> {
        if self.transferred {
            return Err(AccommodationError::Transferred(self.id));
        }
        draft.validate()?;
        self.fill(draft);
        self.updated_at = Utc::now();
        Ok(())
    }

    fn fill(&mut self, draft: AccommodationDraft) {
        self.guest_name = draft.guest_name.trim().to_string();
        self.guest_phone = draft.guest_phone;
        self.title = clean(draft.title);
        self.country = draft.country.trim().to_string();
        self.city = draft.city.trim().to_string();
        self.check_in = draft.check_in;
        self.check_out = draft.check_out;
        self.room_type = draft.room_type.trim().to_string();
        self.board_type = draft.board_type;
        self.nightly_rate = draft.nightly_rate;
        self.organization_id = draft.organization_id;
        self.organization_name = clean(draft.organization_name);
        self.hotel_name = draft.hotel_name.trim().to_string();
        self.billing_party = clean(draft.billing_party);
        self.individual = draft.individual;
        self.recompute();
    }

    pub fn recompute(&mut self) {
        self.nights = aggregation::nights_between(self.check_in, self.check_out);
        self.total_charge = aggregation::total_charge(self.nights, self.nightly_rate);
    }

    /// Organization name used for grouping; stays without one are grouped as individual.
    pub fn organization_label(&self) -> &str {
        self.organization_name.as_deref().unwrap_or(INDIVIDUAL_LABEL)
    }

    pub fn mark_transferred(&mut self, sale_id: Uuid) {
        self.transferred = true;
        self.sale_id = Some(sale_id);
        self.version += 1;
        self.updated_at = Utc::now();
    }

    pub fn return_to_pool(&mut self) {
        self.transferred = false;
        self.sale_id = None;
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

impl Record for AccommodationRecord {
    const KIND: &'static str = "accommodations";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    fn is_locked(&self) -> bool {
        self.transferred
    }
}

fn money(value: Decimal) -> Option<FieldValue<'static>> {
    value.to_f64().map(FieldValue::Number)
}

impl Fields for AccommodationRecord {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "guest_name" => Some(FieldValue::text(&self.guest_name)),
            "title" => self.title.as_deref().map(FieldValue::text),
            "country" => Some(FieldValue::text(&self.country)),
            "city" => Some(FieldValue::text(&self.city)),
            "check_in" => Some(FieldValue::Date(self.check_in)),
            "check_out" => Some(FieldValue::Date(self.check_out)),
            "room_type" => Some(FieldValue::text(&self.room_type)),
            "board_type" => Some(FieldValue::text(self.board_type.as_str())),
            "nightly_rate" => money(self.nightly_rate),
            "nights" => Some(FieldValue::Number(self.nights as f64)),
            "total_charge" => money(self.total_charge),
            "organization_name" => self.organization_name.as_deref().map(FieldValue::text),
            "hotel_name" => Some(FieldValue::text(&self.hotel_name)),
            "billing_party" => self.billing_party.as_deref().map(FieldValue::text),
            "individual" => Some(FieldValue::Bool(self.individual)),
            "status" => Some(FieldValue::text(self.status.as_str())),
            "transferred" => Some(FieldValue::Bool(self.transferred)),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }

    fn stay(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.check_in, self.check_out))
    }
}

impl Exportable for AccommodationRecord {
    const COLUMNS: &'static [&'static str] = &[
        "guest_name",
        "hotel_name",
        "organization_name",
        "city",
        "check_in",
        "check_out",
        "nights",
        "room_type",
        "board_type",
        "nightly_rate",
        "total_charge",
    ];
}

impl StatusBearing for AccommodationRecord {
    type Status = StayStatus;

    fn transition(&mut self, status: StayStatus) -> CoreResult<()> {
        if self.transferred {
            return Err(AccommodationError::Transferred(self.id).into());
        }
        if !self.status.can_transition_to(status) {
            return Err(AccommodationError::InvalidTransition {
                from: self.status.as_str(),
                to: status.as_str(),
            }
            .into());
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub fn draft(guest: &str, org: Option<&str>, check_in: (u32, u32), check_out: (u32, u32), rate: Decimal) -> AccommodationDraft {
        AccommodationDraft {
            guest_name: guest.to_string(),
            guest_phone: None,
            title: None,
            country: "Türkiye".to_string(),
            city: "Antalya".to_string(),
            check_in: NaiveDate::from_ymd_opt(2024, check_in.0, check_in.1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, check_out.0, check_out.1).unwrap(),
            room_type: "DBL".to_string(),
            board_type: BoardType::Hb,
            nightly_rate: rate,
            organization_id: None,
            organization_name: org.map(str::to_string),
            hotel_name: "Lara Palace".to_string(),
            billing_party: None,
            individual: org.is_none(),
        }
    }

    #[test]
    fn test_derived_fields_on_create() {
        let record = AccommodationRecord::from_draft(draft("Ayşe", Some("Acme"), (6, 15), (6, 18), dec!(1000))).unwrap();
        assert_eq!(record.nights, 3);
        assert_eq!(record.total_charge, dec!(3000));
    }

    #[test]
    fn test_derived_fields_follow_edits() {
        let mut record = AccommodationRecord::from_draft(draft("Ayşe", None, (6, 15), (6, 18), dec!(1000))).unwrap();
        record.apply(draft("Ayşe", None, (6, 15), (6, 20), dec!(1200))).unwrap();
        assert_eq!((record.nights, record.total_charge), (5, dec!(6000)));

        record.apply(draft("Ayşe", None, (6, 15), (6, 15), dec!(1200))).unwrap();
        assert_eq!((record.nights, record.total_charge), (0, Decimal::ZERO));
    }

    #[test]
    fn test_invalid_drafts() {
        assert!(matches!(
            AccommodationRecord::from_draft(draft("Ayşe", None, (6, 18), (6, 15), dec!(10))),
            Err(AccommodationError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            AccommodationRecord::from_draft(draft("Ayşe", None, (6, 15), (6, 18), dec!(-1))),
            Err(AccommodationError::NegativeRate(_))
        ));
        assert!(matches!(
            AccommodationRecord::from_draft(draft("  ", None, (6, 15), (6, 18), dec!(10))),
            Err(AccommodationError::MissingField("guest_name"))
        ));
    }

    #[test]
    fn test_transferred_record_is_locked() {
        let mut record = AccommodationRecord::from_draft(draft("Ayşe", Some("Acme"), (6, 15), (6, 18), dec!(1000))).unwrap();
        record.mark_transferred(Uuid::new_v4());
        assert!(record.is_locked());

        let err: CoreError = record.apply(draft("Ayşe", None, (6, 15), (6, 19), dec!(1))).unwrap_err().into();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert!(matches!(record.transition(StayStatus::CheckedIn), Err(CoreError::Conflict(_))));

        record.return_to_pool();
        assert!(!record.is_locked());
        record.transition(StayStatus::CheckedIn).unwrap();
    }

    #[test]
    fn test_board_type_wire_format() {
        assert_eq!(serde_json::to_string(&BoardType::Uhd).unwrap(), "\"UHD\"");
        let parsed: BoardType = serde_json::from_str("\"FB\"").unwrap();
        assert_eq!(parsed, BoardType::Fb);
    }
}
