use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use konak_core::bulk::{Exportable, StatusBearing};
use konak_core::query::{FieldValue, Fields};
use konak_core::{CoreError, CoreResult, Record};
use konak_shared::Masked;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TRANSFER_SEARCH_FIELDS: &[&str] = &["origin", "destination", "notes", "lead_passenger"];

/// Ground transfer lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    #[default]
    Pending,
    EnRoute,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::EnRoute => "EN_ROUTE",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Cancelled)
    }

    /// PENDING → EN_ROUTE → COMPLETED, and any open order may be cancelled.
    pub fn can_transition_to(self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, next),
            (Pending, EnRoute) | (EnRoute, Completed) | (Pending, Cancelled) | (EnRoute, Cancelled)
        )
    }
}

/// Who pays for the transfer. A customer and a supplier are never billed together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingParty {
    Customer(Uuid),
    /// The trip is outsourced to this supplier.
    Supplier(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passenger {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<Masked<String>>,
    pub flight_time: Option<NaiveTime>,
    pub flight_code: Option<String>,
}

impl Passenger {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Free-text vehicle and driver details for supplier trips with no registered fleet entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManualAssignment {
    pub vehicle_plate: Option<String>,
    pub vehicle_model: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<Masked<String>>,
}

impl ManualAssignment {
    fn has_vehicle(&self) -> bool {
        self.vehicle_plate.is_some() || self.vehicle_model.is_some()
    }

    fn has_driver(&self) -> bool {
        self.driver_name.is_some() || self.driver_phone.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferOrder {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub passenger_count: u32,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: TransferStatus,
    pub notes: String,
    pub price: Option<Decimal>,
    pub full_day_charter: bool,
    pub billing: Option<BillingParty>,
    pub manual: Option<ManualAssignment>,
    pub passengers: Vec<Passenger>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferDraft {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub passenger_count: u32,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub full_day_charter: bool,
    pub billing: Option<BillingParty>,
    pub manual: Option<ManualAssignment>,
    #[serde(default)]
    pub passengers: Vec<Passenger>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Transfer {0} is required")]
    MissingField(&'static str),

    #[error("Passenger count {declared} does not match {listed} listed passengers")]
    PassengerMismatch { declared: u32, listed: usize },

    #[error("A transfer needs at least one passenger")]
    NoPassengers,

    #[error("Price cannot be negative: {0}")]
    NegativePrice(Decimal),

    #[error("Manual vehicle or driver details are only allowed for supplier trips")]
    ManualWithoutSupplier,

    #[error("Manual {0} details conflict with a registered {0}")]
    ManualConflictsWithRegistered(&'static str),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

impl From<TransferError> for CoreError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InvalidTransition { .. } => CoreError::Conflict(err.to_string()),
            _ => CoreError::Validation(err.to_string()),
        }
    }
}

impl TransferDraft {
    fn validate(&self) -> Result<(), TransferError> {
        if self.origin.trim().is_empty() {
            return Err(TransferError::MissingField("origin"));
        }
        if self.destination.trim().is_empty() {
            return Err(TransferError::MissingField("destination"));
        }
        if self.passenger_count == 0 {
            return Err(TransferError::NoPassengers);
        }
        if self.passengers.len() != self.passenger_count as usize {
            return Err(TransferError::PassengerMismatch {
                declared: self.passenger_count,
                listed: self.passengers.len(),
            });
        }
        if let Some(price) = self.price {
            if price.is_sign_negative() && !price.is_zero() {
                return Err(TransferError::NegativePrice(price));
            }
        }

        if let Some(manual) = &self.manual {
            if !matches!(self.billing, Some(BillingParty::Supplier(_))) {
                return Err(TransferError::ManualWithoutSupplier);
            }
            if manual.has_vehicle() && self.vehicle_id.is_some() {
                return Err(TransferError::ManualConflictsWithRegistered("vehicle"));
            }
            if manual.has_driver() && self.driver_id.is_some() {
                return Err(TransferError::ManualConflictsWithRegistered("driver"));
            }
        }
        Ok(())
    }
}

impl TransferOrder {
    pub fn from_draft(draft: TransferDraft) -> Result<Self, TransferError> {
        draft.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            origin: draft.origin.trim().to_string(),
            destination: draft.destination.trim().to_string(),
            departure_date: draft.departure_date,
            departure_time: draft.departure_time,
            passenger_count: draft.passenger_count,
            vehicle_id: draft.vehicle_id,
            driver_id: draft.driver_id,
            status: TransferStatus::Pending,
            notes: draft.notes,
            price: draft.price,
            full_day_charter: draft.full_day_charter,
            billing: draft.billing,
            manual: draft.manual,
            passengers: draft.passengers,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the editable fields. Status is only changed through [`StatusBearing::transition`].
    pub fn apply(&mut self, draft: TransferDraft) -> Result<(), TransferError> {
        draft.validate()?;
        self.origin = draft.origin.trim().to_string();
        self.destination = draft.destination.trim().to_string();
        self.departure_date = draft.departure_date;
        self.departure_time = draft.departure_time;
        self.passenger_count = draft.passenger_count;
        self.vehicle_id = draft.vehicle_id;
        self.driver_id = draft.driver_id;
        self.notes = draft.notes;
        self.price = draft.price;
        self.full_day_charter = draft.full_day_charter;
        self.billing = draft.billing;
        self.manual = draft.manual;
        self.passengers = draft.passengers;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_outsourced(&self) -> bool {
        matches!(self.billing, Some(BillingParty::Supplier(_)))
    }

    pub fn lead_passenger(&self) -> Option<String> {
        self.passengers.first().map(Passenger::full_name)
    }
}

impl Record for TransferOrder {
    const KIND: &'static str = "transfer_orders";

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

impl Fields for TransferOrder {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "origin" => Some(FieldValue::text(&self.origin)),
            "destination" => Some(FieldValue::text(&self.destination)),
            "notes" => Some(FieldValue::text(&self.notes)),
            "status" => Some(FieldValue::text(self.status.as_str())),
            "departure_date" => Some(FieldValue::Date(self.departure_date)),
            "departure_time" => Some(FieldValue::Time(self.departure_time)),
            "passenger_count" => Some(FieldValue::Number(f64::from(self.passenger_count))),
            "price" => self.price.and_then(|p| p.to_f64()).map(FieldValue::Number),
            "full_day_charter" => Some(FieldValue::Bool(self.full_day_charter)),
            "billing" => self.billing.map(|b| {
                FieldValue::text(match b {
                    BillingParty::Customer(_) => "CUSTOMER",
                    BillingParty::Supplier(_) => "SUPPLIER",
                })
            }),
            "lead_passenger" => self.lead_passenger().map(FieldValue::owned),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }

    fn stay(&self) -> Option<(NaiveDate, NaiveDate)> {
        let next_day = self.departure_date.succ_opt().unwrap_or(self.departure_date);
        Some((self.departure_date, next_day))
    }
}

impl Exportable for TransferOrder {
    const COLUMNS: &'static [&'static str] = &[
        "departure_date",
        "departure_time",
        "origin",
        "destination",
        "passenger_count",
        "lead_passenger",
        "status",
        "price",
        "billing",
    ];
}

impl StatusBearing for TransferOrder {
    type Status = TransferStatus;

    fn transition(&mut self, status: TransferStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(status) {
            return Err(TransferError::InvalidTransition {
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
