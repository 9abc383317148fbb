use chrono::{DateTime, Utc};
use konak_core::bulk::{Exportable, StatusBearing};
use konak_core::query::{FieldValue, Fields};
use konak_core::{CoreError, CoreResult, Record};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accommodation::AccommodationRecord;

pub const SALE_SEARCH_FIELDS: &[&str] = &["organization_name", "guest_name", "hotel_name"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    #[default]
    Transferred,
    Invoiced,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SaleStatus::Transferred => "TRANSFERRED",
            SaleStatus::Invoiced => "INVOICED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Ledger entry billing one stay to its organization.
///
/// `nights` is copied from the stay at transfer time, so the sale total does not
/// move if the stay is later returned to the pool and edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: Uuid,
    pub accommodation_id: Uuid,
    pub organization_name: String,
    pub guest_name: String,
    pub hotel_name: String,
    pub unit_price: Decimal,
    pub nights: i64,
    pub total_amount: Decimal,
    pub status: SaleStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    pub fn for_stay(record: &AccommodationRecord, organization_name: &str, unit_price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            accommodation_id: record.id,
            organization_name: organization_name.to_string(),
            guest_name: record.guest_name.clone(),
            hotel_name: record.hotel_name.clone(),
            unit_price,
            nights: record.nights,
            total_amount: unit_price * Decimal::from(record.nights),
            status: SaleStatus::Transferred,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn counts_as_revenue(&self) -> bool {
        self.status != SaleStatus::Cancelled
    }
}

impl Record for Sale {
    const KIND: &'static str = "sales";

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

impl Fields for Sale {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "organization_name" => Some(FieldValue::text(&self.organization_name)),
            "guest_name" => Some(FieldValue::text(&self.guest_name)),
            "hotel_name" => Some(FieldValue::text(&self.hotel_name)),
            "unit_price" => self.unit_price.to_f64().map(FieldValue::Number),
            "nights" => Some(FieldValue::Number(self.nights as f64)),
            "total_amount" => self.total_amount.to_f64().map(FieldValue::Number),
            "status" => Some(FieldValue::text(self.status.as_str())),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }
}

impl Exportable for Sale {
    const COLUMNS: &'static [&'static str] = &[
        "created_at",
        "organization_name",
        "guest_name",
        "hotel_name",
        "nights",
        "unit_price",
        "total_amount",
        "status",
    ];
}

impl StatusBearing for Sale {
    type Status = SaleStatus;

    /// Cancelled is terminal; an invoiced sale cannot go back to transferred.
    fn transition(&mut self, status: SaleStatus) -> CoreResult<()> {
        let allowed = matches!(
            (self.status, status),
            (SaleStatus::Transferred, SaleStatus::Invoiced)
                | (SaleStatus::Transferred, SaleStatus::Cancelled)
                | (SaleStatus::Invoiced, SaleStatus::Cancelled)
        );
        if !allowed {
            return Err(CoreError::conflict(format!(
                "sale {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                status.as_str()
            )));
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accommodation::tests::draft;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sale_total_uses_stay_nights() {
        let stay = AccommodationRecord::from_draft(draft("Ayşe", Some("Acme"), (6, 15), (6, 18), dec!(1000))).unwrap();
        let sale = Sale::for_stay(&stay, "Acme", dec!(1250.50));
        assert_eq!(sale.nights, 3);
        assert_eq!(sale.total_amount, dec!(3751.50));
        assert_eq!(sale.status, SaleStatus::Transferred);
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let stay = AccommodationRecord::from_draft(draft("Ayşe", Some("Acme"), (6, 15), (6, 16), dec!(10))).unwrap();
        let mut sale = Sale::for_stay(&stay, "Acme", dec!(20));
        sale.transition(SaleStatus::Invoiced).unwrap();
        assert!(sale.transition(SaleStatus::Transferred).is_err());
        sale.transition(SaleStatus::Cancelled).unwrap();
        assert!(!sale.counts_as_revenue());
        assert!(matches!(sale.transition(SaleStatus::Invoiced), Err(CoreError::Conflict(_))));
    }
}
