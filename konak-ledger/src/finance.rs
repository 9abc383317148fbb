use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::accommodation::AccommodationRecord;
use crate::aggregation::{self, GroupSummary, NetMargin};
use crate::sale::Sale;

/// Occupancy and revenue rollup for the accommodation screen.
#[derive(Debug, Clone, Serialize)]
pub struct AccommodationSummary {
    pub record_count: usize,
    pub total_nights: i64,
    pub total_charge: Decimal,
    pub present_on: NaiveDate,
    pub guests_present: usize,
    pub by_hotel: Vec<GroupSummary>,
    pub by_organization: Vec<GroupSummary>,
    pub by_room_type: Vec<GroupSummary>,
    pub by_month: Vec<GroupSummary>,
}

impl AccommodationSummary {
    pub fn build(records: &[AccommodationRecord], present_on: NaiveDate) -> Self {
        Self {
            record_count: records.len(),
            total_nights: records.iter().map(|r| r.nights).sum(),
            total_charge: records.iter().map(|r| r.total_charge).sum(),
            present_on,
            guests_present: aggregation::guests_present_on(records, present_on),
            by_hotel: aggregation::by_hotel(records),
            by_organization: aggregation::by_organization(records),
            by_room_type: aggregation::by_room_type(records),
            by_month: aggregation::by_month(records),
        }
    }
}

/// Buy/sell reconciliation between the stays ledger and the sales ledger.
#[derive(Debug, Clone, Serialize)]
pub struct FinanceSummary {
    /// Accommodation cost of stays whose sale still counts as revenue.
    pub total_buy: Decimal,
    /// Sale totals, cancelled sales excluded.
    pub total_sell: Decimal,
    pub margin: NetMargin,
    pub sale_count: usize,
    pub monthly_sales: Vec<GroupSummary>,
    pub trend_pct: Decimal,
    pub by_organization: Vec<GroupSummary>,
}

impl FinanceSummary {
    pub fn build(stays: &[AccommodationRecord], sales: &[Sale]) -> Self {
        let live: Vec<&Sale> = sales.iter().filter(|s| s.counts_as_revenue()).collect();

        let billed: HashSet<Uuid> = live.iter().map(|s| s.id).collect();
        let total_buy = stays
            .iter()
            .filter(|r| r.sale_id.is_some_and(|id| billed.contains(&id)))
            .map(|r| r.total_charge)
            .sum();
        let total_sell = live.iter().map(|s| s.total_amount).sum();
        let monthly_sales =
            aggregation::group_by_month(&live, |s| s.created_at.date_naive(), |s| s.total_amount);

        Self {
            total_buy,
            total_sell,
            margin: aggregation::net_margin(total_sell, total_buy),
            sale_count: live.len(),
            trend_pct: aggregation::trend(&monthly_sales),
            monthly_sales,
            by_organization: aggregation::group_by(&live, |s| s.organization_name.clone(), |s| s.total_amount),
        }
    }
}
