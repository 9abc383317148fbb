//! Derived figures for stays and sales.
//!
//! Every mutation path computes nights and charges through these functions, and
//! the report endpoints build their breakdowns from [`group_by`].

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::accommodation::AccommodationRecord;

/// Whole nights between check-in and check-out. Checkout day is not a night; never negative.
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days().max(0)
}

pub fn total_charge(nights: i64, nightly_rate: Decimal) -> Decimal {
    Decimal::from(nights.max(0)) * nightly_rate
}

/// Present on `day` means `check_in <= day < check_out`.
pub fn is_present(check_in: NaiveDate, check_out: NaiveDate, day: NaiveDate) -> bool {
    check_in <= day && day < check_out
}

pub fn guests_present_on(records: &[AccommodationRecord], day: NaiveDate) -> usize {
    records
        .iter()
        .filter(|r| is_present(r.check_in, r.check_out, day))
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub count: usize,
    pub total_revenue: Decimal,
}

/// Groups `records` by `key`, most frequent first. Ties keep first-seen order.
pub fn group_by<T>(
    records: &[T],
    key: impl Fn(&T) -> String,
    revenue: impl Fn(&T) -> Decimal,
) -> Vec<GroupSummary> {
    let mut groups = collect_groups(records, key, revenue);
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}

/// Groups by a `YYYY-MM` key in chronological order.
pub fn group_by_month<T>(
    records: &[T],
    date: impl Fn(&T) -> NaiveDate,
    revenue: impl Fn(&T) -> Decimal,
) -> Vec<GroupSummary> {
    let mut groups = collect_groups(records, |r| month_key(date(r)), revenue);
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    groups
}

fn collect_groups<T>(
    records: &[T],
    key: impl Fn(&T) -> String,
    revenue: impl Fn(&T) -> Decimal,
) -> Vec<GroupSummary> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupSummary> = Vec::new();

    for record in records {
        let k = key(record);
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            groups.push(GroupSummary { key: k, count: 0, total_revenue: Decimal::ZERO });
            groups.len() - 1
        });
        groups[slot].count += 1;
        groups[slot].total_revenue += revenue(record);
    }
    groups
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetMargin {
    pub net: Decimal,
    pub margin_pct: Decimal,
}

/// `margin_pct` is relative to the buy side, rounded to 2 places. Zero buy gives 0%.
pub fn net_margin(total_sell: Decimal, total_buy: Decimal) -> NetMargin {
    let net = total_sell - total_buy;
    let margin_pct = if total_buy > Decimal::ZERO {
        (net / total_buy * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    };
    NetMargin { net, margin_pct }
}

/// Percent change in revenue between the last two chronological buckets.
pub fn trend(buckets: &[GroupSummary]) -> Decimal {
    match buckets {
        [.., previous, latest] if previous.total_revenue > Decimal::ZERO => {
            ((latest.total_revenue - previous.total_revenue) / previous.total_revenue
                * Decimal::ONE_HUNDRED)
                .round_dp(2)
        }
        _ => Decimal::ZERO,
    }
}

pub fn by_hotel(records: &[AccommodationRecord]) -> Vec<GroupSummary> {
    group_by(records, |r| r.hotel_name.clone(), |r| r.total_charge)
}

pub fn by_organization(records: &[AccommodationRecord]) -> Vec<GroupSummary> {
    group_by(records, |r| r.organization_label().to_string(), |r| r.total_charge)
}

pub fn by_room_type(records: &[AccommodationRecord]) -> Vec<GroupSummary> {
    group_by(records, |r| r.room_type.clone(), |r| r.total_charge)
}

pub fn by_month(records: &[AccommodationRecord]) -> Vec<GroupSummary> {
    group_by_month(records, |r| r.check_in, |r| r.total_charge)
}
