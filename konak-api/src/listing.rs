//! Query-string handling shared by every list endpoint.
//!
//! `?q=` free text, `?<field>=` categorical equality, `?min_<field>=`/`?max_<field>=`
//! numeric ranges, `?from=`/`?to=` date window, `?sort=&dir=`, `?page=&page_size=`.

use std::collections::HashMap;

use chrono::NaiveDate;
use konak_core::query::{self, DateWindow, FilterSpec, Page, PageRequest, SortDirection, SortSpec};
use konak_core::{CoreError, CoreResult, ExportProjection, Exportable, Fields};

use crate::state::ListingConfig;

/// Which columns a list screen lets the caller search, filter and sort on.
pub struct Columns {
    pub search: &'static [&'static str],
    pub equals: &'static [&'static str],
    pub ranges: &'static [&'static str],
    pub sortable: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct ListParams {
    pub filter: FilterSpec,
    pub sort: Option<SortSpec>,
    pub page: PageRequest,
}

fn listed(names: &[&str], name: &str) -> bool {
    names.iter().any(|n| *n == name)
}

fn number(key: &str, raw: &str) -> CoreResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CoreError::validation(format!("{} must be a number, got {:?}", key, raw)))
}

fn count(key: &str, raw: &str) -> CoreResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| CoreError::validation(format!("{} must be a positive integer, got {:?}", key, raw)))
}

pub fn date(key: &str, raw: &str) -> CoreResult<NaiveDate> {
    raw.trim()
        .parse::<NaiveDate>()
        .map_err(|_| CoreError::validation(format!("{} must be a YYYY-MM-DD date, got {:?}", key, raw)))
}

impl ListParams {
    /// Unknown keys are rejected so a typo never silently widens a result set.
    /// Keys in `passthrough` belong to the endpoint and are left alone.
    pub fn parse(
        raw: &HashMap<String, String>,
        columns: &Columns,
        listing: &ListingConfig,
        passthrough: &[&str],
    ) -> CoreResult<Self> {
        let mut filter = FilterSpec {
            text_fields: columns.search.iter().map(|f| f.to_string()).collect(),
            ..FilterSpec::default()
        };
        let mut ranges: HashMap<&str, (Option<f64>, Option<f64>)> = HashMap::new();
        let (mut from, mut to) = (None, None);
        let (mut sort_field, mut direction) = (None, SortDirection::Asc);
        let (mut page, mut page_size) = (None, None);

        for (key, value) in raw {
            match key.as_str() {
                "q" => filter.set_text(Some(value.clone())),
                "from" => from = Some(date(key, value)?),
                "to" => to = Some(date(key, value)?),
                "sort" => sort_field = Some(value.trim().to_string()),
                "dir" => direction = value.parse()?,
                "page" => page = Some(count(key, value)?),
                "page_size" => page_size = Some(count(key, value)?),
                k if listed(passthrough, k) => {}
                k if listed(columns.equals, k) => filter.set_equals(k, Some(value.clone())),
                k => {
                    let range = k
                        .strip_prefix("min_")
                        .map(|f| (f, true))
                        .or_else(|| k.strip_prefix("max_").map(|f| (f, false)));
                    match range {
                        Some((field, is_min)) if listed(columns.ranges, field) => {
                            let bound = ranges.entry(field).or_default();
                            let n = Some(number(k, value)?);
                            if is_min {
                                bound.0 = n;
                            } else {
                                bound.1 = n;
                            }
                        }
                        _ => return Err(CoreError::validation(format!("unknown query parameter: {}", k))),
                    }
                }
            }
        }

        for (field, (min, max)) in ranges {
            filter.set_range(field, min, max);
        }

        filter.window = match (from, to) {
            (Some(start), Some(end)) => Some(DateWindow::new(start, end)?),
            (Some(start), None) => Some(DateWindow::new(start, NaiveDate::MAX)?),
            (None, Some(end)) => Some(DateWindow::new(NaiveDate::MIN, end)?),
            (None, None) => None,
        };

        let sort = match sort_field {
            Some(field) if listed(columns.sortable, &field) => Some(SortSpec { field, direction }),
            Some(field) => return Err(CoreError::validation(format!("cannot sort by {}", field))),
            None => None,
        };

        let page = PageRequest::validated(
            page,
            page_size.or(Some(listing.default_page_size)),
            &listing.page_sizes,
        )?;

        Ok(Self { filter, sort, page })
    }

    pub fn page_of<T: Fields>(&self, records: Vec<T>) -> Page<T> {
        query::apply(records, &self.filter, self.sort.as_ref(), self.page)
    }

    /// Every matching record, in display order, projected for the export formatters.
    pub fn export_of<T: Exportable>(&self, records: Vec<T>) -> ExportProjection {
        let rows = query::filter_sort(records, &self.filter, self.sort.as_ref());
        ExportProjection::build(rows.iter())
    }

    pub fn filtered<T: Fields>(&self, records: Vec<T>) -> Vec<T> {
        query::filter_sort(records, &self.filter, self.sort.as_ref())
    }
}
