use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

// ============================================================================
// Field access
// ============================================================================

/// A single column value as seen by filters, sorting and exports.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Cow<'a, str>),
    Number(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    Bool(bool),
}

impl<'a> FieldValue<'a> {
    pub fn text(s: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(s))
    }

    pub fn owned(s: String) -> Self {
        FieldValue::Text(Cow::Owned(s))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Strings compare case-insensitively, dates and times chronologically, numbers natively.
    /// Values of different kinds are treated as equal so the stable sort keeps their order.
    pub fn compare(&self, other: &FieldValue<'_>) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
            (FieldValue::Time(a), FieldValue::Time(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    /// Categorical equality against a query-string value.
    pub fn matches_str(&self, wanted: &str) -> bool {
        let wanted = wanted.trim();
        match self {
            FieldValue::Text(v) => v.trim().to_lowercase() == wanted.to_lowercase(),
            FieldValue::Number(n) => wanted.parse::<f64>().map(|w| w == *n).unwrap_or(false),
            FieldValue::Date(d) => wanted.parse::<NaiveDate>().map(|w| w == *d).unwrap_or(false),
            FieldValue::Time(t) => wanted.parse::<NaiveTime>().map(|w| w == *t).unwrap_or(false),
            FieldValue::Timestamp(ts) => wanted.parse::<NaiveDate>().map(|w| w == ts.date_naive()).unwrap_or(false),
            FieldValue::Bool(b) => wanted.parse::<bool>().map(|w| w == *b).unwrap_or(false),
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Time(t) => write!(f, "{}", t.format("%H:%M")),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Named column access for list views.
pub trait Fields {
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;

    /// Occupied interval `[start, end)` for date-window filtering.
    fn stay(&self) -> Option<(NaiveDate, NaiveDate)> {
        None
    }
}

// ============================================================================
// Filtering
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualsFilter {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub field: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeFilter {
    fn contains(&self, n: f64) -> bool {
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::validation(format!("date window ends ({}) before it starts ({})", end, start)));
        }
        Ok(Self { start, end })
    }

    /// Does the half-open stay `[check_in, check_out)` touch `[start, end]`?
    /// Same-day stays occupy their single day.
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        let check_out = if check_out > check_in {
            check_out
        } else {
            check_in.succ_opt().unwrap_or(check_in)
        };
        check_in <= self.end && check_out > self.start
    }
}

/// Conjunction of independently specified predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub text_fields: Vec<String>,
    #[serde(default)]
    pub equals: Vec<EqualsFilter>,
    #[serde(default)]
    pub ranges: Vec<RangeFilter>,
    #[serde(default)]
    pub window: Option<DateWindow>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>, fields: &[&str]) -> Self {
        self.set_text(Some(text.into()));
        self.text_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn equals(mut self, field: &str, value: impl Into<String>) -> Self {
        self.set_equals(field, Some(value.into()));
        self
    }

    pub fn range(mut self, field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        self.set_range(field, min, max);
        self
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text.filter(|t| !t.trim().is_empty());
    }

    /// Replaces the filter on `field`; `None` or a blank value clears it.
    pub fn set_equals(&mut self, field: &str, value: Option<String>) {
        self.equals.retain(|e| e.field != field);
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.equals.push(EqualsFilter { field: field.to_string(), value });
        }
    }

    pub fn set_range(&mut self, field: &str, min: Option<f64>, max: Option<f64>) {
        self.ranges.retain(|r| r.field != field);
        if min.is_some() || max.is_some() {
            self.ranges.push(RangeFilter { field: field.to_string(), min, max });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.equals.is_empty() && self.ranges.is_empty() && self.window.is_none()
    }

    pub fn matches<T: Fields + ?Sized>(&self, record: &T) -> bool {
        if let Some(text) = &self.text {
            let needle = text.trim().to_lowercase();
            let hit = self.text_fields.iter().any(|name| {
                record
                    .field(name)
                    .is_some_and(|v| v.to_string().to_lowercase().contains(&needle))
            });
            if !hit {
                return false;
            }
        }

        let equals_ok = self
            .equals
            .iter()
            .all(|e| record.field(&e.field).is_some_and(|v| v.matches_str(&e.value)));
        if !equals_ok {
            return false;
        }

        let ranges_ok = self.ranges.iter().all(|r| {
            record
                .field(&r.field)
                .and_then(|v| v.as_number())
                .is_some_and(|n| r.contains(n))
        });
        if !ranges_ok {
            return false;
        }

        match (&self.window, record.stay()) {
            (None, _) => true,
            (Some(window), Some((check_in, check_out))) => window.overlaps(check_in, check_out),
            (Some(_), None) => false,
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(CoreError::validation(format!("unknown sort direction: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), direction: SortDirection::Asc }
    }

    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), direction: SortDirection::Desc }
    }
}

/// Column-header sort state: same column cycles asc → desc (→ unsorted when allowed),
/// a different column starts over at asc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    current: Option<SortSpec>,
    allow_unsorted: bool,
}

impl SortState {
    pub fn new(allow_unsorted: bool) -> Self {
        Self { current: None, allow_unsorted }
    }

    pub fn current(&self) -> Option<&SortSpec> {
        self.current.as_ref()
    }

    pub fn toggle(&mut self, field: &str) {
        self.current = match self.current.take() {
            Some(spec) if spec.field == field => match spec.direction {
                SortDirection::Asc => Some(SortSpec::desc(field)),
                SortDirection::Desc if self.allow_unsorted => None,
                SortDirection::Desc => Some(SortSpec::asc(field)),
            },
            _ => Some(SortSpec::asc(field)),
        };
    }
}

fn compare_fields(a: Option<FieldValue<'_>>, b: Option<FieldValue<'_>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.compare(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable single-column sort; equal keys keep their incoming order in both directions.
pub fn sort_records<T: Fields>(records: &mut [T], spec: &SortSpec) {
    records.sort_by(|a, b| {
        let ord = compare_fields(a.field(&spec.field), b.field(&spec.field));
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

// ============================================================================
// Pagination
// ============================================================================

pub const PAGE_SIZE_CHOICES: [usize; 4] = [10, 25, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page: page.max(1), page_size: page_size.max(1) }
    }

    /// Pages are 1-indexed; the size must be one of the configured menu choices.
    pub fn validated(page: Option<usize>, page_size: Option<usize>, choices: &[usize]) -> CoreResult<Self> {
        let default_size = choices.first().copied().unwrap_or(PAGE_SIZE_CHOICES[0]);
        let page_size = page_size.unwrap_or(default_size);
        if !choices.contains(&page_size) {
            return Err(CoreError::validation(format!(
                "page_size must be one of {:?}, got {}",
                choices, page_size
            )));
        }
        Ok(Self::new(page.unwrap_or(1), page_size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, PAGE_SIZE_CHOICES[0])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    total_count.div_ceil(page_size.max(1))
}

pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total_count = items.len();
    let skip = (request.page - 1).saturating_mul(request.page_size);
    let items = items.into_iter().skip(skip).take(request.page_size).collect();

    Page {
        items,
        total_count,
        page: request.page,
        page_size: request.page_size,
        total_pages: total_pages(total_count, request.page_size),
    }
}

/// Filter, then sort, keeping everything that matched.
pub fn filter_sort<T: Fields>(records: Vec<T>, filter: &FilterSpec, sort: Option<&SortSpec>) -> Vec<T> {
    let mut matched: Vec<T> = records.into_iter().filter(|r| filter.matches(r)).collect();
    if let Some(spec) = sort {
        sort_records(&mut matched, spec);
    }
    matched
}

pub fn apply<T: Fields>(records: Vec<T>, filter: &FilterSpec, sort: Option<&SortSpec>, request: PageRequest) -> Page<T> {
    paginate(filter_sort(records, filter, sort), request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: &'static str,
        city: &'static str,
        price: f64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    }

    impl Fields for Row {
        fn field(&self, name: &str) -> Option<FieldValue<'_>> {
            match name {
                "name" => Some(FieldValue::text(self.name)),
                "city" => Some(FieldValue::text(self.city)),
                "price" => Some(FieldValue::Number(self.price)),
                "check_in" => Some(FieldValue::Date(self.check_in)),
                _ => None,
            }
        }

        fn stay(&self) -> Option<(NaiveDate, NaiveDate)> {
            Some((self.check_in, self.check_out))
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "Ayşe Demir", city: "Antalya", price: 1000.0, check_in: d(1), check_out: d(4) },
            Row { name: "john smith", city: "Istanbul", price: 2500.0, check_in: d(10), check_out: d(12) },
            Row { name: "Mehmet Kaya", city: "antalya", price: 800.0, check_in: d(15), check_out: d(18) },
            Row { name: "Anna Berg", city: "Izmir", price: 1000.0, check_in: d(20), check_out: d(21) },
        ]
    }

    #[test]
    fn test_filter_is_conjunctive_subset() {
        let filter = FilterSpec::new()
            .search("a", &["name"])
            .equals("city", "ANTALYA")
            .range("price", Some(900.0), None);

        let all = rows();
        let matched = filter_sort(all.clone(), &filter, None);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "Ayşe Demir");
        for row in &matched {
            assert!(all.contains(row));
            assert!(filter.matches(row));
        }
    }

    #[test]
    fn test_date_window_overlap() {
        let window = DateWindow::new(d(4), d(10)).unwrap();
        let filter = FilterSpec::new().within(window);
        let names: Vec<_> = filter_sort(rows(), &filter, None).into_iter().map(|r| r.name).collect();
        // Check-out on the window start does not count; check-in on the window end does.
        assert_eq!(names, vec!["john smith"]);

        assert!(DateWindow::new(d(5), d(4)).is_err());
    }

    #[test]
    fn test_sort_is_case_insensitive_and_stable() {
        let mut by_name = rows();
        sort_records(&mut by_name, &SortSpec::asc("name"));
        let names: Vec<_> = by_name.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Anna Berg", "Ayşe Demir", "john smith", "Mehmet Kaya"]);

        // Equal prices keep their incoming order both ways.
        let mut asc = rows();
        sort_records(&mut asc, &SortSpec::asc("price"));
        assert_eq!(asc.iter().map(|r| r.name).collect::<Vec<_>>(), vec!["Mehmet Kaya", "Ayşe Demir", "Anna Berg", "john smith"]);
        let mut desc = rows();
        sort_records(&mut desc, &SortSpec::desc("price"));
        assert_eq!(desc.iter().map(|r| r.name).collect::<Vec<_>>(), vec!["john smith", "Ayşe Demir", "Anna Berg", "Mehmet Kaya"]);
    }

    #[test]
    fn test_sort_state_cycles() {
        let mut state = SortState::new(true);
        state.toggle("name");
        assert_eq!(state.current(), Some(&SortSpec::asc("name")));
        state.toggle("name");
        assert_eq!(state.current(), Some(&SortSpec::desc("name")));
        state.toggle("name");
        assert_eq!(state.current(), None);

        let mut strict = SortState::new(false);
        strict.toggle("price");
        strict.toggle("price");
        strict.toggle("price");
        assert_eq!(strict.current(), Some(&SortSpec::asc("price")));
        strict.toggle("price");
        strict.toggle("name");
        assert_eq!(strict.current(), Some(&SortSpec::asc("name")));
    }

    #[test]
    fn test_pages_cover_total_count() {
        let items: Vec<u32> = (0..23).collect();
        let pages: Vec<Page<u32>> = (1..=3).map(|p| paginate(items.clone(), PageRequest::new(p, 10))).collect();

        assert!(pages.iter().all(|p| p.total_pages == 3 && p.total_count == 23));
        assert_eq!(pages[0].items.len(), 10);
        assert_eq!(pages[1].items.len(), 10);
        assert_eq!(pages[2].items, vec![20, 21, 22]);
        assert_eq!(pages.iter().map(|p| p.items.len()).sum::<usize>(), 23);

        assert!(paginate(items, PageRequest::new(9, 10)).items.is_empty());
        assert_eq!(total_pages(0, 25), 0);
    }

    #[test]
    fn test_page_size_must_be_a_menu_choice() {
        assert!(PageRequest::validated(Some(2), Some(25), &PAGE_SIZE_CHOICES).is_ok());
        assert!(PageRequest::validated(None, Some(7), &PAGE_SIZE_CHOICES).is_err());
        let default = PageRequest::validated(Some(0), None, &PAGE_SIZE_CHOICES).unwrap();
        assert_eq!(default, PageRequest::new(1, 10));
    }
}
