//! List-screen state as one value with named transitions.
//!
//! Every user interaction on a list screen (typing in the search box, clicking a
//! column header, ticking a row, confirming a bulk delete) is a [`ViewAction`];
//! [`ListView::apply`] is the only way the state changes. Side effects the
//! screen must perform come back as a [`Command`].

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::bulk::{BulkOperation, BulkOutcome};
use crate::query::{self, DateWindow, Fields, FilterSpec, Page, PageRequest, SortState};
use crate::repository::Record;
use crate::CoreResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<Uuid>,
}

impl Selection {
    pub fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.ids.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    fn toggle(&mut self, id: Uuid) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    /// Flips between nothing and exactly `selectable`.
    fn toggle_all(&mut self, selectable: BTreeSet<Uuid>) {
        if !selectable.is_empty() && self.ids == selectable {
            self.ids.clear();
        } else {
            self.ids = selectable;
        }
    }

    fn retain(&mut self, keep: impl Fn(&Uuid) -> bool) {
        self.ids.retain(|id| keep(id));
    }
}

#[derive(Debug)]
pub enum ViewAction<T, S> {
    Search(String),
    SetEquals { field: String, value: Option<String> },
    SetRange { field: String, min: Option<f64>, max: Option<f64> },
    SetWindow(Option<DateWindow>),
    ClearFilters,
    ToggleSort(String),
    GoToPage(usize),
    SetPageSize(usize),
    ToggleRow(Uuid),
    ToggleAll,
    RequestBulk(BulkOperation<S>),
    ConfirmBulk,
    CancelBulk,
    Refreshed(CoreResult<Vec<T>>),
    BulkFinished(BulkOutcome),
    DismissNotice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<S> {
    Execute { ids: Vec<Uuid>, operation: BulkOperation<S> },
    Refresh,
}

#[derive(Debug, Clone)]
pub struct ListView<T, S> {
    items: Vec<T>,
    pub filter: FilterSpec,
    pub sort: SortState,
    pub page: usize,
    pub page_size: usize,
    page_sizes: Vec<usize>,
    pub selection: Selection,
    pub pending: Option<BulkOperation<S>>,
    pub notice: Option<String>,
}

impl<T, S> ListView<T, S>
where
    T: Record + Fields,
    S: Clone,
{
    pub fn new(search_fields: &[&str], page_sizes: &[usize], allow_unsorted: bool) -> Self {
        let page_sizes = if page_sizes.is_empty() {
            query::PAGE_SIZE_CHOICES.to_vec()
        } else {
            page_sizes.to_vec()
        };
        let filter = FilterSpec {
            text_fields: search_fields.iter().map(|f| f.to_string()).collect(),
            ..FilterSpec::default()
        };

        Self {
            items: Vec::new(),
            filter,
            sort: SortState::new(allow_unsorted),
            page: 1,
            page_size: page_sizes[0],
            page_sizes,
            selection: Selection::default(),
            pending: None,
            notice: None,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Ids that pass the current filter and are not locked.
    pub fn selectable_ids(&self) -> BTreeSet<Uuid> {
        self.items
            .iter()
            .filter(|r| !r.is_locked() && self.filter.matches(*r))
            .map(|r| r.id())
            .collect()
    }

    pub fn visible(&self) -> Page<T> {
        query::apply(
            self.items.clone(),
            &self.filter,
            self.sort.current(),
            PageRequest::new(self.page, self.page_size),
        )
    }

    fn filtered_count(&self) -> usize {
        self.items.iter().filter(|r| self.filter.matches(*r)).count()
    }

    fn filter_changed(&mut self) {
        self.page = 1;
    }

    pub fn apply(&mut self, action: ViewAction<T, S>) -> Option<Command<S>> {
        match action {
            ViewAction::Search(text) => {
                self.filter.set_text(Some(text));
                self.filter_changed();
            }
            ViewAction::SetEquals { field, value } => {
                self.filter.set_equals(&field, value);
                self.filter_changed();
            }
            ViewAction::SetRange { field, min, max } => {
                self.filter.set_range(&field, min, max);
                self.filter_changed();
            }
            ViewAction::SetWindow(window) => {
                self.filter.window = window;
                self.filter_changed();
            }
            ViewAction::ClearFilters => {
                let text_fields = std::mem::take(&mut self.filter.text_fields);
                self.filter = FilterSpec { text_fields, ..FilterSpec::default() };
                self.filter_changed();
            }
            ViewAction::ToggleSort(field) => self.sort.toggle(&field),
            ViewAction::GoToPage(page) => {
                let last = query::total_pages(self.filtered_count(), self.page_size).max(1);
                self.page = page.clamp(1, last);
            }
            ViewAction::SetPageSize(size) => {
                if self.page_sizes.contains(&size) {
                    self.page_size = size;
                    self.page = 1;
                } else {
                    self.notice = Some(format!("Page size {} is not available", size));
                }
            }
            ViewAction::ToggleRow(id) => {
                if self.items.iter().any(|r| r.id() == id && !r.is_locked()) {
                    self.selection.toggle(id);
                }
            }
            ViewAction::ToggleAll => {
                let selectable = self.selectable_ids();
                self.selection.toggle_all(selectable);
            }
            ViewAction::RequestBulk(operation) => {
                if self.selection.is_empty() {
                    self.notice = Some("Select at least one record first".to_string());
                    return None;
                }
                if !operation.is_destructive() {
                    return Some(Command::Execute { ids: self.selection.ids(), operation });
                }
                self.pending = Some(operation);
            }
            ViewAction::ConfirmBulk => {
                let operation = self.pending.take()?;
                return Some(Command::Execute { ids: self.selection.ids(), operation });
            }
            ViewAction::CancelBulk => self.pending = None,
            ViewAction::Refreshed(Ok(items)) => {
                self.items = items;
                let items = &self.items;
                self.selection
                    .retain(|id| items.iter().any(|r| r.id() == *id && !r.is_locked()));
                let last = query::total_pages(self.filtered_count(), self.page_size).max(1);
                self.page = self.page.min(last);
            }
            ViewAction::Refreshed(Err(e)) => {
                tracing::warn!(kind = T::KIND, "list refresh failed: {}", e);
                self.items.clear();
                self.selection.clear();
                self.page = 1;
                self.notice = Some(e.to_string());
            }
            ViewAction::BulkFinished(outcome) => {
                self.selection.clear();
                self.notice = Some(format!(
                    "{} succeeded, {} failed, {} skipped",
                    outcome.succeeded, outcome.failed, outcome.skipped
                ));
                return Some(Command::Refresh);
            }
            ViewAction::DismissNotice => self.notice = None,
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FieldValue;
    use crate::CoreError;

    #[derive(Debug, Clone)]
    struct Stay {
        id: Uuid,
        guest: String,
        locked: bool,
    }

    impl Record for Stay {
        const KIND: &'static str = "stays";
        fn id(&self) -> Uuid {
            self.id
        }
        fn version(&self) -> i64 {
            1
        }
        fn set_version(&mut self, _version: i64) {}
        fn is_locked(&self) -> bool {
            self.locked
        }
    }

    impl Fields for Stay {
        fn field(&self, name: &str) -> Option<FieldValue<'_>> {
            (name == "guest").then(|| FieldValue::text(&self.guest))
        }
    }

    fn stays(n: usize) -> Vec<Stay> {
        (0..n)
            .map(|i| Stay { id: Uuid::new_v4(), guest: format!("guest {}", i), locked: i % 5 == 0 })
            .collect()
    }

    fn loaded(n: usize) -> ListView<Stay, ()> {
        let mut view = ListView::new(&["guest"], &[10, 25], true);
        view.apply(ViewAction::Refreshed(Ok(stays(n))));
        view
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut view = loaded(30);
        view.apply(ViewAction::GoToPage(3));
        assert_eq!(view.page, 3);

        view.apply(ViewAction::Search("guest 1".into()));
        assert_eq!(view.page, 1);

        view.apply(ViewAction::GoToPage(99));
        assert_eq!(view.page, 2); // "guest 1" and "guest 10".."guest 19": 11 rows
    }

    #[test]
    fn test_select_all_skips_locked_rows() {
        let mut view = loaded(10);
        view.apply(ViewAction::ToggleAll);
        assert_eq!(view.selection.len(), 8);
        assert!(view.items().iter().filter(|s| s.locked).all(|s| !view.selection.contains(&s.id)));

        view.apply(ViewAction::ToggleAll);
        assert!(view.selection.is_empty());

        let locked = view.items()[0].id;
        view.apply(ViewAction::ToggleRow(locked));
        assert!(view.selection.is_empty());
    }

    #[test]
    fn test_bulk_delete_waits_for_confirmation() {
        let mut view = loaded(3);
        let id = view.items()[1].id;
        view.apply(ViewAction::ToggleRow(id));

        assert_eq!(view.apply(ViewAction::RequestBulk(BulkOperation::Delete)), None);
        assert_eq!(view.pending, Some(BulkOperation::Delete));

        let command = view.apply(ViewAction::ConfirmBulk);
        assert_eq!(command, Some(Command::Execute { ids: vec![id], operation: BulkOperation::Delete }));
        assert_eq!(view.pending, None);

        let after = view.apply(ViewAction::BulkFinished(BulkOutcome { succeeded: 1, ..Default::default() }));
        assert_eq!(after, Some(Command::Refresh));
        assert!(view.selection.is_empty());
    }

    #[test]
    fn test_failed_refresh_degrades_to_empty_list() {
        let mut view = loaded(4);
        view.apply(ViewAction::ToggleAll);
        view.apply(ViewAction::Refreshed(Err(CoreError::Remote("connection reset".into()))));

        assert!(view.items().is_empty());
        assert!(view.selection.is_empty());
        assert!(view.notice.as_deref().unwrap_or_default().contains("connection reset"));
    }
}
