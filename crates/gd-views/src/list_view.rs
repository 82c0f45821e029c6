//! List view: the current page as a table

use gd_core::{
    FilterState, QuerySnapshot, RecordId, RecordStatus, SortDirection, SortField, StatusFilter,
    ViewEvent,
};

use crate::{SpaceView, SpaceViewId, ViewerContext};

/// Configuration for list views
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub show_row_numbers: bool,
    pub columns: Vec<SortField>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            show_row_numbers: true,
            columns: vec![
                SortField::Name,
                SortField::Status,
                SortField::Latitude,
                SortField::Longitude,
                SortField::Progress,
                SortField::LastUpdated,
            ],
        }
    }
}

/// A column header with its sort indicator
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHeader {
    pub field: SortField,
    pub label: &'static str,
    /// Set on the column the page is sorted by
    pub sort: Option<SortDirection>,
}

/// One rendered row
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    /// 1-based position across all pages
    pub row_number: usize,
    pub id: RecordId,
    pub name: String,
    pub status: RecordStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub progress: Option<f64>,
    pub budget: Option<f64>,
    pub last_updated: String,
    pub selected: bool,
}

/// What the table body shows
#[derive(Debug, Clone, PartialEq)]
pub enum ListBody {
    /// Nothing loaded yet and a query is pending
    Loading,
    /// Nothing was ever loaded and the query failed
    Error(String),
    /// The current filter matches no records
    NoRecords,
    Rows(Vec<ListRow>),
}

/// Pagination controls state
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState {
    /// Page the shown rows belong to
    pub page: usize,
    pub page_size: usize,
    /// Page and size the controls point at; ahead of `page` while a reload is pending
    pub requested_page: usize,
    pub requested_page_size: usize,
    pub page_count: usize,
    pub total_count: usize,
    /// First and last row number shown, 0 when the page is empty
    pub first_row: usize,
    pub last_row: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub page_sizes: Vec<usize>,
}

impl PaginationState {
    /// "51-100 of 5000"
    pub fn summary(&self) -> String {
        if self.total_count == 0 || self.first_row == 0 {
            format!("0 of {}", self.total_count)
        } else {
            format!("{}-{} of {}", self.first_row, self.last_row, self.total_count)
        }
    }
}

/// Everything needed to draw the list for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct ListFrame {
    pub columns: Vec<ColumnHeader>,
    pub body: ListBody,
    pub pagination: PaginationState,
    pub filter: FilterState,
    pub is_loading: bool,
    /// Message from the last failed query, shown above the last good page
    pub error: Option<String>,
}

/// Table view over the current page
pub struct ListView {
    id: SpaceViewId,
    title: String,
    pub config: TableConfig,
    events: Vec<ViewEvent>,
}

impl ListView {
    /// Create a new list view
    pub fn new(id: SpaceViewId, title: String) -> Self {
        Self {
            id,
            title,
            config: TableConfig::default(),
            events: Vec::new(),
        }
    }

    /// Build the frame for the current state
    pub fn frame(&self, ctx: &ViewerContext) -> ListFrame {
        let (snapshot, page_sizes) = {
            let state = ctx.query_state.read();
            (state.snapshot(), state.page_sizes().allowed().to_vec())
        };
        let selected = ctx.selection.selected();

        ListFrame {
            columns: self.columns(&snapshot),
            body: Self::body(&snapshot, selected.as_ref()),
            pagination: Self::pagination(&snapshot, page_sizes),
            filter: snapshot.params.filter.clone(),
            is_loading: snapshot.is_loading,
            error: snapshot.error.clone(),
        }
    }

    fn columns(&self, snapshot: &QuerySnapshot) -> Vec<ColumnHeader> {
        let sort = snapshot.params.sort;
        self.config
            .columns
            .iter()
            .map(|&field| ColumnHeader {
                field,
                label: field.label(),
                sort: (sort.field == field).then_some(sort.direction),
            })
            .collect()
    }

    fn body(snapshot: &QuerySnapshot, selected: Option<&RecordId>) -> ListBody {
        if snapshot.records.is_empty() {
            return if snapshot.is_loading {
                ListBody::Loading
            } else if let (Some(error), 0) = (&snapshot.error, snapshot.version) {
                ListBody::Error(error.clone())
            } else {
                ListBody::NoRecords
            };
        }

        let offset = snapshot.applied_offset();
        let rows = snapshot
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| ListRow {
                row_number: offset + index + 1,
                id: record.id().clone(),
                name: record.name().to_string(),
                status: record.status(),
                latitude: record.latitude(),
                longitude: record.longitude(),
                progress: record.progress(),
                budget: record.budget(),
                last_updated: record.last_updated().format("%Y-%m-%d %H:%M").to_string(),
                selected: selected == Some(record.id()),
            })
            .collect();

        ListBody::Rows(rows)
    }

    fn pagination(snapshot: &QuerySnapshot, page_sizes: Vec<usize>) -> PaginationState {
        let page = snapshot.applied_page;
        let page_count = snapshot.page_count();
        let offset = snapshot.applied_offset();
        let shown = snapshot.records.len();
        let (first_row, last_row) = if shown == 0 {
            (0, 0)
        } else {
            (offset + 1, offset + shown)
        };

        PaginationState {
            page,
            page_size: snapshot.applied_page_size,
            requested_page: snapshot.params.page,
            requested_page_size: snapshot.params.page_size,
            page_count,
            total_count: snapshot.total_count,
            first_row,
            last_row,
            has_previous: page > 1,
            has_next: page < page_count,
            page_sizes,
        }
    }

    pub fn change_page(&mut self, page: usize) {
        self.events.push(ViewEvent::PageChanged(page));
    }

    pub fn change_page_size(&mut self, size: usize) {
        self.events.push(ViewEvent::PageSizeChanged(size));
    }

    pub fn click_sort(&mut self, field: SortField) {
        self.events.push(ViewEvent::SortFieldClicked(field));
    }

    pub fn change_filter_text(&mut self, text: impl Into<String>) {
        self.events.push(ViewEvent::FilterTextChanged(text.into()));
    }

    pub fn change_status_filter(&mut self, status: StatusFilter) {
        self.events.push(ViewEvent::StatusFilterChanged(status));
    }

    pub fn click_row(&mut self, id: RecordId) {
        self.events.push(ViewEvent::RowClicked(id));
    }

    pub fn clear_selection(&mut self) {
        self.events.push(ViewEvent::SelectionCleared);
    }

    pub fn refresh(&mut self) {
        self.events.push(ViewEvent::RefreshRequested);
    }
}

impl SpaceView for ListView {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "list"
    }

    fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gd_core::{
        PageResult, PageSizeOptions, QueryError, QueryStateManager, Record, SelectionCoordinator,
        SortSpec,
    };
    use parking_lot::RwLock;
    use std::sync::Arc;

    fn context() -> ViewerContext {
        ViewerContext::new(
            Arc::new(RwLock::new(QueryStateManager::new(
                PageSizeOptions::default(),
                SortSpec::default(),
            ))),
            Arc::new(SelectionCoordinator::new()),
        )
    }

    fn load(ctx: &ViewerContext, total: usize) {
        let mut state = ctx.query_state.write();
        let ticket = state.begin_reload();
        let params = ticket.params().clone();
        let len = PageResult::expected_len(params.page, params.page_size, total);
        let records = (0..len)
            .map(|i| {
                Record::new(
                    format!("r{}", params.offset() + i),
                    format!("Site {}", params.offset() + i),
                    12.0,
                    77.0,
                    gd_core::RecordStatus::Active,
                    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
                )
                .unwrap()
            })
            .collect();
        state.complete_reload(
            ticket,
            Ok(PageResult {
                records,
                page: params.page,
                page_size: params.page_size,
                total_count: total,
            }),
        );
    }

    fn view() -> ListView {
        ListView::new(SpaceViewId::new_v4(), "Records".to_string())
    }

    #[test]
    fn test_loading_before_first_page() {
        let ctx = context();
        ctx.query_state.write().begin_reload();
        let frame = view().frame(&ctx);
        assert_eq!(frame.body, ListBody::Loading);
        assert!(frame.is_loading);
    }

    #[test]
    fn test_rows_and_pagination() {
        let ctx = context();
        ctx.query_state.write().set_page(2);
        load(&ctx, 120);

        let frame = view().frame(&ctx);
        let ListBody::Rows(rows) = &frame.body else {
            panic!("expected rows, got {:?}", frame.body);
        };
        assert_eq!(rows.len(), 50);
        assert_eq!(rows[0].row_number, 51);
        assert_eq!(rows[0].last_updated, "2024-05-01 08:00");

        assert_eq!(frame.pagination.page_count, 3);
        assert_eq!(frame.pagination.summary(), "51-100 of 120");
        assert!(frame.pagination.has_previous);
        assert!(frame.pagination.has_next);
        assert_eq!(frame.pagination.page_sizes, vec![25, 50, 100]);
    }

    #[test]
    fn test_rows_keep_their_page_while_reload_is_pending() {
        let ctx = context();
        load(&ctx, 120);
        ctx.query_state.write().set_page(3);

        let frame = view().frame(&ctx);
        let ListBody::Rows(rows) = &frame.body else {
            panic!("expected rows, got {:?}", frame.body);
        };
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(rows[0].id.as_str(), "r0");
        assert_eq!(rows[49].row_number, 50);
        assert_eq!(frame.pagination.summary(), "1-50 of 120");
        assert_eq!(frame.pagination.page, 1);
        assert_eq!(frame.pagination.requested_page, 3);
        assert!(!frame.pagination.has_previous);
        assert!(frame.pagination.has_next);

        load(&ctx, 120);
        let frame = view().frame(&ctx);
        assert_eq!(frame.pagination.summary(), "101-120 of 120");
        assert_eq!(frame.pagination.page, 3);
        assert!(!frame.pagination.has_next);
    }

    #[test]
    fn test_page_size_change_keeps_applied_numbering() {
        let ctx = context();
        ctx.query_state.write().set_page(2);
        load(&ctx, 120);
        ctx.query_state.write().set_page_size(25);

        let frame = view().frame(&ctx);
        assert_eq!(frame.pagination.summary(), "51-100 of 120");
        assert_eq!(frame.pagination.page_size, 50);
        assert_eq!(frame.pagination.requested_page_size, 25);
        assert_eq!(frame.pagination.page_count, 3);
    }

    #[test]
    fn test_no_records_state() {
        let ctx = context();
        ctx.query_state.write().set_name_filter("nothing matches");
        load(&ctx, 0);

        let frame = view().frame(&ctx);
        assert_eq!(frame.body, ListBody::NoRecords);
        assert_eq!(frame.pagination.summary(), "0 of 0");
        assert!(!frame.pagination.has_next);
        assert_eq!(frame.filter.name_contains, "nothing matches");
    }

    #[test]
    fn test_error_without_data() {
        let ctx = context();
        {
            let mut state = ctx.query_state.write();
            let ticket = state.begin_reload();
            state.complete_reload(ticket, Err(QueryError::Source("boom".to_string())));
        }
        let frame = view().frame(&ctx);
        assert_eq!(frame.body, ListBody::Error("record source error: boom".to_string()));
    }

    #[test]
    fn test_error_keeps_last_good_rows() {
        let ctx = context();
        load(&ctx, 10);
        {
            let mut state = ctx.query_state.write();
            let ticket = state.begin_reload();
            state.complete_reload(ticket, Err(QueryError::Source("boom".to_string())));
        }

        let frame = view().frame(&ctx);
        assert!(matches!(frame.body, ListBody::Rows(ref rows) if rows.len() == 10));
        assert_eq!(frame.error.as_deref(), Some("record source error: boom"));
    }

    #[test]
    fn test_selected_row_is_marked() {
        let ctx = context();
        load(&ctx, 5);
        ctx.selection.select(RecordId::from("r3"));

        let frame = view().frame(&ctx);
        let ListBody::Rows(rows) = frame.body else {
            panic!("expected rows");
        };
        let selected: Vec<_> = rows.iter().filter(|r| r.selected).map(|r| r.id.as_str()).collect();
        assert_eq!(selected, vec!["r3"]);
    }

    #[test]
    fn test_sort_indicator() {
        let ctx = context();
        ctx.query_state.write().set_sort(SortField::Progress, SortDirection::Descending);

        let frame = view().frame(&ctx);
        let sorted: Vec<_> = frame.columns.iter().filter(|c| c.sort.is_some()).collect();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].field, SortField::Progress);
        assert_eq!(sorted[0].sort, Some(SortDirection::Descending));
    }

    #[test]
    fn test_events_are_queued_in_order() {
        let mut view = view();
        view.click_sort(SortField::Name);
        view.change_filter_text("delhi");
        view.click_row(RecordId::from("r1"));

        assert_eq!(
            view.drain_events(),
            vec![
                ViewEvent::SortFieldClicked(SortField::Name),
                ViewEvent::FilterTextChanged("delhi".to_string()),
                ViewEvent::RowClicked(RecordId::from("r1")),
            ]
        );
        assert!(view.drain_events().is_empty());
    }
}
