//! Query state manager: pagination, sort, filter and the current page

use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::query::{
    index_by_id, page_count, FilterState, PageResult, PageSizeOptions, QueryError, QueryParams,
    SortDirection, SortField, SortSpec, StatusFilter,
};
use crate::record::{Record, RecordId};
use crate::settings::QuerySettings;

/// Handle for one initiated reload
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadTicket {
    generation: u64,
    params: QueryParams,
}

impl ReloadTicket {
    /// Generation number assigned when the reload was initiated
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Parameters captured when the reload was initiated
    pub fn params(&self) -> &QueryParams {
        &self.params
    }
}

/// What happened when a reload result came back
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// The page replaced the current records
    Applied {
        generation: u64,
        record_count: usize,
        total_count: usize,
    },
    /// The query failed; previous records are untouched
    Failed { generation: u64, message: String },
    /// A newer reload was initiated after this one; the result was dropped
    Stale { generation: u64, latest_generation: u64 },
}

/// Read-only copy of the query state handed to views
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    /// Requested parameters; may be ahead of `records` while a reload is pending
    pub params: QueryParams,
    pub records: Arc<Vec<Record>>,
    /// Page number `records` and `total_count` were answered for
    pub applied_page: usize,
    /// Page size `records` and `total_count` were answered for
    pub applied_page_size: usize,
    pub total_count: usize,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Incremented every time a page is applied
    pub version: u64,
}

impl QuerySnapshot {
    /// Number of pages in the applied result
    pub fn page_count(&self) -> usize {
        page_count(self.total_count, self.applied_page_size)
    }

    /// Zero-based position of the first applied record across all pages
    pub fn applied_offset(&self) -> usize {
        self.applied_page.saturating_sub(1) * self.applied_page_size
    }

    /// Lookup from id to record for the applied page
    pub fn index(&self) -> IndexMap<&RecordId, &Record> {
        index_by_id(&self.records)
    }

    /// Find a record on the applied page
    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id() == id)
    }
}

/// Single source of truth for which page of which sorted, filtered view is shown.
///
/// Reloads are tagged with a generation number; only the result of the most
/// recently initiated reload is ever applied.
#[derive(Debug)]
pub struct QueryStateManager {
    params: QueryParams,
    page_sizes: PageSizeOptions,
    records: Arc<Vec<Record>>,
    applied_page: usize,
    applied_page_size: usize,
    total_count: usize,
    is_loading: bool,
    error: Option<String>,
    latest_generation: u64,
    version: u64,
}

impl QueryStateManager {
    /// Create a manager on page 1 with the default page size and sort
    pub fn new(page_sizes: PageSizeOptions, default_sort: SortSpec) -> Self {
        let params = QueryParams::new(page_sizes.default_size(), default_sort);
        Self {
            applied_page: params.page,
            applied_page_size: params.page_size,
            params,
            page_sizes,
            records: Arc::new(Vec::new()),
            total_count: 0,
            is_loading: false,
            error: None,
            latest_generation: 0,
            version: 0,
        }
    }

    /// Create a manager from the query section of the settings
    pub fn from_settings(settings: &QuerySettings) -> anyhow::Result<Self> {
        Ok(Self::new(settings.page_size_options()?, settings.default_sort))
    }

    /// Requested parameters, including changes not yet reloaded
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Allowed page sizes
    pub fn page_sizes(&self) -> &PageSizeOptions {
        &self.page_sizes
    }

    /// Records of the last applied page
    pub fn records(&self) -> &Arc<Vec<Record>> {
        &self.records
    }

    /// Page number the current records belong to
    pub fn applied_page(&self) -> usize {
        self.applied_page
    }

    /// Page size the current records were fetched with
    pub fn applied_page_size(&self) -> usize {
        self.applied_page_size
    }

    /// Total matching records reported with the last applied page
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Number of pages in the last applied result
    pub fn page_count(&self) -> usize {
        page_count(self.total_count, self.applied_page_size)
    }

    /// Whether the most recently initiated reload is still pending
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Message from the last failed reload, cleared when a page is applied
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Generation of the most recently initiated reload
    pub fn latest_generation(&self) -> u64 {
        self.latest_generation
    }

    /// Number of pages applied so far
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Copy of the state for building a frame
    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            params: self.params.clone(),
            records: self.records.clone(),
            applied_page: self.applied_page,
            applied_page_size: self.applied_page_size,
            total_count: self.total_count,
            is_loading: self.is_loading,
            error: self.error.clone(),
            version: self.version,
        }
    }

    /// Go to page `max(1, page)`. Returns whether the page changed.
    pub fn set_page(&mut self, page: usize) -> bool {
        let page = page.max(1);
        if self.params.page == page {
            return false;
        }
        self.params.page = page;
        true
    }

    /// Set the page size and go back to page 1.
    ///
    /// Unsupported sizes are clamped to the nearest allowed size (ties go to
    /// the smaller one), so nothing outside the allowed set reaches a source.
    pub fn set_page_size(&mut self, requested: usize) -> bool {
        let size = self.page_sizes.clamp(requested);
        if size != requested {
            warn!(requested, clamped = size, "unsupported page size, clamping");
        }
        let before = self.params.clone();
        self.params.page_size = size;
        self.params.page = 1;
        before != self.params
    }

    /// Replace the sort and go back to page 1
    pub fn set_sort(&mut self, field: SortField, direction: SortDirection) -> bool {
        let before = self.params.clone();
        self.params.sort = SortSpec::new(field, direction);
        self.params.page = 1;
        before != self.params
    }

    /// Header click: same field flips direction, another field sorts ascending
    pub fn toggle_sort(&mut self, field: SortField) -> bool {
        let direction = if self.params.sort.field == field {
            self.params.sort.direction.toggled()
        } else {
            SortDirection::Ascending
        };
        self.set_sort(field, direction)
    }

    /// Replace the filter and go back to page 1
    pub fn set_filter(&mut self, filter: FilterState) -> bool {
        let before = self.params.clone();
        self.params.filter = filter;
        self.params.page = 1;
        before != self.params
    }

    /// Replace the name filter text, keeping the status filter
    pub fn set_name_filter(&mut self, text: impl Into<String>) -> bool {
        let filter = FilterState {
            name_contains: text.into(),
            status: self.params.filter.status,
        };
        self.set_filter(filter)
    }

    /// Replace the status filter, keeping the name filter text
    pub fn set_status_filter(&mut self, status: StatusFilter) -> bool {
        let filter = FilterState {
            name_contains: self.params.filter.name_contains.clone(),
            status,
        };
        self.set_filter(filter)
    }

    /// Start a reload with the current parameters
    pub fn begin_reload(&mut self) -> ReloadTicket {
        self.latest_generation += 1;
        self.is_loading = true;
        debug!(generation = self.latest_generation, page = self.params.page, "reload started");

        ReloadTicket {
            generation: self.latest_generation,
            params: self.params.clone(),
        }
    }

    /// Apply a query result if it belongs to the most recently initiated reload
    pub fn complete_reload(
        &mut self,
        ticket: ReloadTicket,
        result: Result<PageResult, QueryError>,
    ) -> ReloadOutcome {
        let generation = ticket.generation;
        if generation != self.latest_generation {
            debug!(generation, latest = self.latest_generation, "discarding stale reload result");
            return ReloadOutcome::Stale {
                generation,
                latest_generation: self.latest_generation,
            };
        }

        self.is_loading = false;

        let result = result.and_then(|page| Self::check_page(&ticket.params, page));
        match result {
            Ok(page) => {
                let record_count = page.records.len();
                self.records = Arc::new(page.records);
                self.applied_page = page.page;
                self.applied_page_size = page.page_size;
                self.total_count = page.total_count;
                self.error = None;
                self.version += 1;
                debug!(generation, record_count, total = self.total_count, "page applied");

                ReloadOutcome::Applied {
                    generation,
                    record_count,
                    total_count: self.total_count,
                }
            }
            Err(error) => {
                let message = error.to_string();
                warn!(generation, %message, "reload failed, keeping previous page");
                self.error = Some(message.clone());
                ReloadOutcome::Failed { generation, message }
            }
        }
    }

    /// Run `query` against the current parameters and apply its result.
    ///
    /// The lock is only held to start and to finish the reload, never while
    /// the query is pending, so concurrent reloads are resolved by generation.
    pub async fn reload<F, Fut>(state: &RwLock<Self>, query: F) -> ReloadOutcome
    where
        F: FnOnce(QueryParams) -> Fut,
        Fut: Future<Output = Result<PageResult, QueryError>>,
    {
        let ticket = state.write().begin_reload();
        let result = query(ticket.params.clone()).await;
        state.write().complete_reload(ticket, result)
    }

    fn check_page(params: &QueryParams, page: PageResult) -> Result<PageResult, QueryError> {
        if page.page != params.page || page.page_size != params.page_size {
            return Err(QueryError::InvalidParameters(format!(
                "source answered page {} (size {}) for page {} (size {})",
                page.page, page.page_size, params.page, params.page_size
            )));
        }
        if !page.is_consistent() {
            return Err(QueryError::InvalidParameters(format!(
                "source returned {} records for page {} of {} total",
                page.records.len(),
                page.page,
                page.total_count
            )));
        }
        Ok(page)
    }
}
