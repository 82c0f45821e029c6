//! Query parameters, page results and their ordering/filtering semantics

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{Record, RecordId, RecordStatus};

/// Errors produced by a record query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("invalid query parameters: {0}")]
    InvalidParameters(String),

    #[error("record source error: {0}")]
    Source(String),

    #[error("record source unavailable: {0}")]
    Unavailable(String),
}

/// Record field a page can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    Id,
    Name,
    Status,
    Latitude,
    Longitude,
    LastUpdated,
    Budget,
    Progress,
}

impl SortField {
    pub const ALL: [SortField; 8] = [
        SortField::Id,
        SortField::Name,
        SortField::Status,
        SortField::Latitude,
        SortField::Longitude,
        SortField::LastUpdated,
        SortField::Budget,
        SortField::Progress,
    ];

    /// Column label
    pub fn label(&self) -> &'static str {
        match self {
            SortField::Id => "ID",
            SortField::Name => "Name",
            SortField::Status => "Status",
            SortField::Latitude => "Latitude",
            SortField::Longitude => "Longitude",
            SortField::LastUpdated => "Last Updated",
            SortField::Budget => "Budget",
            SortField::Progress => "Progress",
        }
    }

    /// Parse a field name as typed by a user ("name", "last_updated", "lastUpdated", ...)
    pub fn parse(s: &str) -> Option<SortField> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "id" => Some(SortField::Id),
            "name" => Some(SortField::Name),
            "status" => Some(SortField::Status),
            "lat" | "latitude" => Some(SortField::Latitude),
            "lon" | "lng" | "longitude" => Some(SortField::Longitude),
            "updated" | "lastupdated" => Some(SortField::LastUpdated),
            "budget" => Some(SortField::Budget),
            "progress" => Some(SortField::Progress),
            _ => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Sort state: a field plus a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::Name,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn ascending(field: SortField) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn descending(field: SortField) -> Self {
        Self::new(field, SortDirection::Descending)
    }

    /// Total order over records for this sort.
    ///
    /// Ties on the sort key fall back to the record id so equal keys still
    /// produce a deterministic order; the direction reverses the whole order.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let by_field = match self.field {
            SortField::Id => collate(a.id().as_str(), b.id().as_str()),
            SortField::Name => collate(a.name(), b.name()),
            SortField::Status => a.status().cmp(&b.status()),
            SortField::Latitude => a.latitude().total_cmp(&b.latitude()),
            SortField::Longitude => a.longitude().total_cmp(&b.longitude()),
            SortField::LastUpdated => a.last_updated().cmp(&b.last_updated()),
            SortField::Budget => compare_optional(a.budget(), b.budget()),
            SortField::Progress => compare_optional(a.progress(), b.progress()),
        };
        let ordering = by_field.then_with(|| a.id().cmp(b.id()));

        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// String collation: case-insensitive first, raw text as the tie-breaker
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_optional(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Status filter: everything, or exactly one status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(RecordStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: RecordStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }

    /// Parse "all" or a status name
    pub fn parse(s: &str) -> Option<StatusFilter> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(StatusFilter::All);
        }
        s.parse::<RecordStatus>().ok().map(StatusFilter::Only)
    }
}

/// Filter predicate state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    /// Case-insensitive substring matched against the record name
    pub name_contains: String,
    pub status: StatusFilter,
}

impl FilterState {
    pub fn new(name_contains: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            name_contains: name_contains.into(),
            status,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name_contains.trim().is_empty() && self.status == StatusFilter::All
    }

    /// Check whether a record passes this filter
    pub fn matches(&self, record: &Record) -> bool {
        if !self.status.matches(record.status()) {
            return false;
        }

        let needle = self.name_contains.trim();
        needle.is_empty() || record.name().to_lowercase().contains(&needle.to_lowercase())
    }
}

/// The set of page sizes the dashboard accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSizeOptions {
    allowed: Vec<usize>,
    default: usize,
}

impl Default for PageSizeOptions {
    fn default() -> Self {
        Self {
            allowed: vec![25, 50, 100],
            default: 50,
        }
    }
}

impl PageSizeOptions {
    /// Create page size options. Sizes are sorted and deduplicated; zero is rejected.
    pub fn new(mut allowed: Vec<usize>, default: usize) -> Result<Self, QueryError> {
        allowed.sort_unstable();
        allowed.dedup();

        if allowed.is_empty() {
            return Err(QueryError::InvalidParameters("no page sizes configured".to_string()));
        }
        if allowed[0] == 0 {
            return Err(QueryError::InvalidParameters("page size 0 is not allowed".to_string()));
        }
        if !allowed.contains(&default) {
            return Err(QueryError::InvalidParameters(format!(
                "default page size {} is not one of {:?}",
                default, allowed
            )));
        }

        Ok(Self { allowed, default })
    }

    pub fn allowed(&self) -> &[usize] {
        &self.allowed
    }

    pub fn default_size(&self) -> usize {
        self.default
    }

    pub fn contains(&self, size: usize) -> bool {
        self.allowed.contains(&size)
    }

    /// Nearest allowed size; ties resolve to the smaller size
    pub fn clamp(&self, requested: usize) -> usize {
        self.allowed
            .iter()
            .copied()
            .min_by_key(|size| (size.abs_diff(requested), *size))
            .unwrap_or(self.default)
    }
}

/// Everything needed to ask a source for one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
    pub sort: SortSpec,
    pub filter: FilterState,
}

impl QueryParams {
    pub fn new(page_size: usize, sort: SortSpec) -> Self {
        Self {
            page: 1,
            page_size,
            sort,
            filter: FilterState::default(),
        }
    }

    /// Number of matching records before this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Reject parameters no source should ever see
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.page == 0 {
            return Err(QueryError::InvalidParameters("page numbers start at 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(QueryError::InvalidParameters("page size must be positive".to_string()));
        }
        Ok(())
    }
}

/// One page of sorted, filtered records
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub records: Vec<Record>,
    pub page: usize,
    pub page_size: usize,
    /// Number of records matching the filter across all pages
    pub total_count: usize,
}

impl PageResult {
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self {
            records: Vec::new(),
            page,
            page_size,
            total_count: 0,
        }
    }

    /// Length a page must have for the given parameters
    pub fn expected_len(page: usize, page_size: usize, total_count: usize) -> usize {
        let before = page.saturating_sub(1).saturating_mul(page_size);
        page_size.min(total_count.saturating_sub(before))
    }

    /// Whether the record count agrees with page, page size and total
    pub fn is_consistent(&self) -> bool {
        self.records.len() == Self::expected_len(self.page, self.page_size, self.total_count)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.total_count, self.page_size)
    }

    /// Id lookup for the records on this page, derived on demand
    pub fn index(&self) -> IndexMap<&RecordId, &Record> {
        index_by_id(&self.records)
    }
}

/// Number of pages needed for `total_count` records
pub fn page_count(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total_count.div_ceil(page_size)
    }
}

/// Map from id to record, in page order
pub fn index_by_id(records: &[Record]) -> IndexMap<&RecordId, &Record> {
    records.iter().map(|record| (record.id(), record)).collect()
}
