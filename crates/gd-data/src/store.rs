//! In-memory record store

use std::path::Path;

use ahash::AHashMap;
use async_trait::async_trait;
use tracing::{debug, info};

use gd_core::{PageResult, QueryError, QueryParams, Record, RecordId, RecordSource};

use crate::sources::load_records_csv;
use crate::DataError;

/// Holds the full record set and answers paged, sorted, filtered queries
pub struct MemoryRecordStore {
    name: String,
    records: Vec<Record>,
    by_id: AHashMap<RecordId, usize>,
}

impl MemoryRecordStore {
    /// Create a store, rejecting duplicate record ids
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Result<Self, DataError> {
        let mut by_id = AHashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if by_id.insert(record.id().clone(), position).is_some() {
                return Err(DataError::DuplicateId(record.id().to_string()));
            }
        }

        let name = name.into();
        info!(store = %name, records = records.len(), "record store ready");

        Ok(Self { name, records, by_id })
    }

    /// Load a store from a CSV file
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let records = load_records_csv(file)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("records.csv")
            .to_string();
        Self::new(name, records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.by_id.get(id).map(|&position| &self.records[position])
    }

    /// Filter, sort and slice one page
    pub fn query_page(&self, params: &QueryParams) -> Result<PageResult, QueryError> {
        params.validate()?;

        let mut matching: Vec<&Record> = self
            .records
            .iter()
            .filter(|record| params.filter.matches(record))
            .collect();
        matching.sort_by(|a, b| params.sort.compare(a, b));

        let total_count = matching.len();
        let records: Vec<Record> = matching
            .into_iter()
            .skip(params.offset())
            .take(params.page_size)
            .cloned()
            .collect();

        debug!(
            page = params.page,
            page_size = params.page_size,
            returned = records.len(),
            total_count,
            "query answered"
        );

        Ok(PageResult {
            records,
            page: params.page,
            page_size: params.page_size,
            total_count,
        })
    }
}

#[async_trait]
impl RecordSource for MemoryRecordStore {
    async fn query(&self, params: &QueryParams) -> Result<PageResult, QueryError> {
        self.query_page(params)
    }

    async fn record_count(&self) -> Result<usize, QueryError> {
        Ok(self.records.len())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
