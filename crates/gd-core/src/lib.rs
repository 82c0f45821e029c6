//! Core functionality for the geo dashboard
//!
//! This crate owns the client-side data view model: the record model, query
//! parameters, the query state manager, the shared selection and the
//! orchestrator that keeps them in step with the views.

pub mod events;
pub mod orchestrator;
pub mod query;
pub mod query_state;
pub mod record;
pub mod selection;
pub mod settings;

// Re-export commonly used types
pub use data::RecordSource;
pub use events::{EventBus, ViewEvent};
pub use orchestrator::{Orchestrator, ReloadPhase};
pub use query::{
    FilterState, PageResult, PageSizeOptions, QueryError, QueryParams, SortDirection, SortField,
    SortSpec, StatusFilter,
};
pub use query_state::{QuerySnapshot, QueryStateManager, ReloadOutcome, ReloadTicket};
pub use record::{Record, RecordAttributes, RecordError, RecordId, RecordStatus};
pub use selection::SelectionCoordinator;
pub use settings::{DashboardSettings, QuerySettings, SelectionRetention, SourceSettings};

pub mod data {
    use crate::query::{PageResult, QueryError, QueryParams};

    /// Anything that can answer paged, sorted, filtered record queries
    #[async_trait::async_trait]
    pub trait RecordSource: Send + Sync {
        /// Fetch one page for the given parameters
        async fn query(&self, params: &QueryParams) -> Result<PageResult, QueryError>;

        /// Total number of records held, ignoring any filter
        async fn record_count(&self) -> Result<usize, QueryError>;

        /// Get the source name
        fn source_name(&self) -> &str;
    }
}
