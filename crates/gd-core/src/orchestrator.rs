//! Orchestrator: turns parameter changes into debounced reloads
//!
//! The orchestrator owns the query state manager and the selection
//! coordinator and hands `Arc`s of both to the views. Parameter changes
//! schedule a reload after the debounce window; selection changes never
//! touch the record source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::data::RecordSource;
use crate::events::{events, EventBus, ViewEvent};
use crate::query::{FilterState, PageResult, QueryError, SortDirection, SortField, StatusFilter};
use crate::query_state::{QuerySnapshot, QueryStateManager, ReloadOutcome, ReloadTicket};
use crate::record::RecordId;
use crate::selection::SelectionCoordinator;
use crate::settings::{DashboardSettings, SelectionRetention};

/// Where the current reload cycle stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPhase {
    /// Nothing pending
    Idle,
    /// A debounce timer is pending
    Scheduled,
    /// The latest query has been issued and not yet resolved
    InFlight,
}

/// Wires the query state and the selection to the views.
///
/// All methods that may start work must be called from within a Tokio
/// runtime. Dropping the orchestrator tears it down.
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    query_state: Arc<RwLock<QueryStateManager>>,
    selection: Arc<SelectionCoordinator>,
    source: Arc<dyn RecordSource>,
    event_bus: Arc<EventBus>,
    debounce: Duration,
    retention: SelectionRetention,
    timer: Mutex<Option<JoinHandle<()>>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    mounted: AtomicBool,
    torn_down: AtomicBool,
}

impl Orchestrator {
    /// Create an orchestrator from settings
    pub fn new(source: Arc<dyn RecordSource>, settings: &DashboardSettings) -> anyhow::Result<Self> {
        let query_state = QueryStateManager::from_settings(&settings.query)?;
        Ok(Self::with_state(
            source,
            query_state,
            settings.debounce(),
            settings.selection_retention,
        ))
    }

    /// Create an orchestrator around an existing query state manager
    pub fn with_state(
        source: Arc<dyn RecordSource>,
        query_state: QueryStateManager,
        debounce: Duration,
        retention: SelectionRetention,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                query_state: Arc::new(RwLock::new(query_state)),
                selection: Arc::new(SelectionCoordinator::new()),
                source,
                event_bus: Arc::new(EventBus::new()),
                debounce,
                retention,
                timer: Mutex::new(None),
                in_flight: Mutex::new(Vec::new()),
                mounted: AtomicBool::new(false),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn query_state(&self) -> Arc<RwLock<QueryStateManager>> {
        self.inner.query_state.clone()
    }

    pub fn selection(&self) -> Arc<SelectionCoordinator> {
        self.inner.selection.clone()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.inner.event_bus.clone()
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        self.inner.query_state.read().snapshot()
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    /// Load the first page immediately, without waiting for the debounce window
    pub fn mount(&self) {
        if self.inner.mounted.swap(true, Ordering::SeqCst) {
            warn!("orchestrator already mounted");
            return;
        }
        info!(source = self.inner.source.source_name(), "mounting dashboard");
        self.inner.spawn_reload();
    }

    pub fn set_page(&self, page: usize) -> bool {
        let changed = self.inner.query_state.write().set_page(page);
        self.parameters_changed(changed)
    }

    pub fn next_page(&self) -> bool {
        let next = self.inner.query_state.read().params().page + 1;
        self.set_page(next)
    }

    pub fn previous_page(&self) -> bool {
        let previous = self.inner.query_state.read().params().page.saturating_sub(1);
        self.set_page(previous)
    }

    pub fn set_page_size(&self, size: usize) -> bool {
        let changed = self.inner.query_state.write().set_page_size(size);
        self.parameters_changed(changed)
    }

    pub fn set_sort(&self, field: SortField, direction: SortDirection) -> bool {
        let changed = self.inner.query_state.write().set_sort(field, direction);
        self.parameters_changed(changed)
    }

    pub fn toggle_sort(&self, field: SortField) -> bool {
        let changed = self.inner.query_state.write().toggle_sort(field);
        self.parameters_changed(changed)
    }

    pub fn set_filter(&self, filter: FilterState) -> bool {
        let changed = self.inner.query_state.write().set_filter(filter);
        self.parameters_changed(changed)
    }

    pub fn set_name_filter(&self, text: impl Into<String>) -> bool {
        let changed = self.inner.query_state.write().set_name_filter(text);
        self.parameters_changed(changed)
    }

    pub fn set_status_filter(&self, status: StatusFilter) -> bool {
        let changed = self.inner.query_state.write().set_status_filter(status);
        self.parameters_changed(changed)
    }

    /// Select a record. Never triggers a query.
    pub fn select(&self, id: RecordId) -> bool {
        let changed = self.inner.selection.select(id.clone());
        if changed {
            debug!(%id, "record selected");
            self.inner.event_bus.publish(events::SelectionChanged { selected: Some(id) });
        }
        changed
    }

    pub fn clear_selection(&self) -> bool {
        let changed = self.inner.selection.clear();
        if changed {
            debug!("selection cleared");
            self.inner.event_bus.publish(events::SelectionChanged { selected: None });
        }
        changed
    }

    /// Route an event emitted by one of the views
    pub fn dispatch(&self, event: ViewEvent) {
        match event {
            ViewEvent::PageChanged(page) => {
                self.set_page(page);
            }
            ViewEvent::PageSizeChanged(size) => {
                self.set_page_size(size);
            }
            ViewEvent::SortFieldClicked(field) => {
                self.toggle_sort(field);
            }
            ViewEvent::FilterTextChanged(text) => {
                self.set_name_filter(text);
            }
            ViewEvent::StatusFilterChanged(status) => {
                self.set_status_filter(status);
            }
            ViewEvent::RowClicked(id) | ViewEvent::MarkerClicked(id) => {
                self.select(id);
            }
            ViewEvent::SelectionCleared => {
                self.clear_selection();
            }
            ViewEvent::RefreshRequested => self.refresh(),
        }
    }

    /// Current stage of the reload cycle. A pending timer wins over an
    /// in-flight query.
    pub fn phase(&self) -> ReloadPhase {
        let timer_pending = self
            .inner
            .timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished());

        if timer_pending {
            ReloadPhase::Scheduled
        } else if self.inner.query_state.read().is_loading() {
            ReloadPhase::InFlight
        } else {
            ReloadPhase::Idle
        }
    }

    /// Fire a pending debounced reload now. Returns whether one was pending.
    pub fn flush(&self) -> bool {
        let pending = self.inner.cancel_timer();
        if pending {
            self.inner.spawn_reload();
        }
        pending
    }

    /// Re-issue the current query immediately
    pub fn refresh(&self) {
        if !self.is_mounted() {
            debug!("refresh before mount ignored");
            return;
        }
        self.inner.cancel_timer();
        self.inner.spawn_reload();
    }

    /// Cancel the debounce timer and any in-flight queries. No state is
    /// mutated after this returns.
    pub fn shutdown(&self) {
        if self.inner.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.cancel_timer();
        for handle in self.inner.in_flight.lock().drain(..) {
            handle.abort();
        }
        info!("dashboard orchestrator shut down");
    }

    fn parameters_changed(&self, changed: bool) -> bool {
        if changed && self.is_mounted() {
            self.inner.schedule_reload();
        }
        changed
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Restart the debounce window
    fn schedule_reload(self: &Arc<Self>) {
        if self.is_torn_down() {
            return;
        }

        let inner = self.clone();
        let delay = self.debounce;
        {
            let mut timer = self.timer.lock();
            if let Some(pending) = timer.take() {
                pending.abort();
            }
            *timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                inner.spawn_reload();
            }));
        }

        debug!(delay_ms = delay.as_millis() as u64, "reload scheduled");
        self.event_bus.publish(events::ReloadScheduled { delay });
    }

    /// Abort the pending timer. Returns whether it had not fired yet.
    fn cancel_timer(&self) -> bool {
        match self.timer.lock().take() {
            Some(timer) => {
                let pending = !timer.is_finished();
                timer.abort();
                pending
            }
            None => false,
        }
    }

    /// Issue a query for the current parameters
    fn spawn_reload(self: &Arc<Self>) {
        if self.is_torn_down() {
            return;
        }

        let ticket = self.query_state.write().begin_reload();
        info!(
            generation = ticket.generation(),
            page = ticket.params().page,
            page_size = ticket.params().page_size,
            "issuing record query"
        );

        let inner = self.clone();
        let handle = tokio::spawn(async move {
            let result = inner.source.query(ticket.params()).await;
            inner.finish_reload(ticket, result);
        });

        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|handle| !handle.is_finished());
        in_flight.push(handle);
    }

    fn finish_reload(&self, ticket: ReloadTicket, result: Result<PageResult, QueryError>) {
        if self.is_torn_down() {
            return;
        }

        let (page, page_size) = (ticket.params().page, ticket.params().page_size);
        let outcome = self.query_state.write().complete_reload(ticket, result);

        match outcome {
            ReloadOutcome::Applied {
                generation,
                record_count,
                total_count,
            } => {
                info!(generation, record_count, total_count, "page loaded");
                self.event_bus.publish(events::RecordsLoaded {
                    generation,
                    page,
                    page_size,
                    record_count,
                    total_count,
                });
                self.apply_retention();
            }
            ReloadOutcome::Failed { generation, message } => {
                self.event_bus.publish(events::QueryFailed { generation, message });
            }
            ReloadOutcome::Stale {
                generation,
                latest_generation,
            } => {
                self.event_bus.publish(events::StaleResultDiscarded {
                    generation,
                    latest_generation,
                });
            }
        }
    }

    fn apply_retention(&self) {
        if self.retention != SelectionRetention::ClearWhenAbsent {
            return;
        }
        let Some(selected) = self.selection.selected() else {
            return;
        };

        let present = self
            .query_state
            .read()
            .records()
            .iter()
            .any(|record| record.id() == &selected);

        if !present && self.selection.clear() {
            info!(id = %selected, "selected record left the result set, clearing selection");
            self.event_bus.publish(events::SelectionChanged { selected: None });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PageSizeOptions, QueryParams, SortSpec};
    use crate::record::{Record, RecordStatus};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    /// In-memory source with per-filter latency and switchable failure
    struct FakeSource {
        records: Vec<Record>,
        calls: Mutex<Vec<QueryParams>>,
        slow_filter: Option<(String, Duration)>,
        failing: AtomicBool,
    }

    impl FakeSource {
        fn new(names: &[&str]) -> Self {
            let records = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    Record::new(
                        format!("r{}", i),
                        *name,
                        20.0 + i as f64 * 0.1,
                        78.0,
                        RecordStatus::ALL[i % 4],
                        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                    )
                    .unwrap()
                })
                .collect();
            Self {
                records,
                calls: Mutex::new(Vec::new()),
                slow_filter: None,
                failing: AtomicBool::new(false),
            }
        }

        fn with_slow_filter(mut self, text: &str, delay: Duration) -> Self {
            self.slow_filter = Some((text.to_string(), delay));
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        fn last_call(&self) -> Option<QueryParams> {
            self.calls.lock().last().cloned()
        }
    }

    #[async_trait::async_trait]
    impl RecordSource for FakeSource {
        async fn query(&self, params: &QueryParams) -> Result<PageResult, QueryError> {
            self.calls.lock().push(params.clone());

            if let Some((text, delay)) = &self.slow_filter {
                if &params.filter.name_contains == text {
                    sleep(*delay).await;
                }
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(QueryError::Unavailable("network down".to_string()));
            }

            let mut matching: Vec<&Record> = self
                .records
                .iter()
                .filter(|record| params.filter.matches(record))
                .collect();
            matching.sort_by(|a, b| params.sort.compare(a, b));

            Ok(PageResult {
                total_count: matching.len(),
                records: matching
                    .into_iter()
                    .skip(params.offset())
                    .take(params.page_size)
                    .cloned()
                    .collect(),
                page: params.page,
                page_size: params.page_size,
            })
        }

        async fn record_count(&self) -> Result<usize, QueryError> {
            Ok(self.records.len())
        }

        fn source_name(&self) -> &str {
            "fake"
        }
    }

    const NAMES: &[&str] = &[
        "Delhi Depot",
        "New Delhi Yard",
        "Mumbai Port",
        "Pune Works",
        "Chennai Hub",
        "slow lane",
        "fast lane",
    ];

    fn orchestrator(source: Arc<FakeSource>, retention: SelectionRetention) -> Orchestrator {
        let state = QueryStateManager::new(
            PageSizeOptions::new(vec![2, 5, 10], 5).unwrap(),
            SortSpec::default(),
        );
        Orchestrator::with_state(source, state, Duration::from_millis(300), retention)
    }

    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_loads_immediately() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);

        orchestrator.mount();
        assert_eq!(orchestrator.phase(), ReloadPhase::InFlight);
        settle().await;

        assert_eq!(source.call_count(), 1);
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.total_count, NAMES.len());
        assert_eq!(snapshot.records.len(), 5);
        assert!(!snapshot.is_loading);
        assert_eq!(orchestrator.phase(), ReloadPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_before_mount_do_not_query() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);

        assert!(orchestrator.set_page(2));
        assert_eq!(orchestrator.phase(), ReloadPhase::Idle);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(source.call_count(), 0);

        orchestrator.mount();
        settle().await;
        assert_eq!(source.last_call().unwrap().page, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_coalesce_into_one_query() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);
        orchestrator.mount();
        settle().await;

        orchestrator.set_name_filter("d");
        sleep(Duration::from_millis(100)).await;
        orchestrator.set_name_filter("de");
        sleep(Duration::from_millis(100)).await;
        orchestrator.set_name_filter("delhi");
        assert_eq!(orchestrator.phase(), ReloadPhase::Scheduled);

        sleep(Duration::from_millis(299)).await;
        assert_eq!(source.call_count(), 1);

        sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(source.call_count(), 2);
        assert_eq!(source.last_call().unwrap().filter.name_contains, "delhi");

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.total_count, 2);
        assert!(snapshot.records.iter().all(|r| r.name().to_lowercase().contains("delhi")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_parameters_do_not_schedule() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);
        orchestrator.mount();
        settle().await;

        assert!(!orchestrator.set_page(1));
        assert!(!orchestrator.previous_page());
        assert_eq!(orchestrator.phase(), ReloadPhase::Idle);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_earlier_query_cannot_clobber_later_result() {
        let source = Arc::new(
            FakeSource::new(NAMES).with_slow_filter("slow", Duration::from_millis(1000)),
        );
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);

        let stale = Arc::new(AtomicUsize::new(0));
        let counter = stale.clone();
        orchestrator
            .event_bus()
            .subscribe_fn::<events::StaleResultDiscarded, _>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        orchestrator.mount();
        settle().await;

        orchestrator.set_name_filter("slow");
        sleep(Duration::from_millis(301)).await;
        assert_eq!(source.call_count(), 2);
        assert_eq!(orchestrator.phase(), ReloadPhase::InFlight);

        orchestrator.set_name_filter("fast");
        assert_eq!(orchestrator.phase(), ReloadPhase::Scheduled);
        sleep(Duration::from_millis(301)).await;
        settle().await;

        let snapshot = orchestrator.snapshot();
        assert_eq!(source.call_count(), 3);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].name(), "fast lane");
        assert!(!snapshot.is_loading);

        sleep(Duration::from_millis(1000)).await;

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.records[0].name(), "fast lane");
        assert_eq!(snapshot.params.filter.name_contains, "fast");
        assert_eq!(stale.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_good_page() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);
        orchestrator.mount();
        settle().await;
        let before = orchestrator.snapshot();

        source.failing.store(true, Ordering::SeqCst);
        orchestrator.set_page(2);
        sleep(Duration::from_millis(301)).await;
        settle().await;

        let after = orchestrator.snapshot();
        assert_eq!(after.records, before.records);
        assert_eq!(after.error.as_deref(), Some("record source unavailable: network down"));
        assert!(!after.is_loading);

        source.failing.store(false, Ordering::SeqCst);
        orchestrator.refresh();
        settle().await;
        let recovered = orchestrator.snapshot();
        assert_eq!(recovered.error, None);
        assert_eq!(recovered.records.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_does_not_query() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);
        orchestrator.mount();
        settle().await;

        orchestrator.dispatch(ViewEvent::RowClicked(RecordId::from("r0")));
        orchestrator.dispatch(ViewEvent::MarkerClicked(RecordId::from("r2")));
        sleep(Duration::from_secs(1)).await;

        assert_eq!(orchestrator.selection().selected(), Some(RecordId::from("r2")));
        assert_eq!(source.call_count(), 1);

        orchestrator.dispatch(ViewEvent::SelectionCleared);
        assert_eq!(orchestrator.selection().selected(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_kept_when_filtered_out_by_default() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);
        orchestrator.mount();
        settle().await;

        orchestrator.select(RecordId::from("r2"));
        orchestrator.set_name_filter("delhi");
        sleep(Duration::from_millis(301)).await;
        settle().await;

        assert_eq!(orchestrator.snapshot().total_count, 2);
        assert_eq!(orchestrator.selection().selected(), Some(RecordId::from("r2")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_cleared_when_absent_if_configured() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::ClearWhenAbsent);
        orchestrator.mount();
        settle().await;

        orchestrator.select(RecordId::from("r0"));
        orchestrator.set_name_filter("delhi");
        sleep(Duration::from_millis(301)).await;
        settle().await;
        assert_eq!(orchestrator.selection().selected(), Some(RecordId::from("r0")));

        orchestrator.set_name_filter("mumbai");
        sleep(Duration::from_millis(301)).await;
        settle().await;
        assert_eq!(orchestrator.selection().selected(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_timer() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);
        orchestrator.mount();
        settle().await;

        orchestrator.set_name_filter("delhi");
        orchestrator.shutdown();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(source.call_count(), 1);
        assert_eq!(orchestrator.snapshot().total_count, NAMES.len());
        assert_eq!(orchestrator.phase(), ReloadPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_timer_and_in_flight_query() {
        let source = Arc::new(
            FakeSource::new(NAMES).with_slow_filter("slow", Duration::from_millis(500)),
        );
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);
        let state = orchestrator.query_state();
        orchestrator.mount();
        settle().await;

        orchestrator.set_name_filter("slow");
        sleep(Duration::from_millis(301)).await;
        orchestrator.set_name_filter("fast");
        drop(orchestrator);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.call_count(), 2);
        assert_eq!(state.read().total_count(), NAMES.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_fires_pending_reload() {
        let source = Arc::new(FakeSource::new(NAMES));
        let orchestrator = orchestrator(source.clone(), SelectionRetention::Keep);
        orchestrator.mount();
        settle().await;

        assert!(!orchestrator.flush());
        orchestrator.set_sort(SortField::Name, SortDirection::Descending);
        assert!(orchestrator.flush());
        settle().await;

        assert_eq!(source.call_count(), 2);
        assert_eq!(orchestrator.snapshot().records[0].name(), "slow lane");
    }
}
