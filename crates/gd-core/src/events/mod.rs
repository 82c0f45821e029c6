use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

use crate::query::{SortField, StatusFilter};
use crate::record::RecordId;

/// Dashboard-wide notification bus
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all notifications implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Notifications published by the orchestrator
pub mod events {
    use super::Event;
    use crate::record::RecordId;
    use std::time::Duration;

    /// A page was applied to the query state
    #[derive(Debug, Clone)]
    pub struct RecordsLoaded {
        pub generation: u64,
        pub page: usize,
        pub page_size: usize,
        pub record_count: usize,
        pub total_count: usize,
    }

    /// The latest query failed; the previous page is still shown
    #[derive(Debug, Clone)]
    pub struct QueryFailed {
        pub generation: u64,
        pub message: String,
    }

    /// A result arrived for a reload that has since been superseded
    #[derive(Debug, Clone)]
    pub struct StaleResultDiscarded {
        pub generation: u64,
        pub latest_generation: u64,
    }

    /// A debounced reload was (re)scheduled
    #[derive(Debug, Clone)]
    pub struct ReloadScheduled {
        pub delay: Duration,
    }

    /// The selected record changed
    #[derive(Debug, Clone)]
    pub struct SelectionChanged {
        pub selected: Option<RecordId>,
    }

    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        RecordsLoaded,
        QueryFailed,
        StaleResultDiscarded,
        ReloadScheduled,
        SelectionChanged
    );
}

/// Outputs of the list and spatial views
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    PageChanged(usize),
    PageSizeChanged(usize),
    SortFieldClicked(SortField),
    FilterTextChanged(String),
    StatusFilterChanged(StatusFilter),
    RowClicked(RecordId),
    MarkerClicked(RecordId),
    SelectionCleared,
    /// Re-issue the current query without waiting for the debounce window
    RefreshRequested,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_insert_with(Vec::new).push(handler);
    }

    /// Subscribe with a closure that only sees events of type `E`
    pub fn subscribe_fn<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Publish an event.
    ///
    /// Handlers run without the bus lock held, so they may publish or
    /// subscribe themselves. While `E`'s handlers run, a nested publish of
    /// another `E` reaches no one.
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let Some(mut running) = self.handlers.lock().remove(&type_id) else {
            return;
        };

        for handler in running.iter_mut() {
            handler.handle(&event);
        }

        let mut handlers = self.handlers.lock();
        if let Some(added) = handlers.remove(&type_id) {
            running.extend(added);
        }
        handlers.insert(type_id, running);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_publish_reaches_typed_subscribers_only() {
        let bus = EventBus::new();
        let loaded = Arc::new(AtomicUsize::new(0));
        let counter = loaded.clone();

        bus.subscribe_fn::<events::RecordsLoaded, _>(move |event| {
            counter.fetch_add(event.record_count, Ordering::SeqCst);
        });

        bus.publish(events::RecordsLoaded {
            generation: 1,
            page: 1,
            page_size: 50,
            record_count: 50,
            total_count: 120,
        });
        bus.publish(events::SelectionChanged { selected: None });

        assert_eq!(loaded.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_handlers_can_publish_and_subscribe() {
        let bus = Arc::new(EventBus::new());
        let loaded = Arc::new(AtomicUsize::new(0));
        let selections = Arc::new(AtomicUsize::new(0));

        let counter = loaded.clone();
        bus.subscribe_fn::<events::RecordsLoaded, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let inner_bus = bus.clone();
        let late = selections.clone();
        bus.subscribe_fn::<events::SelectionChanged, _>(move |_| {
            inner_bus.publish(events::RecordsLoaded {
                generation: 2,
                page: 1,
                page_size: 50,
                record_count: 0,
                total_count: 0,
            });
            let late = late.clone();
            inner_bus.subscribe_fn::<events::SelectionChanged, _>(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.publish(events::SelectionChanged { selected: None });
        assert_eq!(loaded.load(Ordering::SeqCst), 1);
        assert_eq!(selections.load(Ordering::SeqCst), 0);

        // The handler added during the first publish sees the second one
        bus.publish(events::SelectionChanged { selected: None });
        assert_eq!(loaded.load(Ordering::SeqCst), 2);
        assert_eq!(selections.load(Ordering::SeqCst), 1);
    }
}
