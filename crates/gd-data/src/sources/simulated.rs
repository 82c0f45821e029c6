//! Network-like wrapper around any record source

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::warn;

use gd_core::{PageResult, QueryError, QueryParams, RecordSource};

/// Adds a fixed delay to every query and can be told to fail the next one
pub struct SimulatedSource<S> {
    inner: S,
    latency: Duration,
    next_failure: Mutex<Option<String>>,
}

impl<S: RecordSource> SimulatedSource<S> {
    pub fn new(inner: S, latency: Duration) -> Self {
        Self {
            inner,
            latency,
            next_failure: Mutex::new(None),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Make the next query fail with `message`
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.next_failure.lock() = Some(message.into());
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RecordSource> RecordSource for SimulatedSource<S> {
    async fn query(&self, params: &QueryParams) -> Result<PageResult, QueryError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let failure = self.next_failure.lock().take();
        if let Some(message) = failure {
            warn!(%message, "simulated query failure");
            return Err(QueryError::Unavailable(message));
        }

        self.inner.query(params).await
    }

    async fn record_count(&self) -> Result<usize, QueryError> {
        self.inner.record_count().await
    }

    fn source_name(&self) -> &str {
        self.inner.source_name()
    }
}
