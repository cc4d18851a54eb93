//! Reconciliation logic for the Metalsoft infrastructure CRDs.
//!
//! - `cluster`: MetalsoftCluster, resolves the control plane endpoint
//! - `machine`: MetalsoftMachine, finalizer and readiness gating
//!
//! A pass is bounded by `reconcile_timeout`. The scope opened for a pass is
//! always closed outside that deadline, so progress made before a timeout is
//! still written back.

pub mod cluster;
pub mod machine;

#[cfg(test)]
mod machine_test;

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crate::events::EventPublisher;
use crate::services::EndpointResolver;
use crate::store::ObjectStore;
use crds::CLUSTER_API_GROUP;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Shortest requeue after a failed pass
const MIN_BACKOFF: Duration = Duration::from_secs(5);

/// Longest requeue after a failed pass
const MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(MIN_BACKOFF, MAX_BACKOFF),
            error_count: 0,
        }
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciles MetalsoftCluster and MetalsoftMachine resources.
pub struct Reconciler {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) events: Arc<dyn EventPublisher>,
    pub(crate) endpoint: EndpointResolver,
    pub(crate) reconcile_timeout: Duration,
    /// Error tracking per resource ("Kind namespace/name" -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        events: Arc<dyn EventPublisher>,
        endpoint: EndpointResolver,
        reconcile_timeout: Duration,
    ) -> Self {
        Self {
            store,
            events,
            endpoint,
            reconcile_timeout,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Requeue delay after `error` for `resource_key`.
    ///
    /// Retryable errors walk the Fibonacci sequence; hard errors wait the
    /// full ceiling since only a spec or provider change can fix them.
    pub fn next_backoff(&self, resource_key: &str, error: &ControllerError) -> Duration {
        let mut states = self.backoff_states.lock().unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(resource_key.to_string()).or_insert_with(BackoffState::new);
        state.error_count += 1;
        let delay = if error.is_retryable() {
            state.backoff.next_backoff()
        } else {
            state.backoff.ceiling()
        };
        if state.error_count > 1 {
            warn!(
                "{} failed {} times in a row, next attempt in {:?}",
                resource_key, state.error_count, delay
            );
        }
        delay
    }

    /// Reset error tracking for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        let mut states = self.backoff_states.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.get_mut(resource_key) {
            state.reset();
        }
    }

    /// Runs `fut` against the pass deadline.
    pub(crate) async fn within<T, F>(&self, deadline: Instant, fut: F) -> Result<T, ControllerError>
    where
        F: Future<Output = Result<T, ControllerError>>,
    {
        tokio::time::timeout_at(deadline, fut)
            .await
            .unwrap_or(Err(ControllerError::Timeout(self.reconcile_timeout)))
    }
}

/// Name of the Cluster API owner of `kind` ("Cluster", "Machine").
pub(crate) fn owner_name(meta: &ObjectMeta, kind: &str) -> Option<String> {
    meta.owner_references.as_ref()?.iter().find_map(|owner| {
        let group = owner.api_version.split('/').next().unwrap_or_default();
        (owner.kind == kind && group == CLUSTER_API_GROUP).then(|| owner.name.clone())
    })
}
