//! Kubernetes Event recording.
//!
//! Reconcilers publish through the [`EventPublisher`] trait so tests can
//! capture events without an API server. Publishing is fire-and-forget: a
//! failed event is logged and never fails the reconcile.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Client;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::warn;

/// Reason used for MetalsoftCluster events
pub const CLUSTER_REASON: &str = "MetalsoftClusterReconcile";

/// Reason used for MetalsoftMachine events
pub const MACHINE_REASON: &str = "MetalsoftMachineReconcile";

/// Trait for publishing Kubernetes Events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event about `resource_ref`.
    async fn publish(&self, resource_ref: &ObjectReference, type_: EventType, reason: &str, note: String);
}

/// Production implementation wrapping `kube::runtime::events::Recorder`.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller_name`.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, resource_ref: &ObjectReference, type_: EventType, reason: &str, note: String) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note: Some(note),
            action: "Reconcile".to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(reason, error = %e, "Failed to publish Kubernetes event");
        }
    }
}
