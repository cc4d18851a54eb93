//! MetalsoftCluster reconciliation.

use super::{Reconciler, owner_name};
use crate::error::ControllerError;
use crate::events::CLUSTER_REASON;
use crate::scope::ClusterScope;
use crate::store::{ObjectKey, fetch};
use crds::{Cluster, MetalsoftCluster};
use kube::runtime::events::EventType;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Requeue delay while the endpoint host is still unknown
const ENDPOINT_REQUEUE: Duration = Duration::from_secs(5);

impl Reconciler {
    /// Reconciles one MetalsoftCluster.
    pub async fn reconcile_cluster(&self, key: &ObjectKey) -> Result<Action, ControllerError> {
        let deadline = Instant::now() + self.reconcile_timeout;

        let Some((cluster, metalsoft_cluster)) = self.within(deadline, self.load_cluster(key)).await? else {
            return Ok(Action::await_change());
        };

        let mut scope = ClusterScope::builder(Arc::clone(&self.store))
            .cluster(cluster)
            .metalsoft_cluster(metalsoft_cluster)
            .build()?;

        let result = if scope.is_paused() {
            info!("MetalsoftCluster {} or its Cluster is paused, skipping", key);
            Ok(Action::await_change())
        } else if scope.is_deleting() {
            self.within(deadline, self.reconcile_cluster_delete(&mut scope)).await
        } else {
            self.within(deadline, self.reconcile_cluster_normal(&mut scope)).await
        };

        if let Err(e) = &result {
            error!("Failed to reconcile MetalsoftCluster {}: {}", key, e);
            self.events
                .publish(&scope.object_ref(), EventType::Warning, CLUSTER_REASON, e.to_string())
                .await;
            if !e.is_retryable() {
                scope.set_failure_message(Some(e.to_string()));
            }
        }

        let closed = scope.close().await;
        match (result, closed) {
            (Ok(action), Ok(_)) => Ok(action),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(e), Err(close_err)) => {
                error!("Failed to persist MetalsoftCluster {} after error: {}", key, close_err);
                Err(e)
            }
            (Err(e), Ok(_)) => Err(e),
        }
    }

    /// Fetches the MetalsoftCluster and its owning Cluster. `None` means
    /// there is nothing to do until one of them changes.
    async fn load_cluster(&self, key: &ObjectKey) -> Result<Option<(Cluster, MetalsoftCluster)>, ControllerError> {
        let Some(metalsoft_cluster) = fetch::<MetalsoftCluster>(self.store.as_ref(), key).await? else {
            debug!("MetalsoftCluster {} not found, nothing to do", key);
            return Ok(None);
        };

        let Some(owner) = owner_name(&metalsoft_cluster.metadata, "Cluster") else {
            info!("Waiting for Cluster Controller to set OwnerRef on MetalsoftCluster {}", key);
            return Ok(None);
        };

        let cluster_key = ObjectKey::new(&key.namespace, owner);
        match fetch::<Cluster>(self.store.as_ref(), &cluster_key).await? {
            Some(cluster) => Ok(Some((cluster, metalsoft_cluster))),
            None => {
                info!("Cluster {} owning MetalsoftCluster {} not found yet", cluster_key, key);
                Ok(None)
            }
        }
    }

    async fn reconcile_cluster_normal(&self, scope: &mut ClusterScope) -> Result<Action, ControllerError> {
        debug!("Reconciling MetalsoftCluster {}", scope.key());

        if scope.add_finalizer() {
            scope.flush().await?;
        }

        let host = self.endpoint.resolve(scope).await?;

        if host.is_empty() {
            self.events
                .publish(
                    &scope.object_ref(),
                    EventType::Normal,
                    CLUSTER_REASON,
                    "Waiting for control-plane endpoint".to_string(),
                )
                .await;
            scope.set_ready(false);
            return Ok(Action::requeue(ENDPOINT_REQUEUE));
        }

        self.events
            .publish(
                &scope.object_ref(),
                EventType::Normal,
                CLUSTER_REASON,
                format!("Got control-plane endpoint - {}", host),
            )
            .await;

        scope.set_ready(true);
        scope.set_failure_message(None);

        self.events
            .publish(&scope.object_ref(), EventType::Normal, CLUSTER_REASON, "Reconciled".to_string())
            .await;
        info!("MetalsoftCluster {} is ready at {}", scope.key(), host);
        Ok(Action::await_change())
    }

    /// Releases the finalizer. Provider resources are left in place.
    async fn reconcile_cluster_delete(&self, scope: &mut ClusterScope) -> Result<Action, ControllerError> {
        info!("Deleting MetalsoftCluster {}", scope.key());
        scope.remove_finalizer();
        self.events
            .publish(&scope.object_ref(), EventType::Normal, CLUSTER_REASON, "Reconciled".to_string())
            .await;
        Ok(Action::await_change())
    }
}
