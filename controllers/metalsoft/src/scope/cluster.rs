//! Scope of a MetalsoftCluster reconcile pass.

use super::patch::PatchHelper;
use super::{add_finalizer, remove_finalizer};
use crate::error::ControllerError;
use crate::store::{ObjectKey, ObjectStore};
use crds::{
    ApiEndpoint, CLUSTER_FINALIZER, Cluster, ClusterNetworkSpec, Condition, DEFAULT_API_SERVER_PORT, MetalsoftCluster,
    READY_CONDITION, is_paused, set_condition,
};
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Resource;
use std::sync::Arc;
use tracing::warn;

/// Builds a [`ClusterScope`]; both objects are required.
pub struct ClusterScopeBuilder {
    store: Arc<dyn ObjectStore>,
    cluster: Option<Cluster>,
    metalsoft_cluster: Option<MetalsoftCluster>,
}

impl ClusterScopeBuilder {
    /// Owning Cluster API Cluster
    pub fn cluster(mut self, cluster: impl Into<Option<Cluster>>) -> Self {
        self.cluster = cluster.into();
        self
    }

    /// MetalsoftCluster being reconciled
    pub fn metalsoft_cluster(mut self, metalsoft_cluster: impl Into<Option<MetalsoftCluster>>) -> Self {
        self.metalsoft_cluster = metalsoft_cluster.into();
        self
    }

    pub fn build(self) -> Result<ClusterScope, ControllerError> {
        let cluster = self
            .cluster
            .ok_or_else(|| ControllerError::Scope("Cluster is required when creating a ClusterScope".to_string()))?;
        let metalsoft_cluster = self.metalsoft_cluster.ok_or_else(|| {
            ControllerError::Scope("MetalsoftCluster is required when creating a ClusterScope".to_string())
        })?;
        let helper = PatchHelper::new(&metalsoft_cluster)?;

        Ok(ClusterScope {
            store: self.store,
            cluster,
            metalsoft_cluster,
            helper,
        })
    }
}

/// A MetalsoftCluster and its owning Cluster for the duration of one pass.
pub struct ClusterScope {
    store: Arc<dyn ObjectStore>,
    cluster: Cluster,
    metalsoft_cluster: MetalsoftCluster,
    helper: PatchHelper,
}

impl ClusterScope {
    pub fn builder(store: Arc<dyn ObjectStore>) -> ClusterScopeBuilder {
        ClusterScopeBuilder {
            store,
            cluster: None,
            metalsoft_cluster: None,
        }
    }

    pub fn key(&self) -> &ObjectKey {
        self.helper.key()
    }

    pub fn object_ref(&self) -> ObjectReference {
        self.metalsoft_cluster.object_ref(&())
    }

    pub fn datacenter_name(&self) -> &str {
        &self.metalsoft_cluster.spec.datacenter_name
    }

    pub fn infrastructure_label(&self) -> &str {
        &self.metalsoft_cluster.spec.infrastructure_label
    }

    pub fn infrastructure_id(&self) -> u64 {
        self.metalsoft_cluster.spec.infrastructure_id
    }

    pub fn subnet_id(&self) -> u64 {
        self.metalsoft_cluster.spec.network.subnet_id
    }

    pub fn network(&self) -> &ClusterNetworkSpec {
        &self.metalsoft_cluster.spec.network
    }

    /// Control plane endpoint, with the API server port filled in when unset.
    pub fn control_plane_endpoint(&self) -> ApiEndpoint {
        let mut endpoint = self.metalsoft_cluster.spec.control_plane_endpoint.clone();
        if endpoint.port == 0 {
            endpoint.port = DEFAULT_API_SERVER_PORT;
        }
        endpoint
    }

    /// The Cluster is paused or either object carries the paused annotation.
    pub fn is_paused(&self) -> bool {
        is_paused(&self.cluster, &self.metalsoft_cluster)
    }

    pub fn is_deleting(&self) -> bool {
        self.metalsoft_cluster.metadata.deletion_timestamp.is_some()
    }

    pub fn add_finalizer(&mut self) -> bool {
        add_finalizer(&mut self.metalsoft_cluster.metadata, CLUSTER_FINALIZER)
    }

    pub fn remove_finalizer(&mut self) -> bool {
        remove_finalizer(&mut self.metalsoft_cluster.metadata, CLUSTER_FINALIZER)
    }

    pub fn set_infrastructure_id(&mut self, id: u64) {
        self.metalsoft_cluster.spec.infrastructure_id = id;
    }

    pub fn set_subnet_id(&mut self, id: u64) {
        self.metalsoft_cluster.spec.network.subnet_id = id;
    }

    /// Sets the endpoint host once. A host that is already set is kept and
    /// `false` is returned.
    pub fn set_control_plane_host(&mut self, host: &str) -> bool {
        let endpoint = &mut self.metalsoft_cluster.spec.control_plane_endpoint;
        if !endpoint.is_unset() {
            if endpoint.host != host {
                warn!(
                    "Refusing to change control plane endpoint of {} from {} to {}",
                    self.helper.key(),
                    endpoint.host,
                    host
                );
            }
            return false;
        }
        endpoint.host = host.to_string();
        endpoint.port = DEFAULT_API_SERVER_PORT;
        true
    }

    /// Makes sure a set host also carries the API server port.
    pub fn default_control_plane_port(&mut self) {
        let endpoint = &mut self.metalsoft_cluster.spec.control_plane_endpoint;
        if !endpoint.is_unset() && endpoint.port == 0 {
            endpoint.port = DEFAULT_API_SERVER_PORT;
        }
    }

    /// Sets `status.ready` and the matching Ready condition.
    pub fn set_ready(&mut self, ready: bool) {
        let status = self.metalsoft_cluster.status.get_or_insert_with(Default::default);
        status.ready = ready;
        let condition = if ready {
            Condition::new(READY_CONDITION, true)
        } else {
            Condition::new(READY_CONDITION, false).with_reason("WaitingForEndpoint", "Waiting for control-plane endpoint")
        };
        set_condition(&mut status.conditions, condition);
    }

    pub fn set_failure_message(&mut self, message: Option<String>) {
        let status = self.metalsoft_cluster.status.get_or_insert_with(Default::default);
        status.failure_message = message;
    }

    /// Writes pending changes now and keeps the scope open.
    pub async fn flush(&mut self) -> Result<bool, ControllerError> {
        self.helper.patch(self.store.as_ref(), &mut self.metalsoft_cluster).await
    }

    /// Writes pending changes and ends the scope.
    pub async fn close(mut self) -> Result<bool, ControllerError> {
        self.flush().await
    }
}
