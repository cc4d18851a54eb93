//! Scope of a MetalsoftMachine reconcile pass.

use super::patch::PatchHelper;
use super::{add_finalizer, remove_finalizer};
use crate::error::ControllerError;
use crate::store::{ObjectKey, ObjectStore};
use crds::{Cluster, MACHINE_FINALIZER, Machine, MetalsoftCluster, MetalsoftMachine};
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Resource;
use std::sync::Arc;

/// Builds a [`MachineScope`]; every owner object is required.
pub struct MachineScopeBuilder {
    store: Arc<dyn ObjectStore>,
    cluster: Option<Cluster>,
    machine: Option<Machine>,
    metalsoft_cluster: Option<MetalsoftCluster>,
    metalsoft_machine: Option<MetalsoftMachine>,
}

impl MachineScopeBuilder {
    pub fn cluster(mut self, cluster: impl Into<Option<Cluster>>) -> Self {
        self.cluster = cluster.into();
        self
    }

    pub fn machine(mut self, machine: impl Into<Option<Machine>>) -> Self {
        self.machine = machine.into();
        self
    }

    pub fn metalsoft_cluster(mut self, metalsoft_cluster: impl Into<Option<MetalsoftCluster>>) -> Self {
        self.metalsoft_cluster = metalsoft_cluster.into();
        self
    }

    pub fn metalsoft_machine(mut self, metalsoft_machine: impl Into<Option<MetalsoftMachine>>) -> Self {
        self.metalsoft_machine = metalsoft_machine.into();
        self
    }

    pub fn build(self) -> Result<MachineScope, ControllerError> {
        let required = |what: &str| ControllerError::Scope(format!("{} is required when creating a MachineScope", what));

        let cluster = self.cluster.ok_or_else(|| required("Cluster"))?;
        let machine = self.machine.ok_or_else(|| required("Machine"))?;
        let metalsoft_cluster = self.metalsoft_cluster.ok_or_else(|| required("MetalsoftCluster"))?;
        let metalsoft_machine = self.metalsoft_machine.ok_or_else(|| required("MetalsoftMachine"))?;
        let helper = PatchHelper::new(&metalsoft_machine)?;

        Ok(MachineScope {
            store: self.store,
            cluster,
            machine,
            metalsoft_cluster,
            metalsoft_machine,
            helper,
        })
    }
}

/// A MetalsoftMachine and the objects it hangs off for one pass.
pub struct MachineScope {
    store: Arc<dyn ObjectStore>,
    cluster: Cluster,
    machine: Machine,
    metalsoft_cluster: MetalsoftCluster,
    metalsoft_machine: MetalsoftMachine,
    helper: PatchHelper,
}

impl MachineScope {
    pub fn builder(store: Arc<dyn ObjectStore>) -> MachineScopeBuilder {
        MachineScopeBuilder {
            store,
            cluster: None,
            machine: None,
            metalsoft_cluster: None,
            metalsoft_machine: None,
        }
    }

    pub fn key(&self) -> &ObjectKey {
        self.helper.key()
    }

    pub fn object_ref(&self) -> ObjectReference {
        self.metalsoft_machine.object_ref(&())
    }

    pub fn is_control_plane(&self) -> bool {
        self.machine.is_control_plane()
    }

    /// "control-plane" or "node"
    pub fn role(&self) -> &'static str {
        if self.is_control_plane() { "control-plane" } else { "node" }
    }

    pub fn is_deleting(&self) -> bool {
        self.metalsoft_machine.metadata.deletion_timestamp.is_some()
    }

    pub fn add_finalizer(&mut self) -> bool {
        add_finalizer(&mut self.metalsoft_machine.metadata, MACHINE_FINALIZER)
    }

    pub fn remove_finalizer(&mut self) -> bool {
        remove_finalizer(&mut self.metalsoft_machine.metadata, MACHINE_FINALIZER)
    }

    /// Cluster API reports the cluster infrastructure as ready.
    pub fn infrastructure_ready(&self) -> bool {
        self.cluster.status.as_ref().is_some_and(|s| s.infrastructure_ready)
    }

    /// Bootstrap data secret, once the bootstrap provider produced it.
    pub fn bootstrap_data_secret(&self) -> Option<&str> {
        self.machine
            .spec
            .bootstrap
            .data_secret_name
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// Control plane endpoint host of the cluster, empty until resolved.
    pub fn control_plane_host(&self) -> &str {
        &self.metalsoft_cluster.spec.control_plane_endpoint.host
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.metalsoft_machine.spec.provider_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Terminal failure recorded on the status, if any.
    pub fn failure(&self) -> Option<(&str, &str)> {
        let status = self.metalsoft_machine.status.as_ref()?;
        status.has_failed().then(|| {
            (
                status.failure_reason.as_deref().unwrap_or_default(),
                status.failure_message.as_deref().unwrap_or_default(),
            )
        })
    }

    /// Writes pending changes now and keeps the scope open.
    pub async fn flush(&mut self) -> Result<bool, ControllerError> {
        self.helper.patch(self.store.as_ref(), &mut self.metalsoft_machine).await
    }

    /// Writes pending changes and ends the scope.
    pub async fn close(mut self) -> Result<bool, ControllerError> {
        self.flush().await
    }
}
