//! MetalsoftMachine reconciliation.
//!
//! Gates a machine on its cluster infrastructure and bootstrap data and owns
//! its finalizer. Instance provisioning starts once both gates are open.

use super::{Reconciler, owner_name};
use crate::error::ControllerError;
use crate::events::MACHINE_REASON;
use crate::scope::MachineScope;
use crate::store::{ObjectKey, fetch};
use crds::{CLUSTER_NAME_LABEL, Cluster, Machine, MetalsoftCluster, MetalsoftMachine, is_paused};
use kube::runtime::events::EventType;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Objects a MetalsoftMachine pass starts from
struct MachineOwners {
    machine: Machine,
    cluster: Cluster,
    metalsoft_machine: MetalsoftMachine,
}

impl Reconciler {
    /// Reconciles one MetalsoftMachine.
    pub async fn reconcile_machine(&self, key: &ObjectKey) -> Result<Action, ControllerError> {
        let deadline = Instant::now() + self.reconcile_timeout;

        let Some(owners) = self.within(deadline, self.load_machine(key)).await? else {
            return Ok(Action::await_change());
        };

        if is_paused(&owners.cluster, &owners.metalsoft_machine) {
            info!("MetalsoftMachine {} or its Cluster is paused, skipping", key);
            return Ok(Action::await_change());
        }

        let metalsoft_cluster = match owners.cluster.infrastructure_name() {
            Some(name) => {
                let cluster_key = ObjectKey::new(&key.namespace, name);
                self.within(deadline, fetch::<MetalsoftCluster>(self.store.as_ref(), &cluster_key))
                    .await?
            }
            None => None,
        };

        let mut scope = MachineScope::builder(Arc::clone(&self.store))
            .machine(owners.machine)
            .cluster(owners.cluster)
            .metalsoft_cluster(metalsoft_cluster)
            .metalsoft_machine(owners.metalsoft_machine)
            .build()?;

        let result = if scope.is_deleting() {
            self.within(deadline, self.reconcile_machine_delete(&mut scope)).await
        } else {
            self.within(deadline, self.reconcile_machine_normal(&mut scope)).await
        };

        if let Err(e) = &result {
            error!("Failed to reconcile MetalsoftMachine {}: {}", key, e);
            self.events
                .publish(&scope.object_ref(), EventType::Warning, MACHINE_REASON, e.to_string())
                .await;
        }

        let closed = scope.close().await;
        match (result, closed) {
            (Ok(action), Ok(_)) => Ok(action),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(e), Err(close_err)) => {
                error!("Failed to persist MetalsoftMachine {} after error: {}", key, close_err);
                Err(e)
            }
            (Err(e), Ok(_)) => Err(e),
        }
    }

    async fn load_machine(&self, key: &ObjectKey) -> Result<Option<MachineOwners>, ControllerError> {
        let Some(metalsoft_machine) = fetch::<MetalsoftMachine>(self.store.as_ref(), key).await? else {
            debug!("MetalsoftMachine {} not found, nothing to do", key);
            return Ok(None);
        };

        let Some(owner) = owner_name(&metalsoft_machine.metadata, "Machine") else {
            info!("Waiting for Machine Controller to set OwnerRef on MetalsoftMachine {}", key);
            return Ok(None);
        };

        let machine_key = ObjectKey::new(&key.namespace, owner);
        let Some(machine) = fetch::<Machine>(self.store.as_ref(), &machine_key).await? else {
            info!("Machine {} owning MetalsoftMachine {} not found yet", machine_key, key);
            return Ok(None);
        };

        let Some(cluster_name) = machine
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(CLUSTER_NAME_LABEL))
            .filter(|n| !n.is_empty())
        else {
            info!("Machine {} is missing the {} label", machine_key, CLUSTER_NAME_LABEL);
            return Ok(None);
        };

        let cluster_key = ObjectKey::new(&key.namespace, cluster_name.as_str());
        let Some(cluster) = fetch::<Cluster>(self.store.as_ref(), &cluster_key).await? else {
            info!("Cluster {} of MetalsoftMachine {} not found", cluster_key, key);
            return Ok(None);
        };

        Ok(Some(MachineOwners {
            machine,
            cluster,
            metalsoft_machine,
        }))
    }

    async fn reconcile_machine_normal(&self, scope: &mut MachineScope) -> Result<Action, ControllerError> {
        debug!("Reconciling {} MetalsoftMachine {}", scope.role(), scope.key());

        if let Some((reason, message)) = scope.failure() {
            info!("MetalsoftMachine {} has failed ({}: {}), skipping", scope.key(), reason, message);
            return Ok(Action::await_change());
        }

        if scope.add_finalizer() {
            scope.flush().await?;
        }

        if !scope.infrastructure_ready() {
            info!("Cluster infrastructure of {} is not ready yet", scope.key());
            return Ok(Action::await_change());
        }

        let Some(secret) = scope.bootstrap_data_secret() else {
            info!("Bootstrap data secret of {} is not yet available", scope.key());
            return Ok(Action::await_change());
        };

        debug!(
            "MetalsoftMachine {} has bootstrap data in {} (control plane {}, provider ID {:?})",
            scope.key(),
            secret,
            scope.control_plane_host(),
            scope.provider_id()
        );
        Ok(Action::await_change())
    }

    /// Releases the finalizer. The instance is left in place.
    async fn reconcile_machine_delete(&self, scope: &mut MachineScope) -> Result<Action, ControllerError> {
        info!("Deleting MetalsoftMachine {}", scope.key());
        scope.remove_finalizer();
        self.events
            .publish(&scope.object_ref(), EventType::Normal, MACHINE_REASON, "Reconciled".to_string())
            .await;
        Ok(Action::await_change())
    }
}
