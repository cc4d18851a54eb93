//! Control plane endpoint resolution.
//!
//! Walks infrastructure, network, subnet and variable in that order. Each
//! resolved ID is recorded on the scope as soon as it is known, so a pass
//! that fails or times out later still leaves the next pass a checkpoint to
//! resume from instead of creating duplicates.

use super::adoption::AdoptionClassifier;
use super::infrastructure::InfrastructureService;
use super::subnet::SubnetService;
use super::variable::{KUBE_VIP_ADDRESS_VARIABLE, VariableService};
use crate::error::ControllerError;
use crate::scope::ClusterScope;
use metalsoft_client::{CreateInfrastructureRequest, MetalsoftClientTrait, Network, Networks};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Prefix of generated infrastructure labels
const INFRASTRUCTURE_LABEL_PREFIX: &str = "cluster-api-";

/// Prefix of generated subnet labels
const SUBNET_LABEL_PREFIX: &str = "cluster-api-subnet-";

/// Resolves the control plane endpoint of a MetalsoftCluster
pub struct EndpointResolver {
    infrastructures: InfrastructureService,
    subnets: SubnetService,
    variables: VariableService,
    client: Arc<dyn MetalsoftClientTrait>,
}

impl EndpointResolver {
    pub fn new(client: Arc<dyn MetalsoftClientTrait>, classifier: Arc<AdoptionClassifier>) -> Self {
        Self {
            infrastructures: InfrastructureService::new(Arc::clone(&client), Arc::clone(&classifier)),
            subnets: SubnetService::new(Arc::clone(&client), Arc::clone(&classifier)),
            variables: VariableService::new(Arc::clone(&client), classifier),
            client,
        }
    }

    /// Converges the provider side of `scope` and returns the endpoint host.
    ///
    /// The host is only ever taken from the subnet once; a host already on
    /// the spec is returned as is.
    pub async fn resolve(&self, scope: &mut ClusterScope) -> Result<String, ControllerError> {
        let datacenter = scope.datacenter_name().to_string();
        if datacenter.is_empty() {
            return Err(ControllerError::Precondition("datacenterName is required".to_string()));
        }

        let infrastructure_id = self.resolve_infrastructure(scope, &datacenter).await?;

        let subnet = if scope.subnet_id() != 0 {
            self.subnets.get(scope.subnet_id()).await?
        } else {
            let network = self.find_network(scope, infrastructure_id).await?;
            let network_spec = scope.network();
            let overrides = network_spec.subnets.first();
            let label = overrides
                .and_then(|s| s.label.clone())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| format!("{}{}", SUBNET_LABEL_PREFIX, Uuid::new_v4()));

            let request = SubnetService::request(infrastructure_id, network.network_id, label, overrides);
            let subnet = self.subnets.create_or_adopt(&request).await?;
            scope.set_subnet_id(subnet.subnet_id);
            subnet
        };

        if subnet.address().is_empty() {
            return Err(ControllerError::SubnetAddressMissing(subnet.subnet_id));
        }

        let address = subnet.address().to_string();
        // The host is only committed once the variable exists, so a failed
        // variable step is retried on the next pass.
        if scope.control_plane_endpoint().is_unset() {
            let request = VariableService::request(KUBE_VIP_ADDRESS_VARIABLE, &address);
            self.variables.create_or_adopt(&request).await?;
        }
        if scope.set_control_plane_host(&address) {
            info!("Set control plane endpoint of {} to {}", scope.key(), address);
        } else {
            scope.default_control_plane_port();
        }

        Ok(scope.control_plane_endpoint().host)
    }

    async fn resolve_infrastructure(&self, scope: &mut ClusterScope, datacenter: &str) -> Result<u64, ControllerError> {
        if scope.infrastructure_id() != 0 {
            let infrastructure = self.infrastructures.get(scope.infrastructure_id()).await?;
            return Ok(infrastructure.infrastructure_id);
        }

        let label = match scope.infrastructure_label() {
            "" => format!("{}{}", INFRASTRUCTURE_LABEL_PREFIX, Uuid::new_v4()),
            label => label.to_string(),
        };
        debug!("Resolving infrastructure {} in {} for {}", label, datacenter, scope.key());

        let infrastructure = self
            .infrastructures
            .create_or_adopt(&CreateInfrastructureRequest {
                infrastructure_label: label,
                datacenter_name: datacenter.to_string(),
            })
            .await?;
        scope.set_infrastructure_id(infrastructure.infrastructure_id);
        Ok(infrastructure.infrastructure_id)
    }

    async fn find_network(&self, scope: &ClusterScope, infrastructure_id: u64) -> Result<Network, ControllerError> {
        let network_type = scope.network().network_type.unwrap_or_default().as_str();
        let networks = self.client.list_networks(infrastructure_id).await?;

        match select_network(networks, network_type) {
            Some(network) if network.network_id != 0 => Ok(network),
            _ => Err(ControllerError::NetworkNotFound {
                infrastructure_id,
                network_type: network_type.to_string(),
            }),
        }
    }
}

/// Picks the network of `network_type`, keyed by type or carrying it.
fn select_network(mut networks: Networks, network_type: &str) -> Option<Network> {
    networks.remove(network_type).or_else(|| {
        networks
            .into_values()
            .find(|n| n.network_type == network_type)
    })
}
