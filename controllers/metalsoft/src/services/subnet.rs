//! Subnet create-or-adopt.

use super::adoption::{AdoptionClassifier, ResourceKind, adoptable_id};
use crate::error::ControllerError;
use crds::SubnetSpec;
use metalsoft_client::{CreateSubnetRequest, MetalsoftClientTrait, Subnet};
use std::sync::Arc;
use tracing::{debug, info};

/// Destination of the control plane subnet
pub const DEFAULT_SUBNET_DESTINATION: &str = "wan";

/// Prefix size of the control plane subnet
pub const DEFAULT_SUBNET_PREFIX_SIZE: u8 = 29;

/// Address family of the control plane subnet
pub const DEFAULT_SUBNET_TYPE: &str = "ipv4";

/// Creates or adopts Metalsoft subnets
pub struct SubnetService {
    client: Arc<dyn MetalsoftClientTrait>,
    classifier: Arc<AdoptionClassifier>,
}

impl SubnetService {
    pub fn new(client: Arc<dyn MetalsoftClientTrait>, classifier: Arc<AdoptionClassifier>) -> Self {
        Self { client, classifier }
    }

    /// Builds a creation request with the control plane defaults, overridden
    /// by whatever `overrides` sets.
    pub fn request(
        infrastructure_id: u64,
        network_id: u64,
        label: String,
        overrides: Option<&SubnetSpec>,
    ) -> CreateSubnetRequest {
        let mut request = CreateSubnetRequest {
            network_id,
            infrastructure_id,
            subnet_label: label,
            subnet_destination: DEFAULT_SUBNET_DESTINATION.to_string(),
            subnet_prefix_size: DEFAULT_SUBNET_PREFIX_SIZE,
            subnet_type: DEFAULT_SUBNET_TYPE.to_string(),
            subnet_automatic_allocation: false,
        };
        if let Some(spec) = overrides {
            if let Some(prefix_size) = spec.prefix_size {
                request.subnet_prefix_size = prefix_size;
            }
            if let Some(subnet_type) = spec.subnet_type.as_ref().filter(|t| !t.is_empty()) {
                request.subnet_type = subnet_type.clone();
            }
            request.subnet_automatic_allocation = spec.automatic_allocation;
        }
        request
    }

    /// Creates the subnet, or fetches the one the provider says already exists.
    pub async fn create_or_adopt(&self, request: &CreateSubnetRequest) -> Result<Subnet, ControllerError> {
        match self.client.create_subnet(request).await {
            Ok(subnet) => {
                info!(
                    "Created subnet {} ({}) on network {}",
                    subnet.subnet_label, subnet.subnet_id, request.network_id
                );
                Ok(subnet)
            }
            Err(err) => {
                let id = adoptable_id(&self.classifier, ResourceKind::Subnet, err)?;
                debug!("Subnet {} already exists with ID {}, adopting", request.subnet_label, id);
                self.get(id).await
            }
        }
    }

    pub async fn get(&self, id: u64) -> Result<Subnet, ControllerError> {
        Ok(self.client.get_subnet(id).await?)
    }
}
