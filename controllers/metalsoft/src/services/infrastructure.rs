//! Infrastructure create-or-adopt.

use super::adoption::{AdoptionClassifier, ResourceKind, adoptable_id};
use crate::error::ControllerError;
use metalsoft_client::{CreateInfrastructureRequest, Infrastructure, MetalsoftClientTrait};
use std::sync::Arc;
use tracing::{debug, info};

/// Creates or adopts Metalsoft infrastructures
pub struct InfrastructureService {
    client: Arc<dyn MetalsoftClientTrait>,
    classifier: Arc<AdoptionClassifier>,
}

impl InfrastructureService {
    pub fn new(client: Arc<dyn MetalsoftClientTrait>, classifier: Arc<AdoptionClassifier>) -> Self {
        Self { client, classifier }
    }

    /// Creates the infrastructure, or fetches the one already holding its label.
    pub async fn create_or_adopt(&self, request: &CreateInfrastructureRequest) -> Result<Infrastructure, ControllerError> {
        match self.client.create_infrastructure(request).await {
            Ok(infrastructure) => {
                info!(
                    "Created infrastructure {} ({}) in {}",
                    infrastructure.infrastructure_label, infrastructure.infrastructure_id, request.datacenter_name
                );
                Ok(infrastructure)
            }
            Err(err) => {
                let id = adoptable_id(&self.classifier, ResourceKind::Infrastructure, err)?;
                debug!("Infrastructure {} already exists with ID {}, adopting", request.infrastructure_label, id);
                self.get(id).await
            }
        }
    }

    pub async fn get(&self, id: u64) -> Result<Infrastructure, ControllerError> {
        Ok(self.client.get_infrastructure(id).await?)
    }
}
