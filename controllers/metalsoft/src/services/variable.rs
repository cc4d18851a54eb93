//! Variable create-or-adopt.

use super::adoption::{AdoptionClassifier, ResourceKind, adoptable_id};
use crate::error::ControllerError;
use metalsoft_client::{CreateVariableRequest, MetalsoftClientTrait, Variable};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Variable carrying the control plane VIP to kube-vip
pub const KUBE_VIP_ADDRESS_VARIABLE: &str = "kube_vip_address";

/// Creates or adopts Metalsoft variables
pub struct VariableService {
    client: Arc<dyn MetalsoftClientTrait>,
    classifier: Arc<AdoptionClassifier>,
}

impl VariableService {
    pub fn new(client: Arc<dyn MetalsoftClientTrait>, classifier: Arc<AdoptionClassifier>) -> Self {
        Self { client, classifier }
    }

    /// Request for a variable holding `{"value": <value>}`.
    pub fn request(name: &str, value: &str) -> CreateVariableRequest {
        CreateVariableRequest {
            variable_name: name.to_string(),
            variable_json: json!({ "value": value }).to_string(),
        }
    }

    /// Creates the variable, or fetches the one already holding its name.
    ///
    /// An adopted variable keeps its stored value.
    pub async fn create_or_adopt(&self, request: &CreateVariableRequest) -> Result<Variable, ControllerError> {
        match self.client.create_variable(request).await {
            Ok(variable) => {
                info!("Created variable {} ({})", variable.variable_name, variable.variable_id);
                Ok(variable)
            }
            Err(err) => {
                let id = adoptable_id(&self.classifier, ResourceKind::Variable, err)?;
                debug!("Variable {} already exists with ID {}, adopting", request.variable_name, id);
                self.get(id).await
            }
        }
    }

    pub async fn get(&self, id: u64) -> Result<Variable, ControllerError> {
        Ok(self.client.get_variable(id).await?)
    }
}
