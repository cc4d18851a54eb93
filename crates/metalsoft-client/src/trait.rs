//! MetalsoftClient trait for mocking
//!
//! This trait abstracts the MetalsoftClient so the controllers can run
//! against an in-memory provider in unit tests.

use crate::error::MetalsoftError;
use crate::models::*;

/// Trait for Metalsoft API client operations
///
/// Create calls are not idempotent: creating an object whose label is already
/// taken fails with [`MetalsoftError::Api`] whose message names the existing
/// object's ID. Callers that need create-if-absent build it on top.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait MetalsoftClientTrait: Send + Sync {
    /// Developer API endpoint the client talks to
    fn endpoint(&self) -> &str;

    // Infrastructure
    async fn create_infrastructure(&self, request: &CreateInfrastructureRequest) -> Result<Infrastructure, MetalsoftError>;
    async fn get_infrastructure(&self, id: u64) -> Result<Infrastructure, MetalsoftError>;

    // Networking
    async fn list_networks(&self, infrastructure_id: u64) -> Result<Networks, MetalsoftError>;
    async fn create_subnet(&self, request: &CreateSubnetRequest) -> Result<Subnet, MetalsoftError>;
    async fn get_subnet(&self, id: u64) -> Result<Subnet, MetalsoftError>;

    // Variables
    async fn create_variable(&self, request: &CreateVariableRequest) -> Result<Variable, MetalsoftError>;
    async fn get_variable(&self, id: u64) -> Result<Variable, MetalsoftError>;
}
