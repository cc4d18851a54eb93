//! Idempotent create-or-adopt services over the Metalsoft API.
//!
//! The provider has no create-if-absent call. Each service attempts the
//! create and, when the provider rejects it as a duplicate, adopts the
//! existing object by the ID named in the rejection.

pub mod adoption;
pub mod endpoint;
pub mod infrastructure;
pub mod subnet;
pub mod variable;

pub use adoption::{Adoption, AdoptionClassifier, ResourceKind};
pub use endpoint::EndpointResolver;
pub use infrastructure::InfrastructureService;
pub use subnet::SubnetService;
pub use variable::VariableService;

#[cfg(test)]
mod services_test;
