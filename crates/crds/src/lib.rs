//! Metalsoft CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the Metalsoft Cluster API
//! infrastructure provider, plus read-only views of the Cluster API objects
//! that own them.

pub mod capi;
pub mod metalsoft_cluster;
pub mod metalsoft_machine;
pub mod references;
pub mod templates;
pub mod validation;

pub use capi::*;
pub use metalsoft_cluster::*;
pub use metalsoft_machine::*;
pub use references::*;
pub use templates::*;
pub use validation::*;

/// API group of the Metalsoft infrastructure CRDs
pub const INFRASTRUCTURE_GROUP: &str = "infrastructure.cluster.x-k8s.io";

/// API version of the Metalsoft infrastructure CRDs
pub const INFRASTRUCTURE_VERSION: &str = "v1alpha1";
