//! Kubernetes object references used by Cluster API objects
//!
//! Cluster API links owner objects to provider objects with a plain
//! `corev1.ObjectReference` shaped struct (apiVersion, kind, name, namespace).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference from a Cluster API object to a provider-specific object.
///
/// Used as `Cluster.spec.infrastructureRef` and `Machine.spec.infrastructureRef`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// API version of the referenced object (e.g., "infrastructure.cluster.x-k8s.io/v1alpha1")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    /// Kind of the referenced object (e.g., "MetalsoftCluster")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Name of the referenced object
    #[serde(default)]
    pub name: String,

    /// Namespace of the referenced object (defaults to the referencing object's namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectReference {
    /// Reference to a Metalsoft infrastructure object in the same namespace
    pub fn metalsoft(kind: &str, name: impl Into<String>) -> Self {
        Self {
            api_version: format!("{}/{}", crate::INFRASTRUCTURE_GROUP, crate::INFRASTRUCTURE_VERSION),
            kind: kind.to_string(),
            name: name.into(),
            namespace: None,
        }
    }
}
