//! Cluster API owner objects
//!
//! Read-only views of `cluster.x-k8s.io/v1beta1` Cluster and Machine.
//! Only the fields the Metalsoft controllers read are modelled; unknown
//! fields are ignored on deserialization.

use crate::references::ObjectReference;
use kube::CustomResource;
use kube::Resource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cluster API group
pub const CLUSTER_API_GROUP: &str = "cluster.x-k8s.io";

/// Label set on Machines naming the Cluster they belong to
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";

/// Annotation that pauses reconciliation of a Cluster API object
pub const PAUSED_ANNOTATION: &str = "cluster.x-k8s.io/paused";

/// Label used to scope a controller to a subset of objects
pub const WATCH_FILTER_LABEL: &str = "cluster.x-k8s.io/watch-filter";

/// Label set on control plane Machines
pub const CONTROL_PLANE_LABEL: &str = "cluster.x-k8s.io/control-plane";

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Pauses reconciliation of the cluster and all its objects
    #[serde(default)]
    pub paused: bool,

    /// Reference to the provider-specific infrastructure object (a MetalsoftCluster)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Whether the infrastructure provider reported the cluster infrastructure ready
    #[serde(default)]
    pub infrastructure_ready: bool,

    /// Cluster phase as reported by Cluster API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Machine",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Name of the Cluster this machine belongs to
    #[serde(default)]
    pub cluster_name: String,

    /// Bootstrap configuration
    #[serde(default)]
    pub bootstrap: Bootstrap,

    /// Reference to the provider-specific machine object (a MetalsoftMachine)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<ObjectReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    /// Secret holding the bootstrap data, set once the bootstrap provider is done
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_secret_name: Option<String>,
}

/// True when the paused annotation is present on the object.
pub fn has_paused_annotation<K: Resource>(obj: &K) -> bool {
    obj.meta()
        .annotations
        .as_ref()
        .is_some_and(|a| a.contains_key(PAUSED_ANNOTATION))
}

/// Cluster API pause semantics: a paused Cluster pauses every object it owns,
/// and any object can be paused on its own with the paused annotation.
pub fn is_paused<K: Resource>(cluster: &Cluster, obj: &K) -> bool {
    cluster.spec.paused || has_paused_annotation(cluster) || has_paused_annotation(obj)
}

impl Machine {
    /// Whether this machine is part of the control plane.
    pub fn is_control_plane(&self) -> bool {
        self.metadata
            .labels
            .as_ref()
            .is_some_and(|l| l.contains_key(CONTROL_PLANE_LABEL))
    }
}

impl Cluster {
    /// Name of the MetalsoftCluster backing this cluster, if linked yet.
    pub fn infrastructure_name(&self) -> Option<&str> {
        self.spec
            .infrastructure_ref
            .as_ref()
            .map(|r| r.name.as_str())
            .filter(|n| !n.is_empty())
    }
}
