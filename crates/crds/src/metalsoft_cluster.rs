//! MetalsoftCluster CRD
//!
//! Infrastructure counterpart of a Cluster API Cluster. Holds the datacenter
//! and infrastructure the cluster lives in and, once resolved, the control
//! plane endpoint.

use crate::metalsoft_machine::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Finalizer guarding MetalsoftCluster deletion
pub const CLUSTER_FINALIZER: &str = "metalsoftcluster.infrastructure.cluster.x-k8s.io";

/// Port the control plane endpoint listens on
pub const DEFAULT_API_SERVER_PORT: i32 = 6443;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "MetalsoftCluster",
    namespaced,
    status = "MetalsoftClusterStatus",
    shortname = "msc",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Endpoint","type":"string","jsonPath":".spec.controlPlaneEndpoint.host"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MetalsoftClusterSpec {
    /// Datacenter the infrastructure is created in (required, immutable)
    #[serde(default)]
    pub datacenter_name: String,

    /// Label of the Metalsoft infrastructure (immutable, generated when empty)
    #[serde(default)]
    pub infrastructure_label: String,

    /// Endpoint used to reach the control plane; set once by the controller
    #[serde(default)]
    pub control_plane_endpoint: ApiEndpoint,

    /// Metalsoft infrastructure ID (0 until resolved)
    #[serde(default, rename = "infrastructureID")]
    pub infrastructure_id: u64,

    /// Network configuration of the infrastructure
    #[serde(default)]
    pub network: ClusterNetworkSpec,
}

/// Host and port of an API server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    /// Hostname or IP address
    #[serde(default)]
    pub host: String,

    /// Port
    #[serde(default)]
    pub port: i32,
}

impl ApiEndpoint {
    /// True when no host has been assigned yet.
    pub fn is_unset(&self) -> bool {
        self.host.is_empty()
    }
}

/// Network configuration of a MetalsoftCluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkSpec {
    /// Metalsoft subnet ID holding the control plane VIP (0 until resolved)
    #[serde(default, rename = "subnetID")]
    pub subnet_id: u64,

    /// Network label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Network type (wan, lan or san)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub network_type: Option<NetworkType>,

    /// Network profile applied to the network
    #[serde(default, rename = "networkProfileID", skip_serializing_if = "Option::is_none")]
    pub network_profile_id: Option<u64>,

    /// Subnets to allocate; the first entry configures the control plane VIP subnet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<SubnetSpec>,
}

impl ClusterNetworkSpec {
    /// Looks up a subnet entry by label.
    pub fn find_subnet(&self, label: &str) -> Option<&SubnetSpec> {
        self.subnets.iter().find(|s| s.label.as_deref() == Some(label))
    }
}

/// Metalsoft network types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Internet facing network
    #[default]
    Wan,
    /// Private network
    Lan,
    /// Storage network
    San,
}

impl NetworkType {
    /// Name used by the Metalsoft API
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Wan => "wan",
            NetworkType::Lan => "lan",
            NetworkType::San => "san",
        }
    }
}

/// Subnet allocation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    /// Subnet label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Address family ("ipv4" or "ipv6")
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub subnet_type: Option<String>,

    /// Prefix length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_size: Option<u8>,

    /// Whether instances get addresses from this subnet automatically
    #[serde(default)]
    pub automatic_allocation: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetalsoftClusterStatus {
    /// Cluster infrastructure is ready and the control plane endpoint is known
    #[serde(default)]
    pub ready: bool,

    /// Last convergence failure, cleared once the cluster is ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,

    /// Observed conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
