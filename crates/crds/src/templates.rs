//! MetalsoftClusterTemplate and MetalsoftMachineTemplate CRDs
//!
//! Templates used by ClusterClass and MachineDeployment to stamp out
//! MetalsoftClusters and MetalsoftMachines.

use crate::metalsoft_cluster::MetalsoftClusterSpec;
use crate::metalsoft_machine::MetalsoftMachineSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "MetalsoftClusterTemplate",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MetalsoftClusterTemplateSpec {
    /// Template for created MetalsoftClusters
    pub template: MetalsoftClusterTemplateResource,
}

/// Body of a MetalsoftClusterTemplate
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetalsoftClusterTemplateResource {
    /// Labels and annotations copied to created objects
    #[serde(default)]
    pub metadata: TemplateMeta,

    /// Spec of created MetalsoftClusters
    pub spec: MetalsoftClusterSpec,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "MetalsoftMachineTemplate",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MetalsoftMachineTemplateSpec {
    /// Template for created MetalsoftMachines
    pub template: MetalsoftMachineTemplateResource,
}

/// Body of a MetalsoftMachineTemplate
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetalsoftMachineTemplateResource {
    /// Labels and annotations copied to created objects
    #[serde(default)]
    pub metadata: TemplateMeta,

    /// Spec of created MetalsoftMachines
    pub spec: MetalsoftMachineSpec,
}

/// Metadata carried by templates
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TemplateMeta {
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}
