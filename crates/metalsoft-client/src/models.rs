//! Metalsoft API data models
//!
//! Field names follow the developer API's snake_case JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An infrastructure: the top-level container for instances, networks and subnets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Infrastructure {
    pub infrastructure_id: u64,
    pub infrastructure_label: String,
    pub datacenter_name: String,
    #[serde(default)]
    pub infrastructure_subdomain: Option<String>,
    #[serde(default)]
    pub user_id_owner: Option<u64>,
}

/// Request body for infrastructure creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateInfrastructureRequest {
    pub infrastructure_label: String,
    pub datacenter_name: String,
}

/// A network attached to an infrastructure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    pub network_id: u64,
    pub network_type: String,
    #[serde(default)]
    pub network_label: Option<String>,
    #[serde(default)]
    pub infrastructure_id: u64,
}

/// Networks of an infrastructure keyed by label ("wan", "lan", "san" for the defaults)
pub type Networks = HashMap<String, Network>;

/// A subnet carved out of a network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subnet {
    pub subnet_id: u64,
    pub network_id: u64,
    pub infrastructure_id: u64,
    pub subnet_label: String,
    #[serde(default)]
    pub subnet_destination: String,
    #[serde(default)]
    pub subnet_prefix_size: u8,
    #[serde(default)]
    pub subnet_type: String,
    #[serde(default)]
    pub subnet_automatic_allocation: bool,
    /// First usable address in dotted notation, empty until allocated
    #[serde(default)]
    pub subnet_range_start_human_readable: String,
    #[serde(default)]
    pub subnet_range_end_human_readable: String,
    #[serde(default)]
    pub subnet_gateway_human_readable: Option<String>,
    #[serde(default)]
    pub subnet_subdomain: Option<String>,
}

impl Subnet {
    /// Address used as the control plane VIP. Empty when none is allocated.
    ///
    /// This is the first address of the allocated range rather than
    /// `subnet_subdomain`, so the endpoint is always an IP the VIP can bind.
    pub fn address(&self) -> &str {
        &self.subnet_range_start_human_readable
    }
}

/// Request body for subnet creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateSubnetRequest {
    pub network_id: u64,
    pub infrastructure_id: u64,
    pub subnet_label: String,
    pub subnet_destination: String,
    pub subnet_prefix_size: u8,
    pub subnet_type: String,
    pub subnet_automatic_allocation: bool,
}

/// A named JSON variable, made available to OS templates and workflows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variable {
    pub variable_id: u64,
    pub variable_name: String,
    /// JSON document, stored as a string
    pub variable_json: String,
    #[serde(default)]
    pub variable_usage: Option<String>,
    #[serde(default)]
    pub user_id_owner: Option<u64>,
}

/// Request body for variable creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateVariableRequest {
    pub variable_name: String,
    pub variable_json: String,
}
