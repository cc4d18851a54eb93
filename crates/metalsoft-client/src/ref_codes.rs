//! Reference codes the Metalsoft API embeds in error messages
//!
//! Create calls reject duplicates with a message like
//! `Infrastructure with label x already exists (ID 42). Ref: d3241ebb...`.
//! The reference code identifies the rejection independently of the wording.

/// Infrastructure label already in use
pub const INFRASTRUCTURE_EXISTS: &str = "d3241ebb479ffdd886b4dca6a61e3263";

/// Subnet label already in use within the infrastructure
pub const SUBNET_EXISTS: &str = "96cb5b6dffa2dcd7805e02e89fd890cb";

/// Subnet already allocated on the network (returned by newer API versions)
pub const SUBNET_ALLOCATED: &str = "42bde79f729065b21e8583dd00cf48e0";

/// Variable name already in use for the user
pub const VARIABLE_EXISTS: &str = "d5cf17eb3a9ad5bf460c1d564b47d395";
