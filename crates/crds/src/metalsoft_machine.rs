//! MetalsoftMachine CRD
//!
//! Infrastructure counterpart of a Cluster API Machine: one Metalsoft
//! instance with its boot method, server type, OS template and disks.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Finalizer guarding MetalsoftMachine deletion
pub const MACHINE_FINALIZER: &str = "metalsoftmachine.infrastructure.cluster.x-k8s.io";

/// Default size of an additional disk in MB
pub const DEFAULT_DISK_SIZE_MB: u32 = 40960;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "MetalsoftMachine",
    namespaced,
    status = "MetalsoftMachineStatus",
    shortname = "msm",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.instanceState"}"#,
    printcolumn = r#"{"name":"ProviderID","type":"string","jsonPath":".spec.providerID"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MetalsoftMachineSpec {
    /// Label of the Metalsoft instance
    #[serde(default)]
    pub instance_label: String,

    /// How the instance boots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_boot_method: Option<InstanceBootMethod>,

    /// Server type name (e.g., "M.8.8.2")
    #[serde(default)]
    pub instance_server_type_name: String,

    /// Server type ID, takes precedence over the name when set
    #[serde(default, rename = "instanceServerTypeID")]
    pub instance_server_type_id: u64,

    /// OS template label
    #[serde(default, rename = "osTemplateLabel")]
    pub os_template_label: String,

    /// OS template ID, takes precedence over the label when set
    #[serde(default, rename = "osTemplateID")]
    pub os_template_id: u64,

    /// Extra drives attached to the instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_disks: Vec<AttachedDiskSpec>,

    /// Provider ID of the instance, `metalsoft://<id>` once provisioned
    #[serde(default, rename = "providerID", skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl MetalsoftMachineSpec {
    /// Boot method with the default applied.
    pub fn boot_method(&self) -> InstanceBootMethod {
        self.instance_boot_method.unwrap_or_default()
    }
}

/// Instance boot method
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum InstanceBootMethod {
    /// Boot over PXE from an iSCSI drive
    #[serde(rename = "pxe_iscsi")]
    PxeIscsi,
    /// Boot from local drives
    #[default]
    #[serde(rename = "local_drives")]
    LocalDrives,
}

/// Block storage backing a disk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum BlockStorage {
    /// Drive array, one drive per instance
    #[serde(rename = "drive_array")]
    DriveArray,
    /// Drive shared between instances
    #[serde(rename = "shared_drive")]
    SharedDrive,
}

/// Disk media
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum DiskType {
    /// iSCSI SSD
    #[serde(rename = "iscsi_ssd")]
    Ssd,
    /// iSCSI HDD
    #[serde(rename = "iscsi_hdd")]
    Hdd,
}

/// Additional disk attached to an instance
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDiskSpec {
    /// Storage backing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<BlockStorage>,

    /// Disk media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<DiskType>,

    /// Size in MB (defaults to 40960)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    /// Number of disks (defaults to 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_count: Option<u32>,

    /// Disk label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_label: Option<String>,
}

impl AttachedDiskSpec {
    /// Size with the default applied.
    pub fn size_mb(&self) -> u32 {
        self.size.unwrap_or(DEFAULT_DISK_SIZE_MB)
    }

    /// Disk count with the default applied.
    pub fn count(&self) -> u32 {
        self.disk_count.unwrap_or(1)
    }
}

/// Lifecycle state of a Metalsoft instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    /// Ordered but not yet deployed
    Ordered,
    /// Deployed and running
    Active,
    /// Suspended
    Suspended,
    /// Stopped
    Stopped,
    /// Deleted
    Deleted,
}

/// Address of a machine as reported to Cluster API
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineAddress {
    /// Address type (Hostname, ExternalIP, InternalIP, ExternalDNS, InternalDNS)
    #[serde(rename = "type")]
    pub address_type: String,

    /// The address
    pub address: String,
}

/// Cluster API style condition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type
    #[serde(rename = "type")]
    pub condition_type: String,

    /// "True", "False" or "Unknown"
    pub status: String,

    /// Severity when the condition is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Last time the status changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Machine-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Condition type reported once the object is provisioned
pub const READY_CONDITION: &str = "Ready";

impl Condition {
    /// A condition of `condition_type`, transitioning now.
    pub fn new(condition_type: &str, status: bool) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            severity: None,
            last_transition_time: Some(Utc::now()),
            reason: None,
            message: None,
        }
    }

    /// Adds a reason and message; false conditions default to Info severity.
    pub fn with_reason(mut self, reason: &str, message: &str) -> Self {
        if self.status == "False" {
            self.severity = Some("Info".to_string());
        }
        self.reason = Some(reason.to_string());
        self.message = Some(message.to_string());
        self
    }
}

/// Upserts `new` by type. The transition time is kept when the status did
/// not change, so repeated passes do not produce spurious patches.
pub fn set_condition(conditions: &mut Vec<Condition>, mut new: Condition) {
    match conditions.iter_mut().find(|c| c.condition_type == new.condition_type) {
        Some(existing) => {
            if existing.status == new.status {
                new.last_transition_time = existing.last_transition_time;
            }
            *existing = new;
        }
        None => conditions.push(new),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetalsoftMachineStatus {
    /// Instance is provisioned and ready
    #[serde(default)]
    pub ready: bool,

    /// Addresses of the instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<MachineAddress>,

    /// Lifecycle state of the instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_state: Option<InstanceState>,

    /// Terminal failure reason; reconciliation stops until it is cleared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Terminal failure message; reconciliation stops until it is cleared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,

    /// Observed conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl MetalsoftMachineStatus {
    /// True when either terminal failure field is set.
    pub fn has_failed(&self) -> bool {
        self.failure_reason.is_some() || self.failure_message.is_some()
    }
}
