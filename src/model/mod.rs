//! Resource descriptors exchanged with the provider layer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod state;

pub use state::{AttachmentState, BackupState, InstanceState, Lifecycle, VolumeState};

/// Shapes the restore workflow knows how to relaunch.
pub const SUPPORTED_SHAPES: &[&str] = &[
    "VM.Standard2.1",
    "VM.Standard2.2",
    "VM.Standard2.4",
    "VM.Standard2.8",
    "VM.Standard2.16",
    "VM.Standard2.24",
    "VM.Standard.E2.1",
    "VM.Standard.E2.2",
    "VM.Standard.E2.4",
    "VM.Standard.E2.8",
    "VM.Standard.E3.Flex",
    "VM.Standard.E4.Flex",
    "VM.Standard.E5.Flex",
    "VM.Standard3.Flex",
    "VM.Optimized3.Flex",
    "VM.Standard.A1.Flex",
];

/// Returns `true` when `shape` accepts an explicit OCPU/memory configuration.
#[must_use]
pub fn is_flexible_shape(shape: &str) -> bool {
    shape.ends_with(".Flex")
}

/// Returns `true` when `shape` is in [`SUPPORTED_SHAPES`].
#[must_use]
pub fn is_supported_shape(shape: &str) -> bool {
    SUPPORTED_SHAPES.contains(&shape)
}

/// Distinguishes the boot device from additional data devices.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeKind {
    /// Bootable system volume.
    Boot,
    /// Additional, non-bootable volume.
    Block,
}

impl VolumeKind {
    /// Lower-case label used in logs and generated names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for VolumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU and memory of a flexible shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeConfig {
    /// Number of OCPUs.
    pub ocpus: f64,
    /// Memory in gigabytes.
    pub memory_in_gbs: f64,
}

/// A compute instance as reported by the provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputeInstance {
    /// Provider identifier.
    pub id: String,
    /// Display name, unique per compartment and region by convention.
    pub display_name: String,
    /// Shape name, for example `VM.Standard.E4.Flex`.
    pub shape: String,
    /// CPU/memory configuration for flexible shapes.
    pub shape_config: Option<ShapeConfig>,
    /// Current lifecycle state.
    pub lifecycle_state: InstanceState,
    /// Availability domain hosting the instance.
    pub availability_domain: String,
    /// Owning compartment.
    pub compartment_id: String,
}

impl ComputeInstance {
    /// Shape configuration worth copying to a relaunched instance.
    ///
    /// Fixed shapes ignore any reported configuration.
    #[must_use]
    pub fn flexible_config(&self) -> Option<ShapeConfig> {
        if is_flexible_shape(&self.shape) {
            self.shape_config
        } else {
            None
        }
    }
}

impl Lifecycle for ComputeInstance {
    type State = InstanceState;

    fn resource_id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> InstanceState {
        self.lifecycle_state
    }
}

/// A boot or block volume.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Provider identifier.
    pub id: String,
    /// Boot or block.
    pub kind: VolumeKind,
    /// Display name.
    pub display_name: String,
    /// Size in gigabytes.
    pub size_in_gbs: u64,
    /// Availability domain of the volume.
    pub availability_domain: String,
    /// Owning compartment.
    pub compartment_id: String,
    /// Current lifecycle state.
    pub lifecycle_state: VolumeState,
    /// Cross-region replicas of this volume, as reported by its region.
    #[serde(default)]
    pub replica_ids: Vec<String>,
}

impl Lifecycle for Volume {
    type State = VolumeState;

    fn resource_id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> VolumeState {
        self.lifecycle_state
    }
}

/// Volumes attached to one instance, in provider order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AttachedVolumes {
    /// Boot volumes (at most one in practice).
    pub boot: Vec<Volume>,
    /// Block volumes in the order the inventory returned them.
    pub block: Vec<Volume>,
}

impl AttachedVolumes {
    /// Iterates boot volumes first, then block volumes.
    pub fn iter(&self) -> impl Iterator<Item = &Volume> {
        self.boot.iter().chain(self.block.iter())
    }

    /// Total number of attached volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boot.len() + self.block.len()
    }

    /// Returns `true` when nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boot.is_empty() && self.block.is_empty()
    }
}

/// A point-in-time backup of a volume in one region.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    /// Provider identifier.
    pub id: String,
    /// Identifier of the volume the backup was taken from.
    pub volume_id: String,
    /// Display name; copies in another region keep the source name as a
    /// substring.
    pub display_name: String,
    /// Creation time.
    pub time_created: DateTime<Utc>,
    /// Expiry; `None` means the backup is kept until deleted.
    pub expiration_time: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    pub lifecycle_state: BackupState,
}

/// A continuously updated copy of a volume in the secondary region.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Replica {
    /// Provider identifier.
    pub id: String,
    /// Identifier of the replicated source volume.
    pub volume_id: String,
    /// Display name.
    pub display_name: String,
    /// Availability domain holding the replica.
    pub availability_domain: String,
    /// Current lifecycle state.
    pub lifecycle_state: BackupState,
}

impl Replica {
    /// A replica is usable while it is neither faulty nor terminating.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(
            self.lifecycle_state,
            BackupState::Creating | BackupState::Available
        )
    }
}

/// Link between a volume and an instance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VolumeAttachment {
    /// Provider identifier of the attachment.
    pub id: String,
    /// Attached instance.
    pub instance_id: String,
    /// Attached volume.
    pub volume_id: String,
    /// Current lifecycle state.
    pub lifecycle_state: AttachmentState,
}

impl Lifecycle for VolumeAttachment {
    type State = AttachmentState;

    fn resource_id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> AttachmentState {
        self.lifecycle_state
    }
}

/// Subnet metadata needed to validate target private addresses.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    /// Provider identifier.
    pub id: String,
    /// IPv4 range in CIDR notation.
    pub cidr_block: String,
    /// Availability domain for AD-specific subnets; `None` for regional ones.
    pub availability_domain: Option<String>,
}

/// A region the tenancy is subscribed to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegionSubscription {
    /// Region identifier, for example `eu-frankfurt-1`.
    pub region_name: String,
    /// Subscription status; `READY` when usable.
    pub status: String,
}

impl RegionSubscription {
    /// Returns `true` once the subscription is usable.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.eq_ignore_ascii_case("READY")
    }
}

/// Power actions accepted by the provider.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstanceAction {
    /// Graceful guest shutdown followed by power off.
    SoftStop,
    /// Power on.
    Start,
    /// Graceful guest reboot.
    SoftReset,
}

impl InstanceAction {
    /// Provider spelling of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SoftStop => "SOFTSTOP",
            Self::Start => "START",
            Self::SoftReset => "SOFTRESET",
        }
    }
}

impl fmt::Display for InstanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
