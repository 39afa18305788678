//! Error taxonomy shared by the restore and clone workflows.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::wait::WaitError;

/// Named step of a restore or clone workflow.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Pre-flight checks; nothing has been created.
    Validate,
    /// Finding the newest available backup of each volume.
    LocateBackups,
    /// Comparing located backups with attached volumes.
    ConsistencyCheck,
    /// Restoring the boot volume.
    RestoreBoot,
    /// Launching the target instance.
    Launch,
    /// Restoring block volumes.
    RestoreData,
    /// Attaching restored block volumes.
    Attach,
    /// Rebooting so the guest sees the new devices.
    Finalize,
    /// Checking that every volume has a usable replica.
    ReplicaHealthCheck,
    /// Creating volumes from replicas.
    CreateFromReplica,
    /// Stopping and starting the instance.
    StopStart,
}

impl Stage {
    /// Report spelling of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "VALIDATE",
            Self::LocateBackups => "LOCATE_BACKUPS",
            Self::ConsistencyCheck => "CONSISTENCY_CHECK",
            Self::RestoreBoot => "RESTORE_BOOT",
            Self::Launch => "LAUNCH",
            Self::RestoreData => "RESTORE_DATA",
            Self::Attach => "ATTACH",
            Self::Finalize => "FINALIZE",
            Self::ReplicaHealthCheck => "REPLICA_HEALTH_CHECK",
            Self::CreateFromReplica => "CREATE_FROM_REPLICA",
            Self::StopStart => "STOP_START",
        }
    }

    /// Whether resources may already exist when this stage fails.
    #[must_use]
    pub const fn may_leave_resources(self) -> bool {
        !matches!(
            self,
            Self::Validate | Self::LocateBackups | Self::ConsistencyCheck | Self::ReplicaHealthCheck
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pre-flight failures. Raised before any resource is created.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    /// A required request field is empty.
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
    /// An instance with the target name already exists.
    #[error("instance '{name}' already exists in compartment {compartment_id} ({region})")]
    InstanceNameTaken {
        /// Requested display name.
        name: String,
        /// Target compartment.
        compartment_id: String,
        /// Target region.
        region: String,
    },
    /// The subnet reports a CIDR block that cannot be parsed.
    #[error("subnet {subnet_id} reports unparseable CIDR block '{cidr}'")]
    InvalidSubnetCidr {
        /// Subnet identifier.
        subnet_id: String,
        /// Reported CIDR.
        cidr: String,
    },
    /// The requested address is outside the subnet.
    #[error("private IP {address} is outside subnet {subnet_id} ({cidr})")]
    PrivateIpOutsideSubnet {
        /// Requested address.
        address: Ipv4Addr,
        /// Subnet identifier.
        subnet_id: String,
        /// Subnet CIDR.
        cidr: String,
    },
    /// The requested address is already assigned in the subnet.
    #[error("private IP {address} is already in use in subnet {subnet_id}")]
    PrivateIpInUse {
        /// Requested address.
        address: Ipv4Addr,
        /// Subnet identifier.
        subnet_id: String,
    },
    /// The source instance's shape cannot be relaunched.
    #[error("shape '{0}' is not supported for restore")]
    UnsupportedShape(String),
    /// The tenancy is not subscribed to a region the workflow needs.
    #[error("tenancy is not subscribed to region {0}")]
    RegionNotSubscribed(String),
}

/// Invariant failures detected before any resource is created.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConsistencyError {
    /// The source instance reports no boot volume.
    #[error("instance {instance_id} has no boot volume attached")]
    MissingBootVolume {
        /// Source instance.
        instance_id: String,
        /// Stage that looked for the boot volume.
        stage: Stage,
    },
    /// No available backup of the boot volume exists in the target region.
    #[error("no available backup of boot volume {volume_id} in {region}")]
    BootBackupMissing {
        /// Source boot volume.
        volume_id: String,
        /// Region searched.
        region: String,
    },
    /// Fewer block backups were located than block volumes are attached.
    #[error("located {located} block volume backups for {attached} attached block volumes")]
    BlockBackupCountMismatch {
        /// Attached block volumes.
        attached: usize,
        /// Block backups located.
        located: usize,
    },
    /// A volume has no usable replica.
    #[error("volume {volume_id} has no healthy replica ({health})")]
    ReplicaUnavailable {
        /// Source volume.
        volume_id: String,
        /// Health verdict.
        health: String,
    },
}

impl ConsistencyError {
    /// Stage that raises this failure.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::MissingBootVolume { stage, .. } => *stage,
            Self::BootBackupMissing { .. } => Stage::LocateBackups,
            Self::BlockBackupCountMismatch { .. } => Stage::ConsistencyCheck,
            Self::ReplicaUnavailable { .. } => Stage::ReplicaHealthCheck,
        }
    }
}

/// Category of an [`OrchestrationError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Pre-flight check failed.
    Validation,
    /// Invariant check failed.
    Consistency,
    /// A resource settled in an undesired state.
    Provisioning,
    /// A wait exceeded its bound.
    Timeout,
    /// A provider call itself failed.
    Provider,
}

/// Errors that abort a restore or clone workflow.
///
/// Workflows never retry and never remove what they already created.
#[derive(Debug, Error)]
pub enum OrchestrationError<E>
where
    E: std::error::Error + 'static,
{
    /// Pre-flight check failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Invariant check failed.
    #[error("consistency check failed: {0}")]
    Consistency(#[from] ConsistencyError),
    /// A resource reached a terminal state other than the one required.
    #[error("{stage}: {resource_id} reached undesired state {state}")]
    Provisioning {
        /// Stage that failed.
        stage: Stage,
        /// Resource that settled in the wrong state.
        resource_id: String,
        /// State observed.
        state: String,
    },
    /// A wait exceeded its bound.
    #[error("{stage}: timed out after {waited:?} waiting for {resource_id} (last state {last_state})")]
    Timeout {
        /// Stage that failed.
        stage: Stage,
        /// Resource being waited on.
        resource_id: String,
        /// Last state observed.
        last_state: String,
        /// Time spent waiting.
        waited: Duration,
    },
    /// A provider call failed.
    #[error("{stage}: provider call failed: {source}")]
    Provider {
        /// Stage that failed.
        stage: Stage,
        /// Underlying provider error.
        #[source]
        source: E,
    },
}

impl<E> OrchestrationError<E>
where
    E: std::error::Error + 'static,
{
    /// Wraps a provider error raised during `stage`.
    pub const fn provider(stage: Stage, source: E) -> Self {
        Self::Provider { stage, source }
    }

    /// Converts a wait failure raised during `stage`.
    pub fn from_wait(stage: Stage, err: WaitError<E>) -> Self {
        match err {
            WaitError::UndesiredState { resource_id, state } => Self::Provisioning {
                stage,
                resource_id,
                state,
            },
            WaitError::Timeout {
                resource_id,
                last_state,
                waited,
            } => Self::Timeout {
                stage,
                resource_id,
                last_state,
                waited,
            },
            WaitError::Provider(source) => Self::Provider { stage, source },
        }
    }

    /// Taxonomy category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Consistency(_) => ErrorKind::Consistency,
            Self::Provisioning { .. } => ErrorKind::Provisioning,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Provider { .. } => ErrorKind::Provider,
        }
    }

    /// Stage the workflow stopped at.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Validation(_) => Stage::Validate,
            Self::Consistency(err) => err.stage(),
            Self::Provisioning { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Provider { stage, .. } => *stage,
        }
    }

    /// Whether the operator may need to clean up resources.
    #[must_use]
    pub const fn side_effects_possible(&self) -> bool {
        self.stage().may_leave_resources()
    }
}
