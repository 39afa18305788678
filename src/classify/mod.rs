//! Cross-region backup consistency classification.
//!
//! Classification is a pure function over listings that have already been
//! fetched from both regions. Missing or empty secondary data is never an
//! error: it is reported as [`ReplicationStatus::NotReplicated`] per item and
//! [`AggregateStatus::NotEnabled`] when the primary region holds nothing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Backup, BackupState, ComputeInstance, Volume, VolumeKind};

mod replica;
mod scanner;

pub use replica::{ReplicaHealth, ReplicaReport, VolumeReplicaHealth, replica_health};
pub use scanner::ConsistencyScanner;

/// Replication status of one primary-region backup.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationStatus {
    /// The primary backup is terminating or terminated.
    Expired,
    /// No matching copy exists in the secondary region.
    NotReplicated,
    /// Both copies report the same state.
    Synchronized,
    /// The primary backup is still being created.
    Pending,
    /// The primary backup failed.
    PrimaryFaulty,
    /// The primary is available and its copy is still being created.
    InProgress,
    /// The secondary copy is in an unusable state.
    Faulty,
    /// A state combination none of the rules cover.
    Unknown,
}

impl ReplicationStatus {
    /// Report spelling of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "EXPIRED",
            Self::NotReplicated => "NOT_REPLICATED",
            Self::Synchronized => "SYNCHRONIZED",
            Self::Pending => "PENDING",
            Self::PrimaryFaulty => "PRIMARY_FAULTY",
            Self::InProgress => "IN_PROGRESS",
            Self::Faulty => "FAULTY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ReplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roll-up of an instance's backup replication.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateStatus {
    /// The primary region holds no backups for any of the instance's volumes.
    NotEnabled,
    /// At least one volume has differing backup counts between regions.
    PartiallySynchronized,
    /// Every volume has the same backup count in both regions.
    Healthy,
}

impl AggregateStatus {
    /// Report spelling of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotEnabled => "NOT_ENABLED",
            Self::PartiallySynchronized => "PARTIALLY_SYNCHRONIZED",
            Self::Healthy => "HEALTHY",
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backup listings for one volume from both regions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeBackups {
    /// The attached volume.
    pub volume: Volume,
    /// Backups listed in the primary region.
    pub primary: Vec<Backup>,
    /// Backups listed in the secondary region.
    pub secondary: Vec<Backup>,
}

/// Per-backup classification detail.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ItemReport {
    /// Source volume identifier.
    pub volume_id: String,
    /// Source volume display name.
    pub volume_name: String,
    /// Boot or block.
    pub volume_kind: VolumeKind,
    /// Primary backup identifier.
    pub backup_id: String,
    /// Primary backup display name.
    pub backup_name: String,
    /// Primary backup creation time.
    pub time_created: DateTime<Utc>,
    /// Primary backup expiry, `None` for unlimited retention.
    pub expiration_time: Option<DateTime<Utc>>,
    /// Primary backup state.
    pub primary_state: BackupState,
    /// Matched secondary copy, if any.
    pub secondary_backup_id: Option<String>,
    /// Matched secondary copy state, if any.
    pub secondary_state: Option<BackupState>,
    /// Derived status.
    pub status: ReplicationStatus,
}

/// Per-volume backup counts.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VolumeSummary {
    /// Volume identifier.
    pub volume_id: String,
    /// Volume display name.
    pub volume_name: String,
    /// Boot or block.
    pub volume_kind: VolumeKind,
    /// Number of backups in the primary region.
    pub primary_count: usize,
    /// Number of backups in the secondary region.
    pub secondary_count: usize,
}

impl VolumeSummary {
    /// Whether both regions hold the same number of backups.
    #[must_use]
    pub const fn counts_match(&self) -> bool {
        self.primary_count == self.secondary_count
    }
}

/// Classification result for one instance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InstanceReport {
    /// Instance identifier.
    pub instance_id: String,
    /// Instance display name.
    pub instance_name: String,
    /// Aggregate status.
    pub status: AggregateStatus,
    /// Number of primary-region backups across all volumes.
    pub total_backups: usize,
    /// Per-volume counts.
    pub volumes: Vec<VolumeSummary>,
    /// Per-backup detail.
    pub items: Vec<ItemReport>,
}

/// Finds the secondary copy of `primary`: same source volume, and a display
/// name containing the primary's name.
#[must_use]
pub fn find_secondary<'a>(primary: &Backup, secondary: &'a [Backup]) -> Option<&'a Backup> {
    secondary.iter().find(|candidate| {
        candidate.volume_id == primary.volume_id
            && candidate.display_name.contains(primary.display_name.as_str())
    })
}

/// Classifies one primary backup against its matched secondary copy.
///
/// Rules apply in order; the first that matches wins.
#[must_use]
pub fn classify_item(primary: &Backup, secondary: Option<&Backup>) -> ReplicationStatus {
    let primary_state = primary.lifecycle_state;
    if primary_state.is_expired() {
        return ReplicationStatus::Expired;
    }
    let Some(copy) = secondary else {
        return ReplicationStatus::NotReplicated;
    };
    let secondary_state = copy.lifecycle_state;

    if primary_state == secondary_state {
        return ReplicationStatus::Synchronized;
    }
    match primary_state {
        BackupState::Creating => return ReplicationStatus::Pending,
        BackupState::Faulty => return ReplicationStatus::PrimaryFaulty,
        BackupState::Available if secondary_state == BackupState::Creating => {
            return ReplicationStatus::InProgress;
        }
        _ => {}
    }
    if !matches!(
        secondary_state,
        BackupState::Available | BackupState::Terminated | BackupState::Terminating
    ) {
        return ReplicationStatus::Faulty;
    }
    ReplicationStatus::Unknown
}

/// Derives the aggregate status from per-volume counts.
///
/// Only counts are compared; per-item statuses do not influence the result.
#[must_use]
pub fn aggregate_status(volumes: &[VolumeSummary]) -> AggregateStatus {
    let total: usize = volumes.iter().map(|volume| volume.primary_count).sum();
    if total == 0 {
        return AggregateStatus::NotEnabled;
    }
    if volumes.iter().all(VolumeSummary::counts_match) {
        AggregateStatus::Healthy
    } else {
        AggregateStatus::PartiallySynchronized
    }
}

/// Classifies every backup of an instance and rolls the result up.
#[must_use]
pub fn classify_instance(instance: &ComputeInstance, volumes: &[VolumeBackups]) -> InstanceReport {
    let mut items = Vec::new();
    let mut summaries = Vec::with_capacity(volumes.len());

    for listing in volumes {
        let volume = &listing.volume;
        summaries.push(VolumeSummary {
            volume_id: volume.id.clone(),
            volume_name: volume.display_name.clone(),
            volume_kind: volume.kind,
            primary_count: listing.primary.len(),
            secondary_count: listing.secondary.len(),
        });

        for backup in &listing.primary {
            let copy = find_secondary(backup, &listing.secondary);
            items.push(ItemReport {
                volume_id: volume.id.clone(),
                volume_name: volume.display_name.clone(),
                volume_kind: volume.kind,
                backup_id: backup.id.clone(),
                backup_name: backup.display_name.clone(),
                time_created: backup.time_created,
                expiration_time: backup.expiration_time,
                primary_state: backup.lifecycle_state,
                secondary_backup_id: copy.map(|found| found.id.clone()),
                secondary_state: copy.map(|found| found.lifecycle_state),
                status: classify_item(backup, copy),
            });
        }
    }

    InstanceReport {
        instance_id: instance.id.clone(),
        instance_name: instance.display_name.clone(),
        status: aggregate_status(&summaries),
        total_backups: items.len(),
        volumes: summaries,
        items,
    }
}
