//! JSON payloads exchanged with the `oci` CLI.
//!
//! The CLI prints resources in kebab-case inside a `{"data": ...}` envelope
//! and accepts complex parameters as camelCase JSON strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    AttachmentState, Backup, BackupState, ComputeInstance, InstanceState, RegionSubscription,
    Replica, ShapeConfig, Subnet, Volume, VolumeAttachment, VolumeKind, VolumeState,
};
use crate::schedule::{
    BackupPolicy, Month, OffsetType, Schedule, ScheduleValidationError, Weekday,
};

/// Envelope wrapping every CLI response.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct InstanceWire {
    id: String,
    display_name: String,
    shape: String,
    #[serde(default)]
    shape_config: Option<ShapeConfigWire>,
    lifecycle_state: InstanceState,
    availability_domain: String,
    compartment_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ShapeConfigWire {
    ocpus: Option<f64>,
    memory_in_gbs: Option<f64>,
}

impl From<InstanceWire> for ComputeInstance {
    fn from(wire: InstanceWire) -> Self {
        let shape_config = wire.shape_config.and_then(|config| {
            Some(ShapeConfig {
                ocpus: config.ocpus?,
                memory_in_gbs: config.memory_in_gbs?,
            })
        });
        Self {
            id: wire.id,
            display_name: wire.display_name,
            shape: wire.shape,
            shape_config,
            lifecycle_state: wire.lifecycle_state,
            availability_domain: wire.availability_domain,
            compartment_id: wire.compartment_id,
        }
    }
}

/// Boot or block volume attachment as listed by the CLI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct AttachmentWire {
    pub id: String,
    pub instance_id: String,
    #[serde(alias = "boot-volume-id")]
    pub volume_id: String,
    pub lifecycle_state: AttachmentState,
}

impl From<AttachmentWire> for VolumeAttachment {
    fn from(wire: AttachmentWire) -> Self {
        Self {
            id: wire.id,
            instance_id: wire.instance_id,
            volume_id: wire.volume_id,
            lifecycle_state: wire.lifecycle_state,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReplicaRefWire {
    #[serde(alias = "boot-volume-replica-id", alias = "block-volume-replica-id")]
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct VolumeWire {
    id: String,
    display_name: String,
    #[serde(default)]
    size_in_gbs: Option<u64>,
    availability_domain: String,
    compartment_id: String,
    lifecycle_state: VolumeState,
    #[serde(default, alias = "boot-volume-replicas", alias = "block-volume-replicas")]
    replicas: Option<Vec<ReplicaRefWire>>,
}

impl VolumeWire {
    pub(super) fn into_volume(self, kind: VolumeKind) -> Volume {
        Volume {
            id: self.id,
            kind,
            display_name: self.display_name,
            size_in_gbs: self.size_in_gbs.unwrap_or_default(),
            availability_domain: self.availability_domain,
            compartment_id: self.compartment_id,
            lifecycle_state: self.lifecycle_state,
            replica_ids: self
                .replicas
                .unwrap_or_default()
                .into_iter()
                .map(|replica| replica.id)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct BackupWire {
    id: String,
    #[serde(alias = "boot-volume-id")]
    volume_id: Option<String>,
    display_name: String,
    time_created: DateTime<Utc>,
    #[serde(default)]
    expiration_time: Option<DateTime<Utc>>,
    lifecycle_state: BackupState,
}

impl BackupWire {
    /// Converts the listing entry; copies whose source volume is no longer
    /// reported keep the identifier the listing was filtered by.
    pub(super) fn into_backup(self, volume_id: &str) -> Backup {
        Backup {
            id: self.id,
            volume_id: self.volume_id.unwrap_or_else(|| volume_id.to_owned()),
            display_name: self.display_name,
            time_created: self.time_created,
            expiration_time: self.expiration_time,
            lifecycle_state: self.lifecycle_state,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct ReplicaWire {
    id: String,
    #[serde(alias = "boot-volume-id", alias = "block-volume-id")]
    volume_id: String,
    display_name: String,
    availability_domain: String,
    lifecycle_state: String,
}

/// Maps replica lifecycle spellings onto [`BackupState`].
pub(super) fn replica_state(value: &str) -> BackupState {
    match value.trim().to_ascii_uppercase().as_str() {
        "PROVISIONING" | "ACTIVATING" => BackupState::Creating,
        other => BackupState::from_api(other),
    }
}

impl From<ReplicaWire> for Replica {
    fn from(wire: ReplicaWire) -> Self {
        Self {
            lifecycle_state: replica_state(&wire.lifecycle_state),
            id: wire.id,
            volume_id: wire.volume_id,
            display_name: wire.display_name,
            availability_domain: wire.availability_domain,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct SubnetWire {
    id: String,
    cidr_block: String,
    #[serde(default)]
    availability_domain: Option<String>,
}

impl From<SubnetWire> for Subnet {
    fn from(wire: SubnetWire) -> Self {
        Self {
            id: wire.id,
            cidr_block: wire.cidr_block,
            availability_domain: wire.availability_domain,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PrivateIpWire {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct SubscriptionWire {
    region_name: String,
    status: String,
}

impl From<SubscriptionWire> for RegionSubscription {
    fn from(wire: SubscriptionWire) -> Self {
        Self {
            region_name: wire.region_name,
            status: wire.status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct PolicyWire {
    id: String,
    display_name: String,
    #[serde(default)]
    destination_region: Option<String>,
    #[serde(default)]
    schedules: Option<Vec<ScheduleWire>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ScheduleWire {
    backup_type: String,
    period: String,
    #[serde(default)]
    hour_of_day: Option<u8>,
    #[serde(default)]
    day_of_week: Option<String>,
    #[serde(default)]
    day_of_month: Option<u8>,
    #[serde(default)]
    month: Option<String>,
    #[serde(default)]
    offset_type: Option<String>,
    #[serde(default)]
    offset_seconds: Option<u64>,
    retention_seconds: u64,
    #[serde(default)]
    time_zone: Option<String>,
}

impl ScheduleWire {
    fn into_schedule(self) -> Result<Schedule, ScheduleValidationError> {
        Ok(Schedule {
            backup_type: self.backup_type.parse()?,
            period: self.period.parse()?,
            hour_of_day: self.hour_of_day.unwrap_or_default(),
            day_of_week: self
                .day_of_week
                .as_deref()
                .map(str::parse::<Weekday>)
                .transpose()?,
            day_of_month: self.day_of_month,
            month: self.month.as_deref().map(str::parse::<Month>).transpose()?,
            offset_type: self
                .offset_type
                .as_deref()
                .map(str::parse::<OffsetType>)
                .transpose()?,
            offset_seconds: self.offset_seconds,
            retention_seconds: self.retention_seconds,
            time_zone: self.time_zone,
        })
    }
}

impl PolicyWire {
    pub(super) fn into_policy(self) -> Result<BackupPolicy, ScheduleValidationError> {
        let schedules = self
            .schedules
            .unwrap_or_default()
            .into_iter()
            .map(ScheduleWire::into_schedule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BackupPolicy {
            id: self.id,
            display_name: self.display_name,
            destination_region: self.destination_region,
            schedules,
        })
    }
}

/// Schedule in the camelCase form accepted by `--schedules`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScheduleUpdate<'s> {
    backup_type: &'static str,
    period: &'static str,
    hour_of_day: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    day_of_week: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    day_of_month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    month: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset_seconds: Option<u64>,
    retention_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<&'s str>,
}

impl<'s> From<&'s Schedule> for ScheduleUpdate<'s> {
    fn from(schedule: &'s Schedule) -> Self {
        Self {
            backup_type: schedule.backup_type.as_str(),
            period: schedule.period.as_str(),
            hour_of_day: schedule.hour_of_day,
            day_of_week: schedule.day_of_week.map(|day| day.as_str()),
            day_of_month: schedule.day_of_month,
            month: schedule.month.map(|month| month.as_str()),
            offset_type: schedule.offset_type.map(|offset| offset.as_str()),
            offset_seconds: schedule.offset_seconds,
            retention_seconds: schedule.retention_seconds,
            time_zone: schedule.time_zone.as_deref(),
        }
    }
}

/// `--shape-config` payload for flexible shapes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ShapeConfigUpdate {
    ocpus: f64,
    #[serde(rename = "memoryInGBs")]
    memory_in_gbs: f64,
}

impl From<ShapeConfig> for ShapeConfigUpdate {
    fn from(config: ShapeConfig) -> Self {
        Self {
            ocpus: config.ocpus,
            memory_in_gbs: config.memory_in_gbs,
        }
    }
}

/// `--source-details` payload for volumes created from replicas.
#[derive(Debug, Serialize)]
pub(super) struct ReplicaSource<'s> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: &'s str,
}
