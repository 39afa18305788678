//! Per-volume replica health.

use std::fmt;

use serde::Serialize;

use crate::model::{BackupState, Replica, Volume, VolumeKind};

/// Health of the replica backing one volume.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicaHealth {
    /// A replica exists and is neither faulty nor terminating.
    Healthy {
        /// Replica identifier.
        replica_id: String,
    },
    /// No replica exists for the volume.
    Missing,
    /// Replicas exist but none is usable.
    Unhealthy {
        /// Identifier of the first replica found.
        replica_id: String,
        /// Its lifecycle state.
        state: BackupState,
    },
}

impl ReplicaHealth {
    /// Returns the replica identifier when the replica is usable.
    #[must_use]
    pub fn healthy_replica(&self) -> Option<&str> {
        match self {
            Self::Healthy { replica_id } => Some(replica_id.as_str()),
            Self::Missing | Self::Unhealthy { .. } => None,
        }
    }
}

impl fmt::Display for ReplicaHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy { replica_id } => write!(f, "HEALTHY ({replica_id})"),
            Self::Missing => f.write_str("MISSING"),
            Self::Unhealthy { replica_id, state } => {
                write!(f, "UNHEALTHY ({replica_id} is {state})")
            }
        }
    }
}

/// Replica health of one attached volume.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VolumeReplicaHealth {
    /// Volume identifier.
    pub volume_id: String,
    /// Volume display name.
    pub volume_name: String,
    /// Boot or block.
    pub volume_kind: VolumeKind,
    /// Health verdict.
    pub health: ReplicaHealth,
}

/// Replica health of every volume attached to an instance.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ReplicaReport {
    /// Instance identifier.
    pub instance_id: String,
    /// Instance display name.
    pub instance_name: String,
    /// Boot volumes first, then block volumes in inventory order.
    pub volumes: Vec<VolumeReplicaHealth>,
}

impl ReplicaReport {
    /// Whether every volume has a usable replica.
    #[must_use]
    pub fn all_healthy(&self) -> bool {
        self.volumes
            .iter()
            .all(|volume| volume.health.healthy_replica().is_some())
    }
}

/// Picks the replica of `volume` out of a regional listing.
///
/// A usable replica wins over unusable ones; among equals the listing order
/// decides.
#[must_use]
pub fn replica_health(volume: &Volume, replicas: &[Replica]) -> ReplicaHealth {
    let mut owned = replicas
        .iter()
        .filter(|replica| replica.volume_id == volume.id)
        .peekable();
    let Some(first) = owned.peek().copied() else {
        return ReplicaHealth::Missing;
    };
    if let Some(healthy) = owned.find(|replica| replica.is_healthy()) {
        return ReplicaHealth::Healthy {
            replica_id: healthy.id.clone(),
        };
    }
    ReplicaHealth::Unhealthy {
        replica_id: first.id.clone(),
        state: first.lifecycle_state,
    }
}
