//! Shared fixtures and helpers for disaster recovery BDD scenarios.

use std::net::Ipv4Addr;
use std::sync::Arc;

use drbridge::model::{AttachedVolumes, BackupState, VolumeKind};
use drbridge::{AggregateStatus, Stage, TargetPlacement};
use rstest::fixture;

use crate::fake_cloud::{
    COMPARTMENT, DR_SUBNET, FakeCloud, PRIMARY, SECONDARY, backup, instance, volume,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DrOutcome {
    Report {
        status: AggregateStatus,
        total_backups: usize,
    },
    Failed(Stage),
    Restored,
}

#[derive(Clone, Debug)]
pub struct DrContext {
    pub cloud: Arc<FakeCloud>,
    pub outcome: Option<DrOutcome>,
}

#[fixture]
pub fn dr_context() -> DrContext {
    let cloud = FakeCloud::new();
    cloud.add_subnet(SECONDARY, DR_SUBNET, "10.0.1.0/24");
    DrContext {
        cloud: Arc::new(cloud),
        outcome: None,
    }
}

pub fn instance_id(name: &str) -> String {
    format!("ocid1.instance.oc1..{name}")
}

/// Registers `name` with `<name>-boot` and `<name>-data-<n>` volumes.
pub fn add_instance(cloud: &FakeCloud, name: &str, blocks: u32) {
    let block = (1..=blocks)
        .map(|ordinal| volume(&format!("{name}-data-{ordinal}"), VolumeKind::Block))
        .collect();
    cloud.add_instance(
        PRIMARY,
        instance(&instance_id(name), name),
        AttachedVolumes {
            boot: vec![volume(&format!("{name}-boot"), VolumeKind::Boot)],
            block,
        },
    );
}

/// Adds `primary` backups and `secondary` cross-region copies of `volume_id`.
pub fn add_copies(cloud: &FakeCloud, volume_id: &str, primary: u32, secondary: u32) {
    for hour in 1..=primary {
        cloud.add_backup(
            PRIMARY,
            backup(volume_id, &format!("{volume_id}-{hour}"), BackupState::Available, hour),
        );
    }
    for hour in 1..=secondary {
        cloud.add_backup(
            SECONDARY,
            backup(
                volume_id,
                &format!("Copy of {volume_id}-{hour}"),
                BackupState::Available,
                hour,
            ),
        );
    }
}

pub fn placement(name: &str) -> TargetPlacement {
    TargetPlacement::builder()
        .display_name(format!("{name}-dr"))
        .compartment_id(COMPARTMENT)
        .availability_domain("AD-2")
        .subnet_id(DR_SUBNET)
        .private_ip(Ipv4Addr::new(10, 0, 1, 40))
        .build()
        .unwrap_or_else(|err| panic!("valid placement: {err}"))
}
