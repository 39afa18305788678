//! End-to-end classification scenarios driven through the consistency scanner.

#[path = "common/fake_cloud.rs"]
mod fake_cloud;

use drbridge::classify::VolumeSummary;
use drbridge::model::{AttachedVolumes, BackupState, VolumeKind};
use drbridge::{AggregateStatus, ConsistencyScanner, ReplicaHealth, ReplicationStatus};
use rstest::rstest;

use fake_cloud::{FakeCloud, PRIMARY, SECONDARY, backup, instance, regions, replica, volume};

fn add_copies(cloud: &FakeCloud, volume_id: &str, primary: u32, secondary: u32) {
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

#[rstest]
#[tokio::test]
async fn web01_with_a_lagging_block_volume_is_partially_synchronized() {
    let cloud = FakeCloud::new();
    cloud.add_instance(
        PRIMARY,
        instance("ocid1.instance.oc1..web01", "web01"),
        AttachedVolumes {
            boot: vec![volume("web01-boot", VolumeKind::Boot)],
            block: vec![volume("web01-data", VolumeKind::Block)],
        },
    );
    add_copies(&cloud, "web01-boot", 3, 3);
    add_copies(&cloud, "web01-data", 3, 2);
    let pair = regions();

    let report = ConsistencyScanner::new(&cloud, &pair)
        .backup_report("ocid1.instance.oc1..web01")
        .await
        .unwrap_or_else(|err| panic!("report should succeed: {err}"));

    assert_eq!(report.status, AggregateStatus::PartiallySynchronized);
    assert_eq!(report.total_backups, 6);
    let mismatched: Vec<&VolumeSummary> = report
        .volumes
        .iter()
        .filter(|summary| !summary.counts_match())
        .collect();
    assert_eq!(mismatched.len(), 1);
    assert_eq!(
        mismatched.first().map(|summary| summary.volume_id.as_str()),
        Some("web01-data")
    );
    let synchronized = report
        .items
        .iter()
        .filter(|item| item.status == ReplicationStatus::Synchronized)
        .count();
    assert_eq!(synchronized, 5);
}

#[rstest]
#[tokio::test]
async fn db02_without_primary_backups_is_not_enabled() {
    let cloud = FakeCloud::new();
    cloud.add_instance(
        PRIMARY,
        instance("ocid1.instance.oc1..db02", "db02"),
        AttachedVolumes {
            boot: vec![volume("db02-boot", VolumeKind::Boot)],
            block: Vec::new(),
        },
    );
    add_copies(&cloud, "db02-boot", 0, 4);
    let pair = regions();

    let report = ConsistencyScanner::new(&cloud, &pair)
        .backup_report("ocid1.instance.oc1..db02")
        .await
        .unwrap_or_else(|err| panic!("report should succeed: {err}"));

    assert_eq!(report.status, AggregateStatus::NotEnabled);
    assert_eq!(report.total_backups, 0);
    assert!(report.items.is_empty());
}

#[rstest]
#[tokio::test]
async fn matching_counts_everywhere_are_healthy() {
    let cloud = FakeCloud::new();
    cloud.add_instance(
        PRIMARY,
        instance("ocid1.instance.oc1..api03", "api03"),
        AttachedVolumes {
            boot: vec![volume("api03-boot", VolumeKind::Boot)],
            block: vec![volume("api03-data", VolumeKind::Block)],
        },
    );
    add_copies(&cloud, "api03-boot", 2, 2);
    add_copies(&cloud, "api03-data", 1, 1);
    let pair = regions();

    let report = ConsistencyScanner::new(&cloud, &pair)
        .backup_report("ocid1.instance.oc1..api03")
        .await
        .unwrap_or_else(|err| panic!("report should succeed: {err}"));

    assert_eq!(report.status, AggregateStatus::Healthy);
    assert_eq!(report.total_backups, 3);
}

#[rstest]
#[tokio::test]
async fn replica_report_covers_every_attached_volume() {
    let cloud = FakeCloud::new();
    cloud.add_instance(
        PRIMARY,
        instance("ocid1.instance.oc1..web01", "web01"),
        AttachedVolumes {
            boot: vec![volume("web01-boot", VolumeKind::Boot)],
            block: vec![
                volume("web01-data", VolumeKind::Block),
                volume("web01-logs", VolumeKind::Block),
            ],
        },
    );
    cloud.add_replica(SECONDARY, replica("r-boot", "web01-boot", BackupState::Available));
    cloud.add_replica(SECONDARY, replica("r-data", "web01-data", BackupState::Terminating));
    let pair = regions();

    let report = ConsistencyScanner::new(&cloud, &pair)
        .replica_report("ocid1.instance.oc1..web01")
        .await
        .unwrap_or_else(|err| panic!("report should succeed: {err}"));

    let health: Vec<&ReplicaHealth> = report.volumes.iter().map(|entry| &entry.health).collect();
    assert_eq!(
        health,
        vec![
            &ReplicaHealth::Healthy {
                replica_id: String::from("r-boot")
            },
            &ReplicaHealth::Unhealthy {
                replica_id: String::from("r-data"),
                state: BackupState::Terminating,
            },
            &ReplicaHealth::Missing,
        ]
    );
    assert!(!report.all_healthy());
}

#[rstest]
#[tokio::test]
async fn scanner_never_provisions() {
    let cloud = FakeCloud::new();
    cloud.add_instance(
        PRIMARY,
        instance("ocid1.instance.oc1..web01", "web01"),
        AttachedVolumes {
            boot: vec![volume("web01-boot", VolumeKind::Boot)],
            block: Vec::new(),
        },
    );
    add_copies(&cloud, "web01-boot", 1, 1);
    let pair = regions();
    let scanner = ConsistencyScanner::new(&cloud, &pair);

    scanner
        .backup_report("ocid1.instance.oc1..web01")
        .await
        .unwrap_or_else(|err| panic!("report should succeed: {err}"));
    scanner
        .replica_report("ocid1.instance.oc1..web01")
        .await
        .unwrap_or_else(|err| panic!("report should succeed: {err}"));

    assert_eq!(cloud.provisioning_calls(), 0);
    let backup_regions: Vec<String> = cloud
        .calls()
        .into_iter()
        .filter(|call| call.operation == "list_backups")
        .map(|call| call.region)
        .collect();
    assert_eq!(backup_regions, vec![PRIMARY, SECONDARY]);
}
