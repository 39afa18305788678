//! Core library for the `drbridge` disaster-recovery tool.
//!
//! The crate checks whether an OCI compute instance's volume backups have
//! been copied to a secondary region, manages the schedules of the backup
//! policies producing them, and rebuilds the instance in the secondary
//! region either from its newest backups or from live volume replicas.
//! Cloud access goes through the provider traits in [`provider`]; the
//! [`oci`] module implements them on top of the `oci` command line.

pub mod classify;
pub mod command;
pub mod config;
pub mod model;
pub mod oci;
pub mod orchestrate;
pub mod provider;
pub mod region;
pub mod schedule;
pub mod test_support;
pub mod wait;

pub use classify::{
    AggregateStatus, ConsistencyScanner, InstanceReport, ReplicaHealth, ReplicaReport,
    ReplicationStatus, classify_instance, classify_item,
};
pub use command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use config::{ConfigError, DrConfig};
pub use oci::{OciCli, OciCliConfig, OciCliError};
pub use orchestrate::{
    CloneOrchestrator, ErrorKind, OrchestrationError, OrchestrationOutcome, RestoreOrchestrator,
    Stage, TargetPlacement,
};
pub use provider::{
    BackupStore, InventoryProvider, NetworkDirectory, PolicyStore, Provider, ProviderFuture,
    ProvisioningApi,
};
pub use region::{RegionContext, RegionPair, RegionRole};
pub use schedule::{BackupPolicy, RemoveOutcome, ScheduleManager};
pub use wait::{WaitError, WaitPolicies, WaitPolicy};
