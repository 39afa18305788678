//! Collaborator interfaces consumed by the classifier, schedule manager, and
//! orchestrators.
//!
//! Every call names the region it targets through an explicit
//! [`RegionContext`]. Create and act operations return as soon as the
//! provider accepts the request; blocking until a terminal state is layered on
//! top by [`crate::wait`].

use std::future::Future;
use std::net::Ipv4Addr;
use std::pin::Pin;

use crate::model::{
    AttachedVolumes, Backup, ComputeInstance, InstanceAction, RegionSubscription, Replica,
    ShapeConfig, Subnet, Volume, VolumeAttachment, VolumeKind,
};
use crate::region::RegionContext;
use crate::schedule::{BackupPolicy, Schedule};

/// Future returned by provider operations.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Common supertrait fixing the provider's error type.
pub trait Provider {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;
}

/// Looks up instances and the volumes attached to them.
pub trait InventoryProvider: Provider {
    /// Fetches a single instance.
    fn get_instance<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error>;

    /// Lists boot and block volumes attached to `instance`, in provider order.
    fn list_attached_volumes<'a>(
        &'a self,
        region: &'a RegionContext,
        instance: &'a ComputeInstance,
    ) -> ProviderFuture<'a, AttachedVolumes, Self::Error>;

    /// Lists non-terminated instances named `display_name` in a compartment.
    fn find_instances_by_name<'a>(
        &'a self,
        region: &'a RegionContext,
        compartment_id: &'a str,
        display_name: &'a str,
    ) -> ProviderFuture<'a, Vec<ComputeInstance>, Self::Error>;
}

/// Lists backups and replicas of a volume.
pub trait BackupStore: Provider {
    /// Lists backups of `volume` held in `region`.
    fn list_backups<'a>(
        &'a self,
        region: &'a RegionContext,
        volume: &'a Volume,
    ) -> ProviderFuture<'a, Vec<Backup>, Self::Error>;

    /// Lists replicas of `volume` held in `region`.
    fn list_replicas<'a>(
        &'a self,
        region: &'a RegionContext,
        volume: &'a Volume,
    ) -> ProviderFuture<'a, Vec<Replica>, Self::Error>;
}

/// Network and tenancy lookups used during pre-flight validation.
pub trait NetworkDirectory: Provider {
    /// Fetches subnet metadata.
    fn get_subnet<'a>(
        &'a self,
        region: &'a RegionContext,
        subnet_id: &'a str,
    ) -> ProviderFuture<'a, Subnet, Self::Error>;

    /// Returns the identifier of the private IP object holding `address` in
    /// the subnet, if any.
    fn find_private_ip<'a>(
        &'a self,
        region: &'a RegionContext,
        subnet_id: &'a str,
        address: Ipv4Addr,
    ) -> ProviderFuture<'a, Option<String>, Self::Error>;

    /// Lists the tenancy's region subscriptions.
    fn list_region_subscriptions<'a>(
        &'a self,
        region: &'a RegionContext,
    ) -> ProviderFuture<'a, Vec<RegionSubscription>, Self::Error>;
}

/// Where a new volume's contents come from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VolumeSource {
    /// Point-in-time backup identifier.
    Backup(String),
    /// Live replica identifier.
    Replica(String),
}

/// Parameters for creating a volume from a backup or replica.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeCreateRequest {
    /// Boot or block.
    pub kind: VolumeKind,
    /// Content source.
    pub source: VolumeSource,
    /// Display name for the new volume.
    pub display_name: String,
    /// Target availability domain.
    pub availability_domain: String,
    /// Target compartment.
    pub compartment_id: String,
}

/// Parameters for launching an instance from an existing boot volume.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchRequest {
    /// Display name of the new instance.
    pub display_name: String,
    /// Target compartment.
    pub compartment_id: String,
    /// Target availability domain.
    pub availability_domain: String,
    /// Shape copied from the source instance.
    pub shape: String,
    /// CPU/memory for flexible shapes.
    pub shape_config: Option<ShapeConfig>,
    /// Subnet for the primary VNIC.
    pub subnet_id: String,
    /// Private address for the primary VNIC.
    pub private_ip: Ipv4Addr,
    /// Boot volume the instance starts from.
    pub boot_volume_id: String,
}

/// Create, launch, attach, and power operations.
pub trait ProvisioningApi: InventoryProvider {
    /// Requests a new volume; returns the descriptor as first reported.
    fn create_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        request: &'a VolumeCreateRequest,
    ) -> ProviderFuture<'a, Volume, Self::Error>;

    /// Fetches a volume by kind and identifier.
    fn get_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        kind: VolumeKind,
        volume_id: &'a str,
    ) -> ProviderFuture<'a, Volume, Self::Error>;

    /// Requests a new instance.
    fn launch_instance<'a>(
        &'a self,
        region: &'a RegionContext,
        request: &'a LaunchRequest,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error>;

    /// Requests a paravirtualized attachment of a block volume.
    fn attach_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
        volume_id: &'a str,
    ) -> ProviderFuture<'a, VolumeAttachment, Self::Error>;

    /// Fetches an attachment.
    fn get_attachment<'a>(
        &'a self,
        region: &'a RegionContext,
        attachment_id: &'a str,
    ) -> ProviderFuture<'a, VolumeAttachment, Self::Error>;

    /// Requests a power action.
    fn instance_action<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
        action: InstanceAction,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error>;
}

/// Reads and replaces the schedule list of a backup policy.
pub trait PolicyStore: Provider {
    /// Fetches a policy with its current schedules.
    fn get_policy<'a>(
        &'a self,
        region: &'a RegionContext,
        policy_id: &'a str,
    ) -> ProviderFuture<'a, BackupPolicy, Self::Error>;

    /// Replaces the whole schedule list and returns the updated policy.
    fn replace_schedules<'a>(
        &'a self,
        region: &'a RegionContext,
        policy_id: &'a str,
        schedules: &'a [Schedule],
    ) -> ProviderFuture<'a, BackupPolicy, Self::Error>;
}
