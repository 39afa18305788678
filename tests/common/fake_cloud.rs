//! In-memory cloud double implementing every provider trait.
//!
//! Resources are keyed by region so tests can assert that reads and writes
//! hit the region they were meant for. Created resources report a
//! transitional state first and settle on the next read. A soft reset
//! reports `RUNNING` at once and then walks through `STOPPING` before it is
//! `RUNNING` again.

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use drbridge::model::{
    AttachedVolumes, AttachmentState, Backup, BackupState, ComputeInstance, InstanceAction,
    InstanceState, RegionSubscription, Replica, ShapeConfig, Subnet, Volume, VolumeAttachment,
    VolumeKind, VolumeState,
};
use drbridge::provider::{LaunchRequest, VolumeCreateRequest};
use drbridge::schedule::{BackupPolicy, Schedule};
use drbridge::{
    BackupStore, InventoryProvider, NetworkDirectory, PolicyStore, Provider, ProviderFuture,
    ProvisioningApi, RegionContext, RegionPair, WaitPolicies, WaitPolicy,
};
use thiserror::Error;

pub const PRIMARY: &str = "eu-frankfurt-1";
pub const SECONDARY: &str = "eu-amsterdam-1";
pub const COMPARTMENT: &str = "ocid1.compartment.oc1..prod";
pub const DR_SUBNET: &str = "ocid1.subnet.oc1..dr";

/// Errors raised by [`FakeCloud`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FakeError {
    #[error("{kind} {id} not found in {region}")]
    NotFound {
        kind: &'static str,
        id: String,
        region: String,
    },
    #[error("{0} rejected by fake cloud")]
    Rejected(String),
}

/// A call made against the fake, with the region it targeted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Call {
    pub operation: &'static str,
    pub region: String,
}

#[derive(Debug, Default)]
struct State {
    instances: Vec<(String, ComputeInstance)>,
    attached: HashMap<String, AttachedVolumes>,
    backups: HashMap<(String, String), Vec<Backup>>,
    replicas: HashMap<(String, String), Vec<Replica>>,
    subnets: HashMap<(String, String), Subnet>,
    private_ips: Vec<(String, Ipv4Addr)>,
    subscriptions: Vec<RegionSubscription>,
    volumes: HashMap<String, Volume>,
    attachments: HashMap<String, VolumeAttachment>,
    policies: HashMap<String, BackupPolicy>,
    volume_settles_as: Option<VolumeState>,
    volume_failures: HashMap<usize, VolumeState>,
    instance_settles_as: Option<InstanceState>,
    action_settles_as: Vec<(InstanceAction, InstanceState)>,
    instance_transitions: HashMap<String, VecDeque<InstanceState>>,
    rejected_action: Option<InstanceAction>,
    created: Vec<VolumeCreateRequest>,
    launches: Vec<LaunchRequest>,
    actions: Vec<InstanceAction>,
    schedule_writes: Vec<Vec<Schedule>>,
    calls: Vec<Call>,
    next_id: u32,
}

impl State {
    fn record(&mut self, operation: &'static str, region: &RegionContext) {
        self.calls.push(Call {
            operation,
            region: region.name().to_owned(),
        });
    }

    fn new_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("ocid1.{kind}.oc1..fake{}", self.next_id)
    }
}

/// Scriptable in-memory provider.
#[derive(Debug, Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

fn not_found(kind: &'static str, id: &str, region: &RegionContext) -> FakeError {
    FakeError::NotFound {
        kind,
        id: id.to_owned(),
        region: region.name().to_owned(),
    }
}

impl FakeCloud {
    /// Empty cloud where both test regions are subscribed.
    pub fn new() -> Self {
        let cloud = Self::default();
        cloud.subscribe(PRIMARY, "READY");
        cloud.subscribe(SECONDARY, "READY");
        cloud
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|err| panic!("fake cloud lock poisoned: {err}"))
    }

    pub fn add_instance(&self, region: &str, instance: ComputeInstance, attached: AttachedVolumes) {
        let mut state = self.lock();
        state.attached.insert(instance.id.clone(), attached);
        state.instances.push((region.to_owned(), instance));
    }

    pub fn add_backup(&self, region: &str, backup: Backup) {
        self.lock()
            .backups
            .entry((region.to_owned(), backup.volume_id.clone()))
            .or_default()
            .push(backup);
    }

    pub fn add_replica(&self, region: &str, replica: Replica) {
        self.lock()
            .replicas
            .entry((region.to_owned(), replica.volume_id.clone()))
            .or_default()
            .push(replica);
    }

    pub fn add_subnet(&self, region: &str, id: &str, cidr_block: &str) {
        self.lock().subnets.insert(
            (region.to_owned(), id.to_owned()),
            Subnet {
                id: id.to_owned(),
                cidr_block: cidr_block.to_owned(),
                availability_domain: None,
            },
        );
    }

    pub fn mark_ip_used(&self, subnet_id: &str, address: Ipv4Addr) {
        self.lock()
            .private_ips
            .push((subnet_id.to_owned(), address));
    }

    pub fn subscribe(&self, region: &str, status: &str) {
        let mut state = self.lock();
        state
            .subscriptions
            .retain(|subscription| subscription.region_name != region);
        state.subscriptions.push(RegionSubscription {
            region_name: region.to_owned(),
            status: status.to_owned(),
        });
    }

    pub fn unsubscribe(&self, region: &str) {
        self.lock()
            .subscriptions
            .retain(|subscription| subscription.region_name != region);
    }

    pub fn add_policy(&self, policy: BackupPolicy) {
        self.lock().policies.insert(policy.id.clone(), policy);
    }

    /// New volumes settle in `state` instead of `AVAILABLE`.
    pub fn volumes_settle_as(&self, state: VolumeState) {
        self.lock().volume_settles_as = Some(state);
    }

    /// The `ordinal`-th created volume (counting from 1) settles in `state`.
    pub fn fail_volume(&self, ordinal: usize, state: VolumeState) {
        self.lock().volume_failures.insert(ordinal, state);
    }

    /// Launched instances settle in `state` instead of `RUNNING`.
    pub fn instances_settle_as(&self, state: InstanceState) {
        self.lock().instance_settles_as = Some(state);
    }

    /// Instances settle in `state` after `action` instead of its usual
    /// target.
    pub fn action_settles_as(&self, action: InstanceAction, state: InstanceState) {
        self.lock().action_settles_as.push((action, state));
    }

    /// Rejects every request for `action`.
    pub fn reject_action(&self, action: InstanceAction) {
        self.lock().rejected_action = Some(action);
    }

    pub fn created_volumes(&self) -> Vec<VolumeCreateRequest> {
        self.lock().created.clone()
    }

    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.lock().launches.clone()
    }

    pub fn actions(&self) -> Vec<InstanceAction> {
        self.lock().actions.clone()
    }

    pub fn schedule_writes(&self) -> Vec<Vec<Schedule>> {
        self.lock().schedule_writes.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of create, launch, attach, and power requests made so far.
    pub fn provisioning_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(
                    call.operation,
                    "create_volume" | "launch_instance" | "attach_volume" | "instance_action"
                )
            })
            .count()
    }
}

impl Provider for FakeCloud {
    type Error = FakeError;
}

impl InventoryProvider for FakeCloud {
    fn get_instance<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("get_instance", region);
            let next = state
                .instance_transitions
                .get_mut(instance_id)
                .and_then(VecDeque::pop_front);
            state
                .instances
                .iter_mut()
                .find(|(name, instance)| name == region.name() && instance.id == instance_id)
                .map(|(_, instance)| {
                    if let Some(next_state) = next {
                        instance.lifecycle_state = next_state;
                    }
                    instance.clone()
                })
                .ok_or_else(|| not_found("instance", instance_id, region))
        })
    }

    fn list_attached_volumes<'a>(
        &'a self,
        region: &'a RegionContext,
        instance: &'a ComputeInstance,
    ) -> ProviderFuture<'a, AttachedVolumes, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("list_attached_volumes", region);
            Ok(state
                .attached
                .get(&instance.id)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn find_instances_by_name<'a>(
        &'a self,
        region: &'a RegionContext,
        compartment_id: &'a str,
        display_name: &'a str,
    ) -> ProviderFuture<'a, Vec<ComputeInstance>, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("find_instances_by_name", region);
            Ok(state
                .instances
                .iter()
                .filter(|(name, instance)| {
                    name == region.name()
                        && instance.compartment_id == compartment_id
                        && instance.display_name == display_name
                })
                .map(|(_, instance)| instance.clone())
                .collect())
        })
    }
}

impl BackupStore for FakeCloud {
    fn list_backups<'a>(
        &'a self,
        region: &'a RegionContext,
        volume: &'a Volume,
    ) -> ProviderFuture<'a, Vec<Backup>, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("list_backups", region);
            Ok(state
                .backups
                .get(&(region.name().to_owned(), volume.id.clone()))
                .cloned()
                .unwrap_or_default())
        })
    }

    fn list_replicas<'a>(
        &'a self,
        region: &'a RegionContext,
        volume: &'a Volume,
    ) -> ProviderFuture<'a, Vec<Replica>, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("list_replicas", region);
            Ok(state
                .replicas
                .get(&(region.name().to_owned(), volume.id.clone()))
                .cloned()
                .unwrap_or_default())
        })
    }
}

impl NetworkDirectory for FakeCloud {
    fn get_subnet<'a>(
        &'a self,
        region: &'a RegionContext,
        subnet_id: &'a str,
    ) -> ProviderFuture<'a, Subnet, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("get_subnet", region);
            state
                .subnets
                .get(&(region.name().to_owned(), subnet_id.to_owned()))
                .cloned()
                .ok_or_else(|| not_found("subnet", subnet_id, region))
        })
    }

    fn find_private_ip<'a>(
        &'a self,
        region: &'a RegionContext,
        subnet_id: &'a str,
        address: Ipv4Addr,
    ) -> ProviderFuture<'a, Option<String>, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("find_private_ip", region);
            Ok(state
                .private_ips
                .iter()
                .find(|(subnet, used)| subnet == subnet_id && *used == address)
                .map(|(_, used)| format!("ocid1.privateip.oc1..{used}")))
        })
    }

    fn list_region_subscriptions<'a>(
        &'a self,
        region: &'a RegionContext,
    ) -> ProviderFuture<'a, Vec<RegionSubscription>, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("list_region_subscriptions", region);
            Ok(state.subscriptions.clone())
        })
    }
}

impl ProvisioningApi for FakeCloud {
    fn create_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        request: &'a VolumeCreateRequest,
    ) -> ProviderFuture<'a, Volume, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("create_volume", region);
            state.created.push(request.clone());
            let id = state.new_id(match request.kind {
                VolumeKind::Boot => "bootvolume",
                VolumeKind::Block => "volume",
            });
            let ordinal = state.created.len();
            let settled = state
                .volume_failures
                .get(&ordinal)
                .copied()
                .or(state.volume_settles_as)
                .unwrap_or(VolumeState::Available);
            let volume = Volume {
                id: id.clone(),
                kind: request.kind,
                display_name: request.display_name.clone(),
                size_in_gbs: 50,
                availability_domain: request.availability_domain.clone(),
                compartment_id: request.compartment_id.clone(),
                lifecycle_state: settled,
                replica_ids: Vec::new(),
            };
            state.volumes.insert(id, volume.clone());
            Ok(Volume {
                lifecycle_state: VolumeState::Provisioning,
                ..volume
            })
        })
    }

    fn get_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        _kind: VolumeKind,
        volume_id: &'a str,
    ) -> ProviderFuture<'a, Volume, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("get_volume", region);
            state
                .volumes
                .get(volume_id)
                .cloned()
                .ok_or_else(|| not_found("volume", volume_id, region))
        })
    }

    fn launch_instance<'a>(
        &'a self,
        region: &'a RegionContext,
        request: &'a LaunchRequest,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("launch_instance", region);
            state.launches.push(request.clone());
            let instance = ComputeInstance {
                id: state.new_id("instance"),
                display_name: request.display_name.clone(),
                shape: request.shape.clone(),
                shape_config: request.shape_config,
                lifecycle_state: state.instance_settles_as.unwrap_or(InstanceState::Running),
                availability_domain: request.availability_domain.clone(),
                compartment_id: request.compartment_id.clone(),
            };
            state
                .instances
                .push((region.name().to_owned(), instance.clone()));
            Ok(ComputeInstance {
                lifecycle_state: InstanceState::Provisioning,
                ..instance
            })
        })
    }

    fn attach_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
        volume_id: &'a str,
    ) -> ProviderFuture<'a, VolumeAttachment, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("attach_volume", region);
            let attachment = VolumeAttachment {
                id: state.new_id("volumeattachment"),
                instance_id: instance_id.to_owned(),
                volume_id: volume_id.to_owned(),
                lifecycle_state: AttachmentState::Attached,
            };
            state
                .attachments
                .insert(attachment.id.clone(), attachment.clone());
            Ok(VolumeAttachment {
                lifecycle_state: AttachmentState::Attaching,
                ..attachment
            })
        })
    }

    fn get_attachment<'a>(
        &'a self,
        region: &'a RegionContext,
        attachment_id: &'a str,
    ) -> ProviderFuture<'a, VolumeAttachment, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("get_attachment", region);
            state
                .attachments
                .get(attachment_id)
                .cloned()
                .ok_or_else(|| not_found("attachment", attachment_id, region))
        })
    }

    fn instance_action<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
        action: InstanceAction,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("instance_action", region);
            state.actions.push(action);
            if state.rejected_action == Some(action) {
                return Err(FakeError::Rejected(format!("{action} on {instance_id}")));
            }
            let (usual, reported) = match action {
                InstanceAction::SoftStop => (InstanceState::Stopped, InstanceState::Stopping),
                InstanceAction::Start => (InstanceState::Running, InstanceState::Starting),
                InstanceAction::SoftReset => (InstanceState::Running, InstanceState::Running),
            };
            let settled = state
                .action_settles_as
                .iter()
                .find(|(scripted, _)| *scripted == action)
                .map_or(usual, |(_, settled)| *settled);
            if action == InstanceAction::SoftReset {
                state.instance_transitions.insert(
                    instance_id.to_owned(),
                    VecDeque::from([InstanceState::Stopping, settled]),
                );
            }
            let instance = state
                .instances
                .iter_mut()
                .find(|(name, instance)| name == region.name() && instance.id == instance_id)
                .map(|(_, instance)| {
                    instance.lifecycle_state = settled;
                    instance.clone()
                })
                .ok_or_else(|| not_found("instance", instance_id, region))?;
            Ok(ComputeInstance {
                lifecycle_state: reported,
                ..instance
            })
        })
    }
}

impl PolicyStore for FakeCloud {
    fn get_policy<'a>(
        &'a self,
        region: &'a RegionContext,
        policy_id: &'a str,
    ) -> ProviderFuture<'a, BackupPolicy, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("get_policy", region);
            state
                .policies
                .get(policy_id)
                .cloned()
                .ok_or_else(|| not_found("policy", policy_id, region))
        })
    }

    fn replace_schedules<'a>(
        &'a self,
        region: &'a RegionContext,
        policy_id: &'a str,
        schedules: &'a [Schedule],
    ) -> ProviderFuture<'a, BackupPolicy, Self::Error> {
        Box::pin(async move {
            let mut state = self.lock();
            state.record("replace_schedules", region);
            state.schedule_writes.push(schedules.to_vec());
            let policy = state
                .policies
                .get_mut(policy_id)
                .ok_or_else(|| not_found("policy", policy_id, region))?;
            policy.schedules = schedules.to_vec();
            Ok(policy.clone())
        })
    }
}

pub fn regions() -> RegionPair {
    RegionPair::new(PRIMARY, SECONDARY)
}

pub fn fast_policies() -> WaitPolicies {
    let policy = WaitPolicy::new(Duration::from_millis(1), Duration::from_secs(2));
    WaitPolicies {
        volume: policy,
        instance: policy,
        attachment: policy,
    }
}

pub fn instance(id: &str, name: &str) -> ComputeInstance {
    ComputeInstance {
        id: id.to_owned(),
        display_name: name.to_owned(),
        shape: String::from("VM.Standard.E4.Flex"),
        shape_config: Some(ShapeConfig {
            ocpus: 2.0,
            memory_in_gbs: 32.0,
        }),
        lifecycle_state: InstanceState::Running,
        availability_domain: String::from("AD-1"),
        compartment_id: COMPARTMENT.to_owned(),
    }
}

pub fn volume(id: &str, kind: VolumeKind) -> Volume {
    Volume {
        id: id.to_owned(),
        kind,
        display_name: format!("{id}-disk"),
        size_in_gbs: 50,
        availability_domain: String::from("AD-1"),
        compartment_id: COMPARTMENT.to_owned(),
        lifecycle_state: VolumeState::Available,
        replica_ids: Vec::new(),
    }
}

/// Backup taken on 1 May 2024 at `hour`.
pub fn backup(volume_id: &str, name: &str, state: BackupState, hour: u32) -> Backup {
    Backup {
        id: format!("ocid1.backup.oc1..{name}"),
        volume_id: volume_id.to_owned(),
        display_name: name.to_owned(),
        time_created: Utc
            .with_ymd_and_hms(2024, 5, 1, hour, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("valid timestamp")),
        expiration_time: None,
        lifecycle_state: state,
    }
}

pub fn replica(id: &str, volume_id: &str, state: BackupState) -> Replica {
    Replica {
        id: id.to_owned(),
        volume_id: volume_id.to_owned(),
        display_name: format!("{volume_id}-replica"),
        availability_domain: String::from("AD-2"),
        lifecycle_state: state,
    }
}
