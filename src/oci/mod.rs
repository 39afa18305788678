//! Provider implementation backed by the `oci` command line.
//!
//! Every call shells out through a [`CommandRunner`], passing the target region
//! explicitly, and parses the JSON the CLI prints. Authentication, profiles,
//! and session tokens stay with the CLI's own configuration.

mod error;
mod types;

use std::ffi::OsString;
use std::net::Ipv4Addr;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use error::OciCliError;
use types::{
    AttachmentWire, BackupWire, Envelope, InstanceWire, PolicyWire, PrivateIpWire, ReplicaSource,
    ReplicaWire, ScheduleUpdate, ShapeConfigUpdate, SubnetWire, SubscriptionWire, VolumeWire,
};

use crate::command::{CommandOutput, CommandRunner, ProcessCommandRunner, render_command_line};
use crate::model::{
    AttachedVolumes, AttachmentState, Backup, ComputeInstance, InstanceAction, InstanceState,
    RegionSubscription, Replica, Subnet, Volume, VolumeAttachment, VolumeKind,
};
use crate::provider::{
    BackupStore, InventoryProvider, LaunchRequest, NetworkDirectory, PolicyStore, Provider,
    ProviderFuture, ProvisioningApi, VolumeCreateRequest, VolumeSource,
};
use crate::region::RegionContext;
use crate::schedule::{BackupPolicy, Schedule};

/// Default OCI CLI binary name.
pub const DEFAULT_OCI_BIN: &str = "oci";

/// Settings for invoking the `oci` CLI.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OciCliConfig {
    /// Path to the `oci` binary.
    pub oci_bin: String,
    /// Tenancy used for region subscription lookups.
    pub tenancy_id: String,
    /// Profile in the CLI configuration file.
    pub profile: Option<String>,
    /// Alternative CLI configuration file.
    pub config_file: Option<String>,
}

impl OciCliConfig {
    /// Constructs a config, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`OciCliError::InvalidConfig`] when a required field is blank.
    pub fn new(
        oci_bin: impl Into<String>,
        tenancy_id: impl Into<String>,
    ) -> Result<Self, OciCliError> {
        let trimmed_bin = oci_bin.into().trim().to_owned();
        let trimmed_tenancy = tenancy_id.into().trim().to_owned();
        if trimmed_bin.is_empty() {
            return Err(OciCliError::InvalidConfig {
                field: String::from("oci_bin"),
            });
        }
        if trimmed_tenancy.is_empty() {
            return Err(OciCliError::InvalidConfig {
                field: String::from("tenancy_id"),
            });
        }
        Ok(Self {
            oci_bin: trimmed_bin,
            tenancy_id: trimmed_tenancy,
            profile: None,
            config_file: None,
        })
    }

    /// Selects a CLI profile; blank values are ignored.
    #[must_use]
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = non_blank(profile);
        self
    }

    /// Selects a CLI configuration file; blank values are ignored.
    #[must_use]
    pub fn with_config_file(mut self, config_file: Option<String>) -> Self {
        self.config_file = non_blank(config_file);
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// Provider that shells out to `oci`.
#[derive(Clone, Debug)]
pub struct OciCli<R: CommandRunner> {
    config: OciCliConfig,
    runner: R,
}

impl OciCli<ProcessCommandRunner> {
    /// Creates a provider wired to the real process runner.
    #[must_use]
    pub const fn with_process_runner(config: OciCliConfig) -> Self {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> OciCli<R> {
    /// Creates a provider using the given runner.
    #[must_use]
    pub const fn new(config: OciCliConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &OciCliConfig {
        &self.config
    }

    /// Builds `oci [globals] --region <region> <path...>`.
    fn command(&self, region: &RegionContext, path: &[&str]) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(config_file) = &self.config.config_file {
            args.push(OsString::from("--config-file"));
            args.push(OsString::from(config_file));
        }
        if let Some(profile) = &self.config.profile {
            args.push(OsString::from("--profile"));
            args.push(OsString::from(profile));
        }
        args.push(OsString::from("--region"));
        args.push(OsString::from(region.name()));
        args.extend(path.iter().map(OsString::from));
        args
    }

    /// Checks command output and converts failure to `OciCliError`.
    fn check_output(&self, output: CommandOutput, resource: &str) -> Result<String, OciCliError> {
        if output.is_success() {
            return Ok(output.stdout);
        }
        Err(OciCliError::CommandFailure {
            program: self.config.oci_bin.clone(),
            status: output.code,
            status_text: output.status_text(),
            stderr: format!("{resource}: {}", output.stderr.trim()),
        })
    }

    fn run_oci(&self, args: &[OsString], resource: &str) -> Result<String, OciCliError> {
        debug!(
            command = %render_command_line(&self.config.oci_bin, args),
            "running oci"
        );
        let output = self.runner.run(&self.config.oci_bin, args)?;
        self.check_output(output, resource)
    }

    /// Runs a command that prints a single resource.
    fn fetch<T>(&self, args: &[OsString], resource: &str) -> Result<T, OciCliError>
    where
        T: DeserializeOwned,
    {
        let stdout = self.run_oci(args, resource)?;
        parse_envelope(&stdout, resource)
    }

    /// Runs a list command; empty output means no items.
    fn list<T>(&self, args: &[OsString], resource: &str) -> Result<Vec<T>, OciCliError>
    where
        T: DeserializeOwned,
    {
        let stdout = self.run_oci(args, resource)?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        parse_envelope(&stdout, resource)
    }

    fn instance(
        &self,
        region: &RegionContext,
        instance_id: &str,
    ) -> Result<ComputeInstance, OciCliError> {
        let mut args = self.command(region, &["compute", "instance", "get"]);
        push_flag(&mut args, "--instance-id", instance_id);
        self.fetch::<InstanceWire>(&args, "instance")
            .map(ComputeInstance::from)
    }

    fn attached_volumes(
        &self,
        region: &RegionContext,
        instance: &ComputeInstance,
    ) -> Result<AttachedVolumes, OciCliError> {
        let mut boot_args = self.command(region, &["compute", "boot-volume-attachment", "list"]);
        push_flag(&mut boot_args, "--availability-domain", &instance.availability_domain);
        push_flag(&mut boot_args, "--compartment-id", &instance.compartment_id);
        push_flag(&mut boot_args, "--instance-id", &instance.id);
        boot_args.push(OsString::from("--all"));
        let boot = self
            .list::<AttachmentWire>(&boot_args, "boot-volume-attachment")?
            .into_iter()
            .filter(|attachment| attachment.lifecycle_state == AttachmentState::Attached)
            .map(|attachment| self.volume(region, VolumeKind::Boot, &attachment.volume_id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut block_args = self.command(region, &["compute", "volume-attachment", "list"]);
        push_flag(&mut block_args, "--compartment-id", &instance.compartment_id);
        push_flag(&mut block_args, "--instance-id", &instance.id);
        block_args.push(OsString::from("--all"));
        let block = self
            .list::<AttachmentWire>(&block_args, "volume-attachment")?
            .into_iter()
            .filter(|attachment| attachment.lifecycle_state == AttachmentState::Attached)
            .map(|attachment| self.volume(region, VolumeKind::Block, &attachment.volume_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AttachedVolumes { boot, block })
    }

    fn instances_named(
        &self,
        region: &RegionContext,
        compartment_id: &str,
        display_name: &str,
    ) -> Result<Vec<ComputeInstance>, OciCliError> {
        let mut args = self.command(region, &["compute", "instance", "list"]);
        push_flag(&mut args, "--compartment-id", compartment_id);
        push_flag(&mut args, "--display-name", display_name);
        args.push(OsString::from("--all"));
        Ok(self
            .list::<InstanceWire>(&args, "instance")?
            .into_iter()
            .map(ComputeInstance::from)
            .filter(|instance| {
                !matches!(
                    instance.lifecycle_state,
                    InstanceState::Terminating | InstanceState::Terminated
                )
            })
            .collect())
    }

    fn backups(&self, region: &RegionContext, volume: &Volume) -> Result<Vec<Backup>, OciCliError> {
        let (path, id_flag, resource) = match volume.kind {
            VolumeKind::Boot => (
                ["bv", "boot-volume-backup", "list"],
                "--boot-volume-id",
                "boot-volume-backup",
            ),
            VolumeKind::Block => (["bv", "backup", "list"], "--volume-id", "volume-backup"),
        };
        let mut args = self.command(region, &path);
        push_flag(&mut args, "--compartment-id", &volume.compartment_id);
        push_flag(&mut args, id_flag, &volume.id);
        args.push(OsString::from("--all"));
        Ok(self
            .list::<BackupWire>(&args, resource)?
            .into_iter()
            .map(|wire| wire.into_backup(&volume.id))
            .collect())
    }

    fn replicas(
        &self,
        region: &RegionContext,
        volume: &Volume,
    ) -> Result<Vec<Replica>, OciCliError> {
        let (path, id_flag, resource) = match volume.kind {
            VolumeKind::Boot => (
                ["bv", "boot-volume-replica", "get"],
                "--boot-volume-replica-id",
                "boot-volume-replica",
            ),
            VolumeKind::Block => (
                ["bv", "block-volume-replica", "get"],
                "--block-volume-replica-id",
                "block-volume-replica",
            ),
        };
        volume
            .replica_ids
            .iter()
            .map(|replica_id| {
                let mut args = self.command(region, &path);
                push_flag(&mut args, id_flag, replica_id);
                self.fetch::<ReplicaWire>(&args, resource).map(Replica::from)
            })
            .collect()
    }

    fn subnet(&self, region: &RegionContext, subnet_id: &str) -> Result<Subnet, OciCliError> {
        let mut args = self.command(region, &["network", "subnet", "get"]);
        push_flag(&mut args, "--subnet-id", subnet_id);
        self.fetch::<SubnetWire>(&args, "subnet").map(Subnet::from)
    }

    fn private_ip(
        &self,
        region: &RegionContext,
        subnet_id: &str,
        address: Ipv4Addr,
    ) -> Result<Option<String>, OciCliError> {
        let mut args = self.command(region, &["network", "private-ip", "list"]);
        push_flag(&mut args, "--subnet-id", subnet_id);
        push_flag(&mut args, "--ip-address", &address.to_string());
        Ok(self
            .list::<PrivateIpWire>(&args, "private-ip")?
            .into_iter()
            .next()
            .map(|holder| holder.id))
    }

    fn subscriptions(
        &self,
        region: &RegionContext,
    ) -> Result<Vec<RegionSubscription>, OciCliError> {
        let mut args = self.command(region, &["iam", "region-subscription", "list"]);
        push_flag(&mut args, "--tenancy-id", &self.config.tenancy_id);
        Ok(self
            .list::<SubscriptionWire>(&args, "region-subscription")?
            .into_iter()
            .map(RegionSubscription::from)
            .collect())
    }

    fn create(
        &self,
        region: &RegionContext,
        request: &VolumeCreateRequest,
    ) -> Result<Volume, OciCliError> {
        let (path, backup_flag, replica_type) = match request.kind {
            VolumeKind::Boot => (
                ["bv", "boot-volume", "create"],
                "--boot-volume-backup-id",
                "bootVolumeReplica",
            ),
            VolumeKind::Block => (
                ["bv", "volume", "create"],
                "--volume-backup-id",
                "blockVolumeReplica",
            ),
        };
        let mut args = self.command(region, &path);
        push_flag(&mut args, "--availability-domain", &request.availability_domain);
        push_flag(&mut args, "--compartment-id", &request.compartment_id);
        push_flag(&mut args, "--display-name", &request.display_name);
        match &request.source {
            VolumeSource::Backup(backup_id) => push_flag(&mut args, backup_flag, backup_id),
            VolumeSource::Replica(replica_id) => {
                let details = encode_json(
                    &ReplicaSource {
                        kind: replica_type,
                        id: replica_id,
                    },
                    "source details",
                )?;
                push_flag(&mut args, "--source-details", &details);
            }
        }
        self.fetch::<VolumeWire>(&args, request.kind.as_str())
            .map(|wire| wire.into_volume(request.kind))
    }

    fn volume(
        &self,
        region: &RegionContext,
        kind: VolumeKind,
        volume_id: &str,
    ) -> Result<Volume, OciCliError> {
        let (path, id_flag) = match kind {
            VolumeKind::Boot => (["bv", "boot-volume", "get"], "--boot-volume-id"),
            VolumeKind::Block => (["bv", "volume", "get"], "--volume-id"),
        };
        let mut args = self.command(region, &path);
        push_flag(&mut args, id_flag, volume_id);
        self.fetch::<VolumeWire>(&args, kind.as_str())
            .map(|wire| wire.into_volume(kind))
    }

    fn launch(
        &self,
        region: &RegionContext,
        request: &LaunchRequest,
    ) -> Result<ComputeInstance, OciCliError> {
        let mut args = self.command(region, &["compute", "instance", "launch"]);
        push_flag(&mut args, "--availability-domain", &request.availability_domain);
        push_flag(&mut args, "--compartment-id", &request.compartment_id);
        push_flag(&mut args, "--display-name", &request.display_name);
        push_flag(&mut args, "--shape", &request.shape);
        if let Some(config) = request.shape_config {
            let encoded = encode_json(&ShapeConfigUpdate::from(config), "shape config")?;
            push_flag(&mut args, "--shape-config", &encoded);
        }
        push_flag(&mut args, "--subnet-id", &request.subnet_id);
        push_flag(&mut args, "--private-ip", &request.private_ip.to_string());
        push_flag(&mut args, "--source-boot-volume-id", &request.boot_volume_id);
        self.fetch::<InstanceWire>(&args, "instance")
            .map(ComputeInstance::from)
    }

    fn attach(
        &self,
        region: &RegionContext,
        instance_id: &str,
        volume_id: &str,
    ) -> Result<VolumeAttachment, OciCliError> {
        let mut args = self.command(region, &["compute", "volume-attachment", "attach"]);
        push_flag(&mut args, "--type", "paravirtualized");
        push_flag(&mut args, "--instance-id", instance_id);
        push_flag(&mut args, "--volume-id", volume_id);
        self.fetch::<AttachmentWire>(&args, "volume-attachment")
            .map(VolumeAttachment::from)
    }

    fn attachment(
        &self,
        region: &RegionContext,
        attachment_id: &str,
    ) -> Result<VolumeAttachment, OciCliError> {
        let mut args = self.command(region, &["compute", "volume-attachment", "get"]);
        push_flag(&mut args, "--volume-attachment-id", attachment_id);
        self.fetch::<AttachmentWire>(&args, "volume-attachment")
            .map(VolumeAttachment::from)
    }

    fn action(
        &self,
        region: &RegionContext,
        instance_id: &str,
        action: InstanceAction,
    ) -> Result<ComputeInstance, OciCliError> {
        let mut args = self.command(region, &["compute", "instance", "action"]);
        push_flag(&mut args, "--instance-id", instance_id);
        push_flag(&mut args, "--action", action.as_str());
        self.fetch::<InstanceWire>(&args, "instance")
            .map(ComputeInstance::from)
    }

    fn policy(&self, region: &RegionContext, policy_id: &str) -> Result<BackupPolicy, OciCliError> {
        let mut args = self.command(region, &["bv", "volume-backup-policy", "get"]);
        push_flag(&mut args, "--policy-id", policy_id);
        self.fetch::<PolicyWire>(&args, "volume-backup-policy")
            .and_then(into_policy)
    }

    fn update_schedules(
        &self,
        region: &RegionContext,
        policy_id: &str,
        schedules: &[Schedule],
    ) -> Result<BackupPolicy, OciCliError> {
        let updates: Vec<ScheduleUpdate<'_>> = schedules.iter().map(ScheduleUpdate::from).collect();
        let encoded = encode_json(&updates, "schedules")?;
        let mut args = self.command(region, &["bv", "volume-backup-policy", "update"]);
        push_flag(&mut args, "--policy-id", policy_id);
        push_flag(&mut args, "--schedules", &encoded);
        args.push(OsString::from("--force"));
        self.fetch::<PolicyWire>(&args, "volume-backup-policy")
            .and_then(into_policy)
    }
}

fn push_flag(args: &mut Vec<OsString>, flag: &str, value: &str) {
    args.push(OsString::from(flag));
    args.push(OsString::from(value));
}

fn parse_envelope<T>(stdout: &str, resource: &str) -> Result<T, OciCliError>
where
    T: DeserializeOwned,
{
    serde_json::from_str::<Envelope<T>>(stdout)
        .map(|envelope| envelope.data)
        .map_err(|err| OciCliError::Parse {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
}

fn encode_json<T: Serialize>(value: &T, what: &str) -> Result<String, OciCliError> {
    serde_json::to_string(value).map_err(|err| OciCliError::Encode {
        what: what.to_owned(),
        message: err.to_string(),
    })
}

fn into_policy(wire: PolicyWire) -> Result<BackupPolicy, OciCliError> {
    wire.into_policy().map_err(|err| OciCliError::Parse {
        resource: String::from("volume-backup-policy"),
        message: err.to_string(),
    })
}

impl<R: CommandRunner> Provider for OciCli<R> {
    type Error = OciCliError;
}

impl<R> InventoryProvider for OciCli<R>
where
    R: CommandRunner + Sync,
{
    fn get_instance<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error> {
        Box::pin(async move { self.instance(region, instance_id) })
    }

    fn list_attached_volumes<'a>(
        &'a self,
        region: &'a RegionContext,
        instance: &'a ComputeInstance,
    ) -> ProviderFuture<'a, AttachedVolumes, Self::Error> {
        Box::pin(async move { self.attached_volumes(region, instance) })
    }

    fn find_instances_by_name<'a>(
        &'a self,
        region: &'a RegionContext,
        compartment_id: &'a str,
        display_name: &'a str,
    ) -> ProviderFuture<'a, Vec<ComputeInstance>, Self::Error> {
        Box::pin(async move { self.instances_named(region, compartment_id, display_name) })
    }
}

impl<R> BackupStore for OciCli<R>
where
    R: CommandRunner + Sync,
{
    fn list_backups<'a>(
        &'a self,
        region: &'a RegionContext,
        volume: &'a Volume,
    ) -> ProviderFuture<'a, Vec<Backup>, Self::Error> {
        Box::pin(async move { self.backups(region, volume) })
    }

    fn list_replicas<'a>(
        &'a self,
        region: &'a RegionContext,
        volume: &'a Volume,
    ) -> ProviderFuture<'a, Vec<Replica>, Self::Error> {
        Box::pin(async move { self.replicas(region, volume) })
    }
}

impl<R> NetworkDirectory for OciCli<R>
where
    R: CommandRunner + Sync,
{
    fn get_subnet<'a>(
        &'a self,
        region: &'a RegionContext,
        subnet_id: &'a str,
    ) -> ProviderFuture<'a, Subnet, Self::Error> {
        Box::pin(async move { self.subnet(region, subnet_id) })
    }

    fn find_private_ip<'a>(
        &'a self,
        region: &'a RegionContext,
        subnet_id: &'a str,
        address: Ipv4Addr,
    ) -> ProviderFuture<'a, Option<String>, Self::Error> {
        Box::pin(async move { self.private_ip(region, subnet_id, address) })
    }

    fn list_region_subscriptions<'a>(
        &'a self,
        region: &'a RegionContext,
    ) -> ProviderFuture<'a, Vec<RegionSubscription>, Self::Error> {
        Box::pin(async move { self.subscriptions(region) })
    }
}

impl<R> ProvisioningApi for OciCli<R>
where
    R: CommandRunner + Sync,
{
    fn create_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        request: &'a VolumeCreateRequest,
    ) -> ProviderFuture<'a, Volume, Self::Error> {
        Box::pin(async move { self.create(region, request) })
    }

    fn get_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        kind: VolumeKind,
        volume_id: &'a str,
    ) -> ProviderFuture<'a, Volume, Self::Error> {
        Box::pin(async move { self.volume(region, kind, volume_id) })
    }

    fn launch_instance<'a>(
        &'a self,
        region: &'a RegionContext,
        request: &'a LaunchRequest,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error> {
        Box::pin(async move { self.launch(region, request) })
    }

    fn attach_volume<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
        volume_id: &'a str,
    ) -> ProviderFuture<'a, VolumeAttachment, Self::Error> {
        Box::pin(async move { self.attach(region, instance_id, volume_id) })
    }

    fn get_attachment<'a>(
        &'a self,
        region: &'a RegionContext,
        attachment_id: &'a str,
    ) -> ProviderFuture<'a, VolumeAttachment, Self::Error> {
        Box::pin(async move { self.attachment(region, attachment_id) })
    }

    fn instance_action<'a>(
        &'a self,
        region: &'a RegionContext,
        instance_id: &'a str,
        action: InstanceAction,
    ) -> ProviderFuture<'a, ComputeInstance, Self::Error> {
        Box::pin(async move { self.action(region, instance_id, action) })
    }
}

impl<R> PolicyStore for OciCli<R>
where
    R: CommandRunner + Sync,
{
    fn get_policy<'a>(
        &'a self,
        region: &'a RegionContext,
        policy_id: &'a str,
    ) -> ProviderFuture<'a, BackupPolicy, Self::Error> {
        Box::pin(async move { self.policy(region, policy_id) })
    }

    fn replace_schedules<'a>(
        &'a self,
        region: &'a RegionContext,
        policy_id: &'a str,
        schedules: &'a [Schedule],
    ) -> ProviderFuture<'a, BackupPolicy, Self::Error> {
        Box::pin(async move { self.update_schedules(region, policy_id, schedules) })
    }
}
