//! Rebuilds an instance in the secondary region from live volume replicas.

use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::error::{ConsistencyError, OrchestrationError, Stage};
use super::placement::TargetPlacement;
use super::provision::Provisioner;
use super::validate::{
    ensure_name_available, ensure_private_ip_available, ensure_regions_subscribed,
};
use super::{OrchestrationOutcome, attach_all, boot_volume_name, data_volume_name, launch_request};
use crate::classify::replica_health;
use crate::model::{InstanceAction, Volume, VolumeKind};
use crate::provider::{
    BackupStore, NetworkDirectory, ProvisioningApi, VolumeCreateRequest, VolumeSource,
};
use crate::region::RegionPair;
use crate::wait::{INSTANCE_RUNNING, INSTANCE_STOPPED, WaitPolicies};

/// Clones a primary-region instance from its cross-region replicas.
///
/// Replicas trail the source by seconds rather than by a backup interval, so
/// the clone loses less data than a restore from backups.
pub struct CloneOrchestrator<'p, P> {
    provider: &'p P,
    regions: &'p RegionPair,
    policies: WaitPolicies,
}

impl<'p, P> CloneOrchestrator<'p, P>
where
    P: ProvisioningApi + BackupStore + NetworkDirectory,
{
    /// Creates an orchestrator over `provider`.
    #[must_use]
    pub const fn new(provider: &'p P, regions: &'p RegionPair, policies: WaitPolicies) -> Self {
        Self {
            provider,
            regions,
            policies,
        }
    }

    /// Runs the clone workflow for `source_instance_id`.
    ///
    /// Stages: validate, replica health check, create from replica, launch,
    /// attach, stop/start.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError`] from the first stage that fails. When any
    /// volume lacks a healthy replica nothing is created.
    pub async fn clone_instance(
        &self,
        source_instance_id: &str,
        placement: &TargetPlacement,
    ) -> Result<OrchestrationOutcome, OrchestrationError<P::Error>> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "clone",
            %run_id,
            source = source_instance_id,
            target = %placement.display_name,
            region = %self.regions.secondary,
        );
        async move {
            let mut provisioner =
                Provisioner::new(self.provider, &self.regions.secondary, self.policies);
            let result = self
                .run(run_id, source_instance_id, placement, &mut provisioner)
                .await;
            match &result {
                Ok(outcome) => info!(instance = %outcome.instance.id, "clone complete"),
                Err(err) => provisioner.report_abort(err),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        run_id: Uuid,
        source_instance_id: &str,
        placement: &TargetPlacement,
        provisioner: &mut Provisioner<'_, P>,
    ) -> Result<OrchestrationOutcome, OrchestrationError<P::Error>> {
        let primary = &self.regions.primary;
        let secondary = &self.regions.secondary;

        info!(stage = %Stage::Validate, "validating clone request");
        placement.validate()?;
        let source = self
            .provider
            .get_instance(primary, source_instance_id)
            .await
            .map_err(|err| OrchestrationError::provider(Stage::Validate, err))?;
        ensure_regions_subscribed(self.provider, self.regions).await?;
        ensure_name_available(self.provider, secondary, placement).await?;
        ensure_private_ip_available(self.provider, secondary, placement).await?;

        info!(stage = %Stage::ReplicaHealthCheck, "checking replica health");
        let attached = self
            .provider
            .list_attached_volumes(primary, &source)
            .await
            .map_err(|err| OrchestrationError::provider(Stage::ReplicaHealthCheck, err))?;
        let Some(boot) = attached.boot.first() else {
            return Err(ConsistencyError::MissingBootVolume {
                instance_id: source.id.clone(),
                stage: Stage::ReplicaHealthCheck,
            }
            .into());
        };
        let boot_replica = self.healthy_replica(boot).await?;
        let mut data_replicas = Vec::with_capacity(attached.block.len());
        for volume in &attached.block {
            data_replicas.push(self.healthy_replica(volume).await?);
        }

        info!(
            stage = %Stage::CreateFromReplica,
            volumes = data_replicas.len() + 1,
            "creating volumes from replicas"
        );
        let boot_volume = provisioner
            .create_volume(
                Stage::CreateFromReplica,
                &VolumeCreateRequest {
                    kind: VolumeKind::Boot,
                    source: VolumeSource::Replica(boot_replica.clone()),
                    display_name: boot_volume_name(&placement.display_name),
                    availability_domain: placement.availability_domain.clone(),
                    compartment_id: placement.compartment_id.clone(),
                },
            )
            .await?;
        let mut created = Vec::with_capacity(data_replicas.len());
        for (ordinal, replica_id) in (1..).zip(data_replicas) {
            let volume = provisioner
                .create_volume(
                    Stage::CreateFromReplica,
                    &VolumeCreateRequest {
                        kind: VolumeKind::Block,
                        source: VolumeSource::Replica(replica_id.clone()),
                        display_name: data_volume_name(&placement.display_name, ordinal),
                        availability_domain: placement.availability_domain.clone(),
                        compartment_id: placement.compartment_id.clone(),
                    },
                )
                .await?;
            created.push((replica_id, volume));
        }

        info!(stage = %Stage::Launch, boot_volume = %boot_volume.id, "launching instance");
        let instance = provisioner
            .launch(
                Stage::Launch,
                &launch_request(&source, placement, &boot_volume.id),
            )
            .await?;

        info!(stage = %Stage::Attach, count = created.len(), "attaching data volumes");
        let data_volumes = attach_all(provisioner, &instance.id, created).await?;

        info!(stage = %Stage::StopStart, "power cycling instance");
        provisioner
            .power(
                Stage::StopStart,
                &instance.id,
                InstanceAction::SoftStop,
                INSTANCE_STOPPED,
            )
            .await?;
        let restarted = provisioner
            .power(
                Stage::StopStart,
                &instance.id,
                InstanceAction::Start,
                INSTANCE_RUNNING,
            )
            .await?;

        Ok(OrchestrationOutcome {
            run_id,
            source_instance_id: source.id,
            instance: restarted,
            boot_volume,
            data_volumes,
        })
    }

    /// Identifier of the usable replica of `volume` in the secondary region.
    async fn healthy_replica(
        &self,
        volume: &Volume,
    ) -> Result<String, OrchestrationError<P::Error>> {
        let replicas = self
            .provider
            .list_replicas(&self.regions.secondary, volume)
            .await
            .map_err(|err| OrchestrationError::provider(Stage::ReplicaHealthCheck, err))?;
        let health = replica_health(volume, &replicas);
        match health.healthy_replica() {
            Some(replica_id) => Ok(replica_id.to_owned()),
            None => Err(ConsistencyError::ReplicaUnavailable {
                volume_id: volume.id.clone(),
                health: health.to_string(),
            }
            .into()),
        }
    }
}
