//! Rebuilds an instance in the secondary region from its newest backups.

use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use super::error::{ConsistencyError, OrchestrationError, Stage};
use super::placement::TargetPlacement;
use super::provision::Provisioner;
use super::validate::{
    ensure_name_available, ensure_private_ip_available, ensure_supported_shape,
};
use super::{OrchestrationOutcome, attach_all, boot_volume_name, data_volume_name, launch_request};
use crate::model::{Backup, BackupState, Volume, VolumeKind};
use crate::provider::{
    BackupStore, NetworkDirectory, ProvisioningApi, VolumeCreateRequest, VolumeSource,
};
use crate::region::{RegionContext, RegionPair};
use crate::wait::WaitPolicies;

/// Newest `AVAILABLE` backup in a listing.
#[must_use]
pub fn latest_available_backup(backups: &[Backup]) -> Option<&Backup> {
    backups
        .iter()
        .filter(|backup| backup.lifecycle_state == BackupState::Available)
        .max_by_key(|backup| backup.time_created)
}

/// Restores a primary-region instance from backups held in the secondary
/// region.
pub struct RestoreOrchestrator<'p, P> {
    provider: &'p P,
    regions: &'p RegionPair,
    policies: WaitPolicies,
}

impl<'p, P> RestoreOrchestrator<'p, P>
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

    /// Runs the restore workflow for `source_instance_id`.
    ///
    /// Stages: validate, locate backups, consistency check, restore boot,
    /// launch, restore data, attach, finalize.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestrationError`] from the first stage that fails.
    /// Validation and consistency failures leave nothing behind; later
    /// failures may leave volumes or an instance that must be removed by hand.
    pub async fn restore(
        &self,
        source_instance_id: &str,
        placement: &TargetPlacement,
    ) -> Result<OrchestrationOutcome, OrchestrationError<P::Error>> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "restore",
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
                Ok(outcome) => info!(instance = %outcome.instance.id, "restore complete"),
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

        info!(stage = %Stage::Validate, "validating restore request");
        placement.validate()?;
        let source = self
            .provider
            .get_instance(primary, source_instance_id)
            .await
            .map_err(|err| OrchestrationError::provider(Stage::Validate, err))?;
        ensure_supported_shape(&source.shape)?;
        ensure_name_available(self.provider, secondary, placement).await?;
        ensure_private_ip_available(self.provider, secondary, placement).await?;

        info!(stage = %Stage::LocateBackups, "locating newest backups");
        let attached = self
            .provider
            .list_attached_volumes(primary, &source)
            .await
            .map_err(|err| OrchestrationError::provider(Stage::LocateBackups, err))?;
        let boot = attached
            .boot
            .first()
            .ok_or_else(|| ConsistencyError::MissingBootVolume {
                instance_id: source.id.clone(),
                stage: Stage::LocateBackups,
            })?;
        let boot_backup = self.latest_backup(secondary, boot).await?.ok_or_else(|| {
            ConsistencyError::BootBackupMissing {
                volume_id: boot.id.clone(),
                region: secondary.name().to_owned(),
            }
        })?;
        let mut data_backups = Vec::with_capacity(attached.block.len());
        for volume in &attached.block {
            if let Some(backup) = self.latest_backup(secondary, volume).await? {
                data_backups.push(backup);
            }
        }

        info!(
            stage = %Stage::ConsistencyCheck,
            attached = attached.block.len(),
            located = data_backups.len(),
            "checking block backup coverage"
        );
        if data_backups.len() != attached.block.len() {
            return Err(ConsistencyError::BlockBackupCountMismatch {
                attached: attached.block.len(),
                located: data_backups.len(),
            }
            .into());
        }

        info!(stage = %Stage::RestoreBoot, backup = %boot_backup.id, "restoring boot volume");
        let boot_volume = provisioner
            .create_volume(
                Stage::RestoreBoot,
                &VolumeCreateRequest {
                    kind: VolumeKind::Boot,
                    source: VolumeSource::Backup(boot_backup.id.clone()),
                    display_name: boot_volume_name(&placement.display_name),
                    availability_domain: placement.availability_domain.clone(),
                    compartment_id: placement.compartment_id.clone(),
                },
            )
            .await?;

        info!(stage = %Stage::Launch, boot_volume = %boot_volume.id, "launching instance");
        let instance = provisioner
            .launch(
                Stage::Launch,
                &launch_request(&source, placement, &boot_volume.id),
            )
            .await?;

        info!(stage = %Stage::RestoreData, count = data_backups.len(), "restoring data volumes");
        let mut restored = Vec::with_capacity(data_backups.len());
        for (ordinal, backup) in (1..).zip(&data_backups) {
            let volume = provisioner
                .create_volume(
                    Stage::RestoreData,
                    &VolumeCreateRequest {
                        kind: VolumeKind::Block,
                        source: VolumeSource::Backup(backup.id.clone()),
                        display_name: data_volume_name(&instance.display_name, ordinal),
                        availability_domain: placement.availability_domain.clone(),
                        compartment_id: placement.compartment_id.clone(),
                    },
                )
                .await?;
            restored.push((backup.id.clone(), volume));
        }

        info!(stage = %Stage::Attach, count = restored.len(), "attaching data volumes");
        let data_volumes = attach_all(provisioner, &instance.id, restored).await?;

        info!(stage = %Stage::Finalize, "rebooting to pick up attached devices");
        let rebooted = provisioner.reboot(Stage::Finalize, &instance.id).await?;

        Ok(OrchestrationOutcome {
            run_id,
            source_instance_id: source.id,
            instance: rebooted,
            boot_volume,
            data_volumes,
        })
    }

    async fn latest_backup(
        &self,
        region: &RegionContext,
        volume: &Volume,
    ) -> Result<Option<Backup>, OrchestrationError<P::Error>> {
        let backups = self
            .provider
            .list_backups(region, volume)
            .await
            .map_err(|err| OrchestrationError::provider(Stage::LocateBackups, err))?;
        Ok(latest_available_backup(&backups).cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn backup(id: &str, day: u32, state: BackupState) -> Backup {
        Backup {
            id: id.to_owned(),
            volume_id: String::from("vol"),
            display_name: id.to_owned(),
            time_created: Utc
                .with_ymd_and_hms(2024, 5, day, 2, 0, 0)
                .single()
                .unwrap_or_else(|| panic!("valid timestamp")),
            expiration_time: None,
            lifecycle_state: state,
        }
    }

    #[test]
    fn newest_available_backup_wins() {
        let backups = vec![
            backup("old", 1, BackupState::Available),
            backup("newest-but-creating", 4, BackupState::Creating),
            backup("newest-available", 3, BackupState::Available),
            backup("faulty", 2, BackupState::Faulty),
        ];
        assert_eq!(
            latest_available_backup(&backups).map(|found| found.id.as_str()),
            Some("newest-available")
        );
    }

    #[test]
    fn no_available_backup_yields_none() {
        let backups = vec![backup("creating", 1, BackupState::Creating)];
        assert!(latest_available_backup(&backups).is_none());
    }
}
