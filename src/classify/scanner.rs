//! Fetches one snapshot of inventory and listings, then classifies it.

use tracing::{debug, info};

use crate::model::ComputeInstance;
use crate::provider::{BackupStore, InventoryProvider};
use crate::region::RegionPair;

use super::{
    InstanceReport, ReplicaReport, VolumeBackups, VolumeReplicaHealth, classify_instance,
    replica_health,
};

/// Reads the inventory from the primary region and backup or replica
/// listings from both regions, once per call.
#[derive(Debug)]
pub struct ConsistencyScanner<'p, P> {
    provider: &'p P,
    regions: &'p RegionPair,
}

impl<'p, P> ConsistencyScanner<'p, P>
where
    P: InventoryProvider + BackupStore,
{
    /// Creates a scanner over a provider and region pair.
    #[must_use]
    pub const fn new(provider: &'p P, regions: &'p RegionPair) -> Self {
        Self { provider, regions }
    }

    /// Produces the backup replication report for an instance.
    ///
    /// # Errors
    ///
    /// Returns the provider error when an inventory or listing call fails.
    pub async fn backup_report(&self, instance_id: &str) -> Result<InstanceReport, P::Error> {
        let instance = self
            .provider
            .get_instance(&self.regions.primary, instance_id)
            .await?;
        let listings = self.collect_backups(&instance).await?;
        let report = classify_instance(&instance, &listings);
        info!(
            instance = %report.instance_name,
            status = %report.status,
            total_backups = report.total_backups,
            "classified backup replication"
        );
        Ok(report)
    }

    /// Produces the replica health report for an instance.
    ///
    /// # Errors
    ///
    /// Returns the provider error when an inventory or listing call fails.
    pub async fn replica_report(&self, instance_id: &str) -> Result<ReplicaReport, P::Error> {
        let instance = self
            .provider
            .get_instance(&self.regions.primary, instance_id)
            .await?;
        self.replica_report_for(&instance).await
    }

    /// Replica health for an already fetched instance.
    ///
    /// # Errors
    ///
    /// Returns the provider error when an inventory or listing call fails.
    pub async fn replica_report_for(
        &self,
        instance: &ComputeInstance,
    ) -> Result<ReplicaReport, P::Error> {
        let attached = self
            .provider
            .list_attached_volumes(&self.regions.primary, instance)
            .await?;
        let mut volumes = Vec::with_capacity(attached.len());
        for volume in attached.iter() {
            let replicas = self
                .provider
                .list_replicas(&self.regions.secondary, volume)
                .await?;
            let health = replica_health(volume, &replicas);
            debug!(volume = %volume.id, ?health, "evaluated replica");
            volumes.push(VolumeReplicaHealth {
                volume_id: volume.id.clone(),
                volume_name: volume.display_name.clone(),
                volume_kind: volume.kind,
                health,
            });
        }
        Ok(ReplicaReport {
            instance_id: instance.id.clone(),
            instance_name: instance.display_name.clone(),
            volumes,
        })
    }

    async fn collect_backups(
        &self,
        instance: &ComputeInstance,
    ) -> Result<Vec<VolumeBackups>, P::Error> {
        let attached = self
            .provider
            .list_attached_volumes(&self.regions.primary, instance)
            .await?;
        let mut listings = Vec::with_capacity(attached.len());
        for volume in attached.iter() {
            let primary = self
                .provider
                .list_backups(&self.regions.primary, volume)
                .await?;
            let secondary = self
                .provider
                .list_backups(&self.regions.secondary, volume)
                .await?;
            debug!(
                volume = %volume.id,
                primary = primary.len(),
                secondary = secondary.len(),
                "listed backups"
            );
            listings.push(VolumeBackups {
                volume: volume.clone(),
                primary,
                secondary,
            });
        }
        Ok(listings)
    }
}
