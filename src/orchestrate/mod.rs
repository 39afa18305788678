//! Workflows that rebuild a compute instance in the secondary region.
//!
//! [`RestoreOrchestrator`] restores from the newest point-in-time backups;
//! [`CloneOrchestrator`] creates volumes directly from live replicas. Both run
//! their stages strictly in order, wait for every resource to settle before
//! moving on, and stop at the first failure. Nothing they created is removed
//! on failure; the abort is logged together with the identifiers left
//! behind.

mod error;
mod placement;
mod provision;
mod replica_clone;
mod restore;
mod validate;

use serde::Serialize;
use uuid::Uuid;

use crate::model::{ComputeInstance, Volume};
use crate::provider::{LaunchRequest, ProvisioningApi};

pub use error::{ConsistencyError, ErrorKind, OrchestrationError, Stage, ValidationError};
pub use placement::{TargetPlacement, TargetPlacementBuilder};
use provision::Provisioner;
pub use replica_clone::CloneOrchestrator;
pub use restore::{RestoreOrchestrator, latest_available_backup};
pub use validate::{cidr_contains, parse_ipv4_cidr};

/// A data volume created and attached by a workflow.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RestoredVolume {
    /// Backup or replica the volume was created from.
    pub source_id: String,
    /// The new volume.
    pub volume: Volume,
    /// Attachment joining it to the new instance.
    pub attachment_id: String,
}

/// Result of a successful restore or clone.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrchestrationOutcome {
    /// Identifier tagging this run's log events.
    pub run_id: Uuid,
    /// Instance the workflow copied.
    pub source_instance_id: String,
    /// Final descriptor of the new instance.
    pub instance: ComputeInstance,
    /// Boot volume the instance runs from.
    pub boot_volume: Volume,
    /// Attached data volumes, in source inventory order.
    pub data_volumes: Vec<RestoredVolume>,
}

/// Display name for a rebuilt boot volume.
#[must_use]
pub fn boot_volume_name(instance_name: &str) -> String {
    format!("{instance_name} (Boot Volume)")
}

/// Display name for the `ordinal`-th rebuilt data volume, counting from 1.
#[must_use]
pub fn data_volume_name(instance_name: &str, ordinal: usize) -> String {
    format!("{instance_name}-data-{ordinal}")
}

fn launch_request(
    source: &ComputeInstance,
    placement: &TargetPlacement,
    boot_volume_id: &str,
) -> LaunchRequest {
    LaunchRequest {
        display_name: placement.display_name.clone(),
        compartment_id: placement.compartment_id.clone(),
        availability_domain: placement.availability_domain.clone(),
        shape: source.shape.clone(),
        shape_config: source.flexible_config(),
        subnet_id: placement.subnet_id.clone(),
        private_ip: placement.private_ip,
        boot_volume_id: boot_volume_id.to_owned(),
    }
}

/// Attaches each `(source_id, volume)` pair to `instance_id` in order.
async fn attach_all<P>(
    provisioner: &mut Provisioner<'_, P>,
    instance_id: &str,
    volumes: Vec<(String, Volume)>,
) -> Result<Vec<RestoredVolume>, OrchestrationError<P::Error>>
where
    P: ProvisioningApi,
{
    let mut attached = Vec::with_capacity(volumes.len());
    for (source_id, volume) in volumes {
        let attachment = provisioner
            .attach(Stage::Attach, instance_id, &volume.id)
            .await?;
        attached.push(RestoredVolume {
            source_id,
            volume,
            attachment_id: attachment.id,
        });
    }
    Ok(attached)
}
