//! Create-and-wait helpers shared by the restore and clone workflows.

use tracing::{info, warn};

use super::error::{OrchestrationError, Stage};
use crate::model::{ComputeInstance, InstanceAction, InstanceState, Volume, VolumeAttachment};
use crate::provider::{LaunchRequest, ProvisioningApi, VolumeCreateRequest};
use crate::region::RegionContext;
use crate::wait::{
    ATTACHMENT_ATTACHED, INSTANCE_RESETTING, INSTANCE_RUNNING, StateTarget, VOLUME_AVAILABLE,
    WaitPolicies, wait_for_state,
};

/// Issues provisioning calls in one region and blocks until each resource
/// settles. Remembers every identifier it created so an abort can name them.
pub(super) struct Provisioner<'a, P> {
    provider: &'a P,
    region: &'a RegionContext,
    policies: WaitPolicies,
    created: Vec<String>,
}

impl<'a, P> Provisioner<'a, P>
where
    P: ProvisioningApi,
{
    pub(super) const fn new(
        provider: &'a P,
        region: &'a RegionContext,
        policies: WaitPolicies,
    ) -> Self {
        Self {
            provider,
            region,
            policies,
            created: Vec::new(),
        }
    }

    pub(super) async fn create_volume(
        &mut self,
        stage: Stage,
        request: &VolumeCreateRequest,
    ) -> Result<Volume, OrchestrationError<P::Error>> {
        let provider = self.provider;
        let region = self.region;
        let initial = provider
            .create_volume(region, request)
            .await
            .map_err(|err| OrchestrationError::provider(stage, err))?;
        self.created.push(initial.id.clone());
        info!(
            %stage,
            volume = %initial.id,
            kind = %request.kind,
            name = %request.display_name,
            "volume requested"
        );

        let volume_id = initial.id.clone();
        let kind = request.kind;
        wait_for_state(self.policies.volume, VOLUME_AVAILABLE, initial, || {
            provider.get_volume(region, kind, &volume_id)
        })
        .await
        .map_err(|err| OrchestrationError::from_wait(stage, err))
    }

    pub(super) async fn launch(
        &mut self,
        stage: Stage,
        request: &LaunchRequest,
    ) -> Result<ComputeInstance, OrchestrationError<P::Error>> {
        let provider = self.provider;
        let region = self.region;
        let initial = provider
            .launch_instance(region, request)
            .await
            .map_err(|err| OrchestrationError::provider(stage, err))?;
        self.created.push(initial.id.clone());
        info!(%stage, instance = %initial.id, shape = %request.shape, "instance launch requested");

        let instance_id = initial.id.clone();
        wait_for_state(self.policies.instance, INSTANCE_RUNNING, initial, || {
            provider.get_instance(region, &instance_id)
        })
        .await
        .map_err(|err| OrchestrationError::from_wait(stage, err))
    }

    pub(super) async fn attach(
        &mut self,
        stage: Stage,
        instance_id: &str,
        volume_id: &str,
    ) -> Result<VolumeAttachment, OrchestrationError<P::Error>> {
        let provider = self.provider;
        let region = self.region;
        let initial = provider
            .attach_volume(region, instance_id, volume_id)
            .await
            .map_err(|err| OrchestrationError::provider(stage, err))?;
        self.created.push(initial.id.clone());
        info!(%stage, attachment = %initial.id, volume = volume_id, "attachment requested");

        let attachment_id = initial.id.clone();
        wait_for_state(self.policies.attachment, ATTACHMENT_ATTACHED, initial, || {
            provider.get_attachment(region, &attachment_id)
        })
        .await
        .map_err(|err| OrchestrationError::from_wait(stage, err))
    }

    /// Sends a power action and waits for `target`.
    pub(super) async fn power(
        &self,
        stage: Stage,
        instance_id: &str,
        action: InstanceAction,
        target: StateTarget<'_, InstanceState>,
    ) -> Result<ComputeInstance, OrchestrationError<P::Error>> {
        let provider = self.provider;
        let region = self.region;
        let initial = provider
            .instance_action(region, instance_id, action)
            .await
            .map_err(|err| OrchestrationError::provider(stage, err))?;
        info!(%stage, instance = instance_id, %action, "power action requested");

        wait_for_state(self.policies.instance, target, initial, || {
            provider.get_instance(region, instance_id)
        })
        .await
        .map_err(|err| OrchestrationError::from_wait(stage, err))
    }

    /// Soft-resets the instance and waits for it to go down and come back.
    ///
    /// The reset call returns while the instance still reports `RUNNING`, so
    /// the first wait looks for the shutdown before the second waits for the
    /// boot.
    pub(super) async fn reboot(
        &self,
        stage: Stage,
        instance_id: &str,
    ) -> Result<ComputeInstance, OrchestrationError<P::Error>> {
        let provider = self.provider;
        let region = self.region;
        let initial = provider
            .instance_action(region, instance_id, InstanceAction::SoftReset)
            .await
            .map_err(|err| OrchestrationError::provider(stage, err))?;
        info!(%stage, instance = instance_id, "reboot requested");

        let cycling = wait_for_state(self.policies.instance, INSTANCE_RESETTING, initial, || {
            provider.get_instance(region, instance_id)
        })
        .await
        .map_err(|err| OrchestrationError::from_wait(stage, err))?;
        wait_for_state(self.policies.instance, INSTANCE_RUNNING, cycling, || {
            provider.get_instance(region, instance_id)
        })
        .await
        .map_err(|err| OrchestrationError::from_wait(stage, err))
    }

    /// Logs the abort along with anything left behind.
    pub(super) fn report_abort(&self, err: &OrchestrationError<P::Error>) {
        if self.created.is_empty() {
            warn!(
                stage = %err.stage(),
                kind = ?err.kind(),
                error = %err,
                "workflow aborted before creating resources"
            );
        } else {
            warn!(
                stage = %err.stage(),
                kind = ?err.kind(),
                error = %err,
                orphaned = ?self.created,
                "workflow aborted; remove orphaned resources manually"
            );
        }
    }
}
