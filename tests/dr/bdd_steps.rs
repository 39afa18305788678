//! BDD step definitions for consistency checks and restore pre-flight.

use drbridge::{ConsistencyScanner, RestoreOrchestrator};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{DrContext, DrOutcome, add_copies, add_instance, instance_id, placement};
use crate::fake_cloud::{fast_policies, regions};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("instance \"{name}\" whose block volume count is {blocks:u32}")]
fn instance_with_blocks(dr_context: DrContext, name: String, blocks: u32) -> DrContext {
    add_instance(&dr_context.cloud, name.trim(), blocks);
    dr_context
}

#[given("volume \"{volume}\" has {primary:u32} primary and {secondary:u32} secondary backups")]
fn volume_has_backups(
    dr_context: DrContext,
    volume: String,
    primary: u32,
    secondary: u32,
) -> DrContext {
    add_copies(&dr_context.cloud, volume.trim(), primary, secondary);
    dr_context
}

#[when("I check backup consistency for \"{name}\"")]
fn check_consistency(mut dr_context: DrContext, name: String) -> Result<DrContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let pair = regions();
    let scanner = ConsistencyScanner::new(dr_context.cloud.as_ref(), &pair);
    let report = runtime
        .block_on(scanner.backup_report(&instance_id(name.trim())))
        .map_err(|err| StepError::Assertion(format!("report failed: {err}")))?;
    dr_context.outcome = Some(DrOutcome::Report {
        status: report.status,
        total_backups: report.total_backups,
    });
    Ok(dr_context)
}

#[when("I restore \"{name}\" into the secondary region")]
fn restore_instance(mut dr_context: DrContext, name: String) -> Result<DrContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let pair = regions();
    let orchestrator = RestoreOrchestrator::new(dr_context.cloud.as_ref(), &pair, fast_policies());
    let target = placement(name.trim());
    let result = runtime.block_on(orchestrator.restore(&instance_id(name.trim()), &target));
    dr_context.outcome = Some(match result {
        Ok(_) => DrOutcome::Restored,
        Err(err) => DrOutcome::Failed(err.stage()),
    });
    Ok(dr_context)
}

#[then("the aggregate status is \"{status}\"")]
fn aggregate_status(dr_context: &DrContext, status: String) -> Result<(), StepError> {
    match &dr_context.outcome {
        Some(DrOutcome::Report { status: actual, .. }) if actual.as_str() == status.trim() => {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected status {status}, got {other:?}"
        ))),
    }
}

#[then("the primary backup count is {count:u32}")]
fn primary_backup_count(dr_context: &DrContext, count: u32) -> Result<(), StepError> {
    match &dr_context.outcome {
        Some(DrOutcome::Report { total_backups, .. })
            if u32::try_from(*total_backups) == Ok(count) =>
        {
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected {count} primary backups, got {other:?}"
        ))),
    }
}

#[then("the restore stops at stage \"{stage}\"")]
fn restore_stops_at(dr_context: &DrContext, stage: String) -> Result<(), StepError> {
    match &dr_context.outcome {
        Some(DrOutcome::Failed(actual)) if actual.as_str() == stage.trim() => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure at {stage}, got {other:?}"
        ))),
    }
}

#[then("no volumes or instances are created")]
fn nothing_created(dr_context: &DrContext) -> Result<(), StepError> {
    let created = dr_context.cloud.created_volumes().len();
    let launched = dr_context.cloud.launches().len();
    if created == 0 && launched == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no resources, got {created} volumes and {launched} launches"
        )))
    }
}
