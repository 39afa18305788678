//! Tests for bounded state polling.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;

use super::*;
use crate::model::{Volume, VolumeKind};

#[derive(Debug, Error)]
#[error("scripted read failure")]
struct ReadFailure;

fn volume(state: VolumeState) -> Volume {
    Volume {
        id: String::from("ocid1.volume.oc1..new"),
        kind: VolumeKind::Block,
        display_name: String::from("web01-data-1"),
        size_in_gbs: 50,
        availability_domain: String::from("AD-1"),
        compartment_id: String::from("ocid1.compartment.oc1..c"),
        lifecycle_state: state,
        replica_ids: Vec::new(),
    }
}

fn fast_policy(timeout_ms: u64) -> WaitPolicy {
    WaitPolicy::new(Duration::from_millis(1), Duration::from_millis(timeout_ms))
}

/// Replays scripted reads, repeating the last state once exhausted.
struct ScriptedReads {
    states: RefCell<VecDeque<Result<VolumeState, ReadFailure>>>,
    reads: RefCell<u32>,
}

impl ScriptedReads {
    fn new(states: Vec<Result<VolumeState, ReadFailure>>) -> Self {
        Self {
            states: RefCell::new(states.into()),
            reads: RefCell::new(0),
        }
    }

    async fn read(&self) -> Result<Volume, ReadFailure> {
        *self.reads.borrow_mut() += 1;
        let mut states = self.states.borrow_mut();
        let next = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().map(|state| match state {
                Ok(value) => Ok(*value),
                Err(_) => Err(ReadFailure),
            })
        };
        next.unwrap_or(Ok(VolumeState::Provisioning)).map(volume)
    }

    fn reads(&self) -> u32 {
        *self.reads.borrow()
    }
}

#[tokio::test]
async fn returns_immediately_when_initial_state_is_accepted() {
    let reads = ScriptedReads::new(vec![]);
    let result = wait_for_state(
        fast_policy(50),
        VOLUME_AVAILABLE,
        volume(VolumeState::Available),
        || reads.read(),
    )
    .await;

    assert!(result.is_ok(), "unexpected outcome: {result:?}");
    assert_eq!(reads.reads(), 0);
}

#[tokio::test]
async fn polls_through_transitional_states() {
    let reads = ScriptedReads::new(vec![
        Ok(VolumeState::Restoring),
        Ok(VolumeState::Restoring),
        Ok(VolumeState::Available),
    ]);
    let result = wait_for_state(
        fast_policy(1_000),
        VOLUME_AVAILABLE,
        volume(VolumeState::Provisioning),
        || reads.read(),
    )
    .await
    .unwrap_or_else(|err| panic!("volume should become available: {err}"));

    assert_eq!(result.lifecycle_state, VolumeState::Available);
    assert_eq!(reads.reads(), 3);
}

#[tokio::test]
async fn failed_state_aborts_without_waiting_for_timeout() {
    let reads = ScriptedReads::new(vec![Ok(VolumeState::Faulty)]);
    let result = wait_for_state(
        fast_policy(10_000),
        VOLUME_AVAILABLE,
        volume(VolumeState::Provisioning),
        || reads.read(),
    )
    .await;

    assert!(
        matches!(result, Err(WaitError::UndesiredState { ref state, .. }) if state == "FAULTY"),
        "unexpected outcome: {result:?}"
    );
}

#[tokio::test]
async fn times_out_with_last_observed_state() {
    let reads = ScriptedReads::new(vec![Ok(VolumeState::Restoring)]);
    let result = wait_for_state(
        fast_policy(5),
        VOLUME_AVAILABLE,
        volume(VolumeState::Provisioning),
        || reads.read(),
    )
    .await;

    assert!(
        matches!(
            result,
            Err(WaitError::Timeout { ref last_state, .. }) if last_state == "RESTORING"
        ),
        "unexpected outcome: {result:?}"
    );
}

#[tokio::test]
async fn timeout_beyond_clock_range_still_polls_to_completion() {
    let reads = ScriptedReads::new(vec![Ok(VolumeState::Restoring), Ok(VolumeState::Available)]);
    let result = wait_for_state(
        WaitPolicy::new(Duration::from_millis(1), Duration::from_secs(u64::MAX)),
        VOLUME_AVAILABLE,
        volume(VolumeState::Provisioning),
        || reads.read(),
    )
    .await
    .unwrap_or_else(|err| panic!("volume should become available: {err}"));

    assert_eq!(result.lifecycle_state, VolumeState::Available);
    assert_eq!(reads.reads(), 2);
}

#[tokio::test]
async fn read_failures_surface_as_provider_errors() {
    let reads = ScriptedReads::new(vec![Err(ReadFailure)]);
    let result = wait_for_state(
        fast_policy(1_000),
        VOLUME_AVAILABLE,
        volume(VolumeState::Provisioning),
        || reads.read(),
    )
    .await;

    assert!(matches!(result, Err(WaitError::Provider(ReadFailure))));
}

#[test]
fn default_policies_bound_every_resource_type() {
    let policies = WaitPolicies::default();
    assert_eq!(policies.volume.timeout, DEFAULT_VOLUME_TIMEOUT);
    assert_eq!(policies.instance.timeout, DEFAULT_INSTANCE_TIMEOUT);
    assert_eq!(policies.attachment.timeout, DEFAULT_ATTACHMENT_TIMEOUT);
}
