//! Bounded polling until a resource reaches an accepted lifecycle state.
//!
//! Provisioning calls return before the resource settles. Rather than sleeping
//! for a fixed period, callers poll the reported state at
//! [`WaitPolicy::poll_interval`] until it enters the accepted set, enters a
//! failed state, or [`WaitPolicy::timeout`] elapses.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::model::{AttachmentState, InstanceState, Lifecycle, VolumeState};

/// Default interval between state polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default upper bound for volume creation from a backup or replica.
pub const DEFAULT_VOLUME_TIMEOUT: Duration = Duration::from_secs(1800);
/// Default upper bound for instance launch and power transitions.
pub const DEFAULT_INSTANCE_TIMEOUT: Duration = Duration::from_secs(1200);
/// Default upper bound for volume attachment.
pub const DEFAULT_ATTACHMENT_TIMEOUT: Duration = Duration::from_secs(600);

/// Polling cadence and deadline for one resource type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitPolicy {
    /// Delay between consecutive state reads.
    pub poll_interval: Duration,
    /// Maximum time spent waiting before giving up.
    pub timeout: Duration,
}

impl WaitPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

/// Wait policies for each resource type an orchestrator provisions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitPolicies {
    /// Volume creation.
    pub volume: WaitPolicy,
    /// Instance launch, stop, start, and reboot.
    pub instance: WaitPolicy,
    /// Volume attachment.
    pub attachment: WaitPolicy,
}

impl Default for WaitPolicies {
    fn default() -> Self {
        Self {
            volume: WaitPolicy::new(DEFAULT_POLL_INTERVAL, DEFAULT_VOLUME_TIMEOUT),
            instance: WaitPolicy::new(DEFAULT_POLL_INTERVAL, DEFAULT_INSTANCE_TIMEOUT),
            attachment: WaitPolicy::new(DEFAULT_POLL_INTERVAL, DEFAULT_ATTACHMENT_TIMEOUT),
        }
    }
}

/// States that end a wait successfully or with a failure.
///
/// States in neither list are treated as transitional.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StateTarget<'s, S> {
    /// States accepted as success.
    pub accepted: &'s [S],
    /// States that abort the wait immediately.
    pub failed: &'s [S],
}

/// Volume ready for attachment or launch.
pub const VOLUME_AVAILABLE: StateTarget<'static, VolumeState> = StateTarget {
    accepted: &[VolumeState::Available],
    failed: &[
        VolumeState::Faulty,
        VolumeState::Terminating,
        VolumeState::Terminated,
    ],
};

/// Instance booted.
pub const INSTANCE_RUNNING: StateTarget<'static, InstanceState> = StateTarget {
    accepted: &[InstanceState::Running],
    failed: &[InstanceState::Terminating, InstanceState::Terminated],
};

/// Instance has left `RUNNING` after a reset request.
pub const INSTANCE_RESETTING: StateTarget<'static, InstanceState> = StateTarget {
    accepted: &[
        InstanceState::Stopping,
        InstanceState::Stopped,
        InstanceState::Starting,
    ],
    failed: &[InstanceState::Terminating, InstanceState::Terminated],
};

/// Instance powered off.
pub const INSTANCE_STOPPED: StateTarget<'static, InstanceState> = StateTarget {
    accepted: &[InstanceState::Stopped],
    failed: &[InstanceState::Terminating, InstanceState::Terminated],
};

/// Volume visible to the instance.
pub const ATTACHMENT_ATTACHED: StateTarget<'static, AttachmentState> = StateTarget {
    accepted: &[AttachmentState::Attached],
    failed: &[AttachmentState::Detaching, AttachmentState::Detached],
};

/// Errors raised while waiting for a state transition.
#[derive(Debug, Error)]
pub enum WaitError<E>
where
    E: std::error::Error + 'static,
{
    /// The resource settled in a state outside the accepted set.
    #[error("{resource_id} reached undesired state {state}")]
    UndesiredState {
        /// Provider identifier of the resource.
        resource_id: String,
        /// State observed.
        state: String,
    },
    /// The deadline elapsed before an accepted state was observed.
    #[error("timed out after {waited:?} waiting for {resource_id} (last state {last_state})")]
    Timeout {
        /// Provider identifier of the resource.
        resource_id: String,
        /// Last state observed before giving up.
        last_state: String,
        /// Time spent waiting.
        waited: Duration,
    },
    /// Reading the resource state failed.
    #[error("failed to read resource state: {0}")]
    Provider(#[source] E),
}

/// Polls `fetch` until the resource reaches a state in `target`.
///
/// `initial` is the descriptor returned by the create or act call and is
/// checked before the first poll.
///
/// # Errors
///
/// Returns [`WaitError::UndesiredState`] when a failed state is observed,
/// [`WaitError::Timeout`] when `policy.timeout` elapses, and
/// [`WaitError::Provider`] when a state read fails.
pub async fn wait_for_state<T, E, F, Fut>(
    policy: WaitPolicy,
    target: StateTarget<'_, T::State>,
    initial: T,
    mut fetch: F,
) -> Result<T, WaitError<E>>
where
    T: Lifecycle,
    E: std::error::Error + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    // A timeout too large for the clock to represent never expires.
    let deadline = started.checked_add(policy.timeout);
    let mut current = initial;

    loop {
        let state = current.state();
        if target.accepted.contains(&state) {
            debug!(resource = current.resource_id(), %state, "resource reached accepted state");
            return Ok(current);
        }
        if target.failed.contains(&state) {
            return Err(WaitError::UndesiredState {
                resource_id: current.resource_id().to_owned(),
                state: state.to_string(),
            });
        }
        if deadline.is_some_and(|limit| Instant::now() >= limit) {
            return Err(WaitError::Timeout {
                resource_id: current.resource_id().to_owned(),
                last_state: state.to_string(),
                waited: started.elapsed(),
            });
        }

        debug!(resource = current.resource_id(), %state, "waiting for state transition");
        sleep(policy.poll_interval).await;
        current = fetch().await.map_err(WaitError::Provider)?;
    }
}

#[cfg(test)]
mod tests;
