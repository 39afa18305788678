//! Backup policy schedule management.
//!
//! Schedules are never edited in place. Each mutation computes a new list in
//! memory and replaces the policy's whole list at the [`PolicyStore`].

use serde::Serialize;
use tracing::info;

use crate::provider::PolicyStore;
use crate::region::RegionContext;

mod types;

pub use types::{
    BackupType, MAX_RETENTION_DAYS, MAX_START_HOUR, MIN_RETENTION_DAYS, Month, OffsetType, Period,
    Schedule, ScheduleKey, ScheduleRequest, ScheduleValidationError, Weekday,
};

/// A volume backup policy and its schedules.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BackupPolicy {
    /// Provider identifier.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Region that receives copies of the policy's backups, if any.
    pub destination_region: Option<String>,
    /// Schedules in provider order.
    pub schedules: Vec<Schedule>,
}

/// Result of a removal request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RemoveOutcome {
    /// At least one schedule matched and the list was replaced.
    Removed {
        /// Policy as returned by the store after the replacement.
        policy: BackupPolicy,
        /// Number of schedules dropped.
        removed: usize,
    },
    /// Nothing matched; no write was performed.
    Unchanged,
}

/// Appends `schedule` after the existing entries.
#[must_use]
pub fn with_added(schedules: &[Schedule], schedule: Schedule) -> Vec<Schedule> {
    let mut updated = Vec::with_capacity(schedules.len() + 1);
    updated.extend_from_slice(schedules);
    updated.push(schedule);
    updated
}

/// Reports whether a schedule with `key` exists.
///
/// Only the first schedule in the list is examined: the answer is `true`
/// exactly when the list is non-empty and its first entry has `key`. Later
/// entries are never consulted.
#[must_use]
pub fn schedule_exists(schedules: &[Schedule], key: ScheduleKey) -> bool {
    schedules.first().is_some_and(|first| first.key() == key)
}

/// Returns the list without any schedule matching `key`, or `None` when
/// nothing matched.
#[must_use]
pub fn without_key(schedules: &[Schedule], key: ScheduleKey) -> Option<Vec<Schedule>> {
    let kept: Vec<Schedule> = schedules
        .iter()
        .filter(|schedule| schedule.key() != key)
        .cloned()
        .collect();
    (kept.len() != schedules.len()).then_some(kept)
}

/// Reads and replaces schedule lists of policies held in one region.
#[derive(Debug)]
pub struct ScheduleManager<'p, P> {
    store: &'p P,
    region: &'p RegionContext,
}

impl<'p, P> ScheduleManager<'p, P>
where
    P: PolicyStore,
{
    /// Creates a manager for policies in `region`.
    #[must_use]
    pub const fn new(store: &'p P, region: &'p RegionContext) -> Self {
        Self { store, region }
    }

    /// Fetches the policy and its schedules.
    ///
    /// # Errors
    ///
    /// Returns the store error when the policy cannot be read.
    pub async fn list(&self, policy_id: &str) -> Result<BackupPolicy, P::Error> {
        self.store.get_policy(self.region, policy_id).await
    }

    /// Appends a new schedule to the policy.
    ///
    /// Existing schedules, including ones with the same key, are kept.
    ///
    /// # Errors
    ///
    /// Returns the store error when reading or replacing fails.
    pub async fn add(
        &self,
        policy_id: &str,
        request: ScheduleRequest,
    ) -> Result<BackupPolicy, P::Error> {
        let policy = self.list(policy_id).await?;
        let schedule = request.into_schedule();
        let updated = with_added(&policy.schedules, schedule);
        let replaced = self.replace(policy_id, &updated).await?;
        info!(
            policy = %replaced.display_name,
            key = %request.key(),
            schedules = replaced.schedules.len(),
            "added backup schedule"
        );
        Ok(replaced)
    }

    /// Reports whether the policy's first schedule has `key`.
    ///
    /// See [`schedule_exists`] for the exact semantics.
    ///
    /// # Errors
    ///
    /// Returns the store error when the policy cannot be read.
    pub async fn exists(&self, policy_id: &str, key: ScheduleKey) -> Result<bool, P::Error> {
        let policy = self.list(policy_id).await?;
        Ok(schedule_exists(&policy.schedules, key))
    }

    /// Removes every schedule matching `key`.
    ///
    /// # Errors
    ///
    /// Returns the store error when reading or replacing fails.
    pub async fn remove(
        &self,
        policy_id: &str,
        key: ScheduleKey,
    ) -> Result<RemoveOutcome, P::Error> {
        let policy = self.list(policy_id).await?;
        let Some(updated) = without_key(&policy.schedules, key) else {
            info!(policy = %policy.display_name, %key, "no schedule matched; policy unchanged");
            return Ok(RemoveOutcome::Unchanged);
        };
        let removed = policy.schedules.len() - updated.len();
        let replaced = self.replace(policy_id, &updated).await?;
        info!(policy = %replaced.display_name, %key, removed, "removed backup schedules");
        Ok(RemoveOutcome::Removed {
            policy: replaced,
            removed,
        })
    }

    async fn replace(
        &self,
        policy_id: &str,
        schedules: &[Schedule],
    ) -> Result<BackupPolicy, P::Error> {
        self.store
            .replace_schedules(self.region, policy_id, schedules)
            .await
    }
}
