//! BDD scenarios for consistency checks and restore pre-flight.

use rstest_bdd_macros::scenario;

use super::test_helpers::{DrContext, dr_context};

#[scenario(
    path = "tests/features/disaster_recovery.feature",
    name = "A lagging block volume leaves the instance partially synchronized"
)]
fn scenario_partially_synchronized(dr_context: DrContext) {
    let _ = dr_context;
}

#[scenario(
    path = "tests/features/disaster_recovery.feature",
    name = "An instance without primary backups is not enabled"
)]
fn scenario_not_enabled(dr_context: DrContext) {
    let _ = dr_context;
}

#[scenario(
    path = "tests/features/disaster_recovery.feature",
    name = "A restore with a missing block backup creates nothing"
)]
fn scenario_restore_count_mismatch(dr_context: DrContext) {
    let _ = dr_context;
}
