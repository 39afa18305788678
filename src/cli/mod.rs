//! Command-line interface definitions for the `drbridge` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.
//! Arguments stay textual here and are parsed into domain types by the
//! binary, since the build script cannot see the library crate.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `drbridge` binary.
#[derive(Debug, Parser)]
#[command(
    name = "drbridge",
    about = "Check cross-region backup health and rebuild OCI instances in a DR region",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace). `RUST_LOG` wins
    /// when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(crate) verbose: u8,
    /// Subcommand to run.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Subcommands of `drbridge`.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Compare an instance's backups in the primary and secondary regions.
    #[command(name = "status")]
    Status(InstanceArgs),
    /// Report whether each volume of an instance has a usable replica.
    #[command(name = "replicas")]
    Replicas(InstanceArgs),
    /// Rebuild an instance in the secondary region from its newest backups.
    #[command(name = "restore")]
    Restore(RebuildArgs),
    /// Rebuild an instance in the secondary region from its volume replicas.
    #[command(name = "clone")]
    Clone(RebuildArgs),
    /// Inspect and edit backup policy schedules.
    #[command(subcommand, name = "schedule")]
    Schedule(ScheduleCommand),
}

/// Selects a source instance.
#[derive(Debug, Args)]
pub(crate) struct InstanceArgs {
    /// OCID of the instance in the primary region.
    #[arg(long, value_name = "OCID")]
    pub(crate) instance_id: String,
}

/// Arguments for `restore` and `clone`.
#[derive(Debug, Args)]
pub(crate) struct RebuildArgs {
    /// OCID of the instance in the primary region.
    #[arg(long, value_name = "OCID")]
    pub(crate) instance_id: String,
    /// Display name for the new instance; must not already exist.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: String,
    /// Availability domain in the secondary region.
    #[arg(long, value_name = "AD")]
    pub(crate) availability_domain: String,
    /// Subnet for the new instance's primary VNIC.
    #[arg(long, value_name = "OCID")]
    pub(crate) subnet_id: String,
    /// Private IPv4 address inside the subnet.
    #[arg(long, value_name = "ADDRESS")]
    pub(crate) private_ip: String,
    /// Target compartment; defaults to the configured compartment.
    #[arg(long, value_name = "OCID")]
    pub(crate) compartment_id: Option<String>,
}

/// `drbridge schedule` subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum ScheduleCommand {
    /// Print a policy's schedules.
    #[command(name = "list")]
    List(PolicyArgs),
    /// Append a schedule to a policy.
    #[command(name = "add")]
    Add(AddScheduleArgs),
    /// Remove every schedule matching a key.
    #[command(name = "remove")]
    Remove(ScheduleKeyArgs),
    /// Exit 0 when a schedule with the key exists, 1 otherwise.
    #[command(name = "exists")]
    Exists(ScheduleKeyArgs),
}

/// Selects a backup policy.
#[derive(Debug, Args)]
pub(crate) struct PolicyArgs {
    /// OCID of the volume backup policy.
    #[arg(long, value_name = "OCID")]
    pub(crate) policy_id: String,
}

/// Identifies a schedule by backup type, period, and start hour.
#[derive(Debug, Args)]
pub(crate) struct ScheduleKeyArgs {
    /// Policy to operate on.
    #[command(flatten)]
    pub(crate) policy: PolicyArgs,
    /// FULL or INCREMENTAL.
    #[arg(long, value_name = "TYPE")]
    pub(crate) backup_type: String,
    /// ONE_HOUR, ONE_DAY, ONE_WEEK, ONE_MONTH, or ONE_YEAR.
    #[arg(long, value_name = "PERIOD")]
    pub(crate) period: String,
    /// Hour of day the schedule starts (0-23).
    #[arg(long, value_name = "HOUR")]
    pub(crate) start_hour: u8,
}

/// Arguments for `schedule add`.
#[derive(Debug, Args)]
pub(crate) struct AddScheduleArgs {
    /// Key of the new schedule.
    #[command(flatten)]
    pub(crate) key: ScheduleKeyArgs,
    /// Days to keep each backup (1-2549).
    #[arg(long, value_name = "DAYS")]
    pub(crate) retention_days: u32,
    /// Weekday for ONE_WEEK schedules, for example MONDAY.
    #[arg(long, value_name = "DAY")]
    pub(crate) day_of_week: Option<String>,
    /// Month for ONE_YEAR schedules, for example JANUARY.
    #[arg(long, value_name = "MONTH")]
    pub(crate) month: Option<String>,
}
