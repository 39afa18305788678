//! Binary entry point for the `drbridge` CLI.

use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::process;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use drbridge::command::CommandRunner;
use drbridge::schedule::{
    BackupType, Month, Period, ScheduleKey, ScheduleRequest, ScheduleValidationError, Weekday,
};
use drbridge::{
    CloneOrchestrator, ConfigError, ConsistencyScanner, DrConfig, OciCli, OciCliError,
    OrchestrationError, RestoreOrchestrator, ScheduleManager, TargetPlacement,
};

mod cli;

use cli::{AddScheduleArgs, Cli, Command, RebuildArgs, ScheduleCommand, ScheduleKeyArgs};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleValidationError),
    #[error("OCI request failed: {0}")]
    Provider(#[from] OciCliError),
    #[error("{0}")]
    Orchestration(Box<OrchestrationError<OciCliError>>),
    #[error("failed to write output: {0}")]
    Output(String),
}

impl From<OrchestrationError<OciCliError>> for CliError {
    fn from(value: OrchestrationError<OciCliError>) -> Self {
        Self::Orchestration(Box::new(value))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let exit_code = match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

async fn run(command: Command) -> Result<i32, CliError> {
    let config = DrConfig::load_without_cli_args()?;
    let cloud = OciCli::with_process_runner(config.oci_cli_config()?);
    execute(command, &cloud, &config, &mut io::stdout()).await
}

async fn execute<R>(
    command: Command,
    cloud: &OciCli<R>,
    config: &DrConfig,
    out: &mut impl Write,
) -> Result<i32, CliError>
where
    R: CommandRunner + Sync,
{
    let regions = config.regions();
    match command {
        Command::Status(args) => {
            let scanner = ConsistencyScanner::new(cloud, &regions);
            let report = scanner.backup_report(&args.instance_id).await?;
            emit(out, &report)?;
            Ok(0)
        }
        Command::Replicas(args) => {
            let scanner = ConsistencyScanner::new(cloud, &regions);
            let report = scanner.replica_report(&args.instance_id).await?;
            emit(out, &report)?;
            Ok(0)
        }
        Command::Restore(args) => {
            let placement = placement(&args, config)?;
            let orchestrator = RestoreOrchestrator::new(cloud, &regions, config.wait_policies());
            let outcome = orchestrator.restore(&args.instance_id, &placement).await?;
            emit(out, &outcome)?;
            Ok(0)
        }
        Command::Clone(args) => {
            let placement = placement(&args, config)?;
            let orchestrator = CloneOrchestrator::new(cloud, &regions, config.wait_policies());
            let outcome = orchestrator
                .clone_instance(&args.instance_id, &placement)
                .await?;
            emit(out, &outcome)?;
            Ok(0)
        }
        Command::Schedule(schedule) => {
            let manager = ScheduleManager::new(cloud, &regions.primary);
            match schedule {
                ScheduleCommand::List(args) => {
                    let policy = manager.list(&args.policy_id).await?;
                    emit(out, &policy)?;
                    Ok(0)
                }
                ScheduleCommand::Add(args) => {
                    let request = schedule_request(&args)?;
                    let policy = manager.add(&args.key.policy.policy_id, request).await?;
                    emit(out, &policy)?;
                    Ok(0)
                }
                ScheduleCommand::Remove(args) => {
                    let outcome = manager
                        .remove(&args.policy.policy_id, schedule_key(&args)?)
                        .await?;
                    emit(out, &outcome)?;
                    Ok(0)
                }
                ScheduleCommand::Exists(args) => {
                    let key = schedule_key(&args)?;
                    let exists = manager.exists(&args.policy.policy_id, key).await?;
                    info!(policy = %args.policy.policy_id, %key, exists, "checked schedule");
                    emit(out, &exists)?;
                    Ok(i32::from(!exists))
                }
            }
        }
    }
}

fn placement(args: &RebuildArgs, config: &DrConfig) -> Result<TargetPlacement, CliError> {
    let private_ip: Ipv4Addr = args.private_ip.trim().parse().map_err(|_| {
        CliError::Argument(format!(
            "--private-ip '{}' is not an IPv4 address",
            args.private_ip
        ))
    })?;
    let compartment_id = args
        .compartment_id
        .as_deref()
        .unwrap_or(config.compartment_id.as_str());
    TargetPlacement::builder()
        .display_name(args.name.as_str())
        .compartment_id(compartment_id)
        .availability_domain(args.availability_domain.as_str())
        .subnet_id(args.subnet_id.as_str())
        .private_ip(private_ip)
        .build()
        .map_err(|err| CliError::Argument(err.to_string()))
}

fn schedule_key(args: &ScheduleKeyArgs) -> Result<ScheduleKey, CliError> {
    let backup_type: BackupType = args.backup_type.parse()?;
    let period: Period = args.period.parse()?;
    Ok(ScheduleKey::new(backup_type, period, args.start_hour)?)
}

fn schedule_request(args: &AddScheduleArgs) -> Result<ScheduleRequest, CliError> {
    let day_of_week = args
        .day_of_week
        .as_deref()
        .map(str::parse::<Weekday>)
        .transpose()?;
    let month = args.month.as_deref().map(str::parse::<Month>).transpose()?;
    Ok(
        ScheduleRequest::new(schedule_key(&args.key)?, args.retention_days)?
            .day_of_week(day_of_week)
            .month(month),
    )
}

fn emit<T: Serialize>(out: &mut impl Write, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(out).map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
    if let CliError::Orchestration(failure) = err {
        if failure.side_effects_possible() {
            writeln!(
                target,
                "resources created before the {} stage failed were left in place; \
                 the warning log lists their identifiers",
                failure.stage()
            )
            .ok();
        }
    }
}
