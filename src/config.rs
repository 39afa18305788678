//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::oci::{OciCliConfig, OciCliError};
use crate::region::RegionPair;
use crate::wait::{WaitPolicies, WaitPolicy};

/// Settings shared by every `drbridge` command, merged from defaults,
/// `drbridge.toml`, and `DRBRIDGE_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "DRBRIDGE",
    discovery(
        app_name = "drbridge",
        env_var = "DRBRIDGE_CONFIG_PATH",
        config_file_name = "drbridge.toml",
        dotfile_name = ".drbridge.toml",
        project_file_name = "drbridge.toml"
    )
)]
pub struct DrConfig {
    /// Path to the `oci` CLI binary.
    #[ortho_config(default = "oci".to_owned())]
    pub oci_bin: String,
    /// Profile in the OCI CLI configuration file.
    pub oci_profile: Option<String>,
    /// Alternative OCI CLI configuration file; `~/` expands to `$HOME`.
    pub oci_config_file: Option<String>,
    /// Tenancy OCID, used for region subscription checks.
    pub tenancy_id: String,
    /// Compartment holding the protected instances.
    pub compartment_id: String,
    /// Region hosting the live workload.
    pub primary_region: String,
    /// Region receiving backups and replicas.
    pub secondary_region: String,
    /// Seconds between lifecycle polls.
    #[ortho_config(default = 10)]
    pub poll_interval_secs: u64,
    /// Upper bound for volume creation, in seconds.
    #[ortho_config(default = 1800)]
    pub volume_timeout_secs: u64,
    /// Upper bound for instance launch and power transitions, in seconds.
    #[ortho_config(default = 1200)]
    pub instance_timeout_secs: u64,
    /// Upper bound for volume attachment, in seconds.
    #[ortho_config(default = 600)]
    pub attachment_timeout_secs: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "set {} or add {} to drbridge.toml",
            self.env_var, self.toml_key
        )
    }
}

const REQUIRED_FIELDS: [FieldMetadata; 5] = [
    FieldMetadata::new("OCI CLI binary", "DRBRIDGE_OCI_BIN", "oci_bin"),
    FieldMetadata::new("tenancy OCID", "DRBRIDGE_TENANCY_ID", "tenancy_id"),
    FieldMetadata::new("compartment OCID", "DRBRIDGE_COMPARTMENT_ID", "compartment_id"),
    FieldMetadata::new("primary region", "DRBRIDGE_PRIMARY_REGION", "primary_region"),
    FieldMetadata::new("secondary region", "DRBRIDGE_SECONDARY_REGION", "secondary_region"),
];

/// Largest accepted poll interval or timeout: one day.
pub const MAX_DURATION_SECS: u64 = 86_400;

const DURATION_FIELDS: [FieldMetadata; 4] = [
    FieldMetadata::new("poll interval", "DRBRIDGE_POLL_INTERVAL_SECS", "poll_interval_secs"),
    FieldMetadata::new("volume timeout", "DRBRIDGE_VOLUME_TIMEOUT_SECS", "volume_timeout_secs"),
    FieldMetadata::new(
        "instance timeout",
        "DRBRIDGE_INSTANCE_TIMEOUT_SECS",
        "instance_timeout_secs",
    ),
    FieldMetadata::new(
        "attachment timeout",
        "DRBRIDGE_ATTACHMENT_TIMEOUT_SECS",
        "attachment_timeout_secs",
    ),
];

impl DrConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("drbridge")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and TOML key that supply each value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is blank,
    /// [`ConfigError::ZeroDuration`] when a poll interval or timeout is zero,
    /// [`ConfigError::DurationTooLong`] when one exceeds
    /// [`MAX_DURATION_SECS`], and [`ConfigError::SameRegion`] when both
    /// regions are equal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            &self.oci_bin,
            &self.tenancy_id,
            &self.compartment_id,
            &self.primary_region,
            &self.secondary_region,
        ];
        for (value, metadata) in required.into_iter().zip(&REQUIRED_FIELDS) {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "{}: {}",
                    metadata.description,
                    metadata.hint()
                )));
            }
        }

        let durations = [
            self.poll_interval_secs,
            self.volume_timeout_secs,
            self.instance_timeout_secs,
            self.attachment_timeout_secs,
        ];
        for (value, metadata) in durations.into_iter().zip(&DURATION_FIELDS) {
            if value == 0 {
                return Err(ConfigError::ZeroDuration(format!(
                    "{} must be greater than zero: {}",
                    metadata.description,
                    metadata.hint()
                )));
            }
            if value > MAX_DURATION_SECS {
                return Err(ConfigError::DurationTooLong(format!(
                    "{} of {value} seconds exceeds {MAX_DURATION_SECS}: {}",
                    metadata.description,
                    metadata.hint()
                )));
            }
        }

        if self.primary_region.trim() == self.secondary_region.trim() {
            return Err(ConfigError::SameRegion(self.primary_region.trim().to_owned()));
        }
        Ok(())
    }

    /// Primary/secondary pair every workflow runs against.
    #[must_use]
    pub fn regions(&self) -> RegionPair {
        RegionPair::new(self.primary_region.as_str(), self.secondary_region.as_str())
    }

    /// Wait bounds for provisioning calls.
    #[must_use]
    pub const fn wait_policies(&self) -> WaitPolicies {
        let poll = Duration::from_secs(self.poll_interval_secs);
        WaitPolicies {
            volume: WaitPolicy::new(poll, Duration::from_secs(self.volume_timeout_secs)),
            instance: WaitPolicy::new(poll, Duration::from_secs(self.instance_timeout_secs)),
            attachment: WaitPolicy::new(poll, Duration::from_secs(self.attachment_timeout_secs)),
        }
    }

    /// OCI CLI configuration file with a leading `~/` expanded against
    /// `$HOME`.
    #[must_use]
    pub fn oci_config_path(&self) -> Option<Utf8PathBuf> {
        let raw = self.oci_config_file.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match (raw.strip_prefix("~/"), std::env::var("HOME")) {
            (Some(rest), Ok(home)) => Some(Utf8PathBuf::from(home).join(rest)),
            _ => Some(Utf8PathBuf::from(raw)),
        }
    }

    /// Settings for the OCI CLI provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn oci_cli_config(&self) -> Result<OciCliConfig, ConfigError> {
        self.validate()?;
        let config = OciCliConfig::new(self.oci_bin.as_str(), self.tenancy_id.as_str())?;
        Ok(config
            .with_profile(self.oci_profile.clone())
            .with_config_file(self.oci_config_path().map(Utf8PathBuf::into_string)))
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a poll interval or timeout of zero.
    #[error("invalid duration: {0}")]
    ZeroDuration(String),
    /// Indicates a poll interval or timeout above [`MAX_DURATION_SECS`].
    #[error("invalid duration: {0}")]
    DurationTooLong(String),
    /// Indicates primary and secondary regions are the same.
    #[error("primary and secondary region are both {0}; they must differ")]
    SameRegion(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// Surfaces provider configuration errors.
    #[error("invalid provider configuration: {0}")]
    Provider(#[from] OciCliError),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
