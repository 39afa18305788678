//! Errors raised by the OCI CLI adapter.

use thiserror::Error;

use crate::command::CommandError;

/// Errors returned by [`super::OciCli`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OciCliError {
    /// Raised when configuration is missing required values.
    #[error("missing {field}")]
    InvalidConfig {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Raised when `oci` returns a non-zero exit status.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (typically `oci`).
        program: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when JSON output from the CLI cannot be parsed.
    #[error("failed to parse {resource} output: {message}")]
    Parse {
        /// Resource type being parsed (for example `boot-volume-backup`).
        resource: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a request cannot be expressed as CLI arguments.
    #[error("failed to encode {what}: {message}")]
    Encode {
        /// What was being encoded.
        what: String,
        /// Encoder error message.
        message: String,
    },
    /// Raised when command execution fails.
    #[error(transparent)]
    Runner(#[from] CommandError),
}
