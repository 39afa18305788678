//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::command::{CommandError, CommandOutput, CommandRunner};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
/// Clones share the same script and invocation log.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Returns the value following `flag`, if present.
    #[must_use]
    pub fn flag_value(&self, flag: &str) -> Option<String> {
        self.args
            .iter()
            .skip_while(|arg| arg.as_os_str() != flag)
            .nth(1)
            .map(|value| value.to_string_lossy().into_owned())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    /// Pushes a successful response printing `stdout`.
    pub fn push_json(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a successful response with no output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.push_output(Some(code), "", stderr);
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.responses).push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        lock(&self.invocations).push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        lock(&self.responses)
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets and removes environment variables while holding a global mutex.
    ///
    /// A `None` value removes the variable for the guard's lifetime.
    pub async fn set_vars(pairs: &[(&str, Option<&str>)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}

/// Wraps `data` in the `{"data": ...}` envelope printed by the `oci` CLI.
#[must_use]
pub fn oci_envelope(data: &str) -> String {
    format!("{{\"data\":{data}}}")
}

/// Produces a `compute instance get` payload.
#[must_use]
pub fn json_instance(id: &str, name: &str, shape: &str, state: &str) -> String {
    oci_envelope(&format!(
        concat!(
            "{{\"id\":\"{id}\",\"display-name\":\"{name}\",\"shape\":\"{shape}\",",
            "\"shape-config\":{{\"ocpus\":2.0,\"memory-in-gbs\":32.0}},",
            "\"lifecycle-state\":\"{state}\",\"availability-domain\":\"AD-1\",",
            "\"compartment-id\":\"ocid1.compartment.oc1..prod\"}}"
        ),
        id = id,
        name = name,
        shape = shape,
        state = state,
    ))
}

/// Produces a single volume object (without the envelope).
#[must_use]
pub fn json_volume_object(id: &str, name: &str, state: &str, replica_ids: &[&str]) -> String {
    let replicas = replica_ids
        .iter()
        .map(|replica| format!("{{\"block-volume-replica-id\":\"{replica}\"}}"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        concat!(
            "{{\"id\":\"{id}\",\"display-name\":\"{name}\",\"size-in-gbs\":50,",
            "\"availability-domain\":\"AD-1\",\"compartment-id\":\"ocid1.compartment.oc1..prod\",",
            "\"lifecycle-state\":\"{state}\",\"block-volume-replicas\":[{replicas}]}}"
        ),
        id = id,
        name = name,
        state = state,
        replicas = replicas,
    )
}

/// Produces a list of attachments as printed by `volume-attachment list`.
#[must_use]
pub fn json_attachments(instance_id: &str, items: &[(&str, &str, &str)]) -> String {
    let entries = items
        .iter()
        .map(|(id, volume_id, state)| {
            format!(
                "{{\"id\":\"{id}\",\"instance-id\":\"{instance_id}\",\"volume-id\":\"{volume_id}\",\"lifecycle-state\":\"{state}\"}}"
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    oci_envelope(&format!("[{entries}]"))
}
