//! Shell Integration
//!
//! Runs the interactive `gcloud compute ssh` session.

use std::ffi::OsStr;
use std::process::{Command, Stdio};

use crate::error::{GceError, Result};

/// SSH connection options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    /// Instance name
    pub instance: String,
    /// Zone, short form
    pub zone: String,
}

impl SshOptions {
    pub fn new(instance: &str, zone: &str) -> Self {
        Self {
            instance: instance.to_string(),
            zone: zone.to_string(),
        }
    }

    /// Arguments following the `gcloud` program name
    pub fn args(&self) -> Vec<String> {
        vec![
            "compute".to_string(),
            "ssh".to_string(),
            self.instance.clone(),
            format!("--zone={}", self.zone),
        ]
    }
}

/// Result of a shell operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellResult {
    /// Command completed successfully
    Success,
    /// Command failed with exit code
    Failed(i32),
    /// Command was terminated by a signal
    Interrupted,
}

/// Execute SSH to a GCE instance through `gcloud`
///
/// Blocks until the session ends.
pub fn ssh_to_instance(gcloud: &OsStr, opts: &SshOptions) -> Result<ShellResult> {
    let args = opts.args();

    tracing::info!("Executing: {} {}", gcloud.to_string_lossy(), args.join(" "));

    execute_command(gcloud, &args)
}

/// Execute a command, inheriting stdio
fn execute_command(cmd: &OsStr, args: &[String]) -> Result<ShellResult> {
    let launch_error = |source| GceError::Launch {
        command: cmd.to_string_lossy().into_owned(),
        source,
    };

    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(launch_error)?;

    let status = child.wait().map_err(launch_error)?;

    let result = if status.success() {
        ShellResult::Success
    } else {
        match status.code() {
            Some(code) => ShellResult::Failed(code),
            None => ShellResult::Interrupted,
        }
    };

    Ok(result)
}
