//! Process-backed gcloud

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Output};

use super::Gcloud;
use crate::error::{GceError, Result};
use crate::shell::{self, ShellResult, SshOptions};

pub const DEFAULT_GCLOUD: &str = "gcloud";

/// Maximum length of stderr to carry into an error message
const MAX_STDERR_LENGTH: usize = 500;

/// Runs the `gcloud` binary found on the PATH (or at an explicit path)
#[derive(Debug, Clone)]
pub struct GcloudCli {
    program: OsString,
}

impl GcloudCli {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn resolve(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|e| GceError::GcloudUnavailable {
            reason: format!("{}: {}", self.program.to_string_lossy(), e),
        })
    }

    fn run(&self, args: &[&str]) -> std::io::Result<Output> {
        tracing::debug!("Running: {} {}", self.program.to_string_lossy(), args.join(" "));
        Command::new(&self.program).args(args).output()
    }
}

impl Gcloud for GcloudCli {
    fn probe(&self) -> Result<String> {
        let path = self.resolve()?;
        tracing::debug!("Found gcloud at {:?}", path);

        let output = self
            .run(&["version"])
            .map_err(|e| GceError::GcloudUnavailable {
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(GceError::GcloudUnavailable {
                reason: failure_reason(&output),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn list_instances(&self) -> Result<String> {
        let output = self
            .run(&["compute", "instances", "list", "--format=json"])
            .map_err(|e| GceError::ListFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(GceError::ListFailed(failure_reason(&output)));
        }

        String::from_utf8(output.stdout).map_err(|e| GceError::InvalidListing {
            source_name: "gcloud compute instances list".to_string(),
            message: e.to_string(),
        })
    }

    fn connect(&self, opts: &SshOptions) -> Result<ShellResult> {
        shell::ssh_to_instance(&self.program, opts)
    }
}

/// Exit status plus the (truncated) stderr of a failed command
fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();

    let stderr = if stderr.len() > MAX_STDERR_LENGTH {
        let cut = (0..=MAX_STDERR_LENGTH)
            .rev()
            .find(|&i| stderr.is_char_boundary(i))
            .unwrap_or(0);
        format!("{}... [truncated]", &stderr[..cut])
    } else {
        stderr.to_string()
    };

    if stderr.is_empty() {
        output.status.to_string()
    } else {
        format!("{}: {}", output.status, stderr)
    }
}
