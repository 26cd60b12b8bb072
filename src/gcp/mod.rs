//! gcloud CLI interaction
//!
//! Everything this tool needs from Google Cloud goes through three `gcloud`
//! invocations. They sit behind the [`Gcloud`] trait so the session can be
//! driven by a fake in tests.
//!
//! # Module Structure
//!
//! - [`cli`] - [`GcloudCli`], the implementation that runs the real binary

pub mod cli;

pub use cli::GcloudCli;

use crate::error::Result;
use crate::shell::{ShellResult, SshOptions};

pub trait Gcloud {
    /// Check that gcloud is usable; returns the `gcloud version` output
    fn probe(&self) -> Result<String>;

    /// Raw JSON from `gcloud compute instances list --format=json`
    fn list_instances(&self) -> Result<String>;

    /// Run an interactive `gcloud compute ssh` session to completion
    fn connect(&self, opts: &SshOptions) -> Result<ShellResult>;
}
