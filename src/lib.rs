//! gcloudssh
//!
//! Resolve a Compute Engine instance name to its zone from a cached
//! `gcloud compute instances list` and open `gcloud compute ssh` to it.
//!
//! # Module Structure
//!
//! - [`session`] - Per-run state: directory loading, lookups, connect
//! - [`cache`] - The `~/.gcetools/instances` listing cache
//! - [`resource`] - Instance records, the directory and its indexes
//! - [`gcp`] - The [`gcp::Gcloud`] seam and its process-backed implementation
//! - [`shell`] - Interactive session execution
//! - [`config`] - Optional user configuration
//! - [`error`] - Error types

pub mod cache;
pub mod config;
pub mod error;
pub mod gcp;
pub mod resource;
pub mod session;
pub mod shell;

pub use error::{GceError, Result};
pub use session::Session;
