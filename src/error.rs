//! Error types
//!
//! Every failure here is fatal for the run; the binary prints it and exits.

use std::path::PathBuf;

use thiserror::Error;

/// Where to send users who don't have the Cloud SDK installed
pub const SDK_INSTALL_URL: &str = "https://cloud.google.com/sdk/";

#[derive(Debug, Error)]
pub enum GceError {
    /// `gcloud` is not on the PATH, or `gcloud version` failed
    #[error(
        "Failed to run 'gcloud version': {reason}\n\
         That means you don't have gcloud installed or it's not part of the path.\n\
         To install gcloud see {url}",
        url = SDK_INSTALL_URL
    )]
    GcloudUnavailable { reason: String },

    /// `gcloud compute instances list` could not be run or exited non-zero
    #[error("Failed to list compute instances: {0}")]
    ListFailed(String),

    /// The listing (live or cached) was not a JSON array of instances
    #[error("Invalid instance listing from {source_name}: {message}")]
    InvalidListing { source_name: String, message: String },

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// `gcloud compute ssh` could not be started
    #[error("Failed to launch {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache I/O error at {}: {source}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No home directory found for the instance cache")]
    NoHomeDir,
}

pub type Result<T> = std::result::Result<T, GceError>;
