//! Instance listing cache
//!
//! Keeps the last raw `gcloud compute instances list` output on disk at
//! `~/.gcetools/instances`. Freshness comes from the file's creation time,
//! not from anything stored inside it.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use tempfile::NamedTempFile;

use crate::error::{GceError, Result};

/// Cache directory under the user's home
pub const CACHE_DIR_NAME: &str = ".gcetools";

pub const CACHE_FILE_NAME: &str = "instances";

/// How long a cached listing stays valid unless configured otherwise
pub const DEFAULT_CACHE_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct InstanceCache {
    path: PathBuf,
}

impl InstanceCache {
    /// Cache stored in `dir`, which is created on first write
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CACHE_FILE_NAME),
        }
    }

    /// The default `~/.gcetools` directory
    pub fn default_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CACHE_DIR_NAME))
            .ok_or(GceError::NoHomeDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the cache file was created, or `None` if there is no cache file
    ///
    /// Falls back to the modification time on filesystems that don't
    /// record creation times.
    pub fn created_at(&self) -> Result<Option<SystemTime>> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(|e| self.io_error(e))?;

        Ok(Some(created))
    }

    /// Read the cached listing if it is younger than `expiration` at `now`
    pub fn read_fresh(&self, expiration: Duration, now: SystemTime) -> Result<Option<String>> {
        let Some(created) = self.created_at()? else {
            tracing::debug!("No instance cache at {:?}", self.path);
            return Ok(None);
        };

        // A creation time in the future (clock skew) counts as brand new
        let age = now.duration_since(created).unwrap_or(Duration::ZERO);
        let created_local: DateTime<Local> = created.into();

        if age >= expiration {
            tracing::debug!(
                "Instance cache from {} is {}s old, expired after {}s",
                created_local.format("%Y-%m-%d %H:%M:%S"),
                age.as_secs(),
                expiration.as_secs()
            );
            return Ok(None);
        }

        tracing::debug!(
            "Using instance cache from {}",
            created_local.format("%Y-%m-%d %H:%M:%S")
        );

        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| self.io_error(e))
    }

    /// Replace the cached listing with `raw`
    ///
    /// Writes a uniquely named temp file next to the cache and renames it
    /// into place, so concurrent runs never share a temp file, the cache
    /// file is always whole, and its creation time is the time of this write.
    pub fn write(&self, raw: &str) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));

        fs::create_dir_all(parent).map_err(|e| GceError::Cache {
            path: parent.to_path_buf(),
            source: e,
        })?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| GceError::Cache {
            path: parent.to_path_buf(),
            source: e,
        })?;
        let tmp_path = tmp.path().to_path_buf();

        tmp.write_all(raw.as_bytes()).map_err(|e| GceError::Cache {
            path: tmp_path.clone(),
            source: e,
        })?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::debug!("Wrote {} bytes to instance cache {:?}", raw.len(), self.path);
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> GceError {
        GceError::Cache {
            path: self.path.clone(),
            source,
        }
    }
}
