//! Per-run session state
//!
//! A [`Session`] owns everything one invocation needs: the gcloud backend,
//! the on-disk cache, the memoized availability check and the loaded
//! directory with its indexes.

use std::time::{Duration, SystemTime};

use crate::cache::InstanceCache;
use crate::error::{GceError, Result};
use crate::gcp::Gcloud;
use crate::resource::{Directory, Instance};
use crate::shell::{ShellResult, SshOptions};

/// Label for errors in live listing output
const LIVE_SOURCE: &str = "gcloud compute instances list";

pub struct Session<G> {
    gcloud: G,
    cache: InstanceCache,
    /// Outcome of the first gcloud check; the failure reason when it failed
    gcloud_check: Option<std::result::Result<(), String>>,
    directory: Option<Directory>,
}

impl<G: Gcloud> Session<G> {
    pub fn new(gcloud: G, cache: InstanceCache) -> Self {
        Self {
            gcloud,
            cache,
            gcloud_check: None,
            directory: None,
        }
    }

    /// Session with a directory already loaded
    pub fn with_directory(gcloud: G, cache: InstanceCache, directory: Directory) -> Self {
        Self {
            directory: Some(directory),
            ..Self::new(gcloud, cache)
        }
    }

    pub fn gcloud(&self) -> &G {
        &self.gcloud
    }

    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    /// Verify gcloud is usable, probing at most once per session
    pub fn ensure_gcloud(&mut self) -> Result<()> {
        match &self.gcloud_check {
            Some(Ok(())) => Ok(()),
            Some(Err(reason)) => Err(GceError::GcloudUnavailable {
                reason: reason.clone(),
            }),
            None => match self.gcloud.probe() {
                Ok(version) => {
                    self.gcloud_check = Some(Ok(()));
                    tracing::debug!(
                        "gcloud available: {}",
                        version.lines().next().unwrap_or_default()
                    );
                    Ok(())
                }
                Err(e) => {
                    let reason = match &e {
                        GceError::GcloudUnavailable { reason } => reason.clone(),
                        other => other.to_string(),
                    };
                    self.gcloud_check = Some(Err(reason));
                    Err(e)
                }
            },
        }
    }

    /// Load the instance directory, from the cache when it is fresh
    ///
    /// With `use_cache` set and no `force_refresh`, a cache file younger
    /// than `expiration` is returned without calling gcloud. Otherwise the
    /// live listing is fetched and, when caching or forcing, written back.
    /// The indexes are rebuilt either way.
    pub fn load_directory(
        &mut self,
        use_cache: bool,
        expiration: Duration,
        force_refresh: bool,
    ) -> Result<&Directory> {
        if use_cache && !force_refresh {
            if let Some(raw) = self.cache.read_fresh(expiration, SystemTime::now())? {
                let source = self.cache.path().display().to_string();
                let directory = Directory::parse(raw, &source)?;
                tracing::info!("Loaded {} instances from cache", directory.len());
                return Ok(&*self.directory.insert(directory));
            }
        }

        self.ensure_gcloud()?;

        let raw = self.gcloud.list_instances()?;
        let directory = Directory::parse(raw, LIVE_SOURCE)?;
        tracing::info!("Fetched {} instances from gcloud", directory.len());

        if use_cache || force_refresh {
            self.cache.write(directory.raw())?;
        }

        Ok(&*self.directory.insert(directory))
    }

    /// The directory from the last load, if any
    pub fn directory(&self) -> Option<&Directory> {
        self.directory.as_ref()
    }

    pub fn instance_by_name(&self, name: &str) -> Option<&Instance> {
        self.directory.as_ref()?.instance_by_name(name)
    }

    pub fn instance_by_ip(&self, ip: &str) -> Option<&Instance> {
        self.directory.as_ref()?.instance_by_ip(ip)
    }

    pub fn zone_by_name(&self, name: &str) -> Option<&str> {
        self.directory.as_ref()?.zone_by_name(name)
    }

    /// Resolve `name` to its zone and run an interactive session
    ///
    /// Fails before launching anything when the name (or its zone) is not
    /// in the loaded directory.
    pub fn connect(&self, name: &str) -> Result<ShellResult> {
        let Some(zone) = self.zone_by_name(name) else {
            if self.instance_by_name(name).is_some() {
                tracing::warn!("Instance {} has no zone in the listing", name);
            }
            return Err(GceError::InstanceNotFound(name.to_string()));
        };

        tracing::info!("Connecting to {} in {}", name, zone);

        let result = self.gcloud.connect(&SshOptions::new(name, zone))?;
        tracing::info!("Session to {} ended: {:?}", name, result);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    const WEB1: &str = r#"[{"name":"web-1","zone":"us-central1-a","networkInterfaces":[{"accessConfigs":[{"natIP":"1.2.3.4"}]}]}]"#;
    const WEB2: &str = r#"[{"name":"web-2","zone":"europe-west1-b","networkInterfaces":[{"accessConfigs":[{"natIP":"5.6.7.8"}]}]}]"#;
    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    struct FakeGcloud {
        /// `None` makes the listing command fail
        listing: Option<String>,
        available: bool,
        probes: Cell<usize>,
        lists: Cell<usize>,
        connects: RefCell<Vec<SshOptions>>,
    }

    impl FakeGcloud {
        fn listing(raw: &str) -> Self {
            Self {
                listing: Some(raw.to_string()),
                available: true,
                probes: Cell::new(0),
                lists: Cell::new(0),
                connects: RefCell::new(Vec::new()),
            }
        }

        fn failing_list() -> Self {
            Self {
                listing: None,
                ..Self::listing("[]")
            }
        }

        fn not_installed() -> Self {
            Self {
                available: false,
                ..Self::listing(WEB1)
            }
        }
    }

    impl Gcloud for FakeGcloud {
        fn probe(&self) -> Result<String> {
            self.probes.set(self.probes.get() + 1);
            if self.available {
                Ok("Google Cloud SDK 500.0.0\n".to_string())
            } else {
                Err(GceError::GcloudUnavailable {
                    reason: "not found".to_string(),
                })
            }
        }

        fn list_instances(&self) -> Result<String> {
            self.lists.set(self.lists.get() + 1);
            self.listing
                .clone()
                .ok_or_else(|| GceError::ListFailed("exit status: 1".to_string()))
        }

        fn connect(&self, opts: &SshOptions) -> Result<ShellResult> {
            self.connects.borrow_mut().push(opts.clone());
            Ok(ShellResult::Success)
        }
    }

    fn session(gcloud: FakeGcloud) -> (tempfile::TempDir, Session<FakeGcloud>) {
        let dir = tempfile::tempdir().unwrap();
        let cache = InstanceCache::new(dir.path().join(".gcetools"));
        (dir, Session::new(gcloud, cache))
    }

    #[test]
    fn test_live_load_writes_cache() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB1));

        let directory = session.load_directory(true, DAY, false).unwrap();
        assert_eq!(directory.len(), 1);

        assert_eq!(session.gcloud().lists.get(), 1);
        assert_eq!(std::fs::read_to_string(session.cache().path()).unwrap(), WEB1);
        assert_eq!(session.zone_by_name("web-1"), Some("us-central1-a"));
    }

    #[test]
    fn test_fresh_cache_skips_gcloud() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB2));
        session.cache().write(WEB1).unwrap();

        session.load_directory(true, DAY, false).unwrap();

        assert_eq!(session.gcloud().probes.get(), 0);
        assert_eq!(session.gcloud().lists.get(), 0);
        assert_eq!(session.directory().unwrap().raw(), WEB1);
        assert_eq!(session.zone_by_name("web-1"), Some("us-central1-a"));
    }

    #[test]
    fn test_expired_cache_fetches_live() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB2));
        session.cache().write(WEB1).unwrap();

        session.load_directory(true, Duration::ZERO, false).unwrap();

        assert_eq!(session.gcloud().lists.get(), 1);
        assert_eq!(session.zone_by_name("web-1"), None);
        assert_eq!(session.zone_by_name("web-2"), Some("europe-west1-b"));
        assert_eq!(std::fs::read_to_string(session.cache().path()).unwrap(), WEB2);
    }

    #[test]
    fn test_force_refresh_bypasses_fresh_cache() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB2));
        session.cache().write(WEB1).unwrap();

        session.load_directory(true, DAY, true).unwrap();

        assert_eq!(session.gcloud().lists.get(), 1);
        assert_eq!(session.instance_by_ip("5.6.7.8").and_then(Instance::name), Some("web-2"));
        assert_eq!(std::fs::read_to_string(session.cache().path()).unwrap(), WEB2);

        // The rewritten cache is fresh for the next run
        session.load_directory(true, DAY, false).unwrap();
        assert_eq!(session.gcloud().lists.get(), 1);
    }

    #[test]
    fn test_cache_disabled_never_touches_disk() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB1));

        session.load_directory(false, DAY, false).unwrap();
        session.load_directory(false, DAY, false).unwrap();

        assert_eq!(session.gcloud().lists.get(), 2);
        assert!(!session.cache().path().exists());
    }

    #[test]
    fn test_probe_is_memoized() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB1));

        session.load_directory(false, DAY, false).unwrap();
        session.load_directory(false, DAY, true).unwrap();

        assert_eq!(session.gcloud().probes.get(), 1);
        assert_eq!(session.gcloud().lists.get(), 2);
    }

    #[test]
    fn test_force_refresh_writes_cache_even_when_disabled() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB1));

        session.load_directory(false, DAY, false).unwrap();
        assert!(!session.cache().path().exists());

        session.load_directory(false, DAY, true).unwrap();
        assert_eq!(std::fs::read_to_string(session.cache().path()).unwrap(), WEB1);
        assert_eq!(session.gcloud().lists.get(), 2);
    }

    #[test]
    fn test_missing_gcloud_is_fatal_and_remembered() {
        let (_dir, mut session) = session(FakeGcloud::not_installed());

        let err = session.load_directory(true, DAY, false).unwrap_err();
        assert!(matches!(err, GceError::GcloudUnavailable { ref reason } if reason == "not found"));

        // The second check keeps the first failure's reason
        let err = session.load_directory(true, DAY, false).unwrap_err();
        assert!(matches!(err, GceError::GcloudUnavailable { ref reason } if reason == "not found"));

        assert_eq!(session.gcloud().probes.get(), 1);
        assert_eq!(session.gcloud().lists.get(), 0);
        assert!(session.directory().is_none());
    }

    #[test]
    fn test_list_failure_is_fatal() {
        let (_dir, mut session) = session(FakeGcloud::failing_list());

        let err = session.load_directory(true, DAY, false).unwrap_err();

        assert!(matches!(err, GceError::ListFailed(_)));
        assert!(session.directory().is_none());
        assert!(!session.cache().path().exists());
    }

    #[test]
    fn test_malformed_cache_is_fatal() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB1));
        session.cache().write("[{\"name\": ").unwrap();

        let err = session.load_directory(true, DAY, false).unwrap_err();

        assert!(matches!(err, GceError::InvalidListing { .. }));
        assert_eq!(session.gcloud().lists.get(), 0);
    }

    #[test]
    fn test_malformed_live_output_is_not_cached() {
        let (_dir, mut session) = session(FakeGcloud::listing("Listed 0 items."));

        let err = session.load_directory(true, DAY, false).unwrap_err();

        assert!(matches!(err, GceError::InvalidListing { .. }));
        assert!(!session.cache().path().exists());
    }

    #[test]
    fn test_lookups_before_load() {
        let (_dir, session) = session(FakeGcloud::listing(WEB1));
        assert!(session.instance_by_name("web-1").is_none());
        assert!(session.zone_by_name("web-1").is_none());
    }

    #[test]
    fn test_connect_uses_resolved_zone() {
        let (_dir, mut session) = session(FakeGcloud::listing(WEB1));
        session.load_directory(false, DAY, false).unwrap();

        let result = session.connect("web-1").unwrap();

        assert_eq!(result, ShellResult::Success);
        assert_eq!(
            *session.gcloud().connects.borrow(),
            vec![SshOptions::new("web-1", "us-central1-a")]
        );
    }

    #[test]
    fn test_connect_unknown_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::parse(WEB1.to_string(), "test").unwrap();
        let session = Session::with_directory(
            FakeGcloud::listing(WEB1),
            InstanceCache::new(dir.path()),
            directory,
        );

        let err = session.connect("missing").unwrap_err();

        assert!(matches!(err, GceError::InstanceNotFound(ref n) if n == "missing"));
        assert!(session.gcloud().connects.borrow().is_empty());
    }

    #[test]
    fn test_connect_without_zone_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let directory = Directory::parse(r#"[{"name":"zoneless"}]"#.to_string(), "test").unwrap();
        let session = Session::with_directory(
            FakeGcloud::listing("[]"),
            InstanceCache::new(dir.path()),
            directory,
        );

        assert!(session.instance_by_name("zoneless").is_some());
        assert!(matches!(
            session.connect("zoneless"),
            Err(GceError::InstanceNotFound(_))
        ));
        assert!(session.gcloud().connects.borrow().is_empty());
    }
}
