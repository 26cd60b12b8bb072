//! Instance directory
//!
//! The full listing of instances for the active project, together with the
//! raw text it came from (so the cache can store it byte for byte) and the
//! lookup indexes built from it.

use std::collections::BTreeMap;

use serde_json::Value;

use super::index::DirectoryIndex;
use super::instance::Instance;
use crate::error::{GceError, Result};

#[derive(Debug, Clone)]
pub struct Directory {
    raw: String,
    instances: Vec<Instance>,
    index: DirectoryIndex,
}

impl Directory {
    /// Parse a listing as emitted by `gcloud compute instances list --format=json`
    ///
    /// `source_name` only labels the error (e.g. the cache path).
    pub fn parse(raw: String, source_name: &str) -> Result<Self> {
        let invalid = |message: String| GceError::InvalidListing {
            source_name: source_name.to_string(),
            message,
        };

        let value: Value = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

        let Value::Array(items) = value else {
            return Err(invalid("expected a JSON array of instances".to_string()));
        };

        let instances: Vec<Instance> = items.into_iter().map(Instance::new).collect();
        let index = DirectoryIndex::build(&instances);

        Ok(Self {
            raw,
            instances,
            index,
        })
    }

    /// Build a directory from records already in memory
    pub fn from_instances(instances: Vec<Instance>) -> Self {
        let raw = Value::Array(instances.iter().map(|i| i.raw().clone()).collect()).to_string();
        let index = DirectoryIndex::build(&instances);

        Self {
            raw,
            instances,
            index,
        }
    }

    /// The listing text this directory was parsed from
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn index(&self) -> &DirectoryIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instance_by_name(&self, name: &str) -> Option<&Instance> {
        self.index
            .position_by_name(name)
            .and_then(|pos| self.instances.get(pos))
    }

    pub fn instance_by_ip(&self, ip: &str) -> Option<&Instance> {
        self.index
            .position_by_ip(ip)
            .and_then(|pos| self.instances.get(pos))
    }

    pub fn zone_by_name(&self, name: &str) -> Option<&str> {
        self.instance_by_name(name).and_then(Instance::zone)
    }

    /// Group public IPs by network tag
    ///
    /// Each tag maps to the distinct public IPs of the instances carrying
    /// it, in directory order.
    pub fn roles(&self) -> BTreeMap<String, Vec<String>> {
        let mut roles: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for instance in &self.instances {
            let Some(ip) = instance.nat_ip() else {
                continue;
            };

            for tag in instance.tags() {
                let addresses = roles.entry(tag.to_string()).or_default();
                if !addresses.iter().any(|a| a == ip) {
                    addresses.push(ip.to_string());
                }
            }
        }

        roles
    }
}

impl PartialEq for Directory {
    fn eq(&self, other: &Self) -> bool {
        self.instances == other.instances
    }
}
