//! Lookup indexes over a directory
//!
//! Positions into the directory's instance list, keyed by name and by
//! public IP. The first record seen for a key wins.

use std::collections::HashMap;

use super::instance::Instance;

#[derive(Debug, Clone, Default)]
pub struct DirectoryIndex {
    by_name: HashMap<String, usize>,
    by_ip: HashMap<String, usize>,
}

impl DirectoryIndex {
    /// Build both indexes from scratch
    pub fn build(instances: &[Instance]) -> Self {
        let mut index = Self::default();

        for (pos, instance) in instances.iter().enumerate() {
            match instance.name() {
                Some(name) => {
                    index.by_name.entry(name.to_string()).or_insert(pos);
                }
                None => tracing::warn!("Instance #{} has no name, not indexed", pos),
            }

            // Instances without an external address are simply unreachable by IP
            if let Some(ip) = instance.nat_ip() {
                index.by_ip.entry(ip.to_string()).or_insert(pos);
            }
        }

        tracing::debug!(
            "Indexed {} instances: {} names, {} public IPs",
            instances.len(),
            index.by_name.len(),
            index.by_ip.len()
        );

        index
    }

    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn position_by_ip(&self, ip: &str) -> Option<usize> {
        self.by_ip.get(ip).copied()
    }

    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn ip_count(&self) -> usize {
        self.by_ip.len()
    }
}
