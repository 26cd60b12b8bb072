//! Instance records
//!
//! Thin accessors over the JSON documents `gcloud compute instances list`
//! emits. No fixed schema is imposed; missing fields read as `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const NAT_IP_PATH: &str = "networkInterfaces.0.accessConfigs.0.natIP";

/// One Compute Engine instance, as returned by the listing command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instance(Value);

impl Instance {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The underlying JSON document
    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|v| v.as_str())
    }

    /// Zone in short form
    ///
    /// gcloud reports `zone` either bare (`us-central1-a`) or as a resource
    /// URL ending in `/zones/us-central1-a`; both yield `us-central1-a`.
    pub fn zone(&self) -> Option<&str> {
        self.0
            .get("zone")
            .and_then(|v| v.as_str())
            .map(extract_short_name)
            .filter(|z| !z.is_empty())
    }

    /// Public IP of the first access config on the first interface
    pub fn nat_ip(&self) -> Option<&str> {
        self.get_path(NAT_IP_PATH).and_then(|v| v.as_str())
    }

    /// Network tags (`tags.items`)
    pub fn tags(&self) -> Vec<&str> {
        self.0
            .get("tags")
            .and_then(|v| v.get("items"))
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|t| t.as_str()).collect())
            .unwrap_or_default()
    }

    /// Extract a value using a dot-notation path, e.g.
    /// `networkInterfaces.0.networkIP`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = &self.0;

        for part in path.split('.') {
            current = match part.parse::<usize>() {
                Ok(idx) => current.get(idx)?,
                Err(_) => current.get(part)?,
            };
        }

        Some(current)
    }
}

impl From<Value> for Instance {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Extract short name from GCP resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn extract_short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
