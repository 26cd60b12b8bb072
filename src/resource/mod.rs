//! Instance directory model
//!
//! # Architecture
//!
//! - [`instance`] - Accessors over a single instance's JSON document
//! - [`directory`] - The full listing, parsed once per run
//! - [`index`] - Name and public IP lookup tables built from a directory
//!
//! # Example
//!
//! ```
//! use gcloudssh::resource::Directory;
//!
//! let raw = r#"[{"name":"web-1","zone":"us-central1-a"}]"#.to_string();
//! let directory = Directory::parse(raw, "example").unwrap();
//! assert_eq!(directory.zone_by_name("web-1"), Some("us-central1-a"));
//! ```

mod directory;
mod index;
mod instance;

pub use directory::Directory;
pub use index::DirectoryIndex;
pub use instance::{extract_short_name, Instance};
