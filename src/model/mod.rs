//! Core data types for detected components and scan results.
//!
//! - [`Component`] - A plugin or theme found on the target
//! - [`ComponentKind`] - Plugin or theme
//! - [`DetectionMethod`] - The technique that found (or verified) a component
//! - [`RegistryMetadata`] - Directory data attached to plugins after lookup
//! - [`ScanResult`] - Complete scan results for one target
//! - [`Target`] - The base URL every probe is joined onto
//!
//! # Example
//!
//! ```
//! use wpscout::{Component, ComponentKind, DetectionMethod, ScanResult, Target};
//!
//! let target = Target::parse("example.com").unwrap();
//! let plugin = Component::new("akismet", ComponentKind::Plugin, DetectionMethod::ResourceUrl);
//! let result = ScanResult::new(&target, true, vec![plugin]);
//!
//! println!("Found {} components on {}", result.components.len(), result.target);
//! ```

mod component;
mod target;

pub use component::*;
pub use target::*;
