//! HAL Common Library
//!
//! This crate provides the shared types, constants and configuration loading
//! utilities of the HAL manager workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Names, limits and default paths
//! - [`config`] - Configuration loading traits and types
//! - [`hal`] - Registry entry types, descriptors and collaborator traits
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use hal_common::hal::types::{HalEntry, HalMetadata, HalStatus};
//!
//! let entry = HalEntry::external("ext", "hw:0", Some(0), HalMetadata::default());
//! assert_eq!(entry.status, HalStatus::Ready);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
