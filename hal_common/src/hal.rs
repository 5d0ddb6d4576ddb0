//! HAL registry data types, descriptors and collaborator traits.
//!
//! This module contains the types shared between the HAL manager and
//! the hosts that embed it.

pub mod collaborator;
pub mod descriptor;
pub mod types;
