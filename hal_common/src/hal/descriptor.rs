//! HAL descriptor files.
//!
//! A descriptor is a JSON file describing one internal HAL: a `metadata`
//! object identifying the API and its sound card, plus declarative sections
//! that are handed opaquely to the section executor.
//!
//! ```json
//! {
//!   "metadata": { "uid": "hw:0", "api": "4a-hal-intel", "info": "Intel HDA" },
//!   "halmixer": { "mixerapi": "smixer", "prefix": "intel" },
//!   "halmap": [ { "uid": "master-volume", "name": "Master Playback Volume" } ]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Section keys the executor knows how to interpret, in execution order.
pub const KNOWN_SECTIONS: [&str; 6] = [
    "resources",
    "halmixer",
    "halmap",
    "onload",
    "controls",
    "events",
];

/// Error type for descriptor loading.
#[derive(Debug, Clone, Error)]
pub enum DescriptorError {
    /// File could not be read.
    #[error("Failed to read descriptor {path:?}: {reason}")]
    Read {
        /// Descriptor path.
        path: PathBuf,
        /// I/O error text.
        reason: String,
    },

    /// JSON parsing failed or the metadata object is missing.
    #[error("Failed to parse descriptor: {0}")]
    Parse(String),

    /// `metadata.api` is missing or empty.
    #[error("API missing from descriptor metadata")]
    MissingApi,

    /// `metadata.uid` is missing or empty.
    #[error("Sound card uid missing from descriptor metadata")]
    MissingUid,
}

/// `metadata` object of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DescriptorMetadata {
    /// Sound card path (e.g. `hw:0`, `/dev/snd/by-id/...`).
    #[serde(default)]
    pub uid: String,
    /// API name of the HAL endpoint.
    #[serde(default)]
    pub api: String,
    /// Description.
    #[serde(default)]
    pub info: Option<String>,
    /// Author.
    #[serde(default)]
    pub author: Option<String>,
    /// Version.
    #[serde(default)]
    pub version: Option<String>,
    /// Date.
    #[serde(default)]
    pub date: Option<String>,
}

/// One parsed HAL descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct HalDescriptor {
    /// File the descriptor was loaded from (`None` when parsed from a string).
    #[serde(skip)]
    pub path: Option<PathBuf>,

    /// Identification metadata.
    pub metadata: DescriptorMetadata,

    /// Every other top-level key, kept opaque.
    #[serde(flatten)]
    pub sections: BTreeMap<String, Value>,
}

impl HalDescriptor {
    /// Load and validate a descriptor file.
    ///
    /// # Errors
    /// `Read` if the file cannot be read, `Parse` for invalid JSON,
    /// `MissingApi` / `MissingUid` for incomplete metadata.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path).map_err(|e| DescriptorError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut descriptor = Self::from_json_str(&content)?;
        descriptor.path = Some(path.to_path_buf());
        Ok(descriptor)
    }

    /// Parse and validate a descriptor from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self =
            serde_json::from_str(content).map_err(|e| DescriptorError::Parse(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check the required metadata fields.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.metadata.api.trim().is_empty() {
            return Err(DescriptorError::MissingApi);
        }
        if self.metadata.uid.trim().is_empty() {
            return Err(DescriptorError::MissingUid);
        }
        Ok(())
    }

    /// API name.
    pub fn api(&self) -> &str {
        &self.metadata.api
    }

    /// Raw section by key.
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.sections.get(key)
    }

    /// Unique id of this descriptor: its path when loaded from disk,
    /// otherwise the sound card uid.
    pub fn unique_id(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => self.metadata.uid.clone(),
        }
    }

    /// Section keys the executor does not know.
    pub fn unknown_sections(&self) -> impl Iterator<Item = &str> {
        self.sections
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_SECTIONS.contains(key))
    }
}
