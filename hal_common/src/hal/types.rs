//! HAL registry entry types.
//!
//! This module defines the in-memory record of one HAL:
//! - `HalStatus` - Lifecycle status shared by internal and external HALs
//! - `HalHandle` - Stable identity of a registry slot
//! - `HalEntry` - Registry entry (identity, status, card, metadata, origin)
//! - `HalOrigin` / `InternalHal` - Internal (config-provisioned) vs external HALs
//! - `ExtendedData` - Mixer and ALSA control data owned by internal HALs

use crate::hal::descriptor::HalDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a HAL.
///
/// Numeric values are part of the `loaded` wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HalStatus {
    /// Card not present (or not yet probed).
    #[default]
    Unavailable = 0,
    /// Card resolved, configuration not (yet) applied.
    Available = 1,
    /// Card resolved and configuration applied.
    Ready = 2,
}

impl HalStatus {
    /// Wire representation (0/1/2).
    pub fn as_int(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for HalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "unavailable"),
            Self::Available => write!(f, "available"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Stable identity of a registry slot.
///
/// The generation makes a handle to a removed entry stale, even when its
/// slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalHandle {
    index: usize,
    generation: u32,
}

impl HalHandle {
    /// Build a handle from a slot index and generation.
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    pub fn index(self) -> usize {
        self.index
    }

    /// Slot generation.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for HalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Optional descriptive strings attached to a HAL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalMetadata {
    /// Unique id of the HAL source (descriptor path for internal HALs).
    pub uid: Option<String>,
    /// Human readable description.
    pub info: Option<String>,
    /// Author.
    pub author: Option<String>,
    /// Version string.
    pub version: Option<String>,
    /// Release date.
    pub date: Option<String>,
}

/// One stream/playback/capture row of the mixer data tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerStream {
    /// Verb exposed by the HAL endpoint.
    pub verb: String,
    /// Verb of the mixer API the call is forwarded to.
    #[serde(default, rename = "verb-to-call")]
    pub verb_to_call: Option<String>,
    /// Card id used by the mixer for this stream.
    #[serde(default, rename = "stream-card-id")]
    pub stream_card_id: Option<String>,
}

/// One entry of the ALSA control map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlsaControl {
    /// Control uid as used by callers.
    pub uid: String,
    /// ALSA control name on the card.
    #[serde(default)]
    pub name: Option<String>,
    /// ALSA numid, when known.
    #[serde(default)]
    pub numid: Option<u32>,
    /// Initial value to apply.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// Extended control configuration owned by internal HALs.
///
/// Filled by the section executor during activation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedData {
    /// Name of the mixer API this HAL drives.
    pub mixer_api: Option<String>,
    /// Prefix applied to the mixer verbs.
    pub prefix: Option<String>,
    /// Stream table.
    pub streams: Vec<MixerStream>,
    /// Playback table.
    pub playbacks: Vec<MixerStream>,
    /// Capture table.
    pub captures: Vec<MixerStream>,
    /// ALSA control map.
    pub alsa_map: Vec<AlsaControl>,
}

/// Provisioning phase of an internal HAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisionPhase {
    /// Endpoint requested from the host, activation not delivered yet.
    #[default]
    Pending,
    /// Activation ran (whatever its outcome).
    Activated,
}

/// Data carried only by internal HALs.
#[derive(Debug, Clone)]
pub struct InternalHal {
    /// Provisioning phase.
    pub phase: ProvisionPhase,
    /// Descriptor the endpoint is bound to.
    pub descriptor: HalDescriptor,
    /// Extended control configuration.
    pub extended: ExtendedData,
}

/// Where a HAL comes from.
///
/// Internal HALs always carry their extended data; external ones never do.
#[derive(Debug, Clone)]
pub enum HalOrigin {
    /// Provisioned from a local descriptor at startup. Never removable.
    Internal(Box<InternalHal>),
    /// Registered at runtime by another process. Removable.
    External,
}

/// Registry entry for one HAL.
#[derive(Debug, Clone)]
pub struct HalEntry {
    /// API name, unique within the registry.
    pub api_name: String,
    /// Current lifecycle status.
    pub status: HalStatus,
    /// Path identifying the sound card.
    pub snd_card_path: String,
    /// Resolved card id; `None` while unresolved.
    pub snd_card_id: Option<u32>,
    /// Descriptive metadata.
    pub metadata: HalMetadata,
    /// Internal or external origin.
    pub origin: HalOrigin,
}

impl HalEntry {
    /// Create a pending internal entry bound to `descriptor`.
    ///
    /// Starts `Unavailable` with no metadata; activation fills the rest.
    pub fn internal(descriptor: HalDescriptor) -> Self {
        Self {
            api_name: descriptor.metadata.api.clone(),
            status: HalStatus::Unavailable,
            snd_card_path: descriptor.metadata.uid.clone(),
            snd_card_id: None,
            metadata: HalMetadata::default(),
            origin: HalOrigin::Internal(Box::new(InternalHal {
                phase: ProvisionPhase::Pending,
                descriptor,
                extended: ExtendedData::default(),
            })),
        }
    }

    /// Create an external entry. External HALs are trusted to be ready.
    pub fn external(
        api_name: impl Into<String>,
        snd_card_path: impl Into<String>,
        snd_card_id: Option<u32>,
        metadata: HalMetadata,
    ) -> Self {
        Self {
            api_name: api_name.into(),
            status: HalStatus::Ready,
            snd_card_path: snd_card_path.into(),
            snd_card_id,
            metadata,
            origin: HalOrigin::External,
        }
    }

    /// True for HALs provisioned from local configuration.
    pub fn is_internal(&self) -> bool {
        matches!(self.origin, HalOrigin::Internal(_))
    }

    /// Internal data, if any.
    pub fn internal_data(&self) -> Option<&InternalHal> {
        match &self.origin {
            HalOrigin::Internal(data) => Some(data.as_ref()),
            HalOrigin::External => None,
        }
    }

    /// Mutable internal data, if any.
    pub fn internal_data_mut(&mut self) -> Option<&mut InternalHal> {
        match &mut self.origin {
            HalOrigin::Internal(data) => Some(data.as_mut()),
            HalOrigin::External => None,
        }
    }

    /// Extended data, present only for internal HALs.
    pub fn extended(&self) -> Option<&ExtendedData> {
        self.internal_data().map(|data| &data.extended)
    }

    /// Device string reported to callers: `hw:<id>` or `not-found`.
    pub fn device_string(&self) -> String {
        match self.snd_card_id {
            Some(id) => format!("hw:{id}"),
            None => crate::consts::CARD_NOT_FOUND.to_string(),
        }
    }
}

/// Convert a wire card id to the registry form. Negative ids (`-1` on the
/// wire) and ids out of `u32` range are unresolved.
pub fn card_id_from_wire(id: i64) -> Option<u32> {
    u32::try_from(id).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::descriptor::HalDescriptor;

    fn descriptor(api: &str) -> HalDescriptor {
        HalDescriptor::from_json_str(&format!(
            r#"{{"metadata": {{"uid": "hw:0", "api": "{api}"}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_status_wire_values() {
        assert_eq!(HalStatus::Unavailable.as_int(), 0);
        assert_eq!(HalStatus::Available.as_int(), 1);
        assert_eq!(HalStatus::Ready.as_int(), 2);
        assert_eq!(HalStatus::default(), HalStatus::Unavailable);
    }

    #[test]
    fn test_internal_entry_starts_pending_unavailable() {
        let entry = HalEntry::internal(descriptor("4a-hal-test"));
        assert_eq!(entry.api_name, "4a-hal-test");
        assert_eq!(entry.snd_card_path, "hw:0");
        assert_eq!(entry.status, HalStatus::Unavailable);
        assert!(entry.snd_card_id.is_none());
        assert!(entry.is_internal());
        assert!(entry.extended().is_some());
        assert_eq!(
            entry.internal_data().map(|d| d.phase),
            Some(ProvisionPhase::Pending)
        );
        assert_eq!(entry.metadata, HalMetadata::default());
    }

    #[test]
    fn test_external_entry_is_ready_without_extended_data() {
        let entry = HalEntry::external("ext", "/dev/snd/x", None, HalMetadata::default());
        assert_eq!(entry.status, HalStatus::Ready);
        assert!(!entry.is_internal());
        assert!(entry.extended().is_none());
    }

    #[test]
    fn test_device_string() {
        let mut entry = HalEntry::external("ext", "hw:3", Some(3), HalMetadata::default());
        assert_eq!(entry.device_string(), "hw:3");
        entry.snd_card_id = None;
        assert_eq!(entry.device_string(), "not-found");
    }

    #[test]
    fn test_card_id_from_wire() {
        assert_eq!(card_id_from_wire(-1), None);
        assert_eq!(card_id_from_wire(0), Some(0));
        assert_eq!(card_id_from_wire(7), Some(7));
        assert_eq!(card_id_from_wire(-5), None);
        assert_eq!(card_id_from_wire(i64::from(u32::MAX) + 1), None);
    }
}
