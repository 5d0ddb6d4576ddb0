//! Built-in declarative section executor.
//!
//! Walks the known descriptor sections in order. `halmixer` and `halmap`
//! are decoded into the HAL's extended data; `resources`, `onload`,
//! `controls` and `events` are shape-checked and acknowledged, their actions
//! being carried out by the host's plugin machinery.

use hal_common::hal::collaborator::{ExecError, SectionExecutor};
use hal_common::hal::descriptor::{HalDescriptor, KNOWN_SECTIONS};
use hal_common::hal::types::{AlsaControl, ExtendedData, MixerStream};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// `halmixer` section layout.
#[derive(Debug, Default, Deserialize)]
struct HalMixerSection {
    #[serde(default, rename = "mixerapi")]
    mixer_api: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    streams: Vec<MixerStream>,
    #[serde(default)]
    playbacks: Vec<MixerStream>,
    #[serde(default)]
    captures: Vec<MixerStream>,
}

/// Executor interpreting the declarative sections of HAL descriptors.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeExecutor;

impl DeclarativeExecutor {
    /// Create the executor.
    pub fn new() -> Self {
        Self
    }

    fn apply_halmixer(value: &Value, extended: &mut ExtendedData) -> Result<(), ExecError> {
        let section: HalMixerSection =
            serde_json::from_value(value.clone()).map_err(|e| invalid("halmixer", e))?;

        extended.mixer_api = section.mixer_api;
        extended.prefix = section.prefix;
        extended.streams = section.streams;
        extended.playbacks = section.playbacks;
        extended.captures = section.captures;

        debug!(
            "halmixer: mixer={:?}, {} streams, {} playbacks, {} captures",
            extended.mixer_api,
            extended.streams.len(),
            extended.playbacks.len(),
            extended.captures.len()
        );
        Ok(())
    }

    fn apply_halmap(value: &Value, extended: &mut ExtendedData) -> Result<(), ExecError> {
        let controls: Vec<AlsaControl> =
            serde_json::from_value(value.clone()).map_err(|e| invalid("halmap", e))?;
        debug!("halmap: {} ALSA controls", controls.len());
        extended.alsa_map = controls;
        Ok(())
    }

    fn acknowledge(key: &str, value: &Value) -> Result<(), ExecError> {
        let actions = match value {
            Value::Array(items) => items.len(),
            Value::Object(_) => 1,
            _ => {
                return Err(ExecError::InvalidSection {
                    section: key.to_string(),
                    reason: "expected an object or an array".to_string(),
                });
            }
        };
        debug!("{}: {} action(s) delegated", key, actions);
        Ok(())
    }
}

impl SectionExecutor for DeclarativeExecutor {
    fn execute(
        &self,
        descriptor: &HalDescriptor,
        extended: &mut ExtendedData,
    ) -> Result<(), ExecError> {
        for key in descriptor.unknown_sections() {
            warn!("{}: ignoring unknown section '{}'", descriptor.api(), key);
        }

        for key in KNOWN_SECTIONS {
            let Some(value) = descriptor.section(key) else {
                continue;
            };
            match key {
                "halmixer" => Self::apply_halmixer(value, extended)?,
                "halmap" => Self::apply_halmap(value, extended)?,
                _ => Self::acknowledge(key, value)?,
            }
        }
        Ok(())
    }
}

fn invalid(section: &str, err: serde_json::Error) -> ExecError {
    ExecError::InvalidSection {
        section: section.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(sections: &str) -> HalDescriptor {
        HalDescriptor::from_json_str(&format!(
            r#"{{"metadata": {{"uid": "hw:0", "api": "4a-hal-test"}}{sections}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_execute_fills_extended_data() {
        let descriptor = descriptor(
            r#", "halmixer": {
                    "mixerapi": "smixer", "prefix": "intel",
                    "streams": [{"verb": "multimedia", "verb-to-call": "multimedia_main"}],
                    "playbacks": [{"verb": "speakers", "stream-card-id": "hw:0,0"}],
                    "captures": []
                },
                "halmap": [{"uid": "master-volume", "name": "Master Playback Volume", "numid": 3}],
                "events": [],
                "onload": {"action": "api://smixer#attach"}"#,
        );

        let mut extended = ExtendedData::default();
        DeclarativeExecutor::new()
            .execute(&descriptor, &mut extended)
            .expect("should execute");

        assert_eq!(extended.mixer_api.as_deref(), Some("smixer"));
        assert_eq!(extended.prefix.as_deref(), Some("intel"));
        assert_eq!(extended.streams.len(), 1);
        assert_eq!(
            extended.streams[0].verb_to_call.as_deref(),
            Some("multimedia_main")
        );
        assert_eq!(
            extended.playbacks[0].stream_card_id.as_deref(),
            Some("hw:0,0")
        );
        assert!(extended.captures.is_empty());
        assert_eq!(extended.alsa_map.len(), 1);
        assert_eq!(extended.alsa_map[0].numid, Some(3));
    }

    #[test]
    fn test_execute_without_sections() {
        let mut extended = ExtendedData::default();
        DeclarativeExecutor::new()
            .execute(&descriptor(""), &mut extended)
            .expect("empty descriptor is fine");
        assert_eq!(extended, ExtendedData::default());
    }

    #[test]
    fn test_malformed_halmixer_is_fatal() {
        let mut extended = ExtendedData::default();
        let result = DeclarativeExecutor::new()
            .execute(&descriptor(r#", "halmixer": {"streams": 5}"#), &mut extended);
        assert!(matches!(
            result,
            Err(ExecError::InvalidSection { section, .. }) if section == "halmixer"
        ));
    }

    #[test]
    fn test_scalar_section_is_fatal() {
        let mut extended = ExtendedData::default();
        let result = DeclarativeExecutor::new()
            .execute(&descriptor(r#", "controls": "oops""#), &mut extended);
        assert!(matches!(
            result,
            Err(ExecError::InvalidSection { section, .. }) if section == "controls"
        ));
    }

    #[test]
    fn test_unknown_section_ignored() {
        let mut extended = ExtendedData::default();
        let result = DeclarativeExecutor::new()
            .execute(&descriptor(r#", "plugins": 12"#), &mut extended);
        assert!(result.is_ok());
    }
}
