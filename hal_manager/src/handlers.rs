//! Manager verbs.
//!
//! Request/response types and the handlers reading or mutating the registry
//! on behalf of callers. `dispatch()` is the single JSON entry point used by
//! the manager task.
//!
//! | Verb | Arguments | Reply |
//! |------|-----------|-------|
//! | `ping` | - | counter |
//! | `loaded` | `{all?, verbose?}` | names or HAL objects |
//! | `load` | `{metadata: {api, uid, ...}}` | - |
//! | `unload` | `{api}` | - |
//! | `info` | `{api}` | mixer tables of an internal HAL |
//! | `subscribe` / `unsubscribe` | - | `false` |

use hal_common::hal::types::{
    card_id_from_wire, HalEntry, HalHandle, HalMetadata, HalStatus, MixerStream,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::manager::HalManager;
use crate::registry::RegistryError;

// ─── Requests ───────────────────────────────────────────────────────

/// Arguments of `loaded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LoadedRequest {
    /// List every HAL, whatever its status.
    #[serde(default)]
    pub all: bool,
    /// Return full objects instead of names (only without `all`).
    #[serde(default)]
    pub verbose: bool,
}

/// `metadata` object of `load`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoadMetadata {
    /// API name of the external HAL.
    pub api: String,
    /// Sound card path.
    pub uid: String,
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
    /// Card id, `-1` when unknown.
    #[serde(default, rename = "snd-dev-id")]
    pub snd_dev_id: Option<i64>,
}

/// Arguments of `load`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoadRequest {
    /// HAL metadata.
    pub metadata: LoadMetadata,
}

/// Arguments of `unload` and `info`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiRequest {
    /// API name.
    pub api: String,
}

// ─── Replies ────────────────────────────────────────────────────────

/// One HAL in a verbose `loaded` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalSummary {
    /// API name.
    pub api: String,
    /// Status (0/1/2).
    pub status: i32,
    /// Sound card path.
    pub sndcard: String,
    /// 1 for internal HALs.
    pub internal: i32,
    /// Description or `""`.
    pub info: String,
    /// Author or `""`.
    pub author: String,
    /// Version or `""`.
    pub version: String,
    /// Date or `""`.
    pub date: String,
    /// `hw:<id>` or `not-found`.
    #[serde(rename = "snd-dev-id")]
    pub snd_dev_id: String,
}

impl From<&HalEntry> for HalSummary {
    fn from(entry: &HalEntry) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            api: entry.api_name.clone(),
            status: entry.status.as_int(),
            sndcard: entry.snd_card_path.clone(),
            internal: i32::from(entry.is_internal()),
            info: text(&entry.metadata.info),
            author: text(&entry.metadata.author),
            version: text(&entry.metadata.version),
            date: text(&entry.metadata.date),
            snd_dev_id: entry.device_string(),
        }
    }
}

/// Reply of `loaded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoadedReply {
    /// Bare API names.
    Names(Vec<String>),
    /// Full HAL objects.
    Details(Vec<HalSummary>),
}

/// Reply of `info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalInfoReply {
    /// API name.
    pub api: String,
    /// Mixer API driven by the HAL.
    #[serde(rename = "mixer-api")]
    pub mixer_api: Option<String>,
    /// Mixer verb prefix.
    pub prefix: Option<String>,
    /// Stream verbs.
    pub streams: Vec<String>,
    /// Playback verbs.
    pub playbacks: Vec<String>,
    /// Capture verbs.
    pub captures: Vec<String>,
    /// ALSA control uids.
    pub controls: Vec<String>,
}

// ─── Errors & responses ─────────────────────────────────────────────

/// Caller-facing request failure. Each variant maps to a wire tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Arguments could not be decoded.
    #[error("Can't get request json: {0}")]
    RequestJson(String),

    /// `load` metadata missing, invalid or rejected by the registry.
    #[error("Can't register api metadata: {0}")]
    ApiMetadata(String),

    /// `unload` / `info` arguments invalid.
    #[error("Can't get requested api: {0}")]
    RequestedApi(String),

    /// No HAL with this name.
    #[error("Can't find api '{0}'")]
    NotFound(String),

    /// Internal HALs cannot be removed.
    #[error("Can't remove an internal controller api '{0}'")]
    Protected(String),

    /// `info` asked about an external HAL.
    #[error("Api '{0}' is external, ask it directly")]
    External(String),

    /// Registry refused the removal.
    #[error("Didn't succeed to remove api '{api}': {reason}")]
    Unregister {
        /// API name.
        api: String,
        /// Registry error text.
        reason: String,
    },

    /// No such verb.
    #[error("Unknown verb '{0}'")]
    UnknownVerb(String),
}

impl RequestError {
    /// Failure tag reported on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RequestJson(_) => "request_json",
            Self::ApiMetadata(_) => "api_metadata",
            Self::RequestedApi(_) | Self::NotFound(_) | Self::Protected(_) | Self::External(_) => {
                "requested_api"
            }
            Self::Unregister { .. } => "unregister_error",
            Self::UnknownVerb(_) => "unknown_verb",
        }
    }
}

/// Response to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    /// Request succeeded.
    Success {
        /// Payload, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<Value>,
        /// Human readable note.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        info: Option<String>,
    },
    /// Request failed.
    Failure {
        /// Failure tag.
        error: String,
        /// Human readable message.
        info: String,
    },
}

impl Response {
    /// Success with an optional payload.
    pub fn success(response: Option<Value>, info: impl Into<String>) -> Self {
        Self::Success {
            response,
            info: Some(info.into()),
        }
    }

    /// Failure built from a request error.
    pub fn failure(err: &RequestError) -> Self {
        Self::Failure {
            error: err.tag().to_string(),
            info: err.to_string(),
        }
    }

    /// True for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Success payload.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { response, .. } => response.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    /// Failure tag.
    pub fn error_tag(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

// ─── Handlers ───────────────────────────────────────────────────────

impl HalManager {
    /// Increment and return the ping counter (first call returns 1).
    pub fn ping(&mut self) -> u64 {
        self.ping_count += 1;
        info!("ping count = {}", self.ping_count);
        self.ping_count
    }

    /// List HALs.
    ///
    /// `verbose` only applies when `all` is false: `all` always yields names.
    pub fn loaded(&self, request: LoadedRequest) -> LoadedReply {
        let selected = self
            .registry
            .iter()
            .map(|(_, entry)| entry)
            .filter(|entry| request.all || entry.status == HalStatus::Ready);

        if request.verbose && !request.all {
            LoadedReply::Details(selected.map(HalSummary::from).collect())
        } else {
            LoadedReply::Names(selected.map(|entry| entry.api_name.clone()).collect())
        }
    }

    /// Register an external HAL. It is trusted to be ready.
    pub fn load(&mut self, request: LoadRequest) -> Result<HalHandle, RequestError> {
        let meta = request.metadata;
        if meta.api.trim().is_empty() {
            return Err(RequestError::ApiMetadata("api is empty".to_string()));
        }
        if meta.uid.trim().is_empty() {
            return Err(RequestError::ApiMetadata("uid is empty".to_string()));
        }

        let entry = HalEntry::external(
            meta.api.clone(),
            meta.uid.clone(),
            meta.snd_dev_id.and_then(card_id_from_wire),
            HalMetadata {
                uid: Some(meta.uid),
                info: meta.info,
                author: meta.author,
                version: meta.version,
                date: meta.date,
            },
        );

        let handle = self
            .registry
            .add(entry)
            .map_err(|e| RequestError::ApiMetadata(e.to_string()))?;
        info!("External HAL '{}' registered ({})", meta.api, handle);
        Ok(handle)
    }

    /// Remove an external HAL by name.
    pub fn unload(&mut self, request: &ApiRequest) -> Result<(), RequestError> {
        let handle = self
            .registry
            .search_by_name(&request.api)
            .ok_or_else(|| RequestError::NotFound(request.api.clone()))?;

        match self.registry.remove(handle) {
            Ok(entry) => {
                info!("External HAL '{}' unregistered", entry.api_name);
                Ok(())
            }
            Err(RegistryError::Protected(api)) => Err(RequestError::Protected(api)),
            Err(e) => Err(RequestError::Unregister {
                api: request.api.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Mixer and control tables of an internal HAL.
    pub fn hal_info(&self, request: &ApiRequest) -> Result<HalInfoReply, RequestError> {
        let entry = self
            .registry
            .search_by_name(&request.api)
            .and_then(|handle| self.registry.get(handle))
            .ok_or_else(|| RequestError::NotFound(request.api.clone()))?;
        let extended = entry
            .extended()
            .ok_or_else(|| RequestError::External(request.api.clone()))?;

        let verbs = |streams: &[MixerStream]| {
            streams.iter().map(|s| s.verb.clone()).collect()
        };
        Ok(HalInfoReply {
            api: entry.api_name.clone(),
            mixer_api: extended.mixer_api.clone(),
            prefix: extended.prefix.clone(),
            streams: verbs(&extended.streams),
            playbacks: verbs(&extended.playbacks),
            captures: verbs(&extended.captures),
            controls: extended.alsa_map.iter().map(|c| c.uid.clone()).collect(),
        })
    }

    /// Event subscription placeholder.
    pub fn subscribe(&self) -> bool {
        warn!("subscribe: not implemented yet");
        false
    }

    /// Event unsubscription placeholder.
    pub fn unsubscribe(&self) -> bool {
        warn!("unsubscribe: not implemented yet");
        false
    }

    /// Decode `args`, run the verb, encode the reply.
    pub fn dispatch(&mut self, verb: &str, args: Value) -> Response {
        let result = match verb {
            "ping" => Ok((Some(Value::from(self.ping())), "Ping count")),
            "loaded" => {
                let request = if args.is_null() {
                    LoadedRequest::default()
                } else {
                    serde_json::from_value(args).unwrap_or_else(|e| {
                        warn!("loaded: ignoring undecodable arguments: {}", e);
                        LoadedRequest::default()
                    })
                };
                to_value(&self.loaded(request)).map(|value| (Some(value), "Requested data"))
            }
            "load" => decode::<LoadRequest>(args, RequestError::ApiMetadata)
                .and_then(|request| self.load(request))
                .map(|_| (None, "Api successfully registered")),
            "unload" => decode::<ApiRequest>(args, RequestError::RequestedApi)
                .and_then(|request| self.unload(&request))
                .map(|_| (None, "Api successfully unregistered")),
            "info" => decode::<ApiRequest>(args, RequestError::RequestedApi)
                .and_then(|request| self.hal_info(&request))
                .and_then(|reply| to_value(&reply))
                .map(|value| (Some(value), "Requested data")),
            "subscribe" => Ok((Some(Value::Bool(self.subscribe())), "Not implemented yet")),
            "unsubscribe" => Ok((Some(Value::Bool(self.unsubscribe())), "Not implemented yet")),
            _ => Err(RequestError::UnknownVerb(verb.to_string())),
        };

        match result {
            Ok((payload, note)) => Response::success(payload, note),
            Err(e) => {
                warn!("{} failed: {}", verb, e);
                Response::failure(&e)
            }
        }
    }
}

/// Decode request arguments, mapping failures to the verb's error.
fn decode<T: DeserializeOwned>(
    args: Value,
    on_error: fn(String) -> RequestError,
) -> Result<T, RequestError> {
    serde_json::from_value(args).map_err(|e| on_error(e.to_string()))
}

fn to_value<T: Serialize>(reply: &T) -> Result<Value, RequestError> {
    serde_json::to_value(reply).map_err(|e| RequestError::RequestJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LocalHost;
    use crate::manager::channel;
    use hal_common::config::ManagerSection;
    use hal_common::hal::descriptor::HalDescriptor;
    use serde_json::json;

    fn manager() -> HalManager {
        let (handle, _rx) = channel();
        HalManager::with_defaults(&ManagerSection::default(), Box::new(LocalHost::new(&handle)))
    }

    fn add_internal(mgr: &mut HalManager, api: &str, status: HalStatus) -> HalHandle {
        let descriptor = HalDescriptor::from_json_str(&format!(
            r#"{{"metadata": {{"uid": "hw:0", "api": "{api}"}}}}"#
        ))
        .unwrap();
        let handle = mgr.registry.add(HalEntry::internal(descriptor)).unwrap();
        mgr.registry.get_mut(handle).unwrap().status = status;
        handle
    }

    fn load_request(api: &str, uid: &str) -> LoadRequest {
        LoadRequest {
            metadata: LoadMetadata {
                api: api.to_string(),
                uid: uid.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_ping_counts_from_one() {
        let mut mgr = manager();
        assert_eq!(mgr.ping(), 1);
        assert_eq!(mgr.ping(), 2);
        assert_eq!(mgr.ping(), 3);
    }

    #[test]
    fn test_load_external() {
        let mut mgr = manager();
        let handle = mgr.load(load_request("ext1", "/dev/snd/x")).unwrap();

        let entry = mgr.registry().get(handle).unwrap();
        assert!(!entry.is_internal());
        assert_eq!(entry.status, HalStatus::Ready);
        assert!(entry.snd_card_id.is_none());
        assert_eq!(entry.metadata.uid.as_deref(), Some("/dev/snd/x"));
    }

    #[test]
    fn test_load_with_card_id_and_duplicate() {
        let mut mgr = manager();
        let mut request = load_request("ext1", "hw:4");
        request.metadata.snd_dev_id = Some(4);
        let handle = mgr.load(request).unwrap();
        assert_eq!(mgr.registry().get(handle).unwrap().snd_card_id, Some(4));

        let result = mgr.load(load_request("ext1", "hw:5"));
        assert!(matches!(result, Err(RequestError::ApiMetadata(_))));
        assert_eq!(mgr.registry().count(), 1);
    }

    #[test]
    fn test_load_rejects_empty_fields() {
        let mut mgr = manager();
        assert!(matches!(
            mgr.load(load_request("", "hw:0")),
            Err(RequestError::ApiMetadata(_))
        ));
        assert!(matches!(
            mgr.load(load_request("ext", " ")),
            Err(RequestError::ApiMetadata(_))
        ));
        assert!(mgr.registry().is_empty());
    }

    #[test]
    fn test_unload_external_internal_and_missing() {
        let mut mgr = manager();
        add_internal(&mut mgr, "4a-hal-intel", HalStatus::Ready);
        mgr.load(load_request("ext1", "/dev/snd/x")).unwrap();
        assert_eq!(mgr.registry().count(), 2);

        let result = mgr.unload(&ApiRequest {
            api: "4a-hal-intel".to_string(),
        });
        assert_eq!(
            result,
            Err(RequestError::Protected("4a-hal-intel".to_string()))
        );
        assert_eq!(mgr.registry().count(), 2);

        let result = mgr.unload(&ApiRequest {
            api: "nonexistent".to_string(),
        });
        assert_eq!(result, Err(RequestError::NotFound("nonexistent".to_string())));
        assert_eq!(mgr.registry().count(), 2);

        mgr.unload(&ApiRequest {
            api: "ext1".to_string(),
        })
        .unwrap();
        assert_eq!(mgr.registry().count(), 1);
    }

    #[test]
    fn test_loaded_filters_ready_names() {
        let mut mgr = manager();
        add_internal(&mut mgr, "int-unavailable", HalStatus::Unavailable);
        add_internal(&mut mgr, "int-ready", HalStatus::Ready);
        mgr.load(load_request("ext1", "/dev/snd/x")).unwrap();

        assert_eq!(
            mgr.loaded(LoadedRequest::default()),
            LoadedReply::Names(vec!["ext1".to_string(), "int-ready".to_string()])
        );
        assert_eq!(
            mgr.loaded(LoadedRequest {
                all: true,
                verbose: false
            }),
            LoadedReply::Names(vec![
                "ext1".to_string(),
                "int-ready".to_string(),
                "int-unavailable".to_string()
            ])
        );
    }

    #[test]
    fn test_loaded_all_ignores_verbose() {
        let mut mgr = manager();
        add_internal(&mut mgr, "int", HalStatus::Unavailable);

        assert_eq!(
            mgr.loaded(LoadedRequest {
                all: true,
                verbose: true
            }),
            LoadedReply::Names(vec!["int".to_string()])
        );
    }

    #[test]
    fn test_loaded_verbose_details() {
        let mut mgr = manager();
        let mut request = load_request("ext1", "hw:1");
        request.metadata.snd_dev_id = Some(1);
        request.metadata.info = Some("external card".to_string());
        mgr.load(request).unwrap();
        mgr.load(load_request("ext2", "/dev/snd/y")).unwrap();

        let reply = mgr.loaded(LoadedRequest {
            all: false,
            verbose: true,
        });
        let LoadedReply::Details(details) = reply else {
            panic!("expected details");
        };
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].api, "ext2");
        assert_eq!(details[0].snd_dev_id, "not-found");
        assert_eq!(details[0].info, "");
        assert_eq!(details[1].api, "ext1");
        assert_eq!(details[1].status, 2);
        assert_eq!(details[1].internal, 0);
        assert_eq!(details[1].sndcard, "hw:1");
        assert_eq!(details[1].info, "external card");
        assert_eq!(details[1].snd_dev_id, "hw:1");
    }

    #[test]
    fn test_dispatch_wire_format() {
        let mut mgr = manager();

        let response = mgr.dispatch("ping", Value::Null);
        assert_eq!(response.payload(), Some(&json!(1)));

        let response = mgr.dispatch(
            "load",
            json!({"metadata": {"api": "ext1", "uid": "/dev/snd/x", "snd-dev-id": -1}}),
        );
        assert!(response.is_success());
        assert!(response.payload().is_none());

        let response = mgr.dispatch("loaded", json!({"verbose": true}));
        assert_eq!(
            response.payload(),
            Some(&json!([{
                "api": "ext1", "status": 2, "sndcard": "/dev/snd/x", "internal": 0,
                "info": "", "author": "", "version": "", "date": "",
                "snd-dev-id": "not-found"
            }]))
        );

        let response = mgr.dispatch("loaded", Value::Null);
        assert_eq!(response.payload(), Some(&json!(["ext1"])));
    }

    #[test]
    fn test_dispatch_failure_tags() {
        let mut mgr = manager();
        add_internal(&mut mgr, "4a-hal-intel", HalStatus::Ready);

        let response = mgr.dispatch("load", json!({"api": "no-metadata"}));
        assert_eq!(response.error_tag(), Some("api_metadata"));

        let response = mgr.dispatch("load", json!({"metadata": {"api": "no-uid"}}));
        assert_eq!(response.error_tag(), Some("api_metadata"));

        let response = mgr.dispatch("unload", json!({}));
        assert_eq!(response.error_tag(), Some("requested_api"));

        let response = mgr.dispatch("unload", json!({"api": "4a-hal-intel"}));
        assert_eq!(response.error_tag(), Some("requested_api"));

        let response = mgr.dispatch("unload", json!({"api": "missing"}));
        assert_eq!(response.error_tag(), Some("requested_api"));

        let response = mgr.dispatch("reboot", Value::Null);
        assert_eq!(response.error_tag(), Some("unknown_verb"));

        assert_eq!(mgr.registry().count(), 1);
    }

    #[test]
    fn test_dispatch_placeholders() {
        let mut mgr = manager();
        for verb in ["subscribe", "unsubscribe"] {
            let response = mgr.dispatch(verb, json!({"event": "status"}));
            assert!(response.is_success());
            assert_eq!(response.payload(), Some(&Value::Bool(false)));
        }
        assert!(mgr.registry().is_empty());
    }

    #[test]
    fn test_info_internal_and_external() {
        let mut mgr = manager();
        let handle = add_internal(&mut mgr, "4a-hal-intel", HalStatus::Ready);
        if let Some(data) = mgr.registry.get_mut(handle).unwrap().internal_data_mut() {
            data.extended.mixer_api = Some("smixer".to_string());
            data.extended.streams.push(MixerStream {
                verb: "multimedia".to_string(),
                ..Default::default()
            });
        }
        mgr.load(load_request("ext1", "hw:1")).unwrap();

        let response = mgr.dispatch("info", json!({"api": "4a-hal-intel"}));
        let payload = response.payload().unwrap();
        assert_eq!(payload["mixer-api"], json!("smixer"));
        assert_eq!(payload["streams"], json!(["multimedia"]));

        let response = mgr.dispatch("info", json!({"api": "ext1"}));
        assert_eq!(response.error_tag(), Some("requested_api"));
    }
}
