//! Built-in sound card resolver.
//!
//! Resolves the card paths found in descriptors and `load` requests:
//! - `hw:<N>` / `hw:<N>,<D>` - checked against `<proc>/asound/card<N>`
//! - `hw:<name>` - `<proc>/asound/<name>` is a symlink to `card<N>`
//! - device paths - `/dev/snd/controlC<N>`, `/dev/snd/pcmC<N>D<M>p`, or any
//!   symlink to one of them (`/dev/snd/by-id/...`, `/dev/snd/by-path/...`)

use hal_common::hal::collaborator::{CardResolver, ResolveError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default procfs mount point.
const DEFAULT_PROC_ROOT: &str = "/proc";

/// Resolves card paths through procfs and the ALSA device nodes.
#[derive(Debug, Clone)]
pub struct AlsaCardResolver {
    proc_root: PathBuf,
}

impl AlsaCardResolver {
    /// Resolver reading the live `/proc`.
    pub fn new() -> Self {
        Self::with_proc_root(DEFAULT_PROC_ROOT)
    }

    /// Resolver reading `<proc_root>/asound` instead of `/proc/asound`.
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn asound(&self) -> PathBuf {
        self.proc_root.join("asound")
    }

    fn resolve_hw(&self, path: &str, spec: &str) -> Result<u32, ResolveError> {
        // `hw:<card>,<device>` addresses a device on the card
        let spec = spec.split(',').next().unwrap_or(spec);
        if let Ok(id) = spec.parse::<u32>() {
            return if self.asound().join(format!("card{id}")).exists() {
                Ok(id)
            } else {
                Err(ResolveError::NotFound(path.to_string()))
            };
        }

        // Card ids are symlinks: /proc/asound/<name> -> card<N>
        let target = std::fs::read_link(self.asound().join(spec))
            .map_err(|_| ResolveError::NotFound(path.to_string()))?;
        target
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix("card"))
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| ResolveError::NotFound(path.to_string()))
    }

    fn resolve_device(&self, path: &str) -> Result<u32, ResolveError> {
        let device = std::fs::canonicalize(Path::new(path))
            .map_err(|_| ResolveError::NotFound(path.to_string()))?;
        let name = device
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ResolveError::Unsupported(path.to_string()))?;
        card_id_from_node(name).ok_or_else(|| ResolveError::Unsupported(path.to_string()))
    }
}

impl Default for AlsaCardResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CardResolver for AlsaCardResolver {
    fn resolve(&self, path: &str) -> Result<u32, ResolveError> {
        let result = match path.strip_prefix("hw:") {
            Some(spec) if !spec.is_empty() => self.resolve_hw(path, spec),
            Some(_) => Err(ResolveError::Unsupported(path.to_string())),
            None if path.starts_with('/') => self.resolve_device(path),
            None => Err(ResolveError::Unsupported(path.to_string())),
        };
        debug!("Card path '{}' resolved to {:?}", path, result);
        result
    }
}

/// Card number of an ALSA device node name (`controlC2`, `pcmC2D0p`, ...).
fn card_id_from_node(name: &str) -> Option<u32> {
    let rest = name
        .strip_prefix("controlC")
        .or_else(|| name.strip_prefix("pcmC"))
        .or_else(|| name.strip_prefix("hwC"))
        .or_else(|| name.strip_prefix("midiC"))?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
