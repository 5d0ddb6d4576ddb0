//! Descriptor discovery and batch provisioning.
//!
//! Scans a `:`-separated directory list for HAL descriptors and provisions
//! each one. A bad file only fails itself; the batch always runs to the end.

use hal_common::consts::{CONFIG_PATH_SEPARATOR, DESCRIPTOR_EXTENSION, DESCRIPTOR_MARKER};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::manager::HalManager;

/// Outcome of a provisioning batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Descriptors provisioned.
    pub provisioned: usize,
    /// Descriptors that failed.
    pub failed: usize,
}

impl ProvisionReport {
    /// True when no descriptor failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// True for file names following the descriptor convention: a `.json` file
/// whose stem has a `hal` component (`hal-intel.json`, `4a-hal-usb.json`).
pub fn is_descriptor_name(file_name: &str) -> bool {
    let path = Path::new(file_name);
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == DESCRIPTOR_EXTENSION);
    let has_marker = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.split('-').any(|part| part == DESCRIPTOR_MARKER));
    is_json && has_marker
}

/// Descriptor files under `dir_list`, directory by directory, each directory
/// in file-name order. Missing directories are skipped with a warning.
pub fn scan_descriptors(dir_list: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for dir in dir_list
        .split(CONFIG_PATH_SEPARATOR)
        .filter(|dir| !dir.trim().is_empty())
    {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping descriptor directory {}: {}", dir, e);
                continue;
            }
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_descriptor_name(name))
            .collect();
        names.sort();

        found.extend(names.into_iter().map(|name| Path::new(dir).join(name)));
    }

    found
}

impl HalManager {
    /// Provision every descriptor found under `dir_list`.
    ///
    /// Finding no descriptor is not a failure: external HALs may still
    /// register later.
    pub fn provision_all(&mut self, dir_list: &str) -> ProvisionReport {
        info!("Beginning to create all HAL APIs from {}", dir_list);

        let descriptors = scan_descriptors(dir_list);
        if descriptors.is_empty() {
            warn!(
                "No hal-*.json descriptor found in {}, {} will only work with external HALs",
                dir_list,
                self.api_name()
            );
            return ProvisionReport::default();
        }

        let mut report = ProvisionReport::default();
        for path in &descriptors {
            match self.provision_one(path) {
                Ok(_) => report.provisioned += 1,
                Err(e) => {
                    error!("Failed to provision {:?}: {}", path, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Provisioned {} HAL(s), {} failure(s)",
            report.provisioned, report.failed
        );
        report
    }
}
