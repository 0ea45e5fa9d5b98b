//! Device registry and rescan engine.
//!
//! This module owns the authoritative inventory of storage volumes. A
//! [`DeviceRegistry`] is constructed once by the host, runs an initial
//! scan, and is shared by handle; every [`DeviceRegistry::rescan`]
//! rebuilds the whole inventory from the vold configuration and the
//! OS-reported primary attributes, then publishes it atomically.
//!
//! Discovery is best-effort and never fails; queries about an absent
//! secondary device return typed errors instead.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use snafu::ensure;
use tracing::{debug, warn};

use crate::device::{Device, MediaState};
use crate::error::{Error, InvalidArgumentSnafu, Result};
use crate::probe::VolumeProbe;
use crate::vold::{self, VoldScan};

/// Default directory holding the vold configuration files.
pub const DEFAULT_CONFIG_DIR: &str = "/system/etc";

/// Display name of a removable primary volume.
const PRIMARY_NAME_CARD: &str = "card";

/// Display name of a built-in primary volume.
const PRIMARY_NAME_INTERNAL: &str = "internal";

/// Mount-path substring identifying USB host-port entries. Some vendors
/// leave the mount entry in place with an empty directory when no USB
/// media is inserted.
const USB_DRIVE_MARKER: &str = "usbdrive";

/// Per-app data subtree on a volume.
const APP_DATA_SUBDIR: &str = "Android/data";

/// Callback registered with [`DeviceRegistry::on_volume_change`].
pub type VolumeChangeListener = Box<dyn Fn() + Send>;

/// Configuration for constructing a [`DeviceRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory searched for `vold.fstab` and the `vold.conf` fallback.
    pub config_dir: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
        }
    }
}

impl RegistryConfig {
    /// Creates a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }
}

/// Inventory published by the most recent rescan.
#[derive(Debug, Clone)]
struct Inventory {
    /// The always-present built-in volume.
    primary: Device,
    /// Devices discovered from configuration, in file order. The first
    /// entry, when any, is the secondary volume.
    devices: Vec<Device>,
    /// Unified-storage flag. Structurally present, currently always
    /// false; detection needs a filesystem-identity collaborator.
    emulated: bool,
}

/// Authoritative storage-device inventory with rescan support.
///
/// All state sits behind one mutex, held across the whole
/// rescan-and-publish sequence, so a query never observes a half-built
/// inventory even when an event trigger rescans concurrently.
pub struct DeviceRegistry {
    probe: Box<dyn VolumeProbe>,
    config: RegistryConfig,
    state: Mutex<Inventory>,
    listeners: Mutex<Vec<VolumeChangeListener>>,
}

impl DeviceRegistry {
    /// Creates a registry and runs the initial scan.
    pub fn new(config: RegistryConfig, probe: impl VolumeProbe + 'static) -> Self {
        let probe: Box<dyn VolumeProbe> = Box::new(probe);
        let state = Mutex::new(build_inventory(probe.as_ref(), &config));
        Self {
            probe,
            config,
            state,
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Inventory> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rebuilds the device inventory from current configuration and OS
    /// state, replacing the prior inventory wholesale.
    ///
    /// Never fails: an unreadable configuration degrades to an inventory
    /// without a secondary device.
    pub fn rescan(&self) {
        let mut state = self.lock_state();
        *state = build_inventory(self.probe.as_ref(), &self.config);
    }

    /// Rescans, then invokes every registered volume-change listener in
    /// registration order. The state lock is released before callbacks
    /// run.
    pub fn rescan_and_notify(&self) {
        self.rescan();
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener();
        }
    }

    /// Registers a callback invoked after each [`Self::rescan_and_notify`].
    ///
    /// The external event source is responsible for translating platform
    /// notifications into `rescan_and_notify` calls.
    pub fn on_volume_change(&self, listener: impl Fn() + Send + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// The built-in volume as of the last rescan.
    pub fn primary(&self) -> Device {
        self.lock_state().primary.clone()
    }

    /// The secondary volume, if one was classified.
    pub fn secondary(&self) -> Result<Device> {
        self.lock_state()
            .devices
            .first()
            .cloned()
            .ok_or(Error::NoSecondaryStorage)
    }

    /// Whether a secondary volume exists and currently holds media.
    ///
    /// USB host-port entries need the extra writability check: the mount
    /// path survives as an empty directory with nothing inserted, and
    /// writability is the only usable discriminator short of deeper OS
    /// calls.
    pub fn is_secondary_available(&self) -> bool {
        self.lock_state()
            .devices
            .first()
            .is_some_and(secondary_usable)
    }

    /// Mount path of the secondary volume.
    pub fn secondary_directory(&self) -> Result<PathBuf> {
        Ok(self.secondary()?.mount_point)
    }

    /// Media state of the secondary volume.
    pub fn secondary_state(&self) -> Result<MediaState> {
        Ok(self.secondary()?.state())
    }

    /// Whether the secondary volume is physically removable.
    ///
    /// No tested device solders its secondary slot in, so this holds
    /// whenever a secondary exists.
    pub fn is_secondary_removable(&self) -> Result<bool> {
        Ok(self.secondary()?.removable)
    }

    /// "Give me removable storage if present and inserted, else the
    /// built-in volume": the single most important convenience contract
    /// of the whole subsystem.
    pub fn card_directory(&self) -> PathBuf {
        let state = self.lock_state();
        match state.devices.first() {
            Some(secondary) if secondary_usable(secondary) => secondary.mount_point.clone(),
            _ => state.primary.mount_point.clone(),
        }
    }

    /// Tri-state variant of [`Self::card_directory`]'s fallback.
    pub fn card_state(&self) -> MediaState {
        let state = self.lock_state();
        match state.devices.first() {
            Some(secondary) if secondary_usable(secondary) => secondary.state(),
            _ => state.primary.state(),
        }
    }

    /// Whether the built-in volume itself is a removable physical card.
    pub fn is_external_storage_removable(&self) -> bool {
        self.lock_state().primary.removable
    }

    /// Whether internal storage and user data share one physical
    /// partition. Always false until a filesystem-identity collaborator
    /// exists.
    pub fn is_external_storage_emulated(&self) -> bool {
        self.lock_state().emulated
    }

    /// Filtered view of the inventory.
    ///
    /// `name_filter` is a case-insensitive substring match on the device
    /// name (match-all when absent); `only_available` keeps devices with
    /// media present; `include_internal` adds the primary ahead of the
    /// discovered devices.
    pub fn devices(
        &self,
        name_filter: Option<&str>,
        only_available: bool,
        include_internal: bool,
    ) -> Vec<Device> {
        let state = self.lock_state();
        let filter = name_filter.map(str::to_lowercase);
        let matches = |device: &Device| {
            let name_matches = filter
                .as_deref()
                .is_none_or(|f| device.name.to_lowercase().contains(f));
            name_matches && (!only_available || device.available)
        };

        let mut result = Vec::with_capacity(state.devices.len() + 1);
        if include_internal && matches(&state.primary) {
            result.push(state.primary.clone());
        }
        result.extend(state.devices.iter().filter(|d| matches(d)).cloned());
        result
    }

    /// Path of a named public directory on the secondary volume.
    ///
    /// Pure path construction; creating the directory stays with the
    /// caller.
    pub fn secondary_public_dir(&self, name: &str) -> Result<PathBuf> {
        let secondary = self.secondary()?;
        ensure!(
            !name.is_empty(),
            InvalidArgumentSnafu {
                what: "public directory name must not be empty",
            }
        );
        Ok(secondary.mount_point.join(name))
    }

    /// Path of an app-scoped files directory on the secondary volume,
    /// optionally narrowed to a content kind.
    pub fn secondary_files_dir(&self, package: &str, kind: Option<&str>) -> Result<PathBuf> {
        let secondary = self.secondary()?;
        ensure!(
            !package.is_empty(),
            InvalidArgumentSnafu {
                what: "package name must not be empty",
            }
        );
        let mut dir = secondary
            .mount_point
            .join(APP_DATA_SUBDIR)
            .join(package)
            .join("files");
        if let Some(kind) = kind {
            dir.push(kind);
        }
        Ok(dir)
    }

    /// Path of an app-scoped cache directory on the secondary volume.
    pub fn secondary_cache_dir(&self, package: &str) -> Result<PathBuf> {
        let secondary = self.secondary()?;
        ensure!(
            !package.is_empty(),
            InvalidArgumentSnafu {
                what: "package name must not be empty",
            }
        );
        Ok(secondary
            .mount_point
            .join(APP_DATA_SUBDIR)
            .join(package)
            .join("cache"))
    }
}

/// Availability of the secondary, with the stale-usbdrive override.
fn secondary_usable(secondary: &Device) -> bool {
    if !secondary.available {
        return false;
    }
    if secondary.mount_point.to_string_lossy().contains(USB_DRIVE_MARKER) {
        return secondary.writable;
    }
    true
}

/// Display name for a discovered device, derived from its mount path.
fn device_name(mount_point: &Path) -> String {
    mount_point
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| mount_point.to_string_lossy().into_owned())
}

/// Runs one full discovery pass: probe the primary, scan the
/// configuration, reconcile the flags.
fn build_inventory(probe: &dyn VolumeProbe, config: &RegistryConfig) -> Inventory {
    let baseline = probe.primary_baseline();
    let mut primary = Device {
        mount_point: baseline.mount_point,
        name: String::new(),
        removable: baseline.removable,
        available: baseline.status.available,
        writable: baseline.status.writable,
    };

    let scan = scan_config(config, &primary.mount_point);

    // Config evidence beats the baseline guess: default guesses are known
    // wrong on several vendors, in both directions.
    if scan.primary.force_non_removable {
        if primary.removable {
            warn!("overriding primary removable flag to false ('nonremovable' in config)");
        }
        primary.removable = false;
    } else if scan.primary.saw_primary_in_config {
        primary.removable = true;
    }

    let devices: Vec<Device> = scan
        .records
        .iter()
        .map(|record| {
            let status = probe.status(&record.mount_point);
            Device {
                name: device_name(&record.mount_point),
                mount_point: record.mount_point.clone(),
                removable: true,
                available: status.available,
                writable: status.writable,
            }
        })
        .collect();

    // A distinct second mountable volume proves the built-in one is not
    // itself the removable medium, whatever the flags said.
    if !devices.is_empty() {
        if primary.removable {
            warn!("overriding primary removable flag to false (secondary volume found)");
        }
        primary.removable = false;
    }

    primary.name = if primary.removable {
        PRIMARY_NAME_CARD
    } else {
        PRIMARY_NAME_INTERNAL
    }
    .to_string();

    Inventory {
        primary,
        devices,
        emulated: false,
    }
}

/// Reads the preferred configuration file, falling back to the alternate
/// name, and degrading to an empty scan when neither is readable.
fn scan_config(config: &RegistryConfig, primary_mount: &Path) -> VoldScan {
    let preferred = config.config_dir.join(vold::VOLD_FSTAB);
    match vold::parse_file(&preferred, primary_mount) {
        Ok(scan) => scan,
        Err(error) => {
            debug!(%error, "preferred configuration unreadable, trying fallback");
            let fallback = config.config_dir.join(vold::VOLD_CONF);
            match vold::parse_file(&fallback, primary_mount) {
                Ok(scan) => scan,
                Err(error) => {
                    debug!(%error, "no readable mount configuration, keeping primary only");
                    VoldScan::default()
                }
            }
        }
    }
}
