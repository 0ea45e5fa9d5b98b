//! Volume attribute probing.
//!
//! The registry's window onto OS-reported volume state. The [`VolumeProbe`]
//! trait keeps the boundary mockable; [`SystemProbe`] implements it against
//! the live filesystem.

use std::path::{Path, PathBuf};

use nix::unistd::{AccessFlags, access};

/// Momentary availability and writability of one mount path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeStatus {
    /// Media present and mounted at the path.
    pub available: bool,
    /// The mount is read-write for the current process.
    pub writable: bool,
}

/// OS-reported baseline attributes of the built-in volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryBaseline {
    /// Mount path of the built-in volume.
    pub mount_point: PathBuf,
    /// Best-guess removability. Known unreliable on several vendors;
    /// classification may override it with configuration evidence.
    pub removable: bool,
    /// Current availability and writability.
    pub status: VolumeStatus,
}

/// Source of OS-reported volume attributes.
pub trait VolumeProbe: Send + Sync {
    /// Baseline attributes of the built-in volume.
    fn primary_baseline(&self) -> PrimaryBaseline;

    /// Current attributes of an arbitrary mount path.
    fn status(&self, mount_point: &Path) -> VolumeStatus;
}

/// Probe backed by the live filesystem.
///
/// Availability means the mount path exists as a directory; writability is
/// an `access(2)` check with `W_OK`. Both are cheap, blocking calls.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    primary_mount: PathBuf,
    removable_hint: bool,
}

impl SystemProbe {
    /// Creates a probe for a host whose built-in volume lives at
    /// `primary_mount`.
    ///
    /// `removable_hint` is the OS's guess whether that volume is a physical
    /// card.
    pub fn new(primary_mount: impl Into<PathBuf>, removable_hint: bool) -> Self {
        Self {
            primary_mount: primary_mount.into(),
            removable_hint,
        }
    }
}

impl VolumeProbe for SystemProbe {
    fn primary_baseline(&self) -> PrimaryBaseline {
        PrimaryBaseline {
            mount_point: self.primary_mount.clone(),
            removable: self.removable_hint,
            status: self.status(&self.primary_mount),
        }
    }

    fn status(&self, mount_point: &Path) -> VolumeStatus {
        let available = mount_point.is_dir();
        let writable = available && access(mount_point, AccessFlags::W_OK).is_ok();
        VolumeStatus {
            available,
            writable,
        }
    }
}
