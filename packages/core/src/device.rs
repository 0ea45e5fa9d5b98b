//! Storage volume entity.
//!
//! A [`Device`] is one mountable storage volume together with the
//! attributes the registry assigns during classification. Instances are
//! snapshots: a rescan replaces the whole inventory, so callers re-query
//! rather than hold on to a `Device` across rescans.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Media state of a volume, mirroring the classic mounted/read-only/removed
/// tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaState {
    /// Media present and mounted read-write.
    Mounted,
    /// Media present but the mount is read-only.
    MountedReadOnly,
    /// No media present at the mount path.
    Removed,
}

impl MediaState {
    /// Human-readable label for display surfaces.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaState::Mounted => "mounted",
            MediaState::MountedReadOnly => "mounted-ro",
            MediaState::Removed => "removed",
        }
    }
}

/// One storage volume known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Absolute path at which the volume's contents become visible.
    /// Stable identity key; unique within an inventory.
    pub mount_point: PathBuf,
    /// Display name assigned by the registry, not the OS.
    pub name: String,
    /// Whether the volume is a physically extractable medium.
    pub removable: bool,
    /// Whether media is currently present and mounted.
    pub available: bool,
    /// Whether the current mount is read-write.
    pub writable: bool,
}

impl Device {
    /// Media state derived from the availability and writability flags.
    pub fn state(&self) -> MediaState {
        if self.available {
            if self.writable {
                MediaState::Mounted
            } else {
                MediaState::MountedReadOnly
            }
        } else {
            MediaState::Removed
        }
    }
}
