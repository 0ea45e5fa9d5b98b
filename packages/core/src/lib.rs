//! volscan-core: storage volume discovery and classification.
//!
//! This library discovers the mountable storage volumes of a host that
//! pairs an always-present built-in volume with zero or more removable
//! slots, and answers which volume is the "primary" built-in storage and
//! which, if any, is a distinct "secondary" card. Discovery reads the
//! volume daemon's `vold.fstab`/`vold.conf` configuration and reconciles
//! it with OS-reported flags, which disagree often enough across vendors
//! that neither source can be trusted alone.
//!
//! # Modules
//!
//! - [`device`]: Storage volume entity and media states
//! - [`vold`]: Tolerant vold mount-table parsing
//! - [`probe`]: OS-reported volume attributes behind a mockable trait
//! - [`registry`]: Device inventory, rescan engine and query API
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```no_run
//! use volscan_core::{DeviceRegistry, RegistryConfig, SystemProbe};
//!
//! // One registry per process; construction runs the initial scan.
//! let registry = DeviceRegistry::new(
//!     RegistryConfig::new(),
//!     SystemProbe::new("/mnt/sdcard", false),
//! );
//!
//! // Removable storage if present and inserted, else built-in storage.
//! let data_dir = registry.card_directory();
//! println!("storing map data under {}", data_dir.display());
//!
//! // Media change notifications from the platform land here.
//! registry.rescan_and_notify();
//! ```

pub mod device;
pub mod error;
pub mod probe;
pub mod registry;
pub mod vold;

// Re-export commonly used types
pub use device::{Device, MediaState};
pub use error::{Error, Result};
pub use probe::{PrimaryBaseline, SystemProbe, VolumeProbe, VolumeStatus};
pub use registry::{DeviceRegistry, RegistryConfig};
pub use vold::{DeviceRecord, PrimaryModifiers, VoldScan};
