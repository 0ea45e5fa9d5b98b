//! Unified error types for the volscan-core library.
//!
//! Uses SNAFU for context-rich error handling. Discovery itself is
//! best-effort and absorbs configuration trouble; only sharply-defined
//! query misuse surfaces as a typed error.

use snafu::{ResultExt, Snafu};
use std::path::PathBuf;

/// Result type alias using the library's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all core library operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A secondary-storage accessor was called when no secondary device
    /// was classified by the last rescan.
    #[snafu(display("no secondary storage device present"))]
    NoSecondaryStorage,

    /// A structurally required argument was missing or empty.
    #[snafu(display("invalid argument: {what}"))]
    InvalidArgument { what: String },

    /// Mount configuration file not found or cannot be read.
    ///
    /// Never escapes a rescan; the registry degrades to an inventory
    /// without a secondary device instead.
    #[snafu(display("failed to read mount configuration at {}", path.display()))]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Extension trait for adding context to io::Error results.
pub trait IoResultExt<T> {
    /// Add context for configuration read errors.
    fn config_read_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn config_read_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.context(ConfigReadSnafu { path: path.into() })
    }
}
