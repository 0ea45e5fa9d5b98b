//! Vold mount-table parsing.
//!
//! This module reads and interprets the `vold.fstab`/`vold.conf`
//! configuration of the volume-mounting daemon. The format is
//! line-oriented and varies across vendors, so parsing is deliberately
//! tolerant: a line that cannot be interpreted is classified, counted and
//! skipped rather than failing the whole scan. Only an unreadable file is
//! an error, and even that is absorbed one level up by the registry.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{IoResultExt, Result};

/// Token introducing a mountable-device record.
pub const DEV_MOUNT: &str = "dev_mount";

/// Preferred configuration file name.
pub const VOLD_FSTAB: &str = "vold.fstab";

/// Fallback configuration file name, tried when the preferred one is
/// unreadable.
pub const VOLD_CONF: &str = "vold.conf";

/// Modifier substring marking the primary volume as soldered in.
const NONREMOVABLE: &str = "nonremovable";

/// One mountable-device record from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Vendor label token, informational only.
    pub label: String,
    /// Path at which the device is mounted.
    pub mount_point: PathBuf,
}

/// Side-channel flags affecting the primary volume.
///
/// Records for the primary's own mount path are folded into these flags
/// instead of the record list, so a mount path stays unique within a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimaryModifiers {
    /// Config evidence says the primary is not removable, either a
    /// `nonremovable` modifier on its record or a `discard = disable`
    /// prefix directive.
    pub force_non_removable: bool,
    /// The configuration contained a record for the primary's own mount
    /// path. Absent an override, that is taken as a removable hint.
    pub saw_primary_in_config: bool,
}

/// Result of scanning one configuration file.
#[derive(Debug, Clone, Default)]
pub struct VoldScan {
    /// Device records in file order, primary duplicates excluded.
    /// The first entry is the default secondary candidate.
    pub records: Vec<DeviceRecord>,
    /// Flags collected for the primary volume.
    pub primary: PrimaryModifiers,
    /// `dev_mount` lines with too few tokens to form a record.
    pub malformed_records: usize,
    /// Prefix directives that could not be interpreted.
    pub unrecognized_directives: usize,
}

/// Structural classification of a single configuration line.
///
/// Kept as a named type so the tolerant skip paths stay testable instead
/// of silent fallthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineClass<'a> {
    /// A well-formed `dev_mount` record.
    Record {
        label: &'a str,
        mount_point: &'a str,
        modifiers: Vec<&'a str>,
    },
    /// A `dev_mount` line missing its label or mount point.
    MalformedRecord,
    /// A `discard` prefix directive; `None` when the `= value` shape is
    /// broken.
    Discard(Option<&'a str>),
    /// Anything else; ignored for forward compatibility.
    Other,
}

/// Tokenizes one line on whitespace and classifies its shape.
///
/// A strict sequential token stream, no quoting or escaping.
fn classify_line(line: &str) -> LineClass<'_> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some(DEV_MOUNT) => match (tokens.next(), tokens.next()) {
            (Some(label), Some(mount_point)) => {
                let _major = tokens.next(); // device major id, ignored
                LineClass::Record {
                    label,
                    mount_point,
                    modifiers: tokens.collect(),
                }
            }
            _ => LineClass::MalformedRecord,
        },
        Some("discard") => match (tokens.next(), tokens.next()) {
            (Some("="), Some(setting)) => LineClass::Discard(Some(setting)),
            _ => LineClass::Discard(None),
        },
        _ => LineClass::Other,
    }
}

/// Parses configuration text into device records and primary modifiers.
///
/// `primary_mount` is the mount path of the built-in volume; records for
/// that path become [`PrimaryModifiers`] instead of entries in
/// [`VoldScan::records`]. Malformed lines are skipped and counted, never
/// fatal.
pub fn parse_str(contents: &str, primary_mount: &Path) -> VoldScan {
    let mut scan = VoldScan::default();
    // Directives are only honored ahead of the first dev_mount record.
    let mut prefix_scan = true;

    for line in contents.lines() {
        match classify_line(line) {
            LineClass::Record {
                label,
                mount_point,
                modifiers,
            } => {
                if Path::new(mount_point) == primary_mount {
                    scan.primary.saw_primary_in_config = true;
                    for modifier in modifiers {
                        // e.g. Galaxy Note appends "encryptable_nonremovable"
                        if modifier.contains(NONREMOVABLE) {
                            warn!(modifier, "primary volume marked nonremovable by its record");
                            scan.primary.force_non_removable = true;
                        }
                    }
                } else {
                    scan.records.push(DeviceRecord {
                        label: label.to_string(),
                        mount_point: PathBuf::from(mount_point),
                    });
                }
                prefix_scan = false;
            }
            LineClass::MalformedRecord => {
                debug!(line, "skipping malformed dev_mount record");
                scan.malformed_records += 1;
            }
            LineClass::Discard(setting) if prefix_scan => match setting {
                Some("disable") => {
                    warn!("primary volume marked nonremovable by 'discard = disable'");
                    scan.primary.force_non_removable = true;
                }
                Some("enable") => {
                    // Both handsets observed with this setting had soldered-in
                    // cards, so the flag is not trusted in this direction.
                    warn!("'discard = enable' seen; unreliable, keeping current removable flag");
                }
                other => {
                    debug!(?other, line, "unrecognized discard directive");
                    scan.unrecognized_directives += 1;
                }
            },
            // Past the first record, prefix directives are dead.
            LineClass::Discard(_) => {}
            LineClass::Other => {}
        }
    }

    scan
}

/// Parses a configuration file.
///
/// Fails only when the file cannot be read at all; content-level garbage
/// is handled by [`parse_str`]'s skip-and-continue policy.
pub fn parse_file(path: &Path, primary_mount: &Path) -> Result<VoldScan> {
    let contents = fs::read_to_string(path).config_read_context(path)?;
    Ok(parse_str(&contents, primary_mount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PRIMARY: &str = "/mnt/sdcard";

    const SAMPLE_VOLD_FSTAB: &str = r#"## Vold 2.0 fstab
## - San Disk Corp. style card slot plus USB host port

dev_mount sdcard /mnt/sdcard auto /devices/platform/s3c-sdhci.2/mmc_host/mmc0
dev_mount extsd /mnt/extSdCard 179 /devices/platform/s3c-sdhci.0/mmc_host/mmc1
dev_mount usb /mnt/usbdrive 8 /devices/platform/s3c_otghcd
"#;

    #[test]
    fn test_classify_record_line() {
        let class = classify_line("dev_mount sdcard /mnt/extSdCard 179 encryptable_nonremovable");
        assert_eq!(
            class,
            LineClass::Record {
                label: "sdcard",
                mount_point: "/mnt/extSdCard",
                modifiers: vec!["encryptable_nonremovable"],
            }
        );
    }

    #[test]
    fn test_classify_truncated_record() {
        assert_eq!(classify_line("dev_mount sdcard"), LineClass::MalformedRecord);
        assert_eq!(classify_line("dev_mount"), LineClass::MalformedRecord);
    }

    #[test]
    fn test_classify_discard_shapes() {
        assert_eq!(
            classify_line("discard = disable"),
            LineClass::Discard(Some("disable"))
        );
        // Missing the separator token; tokenizing has no smarts for "a=b".
        assert_eq!(classify_line("discard=enable"), LineClass::Other);
        assert_eq!(classify_line("discard disable"), LineClass::Discard(None));
    }

    #[test]
    fn test_classify_other_lines() {
        assert_eq!(classify_line("## comment"), LineClass::Other);
        assert_eq!(classify_line(""), LineClass::Other);
        assert_eq!(classify_line("mount_point /mnt/secure/asec"), LineClass::Other);
    }

    #[test]
    fn test_parse_folds_primary_record() {
        let scan = parse_str(SAMPLE_VOLD_FSTAB, Path::new(PRIMARY));

        // The /mnt/sdcard record becomes a modifier, not an inventory entry.
        assert!(scan.primary.saw_primary_in_config);
        assert!(!scan.primary.force_non_removable);
        let mounts: Vec<_> = scan
            .records
            .iter()
            .map(|r| r.mount_point.display().to_string())
            .collect();
        assert_eq!(mounts, vec!["/mnt/extSdCard", "/mnt/usbdrive"]);
    }

    #[test]
    fn test_parse_records_keep_file_order() {
        let contents = "dev_mount usb /mnt/usbdrive 8\ndev_mount extsd /mnt/extSdCard 179\n";
        let scan = parse_str(contents, Path::new(PRIMARY));
        assert_eq!(scan.records[0].mount_point, PathBuf::from("/mnt/usbdrive"));
        assert_eq!(scan.records[1].mount_point, PathBuf::from("/mnt/extSdCard"));
    }

    #[test]
    fn test_parse_nonremovable_modifier() {
        let contents = "dev_mount sdcard /mnt/sdcard 179 encryptable_nonremovable\n";
        let scan = parse_str(contents, Path::new(PRIMARY));
        assert!(scan.primary.saw_primary_in_config);
        assert!(scan.primary.force_non_removable);
        assert!(scan.records.is_empty());
    }

    #[test]
    fn test_parse_discard_disable() {
        let contents = "discard = disable\ndev_mount sdcard /mnt/sdcard auto\n";
        let scan = parse_str(contents, Path::new(PRIMARY));
        assert!(scan.primary.force_non_removable);
    }

    #[test]
    fn test_parse_discard_enable_not_trusted() {
        // Observed wrong on every device carrying it, so it must not flip
        // the flag in the removable direction.
        let contents = "discard = enable\ndev_mount sdcard /mnt/sdcard auto\n";
        let scan = parse_str(contents, Path::new(PRIMARY));
        assert!(!scan.primary.force_non_removable);
        assert_eq!(scan.unrecognized_directives, 0);
    }

    #[test]
    fn test_parse_discard_ignored_after_first_record() {
        let contents = "dev_mount extsd /mnt/extSdCard 179\ndiscard = disable\n";
        let scan = parse_str(contents, Path::new(PRIMARY));
        assert!(!scan.primary.force_non_removable);
    }

    #[test]
    fn test_parse_counts_malformed_and_unrecognized() {
        let contents = "discard = sometimes\ndev_mount nolabel\ndev_mount extsd /mnt/extSdCard 179\n";
        let scan = parse_str(contents, Path::new(PRIMARY));
        assert_eq!(scan.unrecognized_directives, 1);
        assert_eq!(scan.malformed_records, 1);
        assert_eq!(scan.records.len(), 1);
    }

    #[test]
    fn test_parse_garbage_keeps_good_records() {
        let contents = "\u{0}\u{1}binary junk\ndev_mount extsd /mnt/extSdCard 179\n%%%%\n";
        let scan = parse_str(contents, Path::new(PRIMARY));
        assert_eq!(scan.records.len(), 1);
    }

    #[test]
    fn test_parse_file_reads_contents() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_VOLD_FSTAB.as_bytes()).unwrap();

        let scan = parse_file(file.path(), Path::new(PRIMARY)).unwrap();
        assert_eq!(scan.records.len(), 2);
        assert!(scan.primary.saw_primary_in_config);
    }

    #[test]
    fn test_parse_file_unreadable() {
        let result = parse_file(Path::new("/nonexistent/vold.fstab"), Path::new(PRIMARY));
        assert!(result.is_err());
    }
}
