//! volscan CLI - inspect storage volume discovery results.
//!
//! Thin front-end over volscan-core: builds a registry, runs the initial
//! scan and prints what was classified. Doubles as a manual rescan
//! trigger when poking at vendor configuration files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use volscan_core::{Device, DeviceRegistry, RegistryConfig, SystemProbe, registry};

/// Storage volume discovery tool.
#[derive(Parser)]
#[command(name = "volscan")]
#[command(about = "Discover and classify mountable storage volumes", long_about = None)]
struct Cli {
    /// Directory containing the vold configuration files.
    #[arg(long, default_value = registry::DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Mount path of the built-in volume.
    #[arg(long, default_value = "/mnt/sdcard")]
    primary: PathBuf,

    /// OS hint that the built-in volume is a removable card.
    #[arg(long)]
    removable_hint: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the primary/secondary classification summary.
    Status,
    /// List discovered devices.
    List {
        /// Only devices whose name contains this substring.
        #[arg(long)]
        filter: Option<String>,
        /// Only devices with media present.
        #[arg(long)]
        available: bool,
        /// Include the built-in volume.
        #[arg(long)]
        internal: bool,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective card directory (secondary if usable, else
    /// primary).
    CardPath,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let registry = DeviceRegistry::new(
        RegistryConfig::new().with_config_dir(&cli.config_dir),
        SystemProbe::new(&cli.primary, cli.removable_hint),
    );

    match cli.command {
        Commands::Status => print_status(&registry),
        Commands::List {
            filter,
            available,
            internal,
            json,
        } => {
            let devices = registry.devices(filter.as_deref(), available, internal);
            if json {
                match serde_json::to_string_pretty(&devices) {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        eprintln!("Failed to encode device list: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_device_table(&devices);
            }
        }
        Commands::CardPath => println!("{}", registry.card_directory().display()),
    }

    ExitCode::SUCCESS
}

fn print_status(registry: &DeviceRegistry) {
    let primary = registry.primary();
    println!(
        "primary:   {} ({}, {}{})",
        primary.mount_point.display(),
        primary.name,
        primary.state().as_str(),
        if primary.removable { ", removable" } else { "" },
    );

    match registry.secondary() {
        Ok(secondary) => {
            let inserted = if registry.is_secondary_available() {
                "inserted"
            } else {
                "not inserted"
            };
            println!(
                "secondary: {} ({}, {}, {})",
                secondary.mount_point.display(),
                secondary.name,
                secondary.state().as_str(),
                inserted,
            );
        }
        Err(_) => println!("secondary: none"),
    }

    println!(
        "card path: {} ({})",
        registry.card_directory().display(),
        registry.card_state().as_str(),
    );
}

fn print_device_table(devices: &[Device]) {
    if devices.is_empty() {
        println!("no devices matched");
        return;
    }
    for device in devices {
        println!(
            "{:<12} {:<24} {}{}",
            device.name,
            device.mount_point.display(),
            device.state().as_str(),
            if device.removable { " removable" } else { "" },
        );
    }
}
