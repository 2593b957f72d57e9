//! CAN Registry CLI Application
//!
//! Command-line front end for the can-registry library:
//! - Describe and list protocol identifiers
//! - Check candump logs against the registry (validation, sensor bindings,
//!   node tracking)
//! - Audit and export DBC files
//! - Checksum node configuration images
//! - Validate outgoing frames

use anyhow::{bail, Context, Result};
use can_registry::formats::candump::{parse_hex, parse_interface};
use can_registry::formats::{self, CandumpWriter};
use can_registry::{Category, DispatchConfig, Dispatcher, MessageDescriptor, Registry};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod report;
mod state;

use config::{AppConfig, OutputFormat};
use report::{FileReport, ReportBuilder};

/// CAN Registry - Inspect the controller protocol and check CAN logs
#[derive(Parser, Debug)]
#[command(name = "can-registry-cli")]
#[command(about = "Inspect the CAN protocol registry and check candump logs", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe identifiers (hex, e.g. 0x112 or 52A)
    Describe {
        #[arg(required = true, value_parser = parse_id)]
        ids: Vec<u16>,
    },

    /// List the descriptor table
    List {
        /// Only this category (e.g. sensor-data, introduction, config)
        #[arg(long)]
        category: Option<Category>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check candump logs against the registry
    Check {
        /// candump log files (default: [input] files of the config)
        #[arg(value_name = "LOG")]
        logs: Vec<PathBuf>,

        /// Path to configuration file (config.toml)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Maximum number of frames to check per log
        #[arg(long, value_name = "COUNT")]
        max_frames: Option<usize>,

        /// Report format (overrides the config file)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Compare a DBC file with the registry
    AuditDbc {
        #[arg(value_name = "DBC")]
        dbc: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write the registry as a DBC skeleton
    ExportDbc {
        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the CRC-16/CCITT-FALSE of a node configuration image
    Crc {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Fail unless the image matches this CRC (hex)
        #[arg(long, value_parser = parse_id)]
        expect: Option<u16>,
    },

    /// Validate an outgoing frame and print it as a candump line
    Send {
        #[arg(value_parser = parse_id)]
        id: u16,

        /// Payload as hex, e.g. 0102030405 (empty for none)
        #[arg(default_value = "")]
        payload: String,

        #[arg(long, default_value = "can0")]
        iface: String,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Registry CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using registry library v{}", can_registry::VERSION);

    let registry = Registry::new().context("Embedded protocol table is inconsistent")?;

    match args.command {
        Command::Describe { ids } => {
            for id in ids {
                println!("{}", registry.describe(id));
            }
        }
        Command::List { category, json } => list(&registry, category, json)?,
        Command::Check {
            logs,
            config,
            max_frames,
            format,
        } => check(logs, config.as_deref(), max_frames, format)?,
        Command::AuditDbc { dbc, json } => audit(&registry, &dbc, json)?,
        Command::ExportDbc { output } => {
            let dbc = can_registry::export_dbc(registry.table());
            match output {
                Some(path) => {
                    std::fs::write(&path, dbc)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    log::info!("DBC written to {:?}", path);
                }
                None => print!("{}", dbc),
            }
        }
        Command::Crc { image, expect } => {
            let crc = image_crc(&image, expect)?;
            println!("0x{:04X}", crc);
        }
        Command::Send { id, payload, iface } => send(registry, id, &payload, &iface)?,
    }

    Ok(())
}

/// Parse a hex identifier with or without `0x`
fn parse_id(s: &str) -> std::result::Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|_| format!("invalid hex identifier: {}", s))
}

fn list(registry: &Registry, category: Option<Category>, json: bool) -> Result<()> {
    let descriptors: Vec<MessageDescriptor> = match category {
        Some(category) => registry.iter_category(category).collect(),
        None => registry.iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    for descriptor in &descriptors {
        match descriptor.comment {
            Some(comment) if !descriptor.reserved => {
                println!("{:<60} {}", descriptor.to_string(), comment)
            }
            _ => println!("{}", descriptor),
        }
    }
    log::info!("{} descriptors", descriptors.len());
    Ok(())
}

fn check(
    logs: Vec<PathBuf>,
    config_path: Option<&Path>,
    max_frames: Option<usize>,
    format: Option<OutputFormat>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    let logs = if logs.is_empty() {
        config.input.files.clone()
    } else {
        logs
    };
    if logs.is_empty() {
        bail!("No log files given (pass LOG arguments or set [input] files)");
    }
    let format = format.unwrap_or(config.output.format);

    // One registry per log: sensor bindings belong to a single bus
    let results: Vec<(PathBuf, Result<FileReport>)> = logs
        .par_iter()
        .map(|path| {
            let result = check_file(path, &config.dispatch, max_frames);
            (path.clone(), result)
        })
        .collect();

    let mut failed = 0;
    for (path, result) in results {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                log::error!("{:?}: {:#}", path, e);
                failed += 1;
                continue;
            }
        };

        let rendered = report.render(format)?;
        match &config.output.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {:?}", dir))?;
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("log");
                let out = dir.join(format!("{}.report.{}", stem, format.extension()));
                std::fs::write(&out, rendered)
                    .with_context(|| format!("Failed to write {:?}", out))?;
                log::info!("Report written to {:?}", out);
            }
            None => println!("{}", rendered),
        }
    }

    if failed > 0 {
        bail!("{} of {} logs could not be checked", failed, logs.len());
    }
    Ok(())
}

fn check_file(path: &Path, config: &DispatchConfig, max_frames: Option<usize>) -> Result<FileReport> {
    let registry = Arc::new(Registry::new()?);
    let dispatcher = Dispatcher::new(Arc::clone(&registry), config.clone())?;
    let frames = formats::open_log(path)?;

    let mut builder = ReportBuilder::new(path.display().to_string());
    let mut seen = 0;
    for result in dispatcher.dispatch_all(frames) {
        if max_frames.map_or(false, |max| seen >= max) {
            log::info!("{:?}: stopped after {} frames", path, seen);
            break;
        }
        seen += 1;
        match result {
            Ok(event) => builder.observe(&event),
            Err(e) => {
                log::warn!("{:?}: {}", path, e);
                builder.parse_error();
            }
        }
    }

    Ok(builder.finish(registry.resolver().snapshot()))
}

fn audit(registry: &Registry, dbc: &Path, json: bool) -> Result<()> {
    let audit = can_registry::audit_dbc(dbc, registry.table())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&audit)?);
    } else {
        println!("{}: {} messages", audit.source, audit.messages);
        for finding in &audit.findings {
            println!("  {}", finding);
        }
        if audit.is_clean() {
            println!("  ✓ consistent with the registry");
        }
    }
    Ok(())
}

fn image_crc(path: &Path, expect: Option<u16>) -> Result<u16> {
    let image = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let crc = can_registry::crc16_ccitt(&image);
    log::info!("{:?}: {} bytes, CRC 0x{:04X}", path, image.len(), crc);
    if let Some(expected) = expect {
        if crc != expected {
            bail!(
                "{:?}: CRC 0x{:04X} does not match expected 0x{:04X}",
                path,
                crc,
                expected
            );
        }
    }
    Ok(crc)
}

fn send(registry: Registry, id: u16, payload: &str, iface: &str) -> Result<()> {
    let payload = parse_hex(payload).map_err(anyhow::Error::msg)?;

    let (prefix, channel) = parse_interface(iface).map_err(anyhow::Error::msg)?;

    let dispatcher = Dispatcher::new(Arc::new(registry), DispatchConfig::new())?;
    let mut writer = CandumpWriter::with_interface_prefix(std::io::stdout(), prefix);
    dispatcher
        .send(&mut writer, channel, id, &payload)
        .with_context(|| format!("Refusing to send 0x{:03X}", id))?;
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
