//! Standalone candump dispatcher
//!
//! Replays a candump log through the registry and prints every frame with
//! its descriptor, flagging unknown identifiers and length mismatches.
//!
//! Usage:
//!   dispatch_log <candump.log> [--limit <count>] [--verbose]
//!
//! Example:
//!   dispatch_log bus.log --limit 100

use can_registry::formats::CandumpParser;
use can_registry::{DispatchConfig, DispatchEvent, Dispatcher, Registry, Timestamp};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn timestamp_to_secs(ts: &Timestamp) -> f64 {
    ts.timestamp() as f64 + (ts.timestamp_subsec_nanos() as f64 / 1_000_000_000.0)
}

#[derive(Default)]
struct DispatchStats {
    total_frames: usize,
    valid_frames: usize,
    control_frames: usize,
    invalid_frames: usize,
    unique_messages: HashMap<String, usize>,
}

impl DispatchStats {
    fn print_summary(&self) {
        println!("\n=== DISPATCH SUMMARY ===");
        println!("Total frames processed: {}", self.total_frames);
        println!("Valid frames: {}", self.valid_frames);
        println!("Control frames: {}", self.control_frames);
        println!("Invalid frames: {}", self.invalid_frames);
        println!("Unique message names: {}", self.unique_messages.len());

        if !self.unique_messages.is_empty() {
            println!("\nTop 10 Most Frequent Messages:");
            let mut sorted: Vec<_> = self.unique_messages.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1));
            for (name, count) in sorted.iter().take(10) {
                println!("  {}: {} times", name, count);
            }
        }
    }
}

fn print_event(event: &DispatchEvent, verbose: bool) {
    match event {
        DispatchEvent::Frame {
            timestamp,
            channel,
            descriptor,
            data,
        } => {
            if verbose {
                println!(
                    "[{:.6}s] CH{} 0x{:03X} {} {:02X?}",
                    timestamp_to_secs(timestamp),
                    channel,
                    descriptor.id,
                    descriptor.name,
                    data
                );
            }
        }
        DispatchEvent::Control {
            timestamp,
            channel,
            descriptor,
            event,
            outcome,
            data,
        } => {
            println!(
                "[{:.6}s] CH{} 0x{:03X} {} {:02X?} {:?}{}",
                timestamp_to_secs(timestamp),
                channel,
                descriptor.id,
                descriptor.name,
                data,
                event,
                match outcome {
                    Ok(()) => String::new(),
                    Err(e) => format!(" REJECTED: {}", e),
                }
            );
        }
        DispatchEvent::Invalid {
            timestamp,
            channel,
            can_id,
            error,
            ..
        } => {
            println!(
                "[{:.6}s] CH{} 0x{:03X} INVALID: {}",
                timestamp_to_secs(timestamp),
                channel,
                can_id,
                error
            );
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <candump.log> [--limit <count>] [--verbose]", args[0]);
        std::process::exit(1);
    }

    let log_file = PathBuf::from(&args[1]);
    let mut limit: Option<usize> = None;
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                i += 1;
                if i < args.len() {
                    limit = Some(args[i].parse()?);
                }
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    let registry = Arc::new(Registry::new()?);
    let stats = registry.table().stats();
    println!("=== CAN Registry ===");
    println!(
        "Catalog: {} identifiers ({} named, {} reserved, {} dynamic)",
        stats.total, stats.named, stats.reserved, stats.dynamic
    );
    println!("Log file: {:?}\n", log_file);

    let dispatcher = Dispatcher::new(Arc::clone(&registry), DispatchConfig::new())?;
    let frames = CandumpParser::parse(&log_file)?;

    let mut stats = DispatchStats::default();
    for result in dispatcher.dispatch_all(frames) {
        if let Some(max) = limit {
            if stats.total_frames >= max {
                println!("\n... (limit of {} frames reached)", max);
                break;
            }
        }

        let event = match result {
            Ok(event) => event,
            Err(e) => {
                eprintln!("Error reading frame: {}", e);
                continue;
            }
        };

        stats.total_frames += 1;
        match &event {
            DispatchEvent::Frame { descriptor, .. } => {
                stats.valid_frames += 1;
                *stats
                    .unique_messages
                    .entry(descriptor.name.to_string())
                    .or_insert(0) += 1;
            }
            DispatchEvent::Control { .. } => stats.control_frames += 1,
            DispatchEvent::Invalid { .. } => stats.invalid_frames += 1,
        }
        print_event(&event, verbose);
    }

    stats.print_summary();

    let bindings = registry.resolver().snapshot();
    if !bindings.is_empty() {
        println!("\nActive sensor bindings:");
        for (id, channel) in bindings {
            println!("  0x{:03X} -> {}", id, channel);
        }
    }

    Ok(())
}
