//! Report generation
//!
//! One report per checked log, rendered as plain text or JSON.

use crate::config::OutputFormat;
use crate::state::{NodeState, NodeTracker};
use anyhow::Result;
use can_registry::{Category, ChannelId, DispatchEvent, Timestamp, ValidationError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Summary of dispatching one log file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub frames: usize,
    pub valid: usize,
    pub control: usize,
    pub invalid: usize,
    /// Lines the candump parser could not read
    pub parse_errors: usize,
    pub first_timestamp: Option<Timestamp>,
    pub last_timestamp: Option<Timestamp>,
    pub categories: BTreeMap<Category, usize>,
    /// Frame counts of identifiers outside the protocol
    pub unknown_ids: BTreeMap<u32, usize>,
    /// Frame counts of length mismatches per identifier
    pub length_mismatches: BTreeMap<u16, usize>,
    /// Control frames whose assignment was refused
    pub rejected_controls: Vec<String>,
    /// Sensor bindings still active at the end of the log
    pub bindings: Vec<(u16, ChannelId)>,
    pub nodes: Vec<NodeState>,
    /// Node ids whose stored config CRC differs from the expected one
    pub crc_mismatches: Vec<u32>,
}

/// Accumulates a [`FileReport`] while a log is dispatched
pub struct ReportBuilder {
    report: FileReport,
    nodes: NodeTracker,
}

impl ReportBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            report: FileReport {
                file: file.into(),
                frames: 0,
                valid: 0,
                control: 0,
                invalid: 0,
                parse_errors: 0,
                first_timestamp: None,
                last_timestamp: None,
                categories: BTreeMap::new(),
                unknown_ids: BTreeMap::new(),
                length_mismatches: BTreeMap::new(),
                rejected_controls: Vec::new(),
                bindings: Vec::new(),
                nodes: Vec::new(),
                crc_mismatches: Vec::new(),
            },
            nodes: NodeTracker::new(),
        }
    }

    pub fn observe(&mut self, event: &DispatchEvent) {
        let report = &mut self.report;
        report.frames += 1;

        let timestamp = event.timestamp();
        report.first_timestamp.get_or_insert(timestamp);
        report.last_timestamp = Some(timestamp);

        if let Some(descriptor) = event.descriptor() {
            *report.categories.entry(descriptor.category).or_insert(0) += 1;
        }

        match event {
            DispatchEvent::Frame { .. } => report.valid += 1,
            DispatchEvent::Control {
                descriptor,
                event,
                outcome,
                ..
            } => {
                report.control += 1;
                if let Err(e) = outcome {
                    report
                        .rejected_controls
                        .push(format!("{} {:?}: {}", descriptor.name, event, e));
                }
            }
            DispatchEvent::Invalid { can_id, error, .. } => {
                report.invalid += 1;
                match error {
                    ValidationError::Unknown(_) => {
                        *report.unknown_ids.entry(*can_id).or_insert(0) += 1;
                    }
                    ValidationError::LengthMismatch { .. } => {
                        // A length mismatch always has a standard identifier
                        *report
                            .length_mismatches
                            .entry(*can_id as u16)
                            .or_insert(0) += 1;
                    }
                }
            }
        }

        self.nodes.observe(event);
    }

    pub fn parse_error(&mut self) {
        self.report.parse_errors += 1;
    }

    pub fn finish(mut self, bindings: Vec<(u16, ChannelId)>) -> FileReport {
        self.report.bindings = bindings;
        self.report.nodes = self.nodes.into_nodes();
        self.report.crc_mismatches = self
            .report
            .nodes
            .iter()
            .filter(|node| node.crc_mismatch())
            .map(|node| node.node_id)
            .collect();
        self.report
    }
}

impl FileReport {
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Txt => Ok(self.render_txt()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    pub fn render_txt(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "═══════════════════════════════════════════════");
        let _ = writeln!(out, "  {}", self.file);
        let _ = writeln!(out, "═══════════════════════════════════════════════");
        let _ = writeln!(
            out,
            "Frames: {} (valid {}, control {}, invalid {}, unreadable lines {})",
            self.frames, self.valid, self.control, self.invalid, self.parse_errors
        );
        if let (Some(first), Some(last)) = (self.first_timestamp, self.last_timestamp) {
            let _ = writeln!(
                out,
                "Span:   {} .. {}",
                first.format("%Y-%m-%d %H:%M:%S%.6f"),
                last.format("%Y-%m-%d %H:%M:%S%.6f")
            );
        }

        if !self.categories.is_empty() {
            let _ = writeln!(out, "\nCategories:");
            for (category, count) in &self.categories {
                let _ = writeln!(out, "  {:<22} {}", category, count);
            }
        }

        if !self.unknown_ids.is_empty() {
            let _ = writeln!(out, "\nUnknown identifiers:");
            for (id, count) in &self.unknown_ids {
                let _ = writeln!(out, "  0x{:03X}  {} frames", id, count);
            }
        }

        if !self.length_mismatches.is_empty() {
            let _ = writeln!(out, "\nLength mismatches:");
            for (id, count) in &self.length_mismatches {
                let _ = writeln!(out, "  0x{:03X}  {} frames", id, count);
            }
        }

        if !self.rejected_controls.is_empty() {
            let _ = writeln!(out, "\nRejected control frames:");
            for rejected in &self.rejected_controls {
                let _ = writeln!(out, "  {}", rejected);
            }
        }

        if !self.bindings.is_empty() {
            let _ = writeln!(out, "\nActive sensor bindings:");
            for (id, channel) in &self.bindings {
                let _ = writeln!(out, "  0x{:03X} -> {}", id, channel);
            }
        }

        if !self.nodes.is_empty() {
            let _ = writeln!(out, "\nNodes:");
            for node in &self.nodes {
                let identity = node.identity_name.as_deref().unwrap_or("-");
                let crc = match (node.expected_crc(), node.stored_crc) {
                    _ if node.crc_mismatch() => format!(
                        "CRC MISMATCH 0x{:04X} (stored 0x{:04X})",
                        node.expected_crc().unwrap_or_default(),
                        node.stored_crc.unwrap_or_default()
                    ),
                    _ if node.is_unconfigured() => "unconfigured".to_string(),
                    (Some(expected), _) => format!("CRC 0x{:04X}", expected),
                    (None, Some(stored)) => format!("stored CRC 0x{:04X}", stored),
                    (None, None) => "CRC -".to_string(),
                };
                let mut telemetry = String::new();
                if let Some(knob) = node.knob {
                    let _ = write!(telemetry, "  knob {} mV", knob);
                }
                if let Some(celsius) = node.temperature {
                    let _ = write!(telemetry, "  {:.1} °C", celsius);
                }
                let heartbeat = node
                    .epoch
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "no heartbeat".to_string());
                let _ = writeln!(
                    out,
                    "  0x{:08X}  {:<18} {}  {}  {} frames{}{}",
                    node.node_id,
                    identity,
                    crc,
                    heartbeat,
                    node.frames,
                    telemetry,
                    if node.submodule_count.is_some() && !node.interview_complete() {
                        "  (interview incomplete)"
                    } else {
                        ""
                    }
                );
            }
        }

        out
    }
}
