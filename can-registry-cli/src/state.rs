//! Node tracking
//!
//! Follows the nodes visible in a log: heartbeats (`EPOCH`), identity and
//! sub-module introduction frames, config CRCs and knob / temperature
//! telemetry. This is application state; the registry only tells us what
//! each frame means.

use byteorder::{BigEndian, ByteOrder};
use can_registry::catalog::ids;
use can_registry::crc::EMPTY_CONFIG_CRC;
use can_registry::{DispatchEvent, Timestamp};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Everything seen about one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeState {
    pub node_id: u32,
    /// Identity frame the node introduced itself with (0x780-0x79F)
    pub identity: Option<u16>,
    pub identity_name: Option<String>,
    pub submodule_count: Option<u8>,
    /// Sub-module indices seen in introduction frames
    pub submodules: BTreeSet<u8>,
    /// Config CRC announced in the identity frame
    pub reported_crc: Option<u16>,
    /// CRC the master sent with its last commit / NVS write request
    pub committed_crc: Option<u16>,
    /// CRC of the configuration the node last committed to storage
    pub stored_crc: Option<u16>,
    /// Last knob reading in ADC millivolts
    pub knob: Option<u16>,
    /// Last CPU temperature in celsius
    pub temperature: Option<f32>,
    pub last_heartbeat: Option<Timestamp>,
    /// Node clock carried by the last heartbeat
    pub epoch: Option<DateTime<Utc>>,
    pub frames: usize,
}

impl NodeState {
    fn new(node_id: u32) -> Self {
        Self {
            node_id,
            identity: None,
            identity_name: None,
            submodule_count: None,
            submodules: BTreeSet::new(),
            reported_crc: None,
            committed_crc: None,
            stored_crc: None,
            knob: None,
            temperature: None,
            last_heartbeat: None,
            epoch: None,
            frames: 0,
        }
    }

    /// True once every announced sub-module has introduced itself
    pub fn interview_complete(&self) -> bool {
        match self.submodule_count {
            Some(count) => (0..count).all(|i| self.submodules.contains(&i)),
            None => false,
        }
    }

    pub fn is_unconfigured(&self) -> bool {
        self.reported_crc == Some(EMPTY_CONFIG_CRC)
    }

    /// CRC the stored configuration should have: the last commit if the
    /// master sent one, else what the node announced
    pub fn expected_crc(&self) -> Option<u16> {
        self.committed_crc.or(self.reported_crc)
    }

    /// True when the node stored a configuration other than the expected one
    pub fn crc_mismatch(&self) -> bool {
        match (self.expected_crc(), self.stored_crc) {
            (Some(expected), Some(stored)) => expected != stored,
            _ => false,
        }
    }
}

/// Tracks node state across the valid frames of one log
#[derive(Debug, Default)]
pub struct NodeTracker {
    nodes: BTreeMap<u32, NodeState>,
}

impl NodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update node state from one dispatched frame
    ///
    /// Only valid data frames count; control frames carry no node state and
    /// the payload of an invalid frame cannot be trusted.
    pub fn observe(&mut self, event: &DispatchEvent) {
        let (descriptor, data) = match event {
            DispatchEvent::Frame {
                descriptor, data, ..
            } => (descriptor, data.as_slice()),
            _ => return,
        };
        let timestamp = event.timestamp();

        match descriptor.id {
            ids::EPOCH if data.len() >= 8 => {
                let node = self.touch(BigEndian::read_u32(&data[0..4]));
                node.last_heartbeat = Some(timestamp);
                node.epoch = Utc
                    .timestamp_opt(BigEndian::read_u32(&data[4..8]) as i64, 0)
                    .single();
            }
            ids::DATA_CONFIG_CRC if data.len() >= 6 => {
                let node = self.touch(BigEndian::read_u32(&data[0..4]));
                let stored = BigEndian::read_u16(&data[4..6]);
                node.stored_crc = Some(stored);
                if node.crc_mismatch() {
                    log::warn!(
                        "Node 0x{:08X} stored config CRC 0x{:04X}, expected 0x{:04X}",
                        node.node_id,
                        stored,
                        node.expected_crc().unwrap_or_default()
                    );
                }
            }
            ids::NODE_COMMIT_CFG | ids::CFG_WRITE_NVS if data.len() >= 6 => {
                let node = self.touch(BigEndian::read_u32(&data[0..4]));
                node.committed_crc = Some(BigEndian::read_u16(&data[4..6]));
            }
            ids::DATA_KNOB if data.len() >= 6 => {
                let node = self.touch(BigEndian::read_u32(&data[0..4]));
                node.knob = Some(BigEndian::read_u16(&data[4..6]));
            }
            ids::DATA_CPU_TEMP if data.len() >= 8 => {
                let node = self.touch(BigEndian::read_u32(&data[0..4]));
                node.temperature = Some(BigEndian::read_f32(&data[4..8]));
            }
            ids::NODE_INTRO_FIRST..=ids::NODE_INTRO_LAST if data.len() >= 7 => {
                let node = self.touch(BigEndian::read_u32(&data[0..4]));
                node.identity = Some(descriptor.id);
                node.identity_name = Some(descriptor.name.to_string());
                node.submodule_count = Some(data[4]);
                node.reported_crc = Some(BigEndian::read_u16(&data[5..7]));
                log::debug!(
                    "Node 0x{:08X} identity {}: {} sub-modules",
                    node.node_id,
                    descriptor.name,
                    data[4]
                );
            }
            ids::SUBMODULE_INTRO_FIRST..=ids::SUBMODULE_INTRO_LAST if data.len() >= 5 => {
                let node = self.touch(BigEndian::read_u32(&data[0..4]));
                // High bit selects the telemetry half of the introduction
                node.submodules.insert(data[4] & 0x7F);
            }
            _ => {}
        }
    }

    pub fn get(&self, node_id: u32) -> Option<&NodeState> {
        self.nodes.get(&node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes ordered by node id
    pub fn into_nodes(self) -> Vec<NodeState> {
        self.nodes.into_values().collect()
    }

    fn touch(&mut self, node_id: u32) -> &mut NodeState {
        let node = self
            .nodes
            .entry(node_id)
            .or_insert_with(|| NodeState::new(node_id));
        node.frames += 1;
        node
    }
}
