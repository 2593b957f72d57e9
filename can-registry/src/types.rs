//! Core types for the CAN message registry
//!
//! This module defines the descriptor record every consumer works with, the
//! closed set of functional categories, the raw frame shape exchanged with the
//! transport layer, and the error taxonomy of the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Timestamp type used throughout the registry
pub type Timestamp = DateTime<Utc>;

/// Result type for registry operations that touch files or transports
pub type Result<T> = std::result::Result<T, Error>;

/// Functional band of an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// 0x100-0x10F
    ErrorAlarm,
    /// 0x110-0x13F
    SwitchControl,
    /// 0x200-0x23F: display, LED/ARGB and button configuration
    DisplayConfig,
    /// 0x400-0x41F: introduction handshake and system requests
    Introduction,
    /// 0x420-0x43F
    Configuration,
    /// 0x500-0x53F
    SensorData,
    /// 0x700-0x73F: display/input/sensor capability descriptors
    DeviceDescriptor,
    /// 0x740-0x74F
    OutputDescriptor,
    /// 0x750-0x77F: introduction/system space held back for future use
    Reserved,
    /// 0x780-0x79F: interface/enclosure descriptors
    InterfaceDescriptor,
}

impl Category {
    /// Every category, in band order
    pub const ALL: [Category; 10] = [
        Category::ErrorAlarm,
        Category::SwitchControl,
        Category::DisplayConfig,
        Category::Introduction,
        Category::Configuration,
        Category::SensorData,
        Category::DeviceDescriptor,
        Category::OutputDescriptor,
        Category::Reserved,
        Category::InterfaceDescriptor,
    ];

    /// Stable kebab-case label (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ErrorAlarm => "error-alarm",
            Category::SwitchControl => "switch-control",
            Category::DisplayConfig => "display-config",
            Category::Introduction => "introduction",
            Category::Configuration => "configuration",
            Category::SensorData => "sensor-data",
            Category::DeviceDescriptor => "device-descriptor",
            Category::OutputDescriptor => "output-descriptor",
            Category::Reserved => "reserved",
            Category::InterfaceDescriptor => "interface-descriptor",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a category name cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let category = match normalized.as_str() {
            "error-alarm" | "error" | "alarm" => Category::ErrorAlarm,
            "switch-control" | "switch" => Category::SwitchControl,
            "display-config" | "display" | "led" | "button" => Category::DisplayConfig,
            "introduction" | "intro" | "system" => Category::Introduction,
            "configuration" | "config" => Category::Configuration,
            "sensor-data" | "sensor" | "data" => Category::SensorData,
            "device-descriptor" | "device" => Category::DeviceDescriptor,
            "output-descriptor" | "output" => Category::OutputDescriptor,
            "reserved" => Category::Reserved,
            "interface-descriptor" | "interface" | "box" => Category::InterfaceDescriptor,
            _ => return Err(ParseCategoryError(s.to_string())),
        };
        Ok(category)
    }
}

/// Whether a descriptor is fixed forever or subject to runtime remapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Static,
    Dynamic,
}

/// Logical sensor channel bound to a dynamic identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl From<String> for ChannelId {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// The unit of protocol knowledge: what a given identifier means on the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDescriptor {
    /// 11-bit CAN identifier
    pub id: u16,
    /// Number of payload bytes a conforming frame carries (0-8)
    pub expected_length: u8,
    /// Symbolic label
    pub name: Cow<'static, str>,
    /// Functional band
    pub category: Category,
    /// Static or dynamically assignable
    pub mutability: Mutability,
    /// Allocated for future use; still has a known frame shape
    pub reserved: bool,
    /// Channel bound by an active dynamic assignment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<ChannelId>,
    /// Free-text description from the protocol sheet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<&'static str>,
}

impl MessageDescriptor {
    pub fn is_dynamic(&self) -> bool {
        self.mutability == Mutability::Dynamic
    }

    /// True if this descriptor is an active dynamic override
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }
}

impl fmt::Display for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:03X} {} ({}, dlc {}",
            self.id, self.name, self.category, self.expected_length
        )?;
        if self.reserved {
            write!(f, ", reserved")?;
        }
        if self.is_dynamic() {
            write!(f, ", dynamic")?;
        }
        write!(f, ")")
    }
}

/// Raw CAN frame exchanged with the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    /// Timestamp in nanoseconds since epoch
    pub timestamp_ns: u64,
    /// CAN channel number (e.g. 0 for can0)
    pub channel: u8,
    /// CAN identifier (11-bit or 29-bit)
    pub can_id: u32,
    /// Payload bytes (0-8)
    pub data: Vec<u8>,
    /// True if this is an extended (29-bit) CAN ID
    pub is_extended: bool,
    /// True if this is a remote frame
    pub is_remote: bool,
}

impl CanFrame {
    /// Create a standard data frame with a zero timestamp
    pub fn new(channel: u8, can_id: u16, data: &[u8]) -> Self {
        Self {
            timestamp_ns: 0,
            channel,
            can_id: can_id as u32,
            data: data.to_vec(),
            is_extended: false,
            is_remote: false,
        }
    }

    /// Builder method: set the timestamp
    pub fn at(mut self, timestamp_ns: u64) -> Self {
        self.timestamp_ns = timestamp_ns;
        self
    }

    /// Convert timestamp from nanoseconds to DateTime<Utc>
    pub fn timestamp(&self) -> Timestamp {
        let secs = (self.timestamp_ns / 1_000_000_000) as i64;
        let nsecs = (self.timestamp_ns % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nsecs).unwrap_or_default()
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }

    /// The identifier as an 11-bit protocol id, if it is one
    pub fn standard_id(&self) -> Option<u16> {
        if self.is_extended || self.can_id > 0x7FF {
            None
        } else {
            Some(self.can_id as u16)
        }
    }
}

/// Lookup failure: the identifier is not part of this protocol at all
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown identifier: 0x{0:03X}")]
    UnknownIdentifier(u32),
}

/// Frame validation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Unknown(#[from] RegistryError),

    #[error("Length mismatch: expected {expected} bytes, observed {observed}")]
    LengthMismatch { expected: u8, observed: usize },
}

/// Misuse of the dynamic sensor band
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("Identifier 0x{0:03X} is outside the dynamic sensor band")]
    OutOfRangeId(u16),

    #[error("Identifier 0x{id:03X} is already bound to {bound} (requested {requested})")]
    AlreadyAssigned {
        id: u16,
        bound: ChannelId,
        requested: ChannelId,
    },
}

/// Defect in the embedded protocol table, detected while building it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate identifier in catalog: 0x{0:03X}")]
    DuplicateIdentifier(u16),

    #[error("Identifier 0x{0:03X} lies outside every protocol band")]
    OutsideProtocolSpace(u16),

    #[error("Identifier 0x{id:03X} declared as {declared} but its band is {derived}")]
    CategoryMismatch {
        id: u16,
        declared: Category,
        derived: Category,
    },

    #[error("Identifier 0x{id:03X} declares length {length} (max 8)")]
    InvalidLength { id: u16, length: u8 },

    #[error("Identifier 0x{0:03X} has no catalog entry")]
    MissingIdentifier(u16),

    #[error("Identifier 0x{0:03X} has the wrong mutability for its band")]
    DynamicBandMismatch(u16),
}

/// Errors surfaced by file- and transport-facing operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to parse log file: {0}")]
    LogParseError(String),

    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_aliases() {
        assert_eq!("sensor".parse::<Category>(), Ok(Category::SensorData));
        assert_eq!("SYSTEM".parse::<Category>(), Ok(Category::Introduction));
        assert_eq!("switch_control".parse::<Category>(), Ok(Category::SwitchControl));
        assert!("bogus".parse::<Category>().is_err());

        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn test_descriptor_display() {
        let descriptor = MessageDescriptor {
            id: 0x112,
            expected_length: 6,
            name: Cow::Borrowed("SW_SET_MODE"),
            category: Category::SwitchControl,
            mutability: Mutability::Static,
            reserved: false,
            binding: None,
            comment: None,
        };
        assert_eq!(descriptor.to_string(), "0x112 SW_SET_MODE (switch-control, dlc 6)");
    }

    #[test]
    fn test_frame_standard_id() {
        let frame = CanFrame::new(0, 0x112, &[0; 6]);
        assert_eq!(frame.standard_id(), Some(0x112));
        assert_eq!(frame.dlc(), 6);

        let extended = CanFrame {
            is_extended: true,
            can_id: 0x18EC1C2A,
            ..frame
        };
        assert_eq!(extended.standard_id(), None);
    }

    #[test]
    fn test_frame_timestamp() {
        let frame = CanFrame::new(0, 0x40C, &[]).at(1_661_789_611_150_752_000);
        assert_eq!(frame.timestamp().timestamp(), 1_661_789_611);
        assert_eq!(frame.timestamp().timestamp_subsec_micros(), 150_752);
    }
}
