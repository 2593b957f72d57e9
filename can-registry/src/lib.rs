//! CAN Message Registry Library
//!
//! The authoritative catalog of the controller's 11-bit CAN protocol, plus
//! the validation and dispatch layer every subsystem uses to interpret frames.
//!
//! # Architecture
//!
//! - A fixed descriptor table covers the whole protocol space (0x100-0x79F)
//! - Identifiers are classified into categories purely by numeric range
//! - The sensor band 0x52A-0x53F is assigned to sensor channels at runtime
//! - Incoming frames are validated against their descriptor and dispatched
//!
//! The library does NOT:
//! - Drive a CAN controller (frames arrive as an iterator, leave via [`FrameSink`])
//! - Decode signal values inside payloads
//! - Persist dynamic bindings across restarts
//!
//! Node bookkeeping and reporting live in the application layer
//! (can-registry-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use can_registry::formats::CandumpParser;
//! use can_registry::{DispatchConfig, DispatchEvent, Dispatcher, Registry};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(Registry::new()?);
//! println!("{}", registry.describe(0x112));
//!
//! // Pre-wire one sensor channel and keep only sensor traffic
//! let config = DispatchConfig::new()
//!     .add_sensor_binding(0x52A, "imu-x")
//!     .with_category_filter(vec![can_registry::Category::SensorData]);
//! let dispatcher = Dispatcher::new(registry, config)?;
//!
//! let frames = CandumpParser::parse(Path::new("candump.log"))?;
//! for event in dispatcher.dispatch_all(frames) {
//!     match event? {
//!         DispatchEvent::Invalid { can_id, error, .. } => {
//!             eprintln!("0x{:03X}: {}", can_id, error)
//!         }
//!         event => println!("{:?}", event.descriptor().map(|d| d.name.clone())),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod control;
pub mod crc;
pub mod dispatch;
pub mod dynamic;
pub mod formats;
pub mod registry;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use catalog::dbc::{audit_dbc, export_dbc, DbcAudit, DbcFinding};
pub use catalog::{CatalogStats, DescriptorTable};
pub use config::{DispatchConfig, SensorBinding};
pub use control::ControlEvent;
pub use crc::crc16_ccitt;
pub use dispatch::{DispatchEvent, Dispatcher};
pub use dynamic::DynamicRangeResolver;
pub use registry::Registry;
pub use transport::FrameSink;
pub use types::{
    AssignmentError, CanFrame, CatalogError, Category, ChannelId, Error, MessageDescriptor,
    Mutability, RegistryError, Result, Timestamp, ValidationError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
