//! Log file formats
//!
//! Each parser implements an iterator pattern over CanFrame objects, which is
//! the frame-source shape the dispatcher consumes.

use crate::types::{CanFrame, Error, Result};
use std::path::Path;

pub mod candump;

// Re-export parser types
pub use candump::{CandumpFrameIterator, CandumpParser, CandumpWriter};

/// Common trait for all log file parsers
pub trait LogFileParser: Iterator<Item = Result<CanFrame>> + Sized {
    /// Parse a log file and return an iterator over CAN frames
    fn parse(path: &Path) -> Result<Self>;
}

/// Open a recorded log, choosing the parser from the file extension
pub fn open_log(path: &Path) -> Result<Box<dyn Iterator<Item = Result<CanFrame>>>> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());

    match extension.as_deref() {
        None | Some("log") | Some("candump") | Some("txt") => {
            log::debug!("Detected candump log format");
            Ok(Box::new(CandumpParser::parse(path)?))
        }
        _ => Err(Error::LogParseError(format!(
            "Unsupported file format: {:?}",
            extension
        ))),
    }
}
