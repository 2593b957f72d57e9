//! candump log format
//!
//! Reads and writes the can-utils log format:
//!
//! ```text
//! (1661789611.150752) can0 40C#25A56D8465F1A2B0
//! (1661789611.153173) can0 402#
//! (1661789611.154815) can1 18EC1C2A#10900015FF00EF01 T
//! (1661789611.154900) can0 40C#R
//! ```
//!
//! Three hex digits denote a standard identifier, eight an extended one. A
//! trailing direction flag (`T`/`R`) is accepted and ignored.

use super::LogFileParser;
use crate::transport::FrameSink;
use crate::types::{CanFrame, Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::Path;

/// candump log parser
pub struct CandumpParser;

impl CandumpParser {
    /// Open a candump log file and return an iterator over its frames
    pub fn parse(path: &Path) -> Result<CandumpFrameIterator<BufReader<File>>> {
        log::info!("Parsing candump log: {:?}", path);

        let file = File::open(path).map_err(|e| {
            Error::LogParseError(format!("Failed to open candump log {:?}: {}", path, e))
        })?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Parse frames from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> CandumpFrameIterator<R> {
        CandumpFrameIterator {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

/// Iterator over CAN frames of a candump log
pub struct CandumpFrameIterator<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> Iterator for CandumpFrameIterator<R> {
    type Item = Result<CanFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return Some(parse_line(line).map_err(|reason| {
                Error::LogParseError(format!("line {}: {}", self.line_number, reason))
            }));
        }
    }
}

impl LogFileParser for CandumpFrameIterator<BufReader<File>> {
    fn parse(path: &Path) -> Result<Self> {
        CandumpParser::parse(path)
    }
}

/// Parse one candump log line
pub fn parse_line(line: &str) -> std::result::Result<CanFrame, String> {
    let mut fields = line.split_whitespace();

    let stamp = fields.next().ok_or("missing timestamp")?;
    let timestamp_ns = parse_timestamp(stamp)?;

    let interface = fields.next().ok_or("missing interface")?;
    let (_, channel) = parse_interface(interface)?;

    let body = fields.next().ok_or("missing frame")?;
    let (id_text, data_text) = body
        .split_once('#')
        .ok_or_else(|| format!("missing '#' in {:?}", body))?;

    let can_id = u32::from_str_radix(id_text, 16)
        .map_err(|_| format!("invalid identifier {:?}", id_text))?;
    let is_extended = match id_text.len() {
        3 if can_id <= 0x7FF => false,
        8 if can_id <= 0x1FFF_FFFF => true,
        _ => return Err(format!("invalid identifier {:?}", id_text)),
    };

    if data_text.starts_with('#') {
        return Err("CAN FD frames are not supported".to_string());
    }

    let (data, is_remote) = if data_text.starts_with('R') || data_text.starts_with('r') {
        (Vec::new(), true)
    } else {
        (parse_hex(data_text)?, false)
    };

    Ok(CanFrame {
        timestamp_ns,
        channel,
        can_id,
        data,
        is_extended,
        is_remote,
    })
}

/// Render one frame as a candump log line (without newline)
pub fn format_frame(frame: &CanFrame, interface_prefix: &str) -> String {
    let secs = frame.timestamp_ns / 1_000_000_000;
    let micros = (frame.timestamp_ns % 1_000_000_000) / 1_000;
    let id = if frame.is_extended {
        format!("{:08X}", frame.can_id)
    } else {
        format!("{:03X}", frame.can_id)
    };
    let payload = if frame.is_remote {
        "R".to_string()
    } else {
        frame.data.iter().map(|b| format!("{:02X}", b)).collect()
    };
    format!(
        "({}.{:06}) {}{} {}#{}",
        secs, micros, interface_prefix, frame.channel, id, payload
    )
}

/// Writes frames in candump log format
pub struct CandumpWriter<W: Write> {
    writer: W,
    interface_prefix: String,
}

impl<W: Write> CandumpWriter<W> {
    /// Frames on channel N are written as `canN`
    pub fn new(writer: W) -> Self {
        Self::with_interface_prefix(writer, "can")
    }

    pub fn with_interface_prefix(writer: W, prefix: impl Into<String>) -> Self {
        Self {
            writer,
            interface_prefix: prefix.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for CandumpWriter<W> {
    fn send(&mut self, frame: &CanFrame) -> Result<()> {
        writeln!(self.writer, "{}", format_frame(frame, &self.interface_prefix))?;
        Ok(())
    }
}

fn parse_timestamp(stamp: &str) -> std::result::Result<u64, String> {
    let inner = stamp
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("invalid timestamp {:?}", stamp))?;
    let (secs, frac) = inner.split_once('.').unwrap_or((inner, ""));

    let secs: u64 = secs
        .parse()
        .map_err(|_| format!("invalid timestamp {:?}", stamp))?;
    if frac.len() > 9 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid timestamp {:?}", stamp));
    }
    // Right-pad the fraction to nanoseconds
    let nanos: u64 = format!("{:0<9}", frac)
        .parse()
        .map_err(|_| format!("invalid timestamp {:?}", stamp))?;

    secs.checked_mul(1_000_000_000)
        .and_then(|ns| ns.checked_add(nanos))
        .ok_or_else(|| format!("timestamp out of range {:?}", stamp))
}

/// Split an interface name into its prefix and channel number (`vcan1` -> `("vcan", 1)`)
///
/// A name without trailing digits is channel 0.
pub fn parse_interface(interface: &str) -> std::result::Result<(&str, u8), String> {
    let digits_start = interface
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let (prefix, digits) = interface.split_at(digits_start);
    if digits.is_empty() {
        return Ok((prefix, 0));
    }
    let channel = digits
        .parse()
        .map_err(|_| format!("channel number out of range in {:?}", interface))?;
    Ok((prefix, channel))
}

/// Decode an even-length hex payload of at most 8 bytes
pub fn parse_hex(text: &str) -> std::result::Result<Vec<u8>, String> {
    if text.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {:?}", text));
    }
    if text.len() > 16 {
        return Err(format!("payload longer than 8 bytes: {:?}", text));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            text.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex payload {:?}", text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_standard_frame() {
        let frame = parse_line("(1661789611.150752) can0 40C#25A56D8465F1A2B0").unwrap();
        assert_eq!(frame.can_id, 0x40C);
        assert_eq!(frame.channel, 0);
        assert_eq!(frame.data, vec![0x25, 0xA5, 0x6D, 0x84, 0x65, 0xF1, 0xA2, 0xB0]);
        assert_eq!(frame.timestamp_ns, 1_661_789_611_150_752_000);
        assert!(!frame.is_extended);
        assert!(!frame.is_remote);
    }

    #[test]
    fn test_parse_extended_and_direction_flag() {
        let frame = parse_line("(1661789611.154815) can1 18EC1C2A#10900015FF00EF01 T").unwrap();
        assert_eq!(frame.can_id, 0x18EC1C2A);
        assert_eq!(frame.channel, 1);
        assert!(frame.is_extended);
        assert_eq!(frame.standard_id(), None);
    }

    #[test]
    fn test_parse_empty_and_remote_frames() {
        let empty = parse_line("(0.000001) vcan2 402#").unwrap();
        assert!(empty.data.is_empty());
        assert_eq!(empty.channel, 2);
        assert_eq!(empty.timestamp_ns, 1_000);

        let remote = parse_line("(10.5) can0 40C#R").unwrap();
        assert!(remote.is_remote);
        assert_eq!(remote.timestamp_ns, 10_500_000_000);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("can0 40C#00").is_err());
        assert!(parse_line("(1.0) can0 40C00").is_err());
        assert!(parse_line("(1.0) can0 40C#0").is_err());
        assert!(parse_line("(1.0) can0 40C#ZZ").is_err());
        assert!(parse_line("(1.0) can0 80C#00").is_err());
        assert!(parse_line("(1.0) can0 40C#000102030405060708").is_err());
        assert!(parse_line("(1.0) can0 40C##100").is_err());
        assert!(parse_line("(20000000000.000000) can0 112#010203040506").is_err());
        assert!(parse_line("(18446744073.709551616) can0 112#010203040506").is_err());
        assert!(parse_line("(1.0) can300 112#010203040506").is_err());
    }

    #[test]
    fn test_parse_interface() {
        assert_eq!(parse_interface("can1"), Ok(("can", 1)));
        assert_eq!(parse_interface("vcan255"), Ok(("vcan", 255)));
        assert_eq!(parse_interface("slcan"), Ok(("slcan", 0)));
        assert!(parse_interface("can256").is_err());
    }

    #[test]
    fn test_iterator_skips_blank_lines_and_reports_line_numbers() {
        let log = "(1.0) can0 112#010203040501\n\n   \n(2.0) can0 112#XX\n";
        let results: Vec<_> = CandumpParser::from_reader(Cursor::new(log)).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(Error::LogParseError(msg)) => assert!(msg.starts_with("line 4:")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_writer_output() {
        let mut writer = CandumpWriter::new(Vec::new());
        let frame = CanFrame::new(1, 0x112, &[0xDE, 0xAD]).at(1_661_789_611_150_752_000);
        writer.send(&frame).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "(1661789611.150752) can1 112#DEAD\n");
        assert_eq!(parse_line(text.trim()).unwrap(), frame);
    }
}
