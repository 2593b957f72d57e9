//! DBC interchange
//!
//! Audits a Vector DBC file against the descriptor table and exports the
//! table as a signal-less DBC skeleton for bus analysis tools.

use super::DescriptorTable;
use crate::types::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;
use std::path::Path;

/// Transmitter node written into exported DBC files
pub const EXPORT_NODE: &str = "CAN_MASTER";

/// Bit 31 of a DBC message id marks an extended frame
const DBC_EXTENDED_FLAG: u32 = 0x8000_0000;

/// One disagreement between a DBC file and the descriptor table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DbcFinding {
    /// The DBC defines a message the protocol does not allocate
    UnknownIdentifier { id: u32, name: String },
    /// Payload length differs from the expected length
    LengthMismatch {
        id: u16,
        name: String,
        expected: u8,
        declared: u8,
    },
    /// Same identifier, different message name
    NameMismatch {
        id: u16,
        expected: String,
        declared: String,
    },
    /// A named protocol message has no DBC definition
    MissingMessage { id: u16, name: String },
}

impl fmt::Display for DbcFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbcFinding::UnknownIdentifier { id, name } => {
                write!(f, "0x{:03X} {}: identifier not allocated by the protocol", id, name)
            }
            DbcFinding::LengthMismatch {
                id,
                name,
                expected,
                declared,
            } => write!(
                f,
                "0x{:03X} {}: DBC declares {} bytes, protocol expects {}",
                id, name, declared, expected
            ),
            DbcFinding::NameMismatch {
                id,
                expected,
                declared,
            } => write!(f, "0x{:03X}: DBC names it {}, protocol names it {}", id, declared, expected),
            DbcFinding::MissingMessage { id, name } => {
                write!(f, "0x{:03X} {}: missing from DBC", id, name)
            }
        }
    }
}

/// Result of auditing one DBC file
#[derive(Debug, Clone, Serialize)]
pub struct DbcAudit {
    pub source: String,
    /// Messages defined in the DBC file
    pub messages: usize,
    pub findings: Vec<DbcFinding>,
}

impl DbcAudit {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Audit a DBC file against the descriptor table
pub fn audit_dbc(path: &Path, table: &DescriptorTable) -> Result<DbcAudit> {
    log::info!("Auditing DBC file: {:?}", path);

    let bytes = std::fs::read(path)
        .map_err(|e| Error::DbcParseError(format!("Failed to read file {:?}: {}", path, e)))?;

    // Try UTF-8 first, then fallback to Latin-1 (Windows tools emit it)
    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("DBC file is not UTF-8, trying Latin-1 encoding");
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    let dbc = can_dbc::DBC::from_slice(content.as_bytes()).map_err(|e| {
        Error::DbcParseError(format!("Failed to parse DBC file {:?}: {:?}", path, e))
    })?;

    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.dbc")
        .to_string();

    let definitions: Vec<(u32, String, u8)> = dbc
        .messages()
        .iter()
        .map(|m| {
            (
                m.message_id().0,
                m.message_name().to_string(),
                // DLC above 8 cannot match any classic CAN descriptor
                u8::try_from(*m.message_size()).unwrap_or(u8::MAX),
            )
        })
        .collect();

    let audit = audit_definitions(source, &definitions, table);
    log::info!(
        "Audited {} messages from {:?}: {} findings",
        audit.messages,
        path,
        audit.findings.len()
    );
    Ok(audit)
}

/// Compare `(raw id, name, dlc)` definitions with the table
fn audit_definitions(
    source: String,
    definitions: &[(u32, String, u8)],
    table: &DescriptorTable,
) -> DbcAudit {
    let mut findings = Vec::new();
    let mut seen = HashSet::new();

    for (raw_id, name, dlc) in definitions {
        let descriptor = if raw_id & DBC_EXTENDED_FLAG == 0 {
            u16::try_from(*raw_id)
                .ok()
                .and_then(|id| table.get_static(id))
        } else {
            None
        };

        let descriptor = match descriptor {
            Some(d) => d,
            None => {
                findings.push(DbcFinding::UnknownIdentifier {
                    id: raw_id & !DBC_EXTENDED_FLAG,
                    name: name.clone(),
                });
                continue;
            }
        };
        seen.insert(descriptor.id);

        if *dlc != descriptor.expected_length {
            findings.push(DbcFinding::LengthMismatch {
                id: descriptor.id,
                name: name.clone(),
                expected: descriptor.expected_length,
                declared: *dlc,
            });
        }

        // Placeholders and dynamic slots carry no authoritative name
        if !descriptor.reserved && descriptor.name != name.as_str() {
            findings.push(DbcFinding::NameMismatch {
                id: descriptor.id,
                expected: descriptor.name.to_string(),
                declared: name.clone(),
            });
        }
    }

    for descriptor in table.iter().filter(|d| !d.reserved) {
        if !seen.contains(&descriptor.id) {
            findings.push(DbcFinding::MissingMessage {
                id: descriptor.id,
                name: descriptor.name.to_string(),
            });
        }
    }

    DbcAudit {
        source,
        messages: definitions.len(),
        findings,
    }
}

/// Render the named descriptors as a DBC file without signals
pub fn export_dbc(table: &DescriptorTable) -> String {
    let mut out = String::new();
    out.push_str("VERSION \"\"\n\n");
    out.push_str("NS_ :\n\n");
    out.push_str("BS_:\n\n");
    let _ = writeln!(out, "BU_: {}\n", EXPORT_NODE);

    for descriptor in table.iter().filter(|d| !d.reserved) {
        let _ = writeln!(
            out,
            "BO_ {} {}: {} {}\n",
            descriptor.id, descriptor.name, descriptor.expected_length, EXPORT_NODE
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table() -> std::sync::Arc<DescriptorTable> {
        DescriptorTable::builtin().unwrap()
    }

    fn write_dbc(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_export_lists_named_messages_only() {
        let table = table();
        let dbc = export_dbc(&table);

        assert!(dbc.starts_with("VERSION \"\""));
        assert!(dbc.contains("BO_ 274 SW_SET_MODE: 6 CAN_MASTER"));
        assert!(dbc.contains("BO_ 1321 DATA_SENSOR_MSG: 8 CAN_MASTER"));
        assert!(!dbc.contains("RESERVED_"));
        assert!(!dbc.contains("DATA_PRIVATE_SENSOR_"));
        assert_eq!(dbc.matches("BO_ ").count(), table.stats().named);
    }

    #[test]
    fn test_exported_dbc_audits_clean() {
        let table = table();
        let file = write_dbc(&export_dbc(&table));

        let audit = audit_dbc(file.path(), &table).unwrap();
        assert_eq!(audit.messages, table.stats().named);
        assert!(audit.is_clean(), "unexpected findings: {:?}", audit.findings);
    }

    #[test]
    fn test_audit_reports_mismatches() {
        let content = r#"
VERSION ""

NS_ :

BS_:

BU_: ECU1

BO_ 274 SW_SET_MODE: 8 ECU1
 SG_ Mode : 0|8@1+ (1,0) [0|255] "" ECU1

BO_ 1036 HEARTBEAT: 8 ECU1

BO_ 768 NotOurs: 8 ECU1

BO_ 2147484416 ExtendedMsg: 8 ECU1
"#;
        let file = write_dbc(content);
        let audit = audit_dbc(file.path(), &table()).unwrap();

        assert_eq!(audit.messages, 4);
        assert!(!audit.is_clean());
        assert!(audit.findings.contains(&DbcFinding::LengthMismatch {
            id: 0x112,
            name: "SW_SET_MODE".to_string(),
            expected: 6,
            declared: 8,
        }));
        assert!(audit.findings.contains(&DbcFinding::NameMismatch {
            id: 0x40C,
            expected: "EPOCH".to_string(),
            declared: "HEARTBEAT".to_string(),
        }));
        assert!(audit.findings.contains(&DbcFinding::UnknownIdentifier {
            id: 0x300,
            name: "NotOurs".to_string(),
        }));
        assert!(audit.findings.contains(&DbcFinding::UnknownIdentifier {
            id: 0x300,
            name: "ExtendedMsg".to_string(),
        }));
        assert!(audit.findings.contains(&DbcFinding::MissingMessage {
            id: 0x402,
            name: "SYS_HALT_OPERATION".to_string(),
        }));
    }

    #[test]
    fn test_dynamic_slot_names_are_not_checked() {
        let definitions = vec![(0x52A, "IMU_X".to_string(), 8)];
        let audit = audit_definitions("inline".to_string(), &definitions, &table());
        assert!(!audit
            .findings
            .iter()
            .any(|f| matches!(f, DbcFinding::NameMismatch { .. } | DbcFinding::LengthMismatch { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = audit_dbc(Path::new("/nonexistent/file.dbc"), &table());
        assert!(matches!(result, Err(Error::DbcParseError(_))));
    }
}
