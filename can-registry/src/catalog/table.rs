//! Static descriptor table
//!
//! Expands the embedded catalog rows into one descriptor per identifier,
//! indexed directly by identifier. Construction rejects any inconsistency
//! between the rows and the band table.

use super::entries::{EntryKind, RawEntry, CATALOG};
use crate::classifier;
use crate::types::{Category, CatalogError, MessageDescriptor, Mutability};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Size of the 11-bit identifier space
const ID_SPACE: usize = 0x800;

static BUILTIN: OnceLock<Result<Arc<DescriptorTable>, CatalogError>> = OnceLock::new();

/// Immutable identifier → descriptor mapping
#[derive(Debug)]
pub struct DescriptorTable {
    /// Slot per identifier; `None` outside the protocol space
    slots: Vec<Option<MessageDescriptor>>,
    /// Name lookup for named (non-reserved) descriptors
    by_name: HashMap<String, u16>,
    len: usize,
}

impl DescriptorTable {
    /// The table compiled into this crate, built once per process
    ///
    /// A construction failure is cached too, so every caller sees the same
    /// error instead of a partially built table.
    pub fn builtin() -> Result<Arc<DescriptorTable>, CatalogError> {
        BUILTIN
            .get_or_init(|| {
                let table = DescriptorTable::from_entries(CATALOG)?;
                log::info!(
                    "Built message catalog: {} identifiers ({} named)",
                    table.len(),
                    table.by_name.len()
                );
                Ok(Arc::new(table))
            })
            .clone()
    }

    /// Build a table from catalog rows
    pub fn from_entries(entries: &[RawEntry]) -> Result<Self, CatalogError> {
        let mut slots: Vec<Option<MessageDescriptor>> = vec![None; ID_SPACE];
        let mut by_name = HashMap::new();
        let mut len = 0;

        for entry in entries {
            for id in entry.first..=entry.last {
                let derived =
                    classifier::classify(id).ok_or(CatalogError::OutsideProtocolSpace(id))?;
                if derived != entry.category {
                    return Err(CatalogError::CategoryMismatch {
                        id,
                        declared: entry.category,
                        derived,
                    });
                }
                if entry.length > 8 {
                    return Err(CatalogError::InvalidLength {
                        id,
                        length: entry.length,
                    });
                }
                let private = matches!(entry.kind, EntryKind::PrivateSensor);
                if private != classifier::is_dynamic(id) {
                    return Err(CatalogError::DynamicBandMismatch(id));
                }

                let slot = &mut slots[id as usize];
                if slot.is_some() {
                    return Err(CatalogError::DuplicateIdentifier(id));
                }

                let descriptor = expand(entry, id);
                if !descriptor.reserved {
                    by_name.insert(descriptor.name.to_string(), id);
                }
                *slot = Some(descriptor);
                len += 1;
            }
        }

        // Every identifier of every band must resolve
        if let Some(hole) = classifier::protocol_ids().find(|&id| slots[id as usize].is_none()) {
            return Err(CatalogError::MissingIdentifier(hole));
        }

        Ok(Self { slots, by_name, len })
    }

    /// Static descriptor for `id`, or `None` outside the protocol space
    pub fn get_static(&self, id: u16) -> Option<&MessageDescriptor> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    /// Find a named descriptor by its symbolic label
    pub fn find_by_name(&self, name: &str) -> Option<&MessageDescriptor> {
        self.by_name.get(name).and_then(|&id| self.get_static(id))
    }

    /// Number of identifiers in the table
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All descriptors in ascending identifier order
    pub fn iter(&self) -> impl Iterator<Item = &MessageDescriptor> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Descriptors of one category in ascending identifier order
    pub fn iter_category(
        &self,
        category: Category,
    ) -> impl Iterator<Item = &MessageDescriptor> + '_ {
        classifier::bands_for(category)
            .flat_map(|band| band.range())
            .filter_map(move |id| self.get_static(id))
    }

    /// Get catalog statistics
    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats::default();
        for descriptor in self.iter() {
            stats.total += 1;
            if descriptor.mutability == Mutability::Dynamic {
                stats.dynamic += 1;
            } else if descriptor.reserved {
                stats.reserved += 1;
            } else {
                stats.named += 1;
            }
        }
        stats
    }
}

/// Catalog statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Identifiers with a descriptor
    pub total: usize,
    /// Named, fixed messages
    pub named: usize,
    /// Static reserved placeholders
    pub reserved: usize,
    /// Dynamically assignable identifiers
    pub dynamic: usize,
}

fn expand(entry: &RawEntry, id: u16) -> MessageDescriptor {
    let (name, comment, reserved, mutability) = match entry.kind {
        EntryKind::Named { name, comment } => (
            Cow::Borrowed(name),
            (!comment.is_empty()).then_some(comment),
            false,
            Mutability::Static,
        ),
        EntryKind::Reserved => (
            Cow::Owned(format!("RESERVED_{:03X}", id)),
            None,
            true,
            Mutability::Static,
        ),
        EntryKind::PrivateSensor => (
            Cow::Owned(format!("DATA_PRIVATE_SENSOR_{:03X}", id)),
            Some("Private 64-bit sensor payload"),
            true,
            Mutability::Dynamic,
        ),
    };

    MessageDescriptor {
        id,
        expected_length: entry.length,
        name,
        category: entry.category,
        mutability,
        reserved,
        binding: None,
        comment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_covers_protocol_space() {
        let table = DescriptorTable::builtin().unwrap();
        assert_eq!(table.len(), 416);
        for id in classifier::protocol_ids() {
            let descriptor = table.get_static(id).unwrap();
            assert_eq!(descriptor.id, id);
            assert!(descriptor.expected_length <= 8);
            assert_eq!(Some(descriptor.category), classifier::classify(id));
        }
    }

    #[test]
    fn test_outside_space_is_none() {
        let table = DescriptorTable::builtin().unwrap();
        assert!(table.get_static(0x7A0).is_none());
        assert!(table.get_static(0x000).is_none());
        assert!(table.get_static(0x7FF).is_none());
        assert!(table.get_static(0xFFFF).is_none());
    }

    #[test]
    fn test_reserved_and_named_entries() {
        let table = DescriptorTable::builtin().unwrap();

        let mode = table.get_static(0x112).unwrap();
        assert_eq!(mode.name, "SW_SET_MODE");
        assert_eq!(mode.expected_length, 6);
        assert!(!mode.reserved);

        let reserved = table.get_static(0x106).unwrap();
        assert!(reserved.reserved);
        assert_eq!(reserved.name, "RESERVED_106");
        assert_eq!(reserved.category, Category::ErrorAlarm);

        let private = table.get_static(0x52A).unwrap();
        assert_eq!(private.mutability, Mutability::Dynamic);
        assert_eq!(private.expected_length, 8);
        assert!(private.reserved);
    }

    #[test]
    fn test_find_by_name() {
        let table = DescriptorTable::builtin().unwrap();
        assert_eq!(table.find_by_name("EPOCH").map(|d| d.id), Some(0x40C));
        assert!(table.find_by_name("RESERVED_106").is_none());
    }

    #[test]
    fn test_iter_category_is_ascending() {
        let table = DescriptorTable::builtin().unwrap();
        let ids: Vec<u16> = table
            .iter_category(Category::OutputDescriptor)
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, (0x740..=0x74F).collect::<Vec<u16>>());
    }

    #[test]
    fn test_stats() {
        let stats = DescriptorTable::builtin().unwrap().stats();
        assert_eq!(stats.total, 416);
        assert_eq!(stats.dynamic, 22);
        assert_eq!(stats.named + stats.reserved + stats.dynamic, stats.total);
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let entries = [
            RawEntry::named(0x100, 8, "A", "", Category::ErrorAlarm),
            RawEntry::named(0x100, 8, "B", "", Category::ErrorAlarm),
        ];
        let err = DescriptorTable::from_entries(&entries).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateIdentifier(0x100));
    }

    #[test]
    fn test_category_mismatch_rejected() {
        let entries = [RawEntry::named(0x112, 6, "SW", "", Category::DisplayConfig)];
        let err = DescriptorTable::from_entries(&entries).unwrap_err();
        assert_eq!(
            err,
            CatalogError::CategoryMismatch {
                id: 0x112,
                declared: Category::DisplayConfig,
                derived: Category::SwitchControl,
            }
        );
    }

    #[test]
    fn test_outside_space_rejected() {
        let entries = [RawEntry::named(0x7A0, 8, "X", "", Category::InterfaceDescriptor)];
        let err = DescriptorTable::from_entries(&entries).unwrap_err();
        assert_eq!(err, CatalogError::OutsideProtocolSpace(0x7A0));
    }

    #[test]
    fn test_invalid_length_rejected() {
        let entries = [RawEntry::named(0x100, 9, "X", "", Category::ErrorAlarm)];
        let err = DescriptorTable::from_entries(&entries).unwrap_err();
        assert_eq!(err, CatalogError::InvalidLength { id: 0x100, length: 9 });
    }

    #[test]
    fn test_static_entry_in_dynamic_band_rejected() {
        let entries = [RawEntry::named(0x52A, 8, "X", "", Category::SensorData)];
        let err = DescriptorTable::from_entries(&entries).unwrap_err();
        assert_eq!(err, CatalogError::DynamicBandMismatch(0x52A));
    }

    #[test]
    fn test_incomplete_table_rejected() {
        let entries = [RawEntry::named(0x100, 8, "X", "", Category::ErrorAlarm)];
        let err = DescriptorTable::from_entries(&entries).unwrap_err();
        assert_eq!(err, CatalogError::MissingIdentifier(0x101));
    }
}
