//! Message registry
//!
//! The single entry point consumers use to turn an identifier into meaning:
//! static lookup, the dynamic sensor override, frame length validation and
//! category enumeration.

use crate::catalog::DescriptorTable;
use crate::classifier;
use crate::dynamic::DynamicRangeResolver;
use crate::types::{
    AssignmentError, Category, CatalogError, ChannelId, MessageDescriptor, RegistryError,
    ValidationError,
};
use std::sync::Arc;

/// Lookup, validation and enumeration service over the message catalog
///
/// The registry is `Send + Sync`; share it behind an `Arc` between the
/// transport reader and any UI or state-tracking consumers.
#[derive(Debug)]
pub struct Registry {
    table: Arc<DescriptorTable>,
    resolver: DynamicRangeResolver,
}

impl Registry {
    /// Create a registry over the built-in catalog
    ///
    /// Fails only if the embedded table is inconsistent, which is a defect in
    /// the protocol data and must abort initialization.
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Self::with_table(DescriptorTable::builtin()?))
    }

    /// Create a registry over an already built table
    pub fn with_table(table: Arc<DescriptorTable>) -> Self {
        Self {
            table,
            resolver: DynamicRangeResolver::new(),
        }
    }

    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    pub fn resolver(&self) -> &DynamicRangeResolver {
        &self.resolver
    }

    /// Active descriptor for `id`
    ///
    /// In the dynamic band an active assignment wins over the static
    /// descriptor. `UnknownIdentifier` means the id is not part of this
    /// protocol at all; reserved identifiers resolve normally.
    pub fn lookup(&self, id: u16) -> Result<MessageDescriptor, RegistryError> {
        if classifier::is_dynamic(id) {
            if let Some(descriptor) = self.resolver.resolve(id) {
                return Ok(descriptor);
            }
        }
        self.table
            .get_static(id)
            .cloned()
            .ok_or(RegistryError::UnknownIdentifier(id as u32))
    }

    /// Look up a named message by its symbolic label
    pub fn lookup_name(&self, name: &str) -> Option<MessageDescriptor> {
        self.table
            .find_by_name(name)
            .map(|descriptor| self.active(descriptor))
    }

    /// Check an observed payload length against the declared one
    ///
    /// Reserved identifiers are validated like any other.
    pub fn validate_frame(&self, id: u16, observed_length: usize) -> Result<(), ValidationError> {
        let descriptor = self.lookup(id)?;
        check_length(&descriptor, observed_length)
    }

    /// Active descriptors of `category`, ascending by identifier
    ///
    /// The sequence is lazy; dynamic identifiers reflect the bindings at the
    /// moment each item is produced.
    pub fn iter_category(
        &self,
        category: Category,
    ) -> impl Iterator<Item = MessageDescriptor> + '_ {
        self.table
            .iter_category(category)
            .map(move |descriptor| self.active(descriptor))
    }

    /// Every active descriptor, ascending by identifier
    pub fn iter(&self) -> impl Iterator<Item = MessageDescriptor> + '_ {
        self.table.iter().map(move |descriptor| self.active(descriptor))
    }

    /// One-line human description of `id`; never fails
    pub fn describe(&self, id: u16) -> String {
        match self.lookup(id) {
            Ok(descriptor) => descriptor.to_string(),
            Err(_) => format!("unallocated identifier 0x{:03X}", id),
        }
    }

    /// Bind a sensor channel to an identifier of the dynamic band
    pub fn apply_assignment(
        &self,
        id: u16,
        channel: impl Into<ChannelId>,
    ) -> Result<(), AssignmentError> {
        self.resolver.assign(id, channel)
    }

    /// Remove the binding of `id`; a no-op if it has none
    pub fn clear_assignment(&self, id: u16) -> Option<ChannelId> {
        self.resolver.clear(id)
    }

    /// Drop every dynamic binding (bus halt or re-introduction)
    pub fn reset_assignments(&self) -> usize {
        self.resolver.reset_all()
    }

    fn active(&self, descriptor: &MessageDescriptor) -> MessageDescriptor {
        if descriptor.is_dynamic() {
            if let Some(bound) = self.resolver.resolve(descriptor.id) {
                return bound;
            }
        }
        descriptor.clone()
    }
}

/// Compare an observed payload length with a descriptor
pub(crate) fn check_length(
    descriptor: &MessageDescriptor,
    observed: usize,
) -> Result<(), ValidationError> {
    if observed == descriptor.expected_length as usize {
        Ok(())
    } else {
        Err(ValidationError::LengthMismatch {
            expected: descriptor.expected_length,
            observed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new().unwrap()
    }

    #[test]
    fn test_lookup_static() {
        let registry = registry();
        let descriptor = registry.lookup(0x40C).unwrap();
        assert_eq!(descriptor.name, "EPOCH");
        assert_eq!(descriptor.category, Category::Introduction);
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = registry();
        assert_eq!(
            registry.lookup(0x7A0),
            Err(RegistryError::UnknownIdentifier(0x7A0))
        );
    }

    #[test]
    fn test_lookup_prefers_dynamic_binding() {
        let registry = registry();
        registry.apply_assignment(0x52A, "chan-A").unwrap();
        assert!(registry.lookup(0x52A).unwrap().is_bound());

        registry.clear_assignment(0x52A);
        let fallback = registry.lookup(0x52A).unwrap();
        assert!(!fallback.is_bound());
        assert!(fallback.reserved);
        assert_eq!(fallback.expected_length, 8);
    }

    #[test]
    fn test_validate_frame() {
        let registry = registry();
        assert_eq!(registry.validate_frame(0x112, 6), Ok(()));
        assert_eq!(
            registry.validate_frame(0x112, 5),
            Err(ValidationError::LengthMismatch {
                expected: 6,
                observed: 5
            })
        );
    }

    #[test]
    fn test_master_introduction_frames_are_four_bytes() {
        let registry = registry();
        assert_eq!(registry.validate_frame(0x400, 4), Ok(()));
        assert_eq!(registry.validate_frame(0x401, 4), Ok(()));
        assert!(registry.validate_frame(0x401, 8).is_err());
    }

    #[test]
    fn test_validate_reserved_identifier() {
        let registry = registry();
        assert_eq!(registry.validate_frame(0x760, 8), Ok(()));
        assert!(registry.validate_frame(0x760, 2).is_err());
    }

    #[test]
    fn test_validate_unknown_identifier() {
        let registry = registry();
        assert_eq!(
            registry.validate_frame(0x300, 8),
            Err(ValidationError::Unknown(RegistryError::UnknownIdentifier(0x300)))
        );
    }

    #[test]
    fn test_describe() {
        let registry = registry();
        assert_eq!(
            registry.describe(0x112),
            "0x112 SW_SET_MODE (switch-control, dlc 6)"
        );
        assert_eq!(
            registry.describe(0x52A),
            "0x52A DATA_PRIVATE_SENSOR_52A (sensor-data, dlc 8, reserved, dynamic)"
        );
        assert_eq!(registry.describe(0x7A0), "unallocated identifier 0x7A0");

        registry.apply_assignment(0x52A, "chan-A").unwrap();
        assert_eq!(
            registry.describe(0x52A),
            "0x52A SENSOR[chan-A] (sensor-data, dlc 8, dynamic)"
        );
    }

    #[test]
    fn test_iter_category_reflects_bindings() {
        let registry = registry();
        registry.apply_assignment(0x53F, "tail").unwrap();

        let sensors: Vec<MessageDescriptor> =
            registry.iter_category(Category::SensorData).collect();
        assert_eq!(sensors.len(), 64);
        assert_eq!(sensors.first().map(|d| d.id), Some(0x500));
        let last = sensors.last().unwrap();
        assert_eq!(last.id, 0x53F);
        assert_eq!(last.binding, Some(ChannelId::from("tail")));
    }

    #[test]
    fn test_lookup_name() {
        let registry = registry();
        assert_eq!(registry.lookup_name("SW_SET_MODE").map(|d| d.id), Some(0x112));
        assert!(registry.lookup_name("NOPE").is_none());
    }
}
