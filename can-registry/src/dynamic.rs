//! Dynamic sensor band resolver
//!
//! Identifiers 0x52A-0x53F carry private 64-bit sensor payloads whose meaning
//! is announced at runtime by `DATA_SENSOR_MSG`. Bindings live in a small map
//! layered in front of the static table; the static table itself is never
//! touched. The lock here is the only synchronization point of the registry.

use crate::classifier;
use crate::types::{AssignmentError, Category, ChannelId, MessageDescriptor, Mutability};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Payload length of every frame in the dynamic band
pub const PRIVATE_PAYLOAD_LENGTH: u8 = 8;

/// Tracks which logical sensor channel owns each dynamic identifier
#[derive(Debug, Default)]
pub struct DynamicRangeResolver {
    bindings: RwLock<BTreeMap<u16, ChannelId>>,
}

impl DynamicRangeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `channel` to `id`
    ///
    /// Re-announcing the binding that is already active succeeds without
    /// changing anything. Binding a different channel requires an explicit
    /// [`clear`](Self::clear) first.
    pub fn assign(&self, id: u16, channel: impl Into<ChannelId>) -> Result<(), AssignmentError> {
        let channel = channel.into();
        if !classifier::is_dynamic(id) {
            return Err(AssignmentError::OutOfRangeId(id));
        }

        let mut bindings = self.bindings.write();
        match bindings.get(&id) {
            Some(bound) if *bound == channel => Ok(()),
            Some(bound) => Err(AssignmentError::AlreadyAssigned {
                id,
                bound: bound.clone(),
                requested: channel,
            }),
            None => {
                log::debug!("Assigned 0x{:03X} to sensor channel {}", id, channel);
                bindings.insert(id, channel);
                Ok(())
            }
        }
    }

    /// Remove the binding of `id`, returning the channel it had
    ///
    /// Clearing an unbound (or out-of-band) identifier is a no-op.
    pub fn clear(&self, id: u16) -> Option<ChannelId> {
        let previous = self.bindings.write().remove(&id);
        if let Some(channel) = &previous {
            log::debug!("Cleared 0x{:03X} (was {})", id, channel);
        }
        previous
    }

    /// Override descriptor for `id` if a channel is bound to it
    pub fn resolve(&self, id: u16) -> Option<MessageDescriptor> {
        self.bindings
            .read()
            .get(&id)
            .map(|channel| override_descriptor(id, channel.clone()))
    }

    /// Channel currently bound to `id`
    pub fn binding(&self, id: u16) -> Option<ChannelId> {
        self.bindings.read().get(&id).cloned()
    }

    /// Drop every binding, returning how many were active
    pub fn reset_all(&self) -> usize {
        let mut bindings = self.bindings.write();
        let cleared = bindings.len();
        bindings.clear();
        if cleared > 0 {
            log::info!("Reset {} dynamic sensor assignment(s)", cleared);
        }
        cleared
    }

    /// Consistent copy of all bindings, ascending by identifier
    pub fn snapshot(&self) -> Vec<(u16, ChannelId)> {
        self.bindings
            .read()
            .iter()
            .map(|(id, channel)| (*id, channel.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

/// Descriptor describing `id` while `channel` owns it
pub fn override_descriptor(id: u16, channel: ChannelId) -> MessageDescriptor {
    MessageDescriptor {
        id,
        expected_length: PRIVATE_PAYLOAD_LENGTH,
        name: Cow::Owned(format!("SENSOR[{}]", channel)),
        category: Category::SensorData,
        mutability: Mutability::Dynamic,
        reserved: false,
        binding: Some(channel),
        comment: Some("Private 64-bit sensor payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_then_resolve() {
        let resolver = DynamicRangeResolver::new();
        resolver.assign(0x52A, "chan-A").unwrap();

        let descriptor = resolver.resolve(0x52A).unwrap();
        assert_eq!(descriptor.binding, Some(ChannelId::from("chan-A")));
        assert_eq!(descriptor.name, "SENSOR[chan-A]");
        assert_eq!(descriptor.expected_length, 8);

        assert_eq!(resolver.clear(0x52A), Some(ChannelId::from("chan-A")));
        assert!(resolver.resolve(0x52A).is_none());
    }

    #[test]
    fn test_out_of_range() {
        let resolver = DynamicRangeResolver::new();
        assert_eq!(
            resolver.assign(0x529, "chan-A"),
            Err(AssignmentError::OutOfRangeId(0x529))
        );
        assert_eq!(
            resolver.assign(0x540, "chan-A"),
            Err(AssignmentError::OutOfRangeId(0x540))
        );
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_conflicting_assignment_keeps_first() {
        let resolver = DynamicRangeResolver::new();
        resolver.assign(0x52A, "chan-A").unwrap();

        let err = resolver.assign(0x52A, "chan-B").unwrap_err();
        assert_eq!(
            err,
            AssignmentError::AlreadyAssigned {
                id: 0x52A,
                bound: ChannelId::from("chan-A"),
                requested: ChannelId::from("chan-B"),
            }
        );
        assert_eq!(resolver.binding(0x52A), Some(ChannelId::from("chan-A")));
    }

    #[test]
    fn test_reassigning_same_channel_is_accepted() {
        let resolver = DynamicRangeResolver::new();
        resolver.assign(0x530, "imu").unwrap();
        resolver.assign(0x530, "imu").unwrap();
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let resolver = DynamicRangeResolver::new();
        resolver.assign(0x52B, "chan-A").unwrap();

        assert_eq!(resolver.clear(0x52C), None);
        assert_eq!(resolver.clear(0x52C), None);
        assert_eq!(resolver.snapshot(), vec![(0x52B, ChannelId::from("chan-A"))]);

        resolver.clear(0x52B);
        resolver.clear(0x52B);
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_reset_all() {
        let resolver = DynamicRangeResolver::new();
        resolver.assign(0x52A, "a").unwrap();
        resolver.assign(0x535, "b").unwrap();
        resolver.assign(0x53F, "c").unwrap();

        assert_eq!(resolver.reset_all(), 3);
        for id in classifier::DYNAMIC_BAND {
            assert!(resolver.resolve(id).is_none());
        }
        assert_eq!(resolver.reset_all(), 0);
    }
}
