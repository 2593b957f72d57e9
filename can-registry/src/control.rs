//! Bus control events that mutate registry state
//!
//! Two frame shapes matter to the registry: `DATA_SENSOR_MSG`, which binds or
//! releases an identifier of the dynamic sensor band, and the halt /
//! re-introduction requests, after which every binding is stale.

use crate::catalog::ids;
use crate::classifier;
use crate::registry::Registry;
use crate::types::{AssignmentError, ChannelId};
use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

/// Channel index that releases the target identifier
pub const UNASSIGN_CHANNEL: u16 = 0xFFFF;

/// A decoded control notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ControlEvent {
    /// Bind `channel` to `target` (0x52A-0x53F)
    SensorAssignment { target: u16, channel: ChannelId },
    /// Release `target`
    SensorUnassignment { target: u16 },
    /// `SYS_HALT_OPERATION`
    Halt,
    /// `REQ_NODE_INTRO`
    Reintroduction,
}

impl ControlEvent {
    /// Decode a control event from a frame that already passed validation
    ///
    /// Returns `None` for identifiers that are not control frames.
    pub fn decode(id: u16, data: &[u8]) -> Option<Self> {
        match id {
            ids::DATA_SENSOR_MSG if data.len() >= 8 => {
                let node_id = BigEndian::read_u32(&data[0..4]);
                let target = BigEndian::read_u16(&data[4..6]);
                let index = BigEndian::read_u16(&data[6..8]);
                if index == UNASSIGN_CHANNEL {
                    Some(ControlEvent::SensorUnassignment { target })
                } else {
                    Some(ControlEvent::SensorAssignment {
                        target,
                        channel: sensor_channel(node_id, index),
                    })
                }
            }
            ids::SYS_HALT_OPERATION => Some(ControlEvent::Halt),
            ids::REQ_NODE_INTRO => Some(ControlEvent::Reintroduction),
            _ => None,
        }
    }

    /// Check that the event would apply to `registry` without changing it
    pub fn check(&self, registry: &Registry) -> Result<(), AssignmentError> {
        match self {
            ControlEvent::SensorAssignment { target, channel } => {
                if !classifier::is_dynamic(*target) {
                    return Err(AssignmentError::OutOfRangeId(*target));
                }
                match registry.resolver().binding(*target) {
                    Some(bound) if &bound != channel => Err(AssignmentError::AlreadyAssigned {
                        id: *target,
                        bound,
                        requested: channel.clone(),
                    }),
                    _ => Ok(()),
                }
            }
            ControlEvent::SensorUnassignment { target } if !classifier::is_dynamic(*target) => {
                Err(AssignmentError::OutOfRangeId(*target))
            }
            _ => Ok(()),
        }
    }

    /// Apply the event to `registry`
    ///
    /// Assignment misuse is returned untouched so the assigning node's
    /// handshake can be corrected upstream.
    pub fn apply(&self, registry: &Registry) -> Result<(), AssignmentError> {
        match self {
            ControlEvent::SensorAssignment { target, channel } => {
                registry.apply_assignment(*target, channel.clone())
            }
            ControlEvent::SensorUnassignment { target } => {
                if !classifier::is_dynamic(*target) {
                    return Err(AssignmentError::OutOfRangeId(*target));
                }
                registry.clear_assignment(*target);
                Ok(())
            }
            ControlEvent::Halt | ControlEvent::Reintroduction => {
                registry.reset_assignments();
                Ok(())
            }
        }
    }
}

/// Logical channel label of sensor `index` on node `node_id`
pub fn sensor_channel(node_id: u32, index: u16) -> ChannelId {
    ChannelId::new(format!("{:08X}/{}", node_id, index))
}

/// Build a `DATA_SENSOR_MSG` payload
pub fn encode_sensor_assignment(node_id: u32, target: u16, index: u16) -> [u8; 8] {
    let mut payload = [0u8; 8];
    BigEndian::write_u32(&mut payload[0..4], node_id);
    BigEndian::write_u16(&mut payload[4..6], target);
    BigEndian::write_u16(&mut payload[6..8], index);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sensor_assignment() {
        let payload = [0x25, 0xA5, 0x6D, 0x84, 0x05, 0x2A, 0x00, 0x03];
        let event = ControlEvent::decode(ids::DATA_SENSOR_MSG, &payload).unwrap();
        assert_eq!(
            event,
            ControlEvent::SensorAssignment {
                target: 0x52A,
                channel: ChannelId::from("25A56D84/3"),
            }
        );
    }

    #[test]
    fn test_decode_unassignment() {
        let payload = encode_sensor_assignment(1, 0x530, UNASSIGN_CHANNEL);
        assert_eq!(
            ControlEvent::decode(ids::DATA_SENSOR_MSG, &payload),
            Some(ControlEvent::SensorUnassignment { target: 0x530 })
        );
    }

    #[test]
    fn test_decode_bus_requests() {
        assert_eq!(
            ControlEvent::decode(ids::SYS_HALT_OPERATION, &[]),
            Some(ControlEvent::Halt)
        );
        assert_eq!(
            ControlEvent::decode(ids::REQ_NODE_INTRO, &[0; 4]),
            Some(ControlEvent::Reintroduction)
        );
        assert_eq!(ControlEvent::decode(ids::EPOCH, &[0; 8]), None);
        assert_eq!(ControlEvent::decode(ids::DATA_SENSOR_MSG, &[0; 4]), None);
    }

    #[test]
    fn test_apply_events() {
        let registry = Registry::new().unwrap();

        let assign = ControlEvent::SensorAssignment {
            target: 0x52C,
            channel: ChannelId::from("amb"),
        };
        assign.apply(&registry).unwrap();
        assert!(registry.lookup(0x52C).unwrap().is_bound());

        ControlEvent::Halt.apply(&registry).unwrap();
        assert!(registry.resolver().is_empty());

        let stray = ControlEvent::SensorUnassignment { target: 0x500 };
        assert_eq!(stray.apply(&registry), Err(AssignmentError::OutOfRangeId(0x500)));
    }

    #[test]
    fn test_check_leaves_registry_untouched() {
        let registry = Registry::new().unwrap();
        registry.apply_assignment(0x52A, "imu").unwrap();

        let same = ControlEvent::SensorAssignment {
            target: 0x52A,
            channel: ChannelId::from("imu"),
        };
        assert_eq!(same.check(&registry), Ok(()));

        let clash = ControlEvent::SensorAssignment {
            target: 0x52A,
            channel: ChannelId::from("other"),
        };
        assert!(matches!(
            clash.check(&registry),
            Err(AssignmentError::AlreadyAssigned { id: 0x52A, .. })
        ));

        let outside = ControlEvent::SensorAssignment {
            target: 0x112,
            channel: ChannelId::from("imu"),
        };
        assert_eq!(outside.check(&registry), Err(AssignmentError::OutOfRangeId(0x112)));

        assert_eq!(ControlEvent::Halt.check(&registry), Ok(()));
        assert_eq!(registry.resolver().len(), 1);
    }
}
