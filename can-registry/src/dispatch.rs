//! Frame dispatch
//!
//! Classifies frames coming from a transport against the registry and feeds
//! control frames back into it. Every frame is classified; none is dropped
//! unless a configured filter excludes it.

use crate::classifier;
use crate::config::DispatchConfig;
use crate::control::ControlEvent;
use crate::registry::{check_length, Registry};
use crate::transport::FrameSink;
use crate::types::{
    AssignmentError, CanFrame, MessageDescriptor, RegistryError, Result, Timestamp,
    ValidationError,
};
use chrono::Utc;
use std::sync::Arc;

/// Outcome of dispatching one frame
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    /// A conforming frame
    Frame {
        timestamp: Timestamp,
        channel: u8,
        descriptor: MessageDescriptor,
        data: Vec<u8>,
    },

    /// A conforming control frame and the result of applying it
    Control {
        timestamp: Timestamp,
        channel: u8,
        descriptor: MessageDescriptor,
        event: ControlEvent,
        outcome: std::result::Result<(), AssignmentError>,
        data: Vec<u8>,
    },

    /// A frame that is not part of the protocol or has the wrong length
    Invalid {
        timestamp: Timestamp,
        channel: u8,
        can_id: u32,
        /// Known for length mismatches, absent for unknown identifiers
        descriptor: Option<MessageDescriptor>,
        data: Vec<u8>,
        error: ValidationError,
    },
}

impl DispatchEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> Timestamp {
        match self {
            DispatchEvent::Frame { timestamp, .. }
            | DispatchEvent::Control { timestamp, .. }
            | DispatchEvent::Invalid { timestamp, .. } => *timestamp,
        }
    }

    /// Get the CAN channel of this event
    pub fn channel(&self) -> u8 {
        match self {
            DispatchEvent::Frame { channel, .. }
            | DispatchEvent::Control { channel, .. }
            | DispatchEvent::Invalid { channel, .. } => *channel,
        }
    }

    /// Get the CAN ID of this event
    pub fn can_id(&self) -> u32 {
        match self {
            DispatchEvent::Frame { descriptor, .. } | DispatchEvent::Control { descriptor, .. } => {
                descriptor.id as u32
            }
            DispatchEvent::Invalid { can_id, .. } => *can_id,
        }
    }

    /// Descriptor the frame was checked against, if any
    pub fn descriptor(&self) -> Option<&MessageDescriptor> {
        match self {
            DispatchEvent::Frame { descriptor, .. } | DispatchEvent::Control { descriptor, .. } => {
                Some(descriptor)
            }
            DispatchEvent::Invalid { descriptor, .. } => descriptor.as_ref(),
        }
    }

    /// Payload bytes (empty for remote frames)
    pub fn data(&self) -> &[u8] {
        match self {
            DispatchEvent::Frame { data, .. }
            | DispatchEvent::Control { data, .. }
            | DispatchEvent::Invalid { data, .. } => data,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, DispatchEvent::Invalid { .. })
    }
}

/// Validates traffic against a shared [`Registry`]
pub struct Dispatcher {
    registry: Arc<Registry>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher, applying the configured sensor bindings
    ///
    /// Either every configured binding is applied or, on the first refused
    /// one, none of those this call added are left behind.
    pub fn new(registry: Arc<Registry>, config: DispatchConfig) -> Result<Self> {
        let mut added = Vec::new();
        for binding in &config.sensor_bindings {
            let fresh = registry.resolver().binding(binding.id).is_none();
            if let Err(e) = registry.apply_assignment(binding.id, binding.channel.clone()) {
                for id in added {
                    registry.clear_assignment(id);
                }
                return Err(e.into());
            }
            if fresh {
                added.push(binding.id);
            }
        }
        Ok(Self { registry, config })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Classify one received frame
    ///
    /// Returns `None` only when a configured filter excludes the frame.
    pub fn dispatch(&self, frame: CanFrame) -> Option<DispatchEvent> {
        if !self.config.should_process_channel(frame.channel)
            || !self.config.should_process_message(frame.can_id)
        {
            return None;
        }

        let id = frame.standard_id();
        let category = id.and_then(classifier::classify);
        if !self.config.should_process_category(category) {
            return None;
        }

        let timestamp = frame.timestamp();
        let lookup = id
            .ok_or(RegistryError::UnknownIdentifier(frame.can_id))
            .and_then(|id| self.registry.lookup(id));
        let descriptor = match lookup {
            Ok(descriptor) => descriptor,
            Err(e) => {
                log::trace!("Unknown identifier 0x{:X} on channel {}", frame.can_id, frame.channel);
                return Some(DispatchEvent::Invalid {
                    timestamp,
                    channel: frame.channel,
                    can_id: frame.can_id,
                    descriptor: None,
                    data: frame.data,
                    error: e.into(),
                });
            }
        };

        // Remote frames carry no payload; only the identifier is checked
        if !frame.is_remote {
            if let Err(e) = check_length(&descriptor, frame.dlc()) {
                log::warn!("{} on {}: {}", descriptor.name, frame.channel, e);
                return Some(DispatchEvent::Invalid {
                    timestamp,
                    channel: frame.channel,
                    can_id: frame.can_id,
                    descriptor: Some(descriptor),
                    data: frame.data,
                    error: e,
                });
            }
        }

        if self.config.apply_control_events && !frame.is_remote {
            if let Some(event) = ControlEvent::decode(descriptor.id, &frame.data) {
                let outcome = event.apply(&self.registry);
                if let Err(e) = &outcome {
                    log::warn!("Rejected control frame {}: {}", descriptor.name, e);
                }
                return Some(DispatchEvent::Control {
                    timestamp,
                    channel: frame.channel,
                    descriptor,
                    event,
                    outcome,
                    data: frame.data,
                });
            }
        }

        Some(DispatchEvent::Frame {
            timestamp,
            channel: frame.channel,
            descriptor,
            data: frame.data,
        })
    }

    /// Lazily dispatch every frame of a frame source
    pub fn dispatch_all<I>(&self, frames: I) -> DispatchIterator<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Result<CanFrame>>,
    {
        DispatchIterator {
            frames: frames.into_iter(),
            dispatcher: self,
        }
    }

    /// Validate an outgoing frame and hand it to `sink`
    ///
    /// A conflicting assignment is refused before it reaches the bus. Outgoing
    /// control frames update this registry only once the sink accepted them.
    pub fn send<S: FrameSink + ?Sized>(
        &self,
        sink: &mut S,
        channel: u8,
        id: u16,
        payload: &[u8],
    ) -> Result<CanFrame> {
        self.registry.validate_frame(id, payload.len())?;

        let event = if self.config.apply_control_events {
            ControlEvent::decode(id, payload)
        } else {
            None
        };
        if let Some(event) = &event {
            event.check(&self.registry)?;
        }

        let timestamp_ns = Utc::now().timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
        let frame = CanFrame::new(channel, id, payload).at(timestamp_ns);
        sink.send(&frame)?;
        log::debug!("Sent {}", self.registry.describe(id));

        if let Some(event) = event {
            if let Err(e) = event.apply(&self.registry) {
                log::warn!("Sent {:?} but the registry refused it: {}", event, e);
                return Err(e.into());
            }
        }
        Ok(frame)
    }
}

/// Iterator that dispatches frames from a frame source
///
/// Source errors are passed through; filtered frames are skipped.
pub struct DispatchIterator<'a, I>
where
    I: Iterator<Item = Result<CanFrame>>,
{
    frames: I,
    dispatcher: &'a Dispatcher,
}

impl<'a, I> Iterator for DispatchIterator<'a, I>
where
    I: Iterator<Item = Result<CanFrame>>,
{
    type Item = Result<DispatchEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.frames.next()? {
                Ok(frame) => {
                    if let Some(event) = self.dispatcher.dispatch(frame) {
                        return Some(Ok(event));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
