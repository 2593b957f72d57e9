//! Transport-facing contracts
//!
//! The registry never touches the link layer. Received frames arrive as any
//! `Iterator<Item = Result<CanFrame>>`; outgoing frames leave through a
//! [`FrameSink`].

use crate::types::{CanFrame, Result};

/// Send capability provided by the transport layer
pub trait FrameSink {
    /// Hand one frame to the bus
    fn send(&mut self, frame: &CanFrame) -> Result<()>;
}

/// Collects frames in memory (loopback, tests)
impl FrameSink for Vec<CanFrame> {
    fn send(&mut self, frame: &CanFrame) -> Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn send(&mut self, frame: &CanFrame) -> Result<()> {
        (**self).send(frame)
    }
}
