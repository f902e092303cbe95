//! Output side of the adapter
//!
//! The poll loop only ever talks to a [`MessageSink`]. The concrete MIDI
//! transport lives in [`midi`]; tests use an in-memory recorder.

pub mod midi;

use crate::config::ChannelId;
use std::fmt;

/// Highest value a control message may carry
pub const MAX_VALUE: u8 = 127;

/// One discrete control message: a channel and its new value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcMessage {
    pub channel: ChannelId,
    pub value: u8,
}

impl CcMessage {
    pub fn new(channel: ChannelId, value: u8) -> Self {
        Self {
            channel,
            value: value.min(MAX_VALUE),
        }
    }

    pub fn on(channel: ChannelId) -> Self {
        Self::new(channel, MAX_VALUE)
    }

    pub fn off(channel: ChannelId) -> Self {
        Self::new(channel, 0)
    }
}

impl fmt::Display for CcMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CC {} = {}", self.channel, self.value)
    }
}

// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("No MIDI output ports available")]
    NoPorts,

    #[error("Failed to initialize MIDI output: {0}")]
    InitializationError(String),

    #[error("Failed to connect to port '{port}': {reason}")]
    ConnectError { port: String, reason: String },

    #[error("Failed to send message: {0}")]
    SendError(String),
}

/// Boundary to the control protocol.
///
/// Sends are logically synchronous from the caller's side. Any buffering or
/// fan-out is up to the implementation.
pub trait MessageSink: fmt::Debug {
    fn send(&mut self, message: CcMessage) -> Result<(), SinkError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_value_is_clamped() {
        let channel = ChannelId::new(4).unwrap();
        assert_eq!(CcMessage::new(channel, 200).value, 127);
        assert_eq!(CcMessage::on(channel).value, 127);
        assert_eq!(CcMessage::off(channel).value, 0);
    }

    #[test]
    fn test_message_display() {
        let msg = CcMessage::new(ChannelId::new(20).unwrap(), 63);
        assert_eq!(msg.to_string(), "CC 20 = 63");
    }
}
