//! MIDI transport for the adapter, backed by midir
//!
//! Every [`CcMessage`] becomes a three byte Control Change message on a fixed
//! MIDI channel. Port selection is by a case-insensitive name hint, falling
//! back to the first port the system reports.

use super::{CcMessage, MessageSink, SinkError};
use midir::{MidiOutput, MidiOutputConnection};
use std::fmt;
use tracing::{debug, error, info, warn};

const CLIENT_NAME: &str = "gamepad-midi";
const CONTROL_CHANGE: u8 = 0xB0;

/// Pick the output port for `hint`.
///
/// Returns the first port whose name contains the hint (ignoring case), else
/// the first port. `None` only when there are no ports at all.
pub fn select_port(names: &[String], hint: &str) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    let hint = hint.to_lowercase();
    let found = names
        .iter()
        .position(|name| name.to_lowercase().contains(&hint));
    Some(found.unwrap_or(0))
}

/// Control Change bytes for `message` on MIDI channel `channel` (0-15)
pub fn encode_control_change(channel: u8, message: CcMessage) -> [u8; 3] {
    [
        CONTROL_CHANGE | (channel & 0x0F),
        message.channel.get(),
        message.value,
    ]
}

pub struct MidiSink {
    connection: MidiOutputConnection,
    port_name: String,
    midi_channel: u8,
}

impl fmt::Debug for MidiSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiSink")
            .field("port_name", &self.port_name)
            .field("midi_channel", &self.midi_channel)
            .finish()
    }
}

impl MidiSink {
    /// Open the output port best matching `port_hint`
    pub fn connect(port_hint: &str, midi_channel: u8) -> Result<Self, SinkError> {
        info!("Initializing MIDI output");
        let output = MidiOutput::new(CLIENT_NAME).map_err(|e| {
            error!("Failed to initialize MIDI output: {}", e);
            SinkError::InitializationError(e.to_string())
        })?;

        let ports = output.ports();
        let names: Vec<String> = ports
            .iter()
            .map(|port| {
                output.port_name(port).unwrap_or_else(|e| {
                    warn!("Unable to read port name: {}", e);
                    String::new()
                })
            })
            .collect();

        info!("Found {} MIDI output ports:", names.len());
        for (idx, name) in names.iter().enumerate() {
            info!("  [{}] {}", idx, name);
        }

        let index = select_port(&names, port_hint).ok_or(SinkError::NoPorts)?;
        let port_name = names[index].clone();
        if !port_name.to_lowercase().contains(&port_hint.to_lowercase()) {
            warn!(
                "No port matching '{}', falling back to '{}'",
                port_hint, port_name
            );
        }

        let connection = output
            .connect(&ports[index], CLIENT_NAME)
            .map_err(|e| SinkError::ConnectError {
                port: port_name.clone(),
                reason: e.to_string(),
            })?;

        info!("MIDI → {}", port_name);
        Ok(Self {
            connection,
            port_name,
            midi_channel,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MessageSink for MidiSink {
    fn send(&mut self, message: CcMessage) -> Result<(), SinkError> {
        let bytes = encode_control_change(self.midi_channel, message);
        debug!("Sending {} as {:02X?}", message, bytes);
        self.connection
            .send(&bytes)
            .map_err(|e| SinkError::SendError(e.to_string()))
    }
}
