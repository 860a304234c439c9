//! Hardware/virtual MIDI output through `midir`.

use midir::{MidiOutput, MidiOutputConnection};
use tracing::info;

use super::{OutputSink, SinkError};
use crate::error::{Error, Result};

const CLIENT_NAME: &str = "ostinato";

/// An open connection to one MIDI output port.
pub struct MidirSink {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidirSink {
    /// Names of the available output ports, indexed as `open` expects.
    pub fn list_ports() -> Result<Vec<String>> {
        let output = MidiOutput::new(CLIENT_NAME)?;
        Ok(output
            .ports()
            .iter()
            .map(|port| {
                output
                    .port_name(port)
                    .unwrap_or_else(|_| "[unnamed output]".to_string())
            })
            .collect())
    }

    /// Connect to the output port at `index`.
    ///
    /// A missing port is fatal: the error carries the ports that do exist.
    pub fn open(index: usize) -> Result<Self> {
        let output = MidiOutput::new(CLIENT_NAME)?;
        let ports = output.ports();
        let available: Vec<String> = ports
            .iter()
            .map(|port| output.port_name(port).unwrap_or_default())
            .collect();
        let port = ports.get(index).ok_or_else(|| Error::PortUnavailable {
            index,
            available: available.clone(),
        })?;
        let port_name = available.get(index).cloned().unwrap_or_default();
        let connection = output.connect(port, "ostinato-out")?;
        info!(index, port = %port_name, "MIDI output opened");

        Ok(Self {
            connection,
            port_name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl OutputSink for MidirSink {
    fn send(&mut self, bytes: &[u8]) -> std::result::Result<(), SinkError> {
        self.connection
            .send(bytes)
            .map_err(|e| SinkError::Send(e.to_string()))
    }
}
