use crate::error::{EngineError, Result};
use crate::midi::MidiEvent;
use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Send failed on {port}: {reason}")]
    SendFailed { port: String, reason: String },
    #[error("Transport closed")]
    Closed,
}

/// Where the worker delivers messages.
pub trait Transport: Send {
    fn name(&self) -> &str;

    fn send(&mut self, message: &[u8]) -> std::result::Result<(), TransportError>;
}

/// A MIDI output port opened through `midir`.
pub struct MidirTransport {
    port: String,
    connection: MidiOutputConnection,
}

impl MidirTransport {
    /// Connects to the first output port whose name contains `port_match`.
    pub fn open(client_name: &str, port_match: &str) -> Result<Self> {
        let output = MidiOutput::new(client_name)
            .map_err(|err| EngineError::BackendUnavailable(err.to_string()))?;

        let port = output
            .ports()
            .into_iter()
            .find(|port| {
                output
                    .port_name(port)
                    .map(|name| name.contains(port_match))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                EngineError::BackendUnavailable(format!("no MIDI output port matching '{}'", port_match))
            })?;
        let name = output
            .port_name(&port)
            .map_err(|err| EngineError::BackendUnavailable(err.to_string()))?;

        let connection = output
            .connect(&port, "vocal-engine-output")
            .map_err(|err| EngineError::BackendUnavailable(err.to_string()))?;
        tracing::info!(port = %name, "connected to MIDI output");

        Ok(Self {
            port: name,
            connection,
        })
    }
}

impl Transport for MidirTransport {
    fn name(&self) -> &str {
        &self.port
    }

    fn send(&mut self, message: &[u8]) -> std::result::Result<(), TransportError> {
        self.connection
            .send(message)
            .map_err(|err| TransportError::SendFailed {
                port: self.port.clone(),
                reason: err.to_string(),
            })
    }
}

/// Lists the names of the MIDI output ports currently available.
pub fn list_output_ports(client_name: &str) -> Result<Vec<String>> {
    let output = MidiOutput::new(client_name)
        .map_err(|err| EngineError::BackendUnavailable(err.to_string()))?;
    Ok(output
        .ports()
        .iter()
        .filter_map(|port| output.port_name(port).ok())
        .collect())
}

/// Keeps every transmitted message in memory.
pub struct RecordingTransport {
    events: Arc<Mutex<Vec<MidiEvent>>>,
}

/// Read side of a [`RecordingTransport`], usable while the worker owns the transport.
#[derive(Clone)]
pub struct Recording {
    events: Arc<Mutex<Vec<MidiEvent>>>,
}

impl RecordingTransport {
    pub fn new() -> (Self, Recording) {
        let events = Arc::new(Mutex::new(vec![]));
        (
            Self {
                events: events.clone(),
            },
            Recording { events },
        )
    }
}

impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&mut self, message: &[u8]) -> std::result::Result<(), TransportError> {
        self.events.lock().push(MidiEvent::from_raw(message));
        Ok(())
    }
}

impl Recording {
    pub fn events(&self) -> Vec<MidiEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn take(&self) -> Vec<MidiEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}
