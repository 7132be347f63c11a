use crate::error::{check_7bit, EngineError, Result};
use crate::note::Note;
use std::ops::Deref;

/// The only channel vocal synthesis targets listen on.
pub const CHANNEL: u8 = 0;

/// Controller numbers used by the backends.
pub mod cc {
    /// Data Entry MSB, the value of the selected parameter.
    pub const DATA_ENTRY_MSB: u8 = 6;
    /// Data Entry LSB, the optional fine value of the selected parameter.
    pub const DATA_ENTRY_LSB: u8 = 38;
    /// Sound controller 7.
    pub const VIBRATO_RATE: u8 = 76;
    /// Sound controller 8.
    pub const VIBRATO_DEPTH: u8 = 77;
    /// Non-Registered Parameter Number LSB.
    pub const NRPN_LSB: u8 = 98;
    /// Non-Registered Parameter Number MSB.
    pub const NRPN_MSB: u8 = 99;
}

/// Largest system-exclusive body (without the `F0`/`F7` framing) a message can carry.
pub const MAX_SYSEX_BODY: usize = 14;

const MAX_RAW_LEN: usize = MAX_SYSEX_BODY + 2;

/// A message waiting to be transmitted, `time` milliseconds after it was queued.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TimedMidiEvent {
    pub time: u32,
    pub event: MidiEvent,
}

impl TimedMidiEvent {
    pub fn now(event: MidiEvent) -> Self {
        Self { time: 0, event }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum MidiEvent {
    NoteOn {
        channel: u8,
        note: Note,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: Note,
        velocity: u8,
    },
    ControlChange {
        channel: u8,
        control: u8,
        value: u8,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
    SysEx(SysEx),
    Invalid,
}

impl MidiEvent {
    pub fn control_change(control: u8, value: u8) -> Result<Self> {
        Ok(MidiEvent::ControlChange {
            channel: CHANNEL,
            control: check_7bit("control", control)?,
            value: check_7bit("control value", value)?,
        })
    }

    pub fn note_on(note: Note, velocity: u8) -> Result<Self> {
        Ok(MidiEvent::NoteOn {
            channel: CHANNEL,
            note,
            velocity: check_7bit("velocity", velocity)?,
        })
    }

    pub fn note_off(note: Note) -> Self {
        MidiEvent::NoteOff {
            channel: CHANNEL,
            note,
            velocity: 0,
        }
    }

    pub fn program_change(program: u8) -> Result<Self> {
        Ok(MidiEvent::ProgramChange {
            channel: CHANNEL,
            program: check_7bit("program", program)?,
        })
    }

    pub fn from_raw(data: &[u8]) -> Self {
        match *data {
            [a @ 0x80..=0x8f, note @ 0..=0x7f, velocity] => MidiEvent::NoteOff {
                channel: a & 0x0f,
                note: Note(note),
                velocity,
            },
            [a @ 0x90..=0x9f, note @ 0..=0x7f, velocity] => MidiEvent::NoteOn {
                channel: a & 0x0f,
                note: Note(note),
                velocity,
            },
            [a @ 0xb0..=0xbf, control, value] => MidiEvent::ControlChange {
                channel: a & 0x0f,
                control,
                value,
            },
            [a @ 0xc0..=0xcf, program] => MidiEvent::ProgramChange {
                channel: a & 0x0f,
                program,
            },
            [0xf0, ref body @ .., 0xf7] => SysEx::new(body)
                .map(MidiEvent::SysEx)
                .unwrap_or(MidiEvent::Invalid),
            _ => MidiEvent::Invalid,
        }
    }

    /// Serializes the message into the bytes sent over the wire.
    pub fn to_raw(&self) -> RawMessage {
        let mut raw = RawMessage::default();
        match *self {
            MidiEvent::NoteOff {
                channel,
                note,
                velocity,
            } => raw.extend(&[0x80 | channel, note.0, velocity]),
            MidiEvent::NoteOn {
                channel,
                note,
                velocity,
            } => raw.extend(&[0x90 | channel, note.0, velocity]),
            MidiEvent::ControlChange {
                channel,
                control,
                value,
            } => raw.extend(&[0xb0 | channel, control, value]),
            MidiEvent::ProgramChange { channel, program } => raw.extend(&[0xc0 | channel, program]),
            MidiEvent::SysEx(sysex) => {
                raw.extend(&[0xf0]);
                raw.extend(sysex.body());
                raw.extend(&[0xf7]);
            }
            MidiEvent::Invalid => {}
        }
        raw
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, MidiEvent::Invalid)
    }
}

/// A system-exclusive body kept inline so queued events stay `Copy`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SysEx {
    body: [u8; MAX_SYSEX_BODY],
    len: usize,
}

impl SysEx {
    pub fn new(body: &[u8]) -> Result<Self> {
        if body.len() > MAX_SYSEX_BODY {
            return Err(EngineError::invalid("sysex length", body.len() as u32));
        }
        let mut buffer = [0; MAX_SYSEX_BODY];
        for (dst, &byte) in buffer.iter_mut().zip(body) {
            *dst = check_7bit("sysex data", byte)?;
        }
        Ok(Self {
            body: buffer,
            len: body.len(),
        })
    }

    pub fn body(&self) -> &[u8] {
        &self.body[..self.len]
    }
}

/// Raw bytes of one message.
#[derive(Copy, Clone, Default)]
pub struct RawMessage {
    bytes: [u8; MAX_RAW_LEN],
    len: usize,
}

impl RawMessage {
    fn extend(&mut self, data: &[u8]) {
        let end = self.len + data.len();
        self.bytes[self.len..end].copy_from_slice(data);
        self.len = end;
    }
}

impl Deref for RawMessage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}
