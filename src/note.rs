use crate::error::{EngineError, Result};

const PITCH_CLASSES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// A MIDI note number, 0 to 127.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Note(pub(crate) u8);

impl TryFrom<u8> for Note {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self> {
        Note::new(value)
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.pitch_class(), self.octave())
    }
}

impl std::fmt::Debug for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#04x})", self, self.0)
    }
}

impl Note {
    pub fn new(number: u8) -> Result<Self> {
        if number > 0x7f {
            return Err(EngineError::invalid("note", number));
        }
        Ok(Self(number))
    }

    pub fn middle_c() -> Self {
        Self(60)
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn pitch_class(&self) -> &'static str {
        PITCH_CLASSES[(self.0 % 12) as usize]
    }

    /// Octave in scientific pitch notation, so middle C is C4.
    pub fn octave(&self) -> i8 {
        (self.0 / 12) as i8 - 1
    }
}
