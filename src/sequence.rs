//! Parameter sequences for each musical event.
//!
//! Every event starts with a version/device header followed by its delay, and the order of the
//! parameters after that is fixed by the receiving engine.

use crate::error::{check_7bit, EngineError, Result};
use crate::note::Note;
use crate::nrpn::{Parameter, ParameterValue};
use serde::{Deserialize, Serialize};

/// Reserved parameter codes.
pub mod codes {
    pub const NOTE_HEADER: u16 = 0x5000;
    pub const NOTE_DELAY: u16 = 0x5001;
    pub const NOTE_NUMBER: u16 = 0x5002;
    pub const NOTE_VELOCITY: u16 = 0x5003;
    pub const NOTE_DURATION: u16 = 0x5004;
    pub const NOTE_LOCATION: u16 = 0x5005;
    pub const PHONEME_COUNT: u16 = 0x5012;
    pub const PHONEMES_END: u16 = 0x504f;
    pub const SHAPING_START: u16 = 0x5050;
    pub const NOTE_END: u16 = 0x507f;

    pub const VOICE_HEADER: u16 = 0x6000;
    pub const VOICE_DELAY: u16 = 0x6001;
    pub const LANGUAGE_TYPE: u16 = 0x6002;
    pub const VOICE_TYPE: u16 = 0x5302;

    pub const VIBRATO_HEADER: u16 = 0x6500;
    pub const VIBRATO_DELAY: u16 = 0x6501;
    pub const VIBRATO_DEPTH: u16 = 0x6502;
    pub const VIBRATO_RATE: u16 = 0x6402;
}

/// Value carried by both sentinels.
pub const SENTINEL: u8 = 0x7f;

/// Phonemes fit in the slots between the count and the end-of-phonemes sentinel.
pub const MAX_PHONEMES: usize = (codes::PHONEMES_END - codes::PHONEME_COUNT - 1) as usize;

/// Parameters of a note other than its phonemes.
pub const NOTE_FIXED_PARAMETERS: usize = 20;

/// A phonetic symbol and how strongly its consonant is adjusted.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Phoneme {
    pub symbol: u8,
    pub consonant_adjustment: u8,
}

impl Phoneme {
    pub fn new(symbol: u8, consonant_adjustment: u8) -> Self {
        Self {
            symbol,
            consonant_adjustment,
        }
    }
}

impl From<(char, u8)> for Phoneme {
    fn from((symbol, consonant_adjustment): (char, u8)) -> Self {
        // Symbols past U+00FF map to 0xff; anything above 0x7f is rejected when encoded.
        Self::new(u8::try_from(symbol).unwrap_or(0xff), consonant_adjustment)
    }
}

impl std::fmt::Display for Phoneme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.symbol {
            0x20..=0x7e => write!(f, "{}:{}", self.symbol as char, self.consonant_adjustment),
            _ => write!(f, "{:#04x}:{}", self.symbol, self.consonant_adjustment),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum MusicalEvent {
    VoiceSelect {
        delay: u16,
        language: u8,
        voice: u8,
    },
    Note {
        delay: u16,
        note: Note,
        velocity: u8,
        duration: u16,
        position: u8,
        phonetics: Vec<Phoneme>,
    },
    VibratoChange {
        delay: u16,
        depth: u8,
        rate: u8,
    },
}

/// Expression parameters sent with every note. The defaults are the values the engine uses when
/// nothing else is specified; backends may tune them.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteShaping {
    /// Cent/5
    pub v1_mean: u8,
    /// ms/5
    pub d1_mean: u8,
    /// ms/5
    pub d1_mean_first_note: u8,
    /// ms/5
    pub d2_mean: u8,
    /// ms/5
    pub d4_mean: u8,
    /// Cent/5
    pub p_mean_onset_first_note: u8,
    /// Cent/5
    pub v_mean_note_transition: u8,
    /// Cent/5
    pub p_mean_ending_note: u8,
    /// Bit flags for scoop on up intervals and portamento on down intervals.
    pub add_scoop_portamento: u8,
    pub change_after_peak: u8,
    pub accent: u8,
}

impl NoteShaping {
    pub const COUNT: usize = 11;

    pub fn values(&self) -> [u8; Self::COUNT] {
        [
            self.v1_mean,
            self.d1_mean,
            self.d1_mean_first_note,
            self.d2_mean,
            self.d4_mean,
            self.p_mean_onset_first_note,
            self.v_mean_note_transition,
            self.p_mean_ending_note,
            self.add_scoop_portamento,
            self.change_after_peak,
            self.accent,
        ]
    }

    /// Fails if any value does not fit in a data byte, which would make every note unencodable.
    pub fn validate(&self) -> Result<()> {
        for value in self.values() {
            check_7bit("note shaping", value)?;
        }
        Ok(())
    }
}

impl Default for NoteShaping {
    fn default() -> Self {
        Self {
            v1_mean: 0x04,
            d1_mean: 0x08,
            d1_mean_first_note: 0x14,
            d2_mean: 0x1c,
            d4_mean: 0x18,
            p_mean_onset_first_note: 0x0a,
            v_mean_note_transition: 0x0c,
            p_mean_ending_note: 0x0c,
            add_scoop_portamento: 0x00,
            change_after_peak: 0x32,
            accent: 0x32,
        }
    }
}

fn header(code: u16) -> Parameter {
    // Version number and device number.
    Parameter::new(code, ParameterValue::pair(0, 0))
}

fn single(code: u16, value: u8) -> Parameter {
    Parameter::new(code, ParameterValue::single(value))
}

pub fn voice_select(delay: u16, language: u8, voice: u8) -> Vec<Parameter> {
    vec![
        header(codes::VOICE_HEADER),
        Parameter::new(codes::VOICE_DELAY, ParameterValue::split(delay)),
        single(codes::LANGUAGE_TYPE, language),
        single(codes::VOICE_TYPE, voice),
    ]
}

pub fn note(
    delay: u16,
    note: Note,
    velocity: u8,
    duration: u16,
    position: u8,
    phonetics: &[Phoneme],
    shaping: &NoteShaping,
) -> Result<Vec<Parameter>> {
    if phonetics.len() > MAX_PHONEMES {
        return Err(EngineError::invalid("phoneme count", phonetics.len() as u32));
    }

    let mut parameters = Vec::with_capacity(NOTE_FIXED_PARAMETERS + phonetics.len());
    parameters.push(header(codes::NOTE_HEADER));
    parameters.push(Parameter::new(codes::NOTE_DELAY, ParameterValue::split(delay)));
    parameters.push(single(codes::NOTE_NUMBER, note.number()));
    parameters.push(single(codes::NOTE_VELOCITY, velocity));
    parameters.push(Parameter::new(codes::NOTE_DURATION, ParameterValue::split(duration)));
    parameters.push(single(codes::NOTE_LOCATION, position));

    parameters.push(single(codes::PHONEME_COUNT, phonetics.len() as u8));
    for (slot, phoneme) in (codes::PHONEME_COUNT + 1..).zip(phonetics) {
        parameters.push(Parameter::new(
            slot,
            ParameterValue::pair(phoneme.symbol, phoneme.consonant_adjustment),
        ));
    }
    parameters.push(single(codes::PHONEMES_END, SENTINEL));

    for (code, value) in (codes::SHAPING_START..).zip(shaping.values()) {
        parameters.push(single(code, value));
    }
    parameters.push(single(codes::NOTE_END, SENTINEL));

    Ok(parameters)
}

pub fn vibrato_change(delay: u16, depth: u8, rate: u8) -> Vec<Parameter> {
    vec![
        header(codes::VIBRATO_HEADER),
        Parameter::new(codes::VIBRATO_DELAY, ParameterValue::split(delay)),
        single(codes::VIBRATO_DEPTH, depth),
        single(codes::VIBRATO_RATE, rate),
    ]
}

/// Checks that a delay or duration survives the split into 7-bit halves.
pub(crate) fn check_14bit(field: &'static str, value: u16) -> Result<u16> {
    if value >= 0x4000 {
        return Err(EngineError::invalid(field, value));
    }
    Ok(value)
}

/// Checks the inputs shared by every backend's note so range errors do not depend on the target.
pub(crate) fn check_note(velocity: u8, duration: u16, position: u8, phonetics: &[Phoneme]) -> Result<()> {
    check_7bit("velocity", velocity)?;
    check_7bit("position", position)?;
    check_14bit("duration", duration)?;
    if phonetics.len() > MAX_PHONEMES {
        return Err(EngineError::invalid("phoneme count", phonetics.len() as u32));
    }
    for phoneme in phonetics {
        check_7bit("phoneme symbol", phoneme.symbol)?;
        check_7bit("consonant adjustment", phoneme.consonant_adjustment)?;
    }
    Ok(())
}
