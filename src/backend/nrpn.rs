use super::Host;
use crate::config::EngineConfig;
use crate::engine::{EngineState, VocalEngine};
use crate::error::Result;
use crate::interrupt::Interrupter;
use crate::midi::MidiEvent;
use crate::note::Note;
use crate::nrpn::{encode_all, Parameter};
use crate::observer::EngineObserver;
use crate::sequence::{self, check_14bit, check_note, NoteShaping, Phoneme};
use crate::transport::Transport;
use itertools::Itertools;
use std::sync::Arc;

/// Drives engines that take every event, notes included, as parameter-number messages.
pub struct NrpnEngine {
    host: Host,
    shaping: NoteShaping,
    /// Reused between calls; cleared before each sequence is encoded.
    buffer: Vec<MidiEvent>,
}

impl NrpnEngine {
    pub fn new(transport: Box<dyn Transport>, config: &EngineConfig) -> Result<Self> {
        config.note_shaping.validate()?;
        Ok(Self {
            host: Host::new(transport, config)?,
            shaping: config.note_shaping,
            buffer: vec![],
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.host.set_observer(observer);
        self
    }

    /// Encodes the whole sequence before queueing any of it.
    fn queue(&mut self, parameters: &[Parameter]) -> Result<()> {
        self.buffer.clear();
        encode_all(parameters, &mut self.buffer)?;
        self.host.send_now(&self.buffer)
    }
}

impl VocalEngine for NrpnEngine {
    fn start(&mut self) -> Result<()> {
        self.host.start()
    }

    fn stop(&mut self) -> Result<()> {
        self.host.stop()
    }

    fn state(&self) -> EngineState {
        self.host.state()
    }

    fn delay(&mut self, ticks: u32) -> Result<()> {
        self.host.delay(ticks)
    }

    fn set_tempo(&mut self, microseconds_per_quarter_note: u32) -> Result<()> {
        self.host.set_tempo(microseconds_per_quarter_note)
    }

    fn interrupter(&self) -> Interrupter {
        self.host.interrupter()
    }

    fn emit_voice_select(&mut self, delay_millis: u16, language: u8, voice: u8) -> Result<()> {
        self.host.ensure_running()?;
        check_14bit("delay", delay_millis)?;
        tracing::debug!(delay_millis, language, voice, "voice select");
        self.queue(&sequence::voice_select(delay_millis, language, voice))
    }

    fn emit_note(
        &mut self,
        delay_millis: u16,
        note: Note,
        velocity: u8,
        duration: u16,
        position: u8,
        phonetics: &[Phoneme],
    ) -> Result<()> {
        self.host.ensure_running()?;
        check_14bit("delay", delay_millis)?;
        check_note(velocity, duration, position, phonetics)?;
        tracing::debug!(
            delay_millis,
            %note,
            velocity,
            duration,
            position,
            phonetics = %phonetics.iter().join(" "),
            "note"
        );
        let parameters = sequence::note(
            delay_millis,
            note,
            velocity,
            duration,
            position,
            phonetics,
            &self.shaping,
        )?;
        self.queue(&parameters)
    }

    fn emit_vibrato_change(&mut self, delay_millis: u16, depth: u8, rate: u8) -> Result<()> {
        self.host.ensure_running()?;
        check_14bit("delay", delay_millis)?;
        tracing::debug!(delay_millis, depth, rate, "vibrato change");
        self.queue(&sequence::vibrato_change(delay_millis, depth, rate))
    }
}
