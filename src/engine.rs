use crate::error::Result;
use crate::interrupt::Interrupter;
use crate::note::Note;
use crate::sequence::{MusicalEvent, Phoneme};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum EngineState {
    Stopped,
    Running,
}

/// A singing-voice synthesis target.
///
/// Different targets use very different MIDI mechanisms for the same musical events: some address
/// everything, notes included, through parameter numbers, others play ordinary note on/off
/// messages and set lyrics with system-exclusive messages. Callers only see this trait.
///
/// Emit operations queue their messages and return without waiting for transmission. Messages
/// of one call are delivered in order and never interleaved with another call's. Emitting or
/// delaying while stopped fails with [`EngineError::NotStarted`](crate::EngineError::NotStarted).
pub trait VocalEngine {
    /// Starts the worker that transmits queued messages.
    ///
    /// Fails with `AlreadyStarted` if the engine is running.
    fn start(&mut self) -> Result<()>;

    /// Stops the worker and waits for its thread to exit. Messages queued before the call are
    /// transmitted first. Does nothing if the engine is stopped.
    ///
    /// Fails with `Interrupted` if the interrupter fires while waiting; the engine is stopped
    /// regardless. A flag that was already set when `stop` was called is not reported.
    fn stop(&mut self) -> Result<()>;

    fn state(&self) -> EngineState;

    /// Blocks the caller for `ticks` of delta-time at the current tempo.
    fn delay(&mut self, ticks: u32) -> Result<()>;

    fn set_tempo(&mut self, microseconds_per_quarter_note: u32) -> Result<()>;

    /// Handle that cancels a caller blocked in [`VocalEngine::delay`] or [`VocalEngine::stop`].
    fn interrupter(&self) -> Interrupter;

    fn emit_voice_select(&mut self, delay_millis: u16, language: u8, voice: u8) -> Result<()>;

    /// Queues a note.
    ///
    /// # Parameters
    /// - `delay_millis` - Delay before the engine acts on the message.
    /// - `note` - Pitch of the note.
    /// - `velocity` - Velocity to hit the note at, 0 to 127.
    /// - `duration` - Length of the note.
    /// - `position` - Location within the note.
    /// - `phonetics` - The phonemes sung on the note, in order.
    fn emit_note(
        &mut self,
        delay_millis: u16,
        note: Note,
        velocity: u8,
        duration: u16,
        position: u8,
        phonetics: &[Phoneme],
    ) -> Result<()>;

    fn emit_vibrato_change(&mut self, delay_millis: u16, depth: u8, rate: u8) -> Result<()>;

    fn emit(&mut self, event: &MusicalEvent) -> Result<()> {
        match *event {
            MusicalEvent::VoiceSelect {
                delay,
                language,
                voice,
            } => self.emit_voice_select(delay, language, voice),
            MusicalEvent::Note {
                delay,
                note,
                velocity,
                duration,
                position,
                ref phonetics,
            } => self.emit_note(delay, note, velocity, duration, position, phonetics),
            MusicalEvent::VibratoChange { delay, depth, rate } => {
                self.emit_vibrato_change(delay, depth, rate)
            }
        }
    }

    fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }
}
