use super::Host;
use crate::config::EngineConfig;
use crate::engine::{EngineState, VocalEngine};
use crate::error::Result;
use crate::interrupt::Interrupter;
use crate::midi::{cc, MidiEvent, SysEx, TimedMidiEvent};
use crate::note::Note;
use crate::observer::EngineObserver;
use crate::sequence::{check_14bit, check_note, Phoneme};
use crate::transport::Transport;
use itertools::Itertools;
use std::sync::Arc;

/// Manufacturer, device and command bytes that select the lyric of the next note.
const LYRIC_PREFIX: [u8; 6] = [0x43, 0x79, 0x09, 0x00, 0x50, 0x10];

/// Drives embedded singing targets that play ordinary notes and take lyrics as system-exclusive
/// messages.
///
/// Such targets sing one syllable per note, so only the first phoneme of a note is sent. The
/// target looks its lyric up in a built-in syllable table, so for this backend a phoneme's
/// `symbol` is the table index, not a phonetic character. An ASCII symbol such as `'h'` selects
/// whatever syllable sits at index 0x68.
pub struct SysExEngine {
    host: Host,
}

impl SysExEngine {
    pub fn new(transport: Box<dyn Transport>, config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            host: Host::new(transport, config)?,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.host.set_observer(observer);
        self
    }
}

/// Selects entry `phoneme.symbol` of the target's syllable table. No translation is applied.
fn lyric_message(phoneme: &Phoneme) -> Result<MidiEvent> {
    let mut body = [0; LYRIC_PREFIX.len() + 2];
    body[..LYRIC_PREFIX.len()].copy_from_slice(&LYRIC_PREFIX);
    body[LYRIC_PREFIX.len()] = phoneme.symbol;
    Ok(MidiEvent::SysEx(SysEx::new(&body)?))
}

impl VocalEngine for SysExEngine {
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
        let program = MidiEvent::program_change(voice)?;
        if language != 0 {
            tracing::warn!(language, "language selection is not supported, ignoring");
        }
        self.host.send_now(&[program])
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

        let lyric = phonetics.first().map(lyric_message).transpose()?;
        if phonetics.len() > 1 {
            tracing::debug!(
                ignored = %phonetics[1..].iter().join(" "),
                "only the first phoneme of a note is sung"
            );
        }
        let on = MidiEvent::note_on(note, velocity)?;
        tracing::debug!(%note, velocity, duration, "note");

        let off = TimedMidiEvent {
            time: duration as u32,
            event: MidiEvent::note_off(note),
        };
        let events = lyric
            .into_iter()
            .chain([on])
            .map(TimedMidiEvent::now)
            .chain([off]);
        self.host.send(events)
    }

    fn emit_vibrato_change(&mut self, delay_millis: u16, depth: u8, rate: u8) -> Result<()> {
        self.host.ensure_running()?;
        check_14bit("delay", delay_millis)?;
        let events = [
            MidiEvent::control_change(cc::VIBRATO_DEPTH, depth)?,
            MidiEvent::control_change(cc::VIBRATO_RATE, rate)?,
        ];
        self.host.send_now(&events)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::EngineError;
    use crate::transport::{Recording, RecordingTransport};
    use std::time::{Duration, Instant};

    fn engine() -> (SysExEngine, Recording) {
        let (transport, recording) = RecordingTransport::new();
        let engine = SysExEngine::new(Box::new(transport), &EngineConfig::default()).unwrap();
        (engine, recording)
    }

    fn raw(events: &[MidiEvent]) -> Vec<Vec<u8>> {
        events.iter().map(|event| event.to_raw().to_vec()).collect()
    }

    #[test]
    fn test_note_order() {
        let (mut engine, recording) = engine();
        engine.start().unwrap();
        engine
            .emit_note(
                0,
                Note::new(0x45).unwrap(),
                0x40,
                5,
                3,
                &[Phoneme::from(('h', 0x40)), Phoneme::from(('a', 0))],
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while recording.len() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        engine.stop().unwrap();

        assert_eq!(
            raw(&recording.events()),
            vec![
                vec![0xf0, 0x43, 0x79, 0x09, 0x00, 0x50, 0x10, b'h', 0x00, 0xf7],
                vec![0x90, 0x45, 0x40],
                vec![0x80, 0x45, 0x00],
            ]
        );
    }

    #[test]
    fn test_lyric_symbol_is_table_index() {
        for index in [0x00, 0x05, 0x7f] {
            let message = lyric_message(&Phoneme::new(index, 0x40)).unwrap();
            assert_eq!(
                &*message.to_raw(),
                &[0xf0, 0x43, 0x79, 0x09, 0x00, 0x50, 0x10, index, 0x00, 0xf7]
            );
        }
        assert!(lyric_message(&Phoneme::new(0x80, 0)).is_err());
    }

    #[test]
    fn test_note_off_flushed_at_stop() {
        let (mut engine, recording) = engine();
        engine.start().unwrap();
        engine
            .emit_note(0, Note::middle_c(), 0x40, 0x3fff, 0, &[])
            .unwrap();
        let start = Instant::now();
        engine.stop().unwrap();

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(
            recording.events(),
            vec![
                MidiEvent::note_on(Note::middle_c(), 0x40).unwrap(),
                MidiEvent::note_off(Note::middle_c()),
            ]
        );
    }

    #[test]
    fn test_overlapping_notes_release_in_due_order() {
        let (mut engine, recording) = engine();
        let low = Note::new(48).unwrap();
        let high = Note::new(72).unwrap();
        engine.start().unwrap();
        engine.emit_note(0, low, 0x40, 0x3000, 0, &[]).unwrap();
        engine.emit_note(0, high, 0x40, 0x2000, 0, &[]).unwrap();
        engine.stop().unwrap();

        assert_eq!(
            recording.events(),
            vec![
                MidiEvent::note_on(low, 0x40).unwrap(),
                MidiEvent::note_on(high, 0x40).unwrap(),
                MidiEvent::note_off(high),
                MidiEvent::note_off(low),
            ]
        );
    }

    #[test]
    fn test_voice_and_vibrato() {
        let (mut engine, recording) = engine();
        engine.start().unwrap();
        engine.emit_voice_select(0, 1, 5).unwrap();
        engine.emit_vibrato_change(0x0f50, 0x40, 0x32).unwrap();
        engine.stop().unwrap();

        assert_eq!(
            raw(&recording.events()),
            vec![vec![0xc0, 5], vec![0xb0, 77, 0x40], vec![0xb0, 76, 0x32]]
        );
    }

    #[test]
    fn test_invalid_input_sends_nothing() {
        let (mut engine, recording) = engine();
        assert!(matches!(engine.emit_voice_select(0, 0, 0), Err(EngineError::NotStarted)));

        engine.start().unwrap();
        assert!(engine.emit_voice_select(0, 0, 0x80).is_err());
        assert!(engine.emit_vibrato_change(0x4000, 0, 0).is_err());
        assert!(engine
            .emit_note(0, Note::middle_c(), 0x40, 100, 0, &[Phoneme::new(0x80, 0)])
            .is_err());
        assert!(engine
            .emit_note(0, Note::middle_c(), 0x40, 100, 0x80, &[])
            .is_err());
        engine.stop().unwrap();
        assert!(recording.is_empty());
    }
}
