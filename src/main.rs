use itertools::Itertools;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vocal_engine::backend;
use vocal_engine::transport::{list_output_ports, RecordingTransport};
use vocal_engine::{EngineConfig, MusicalEvent, Note, Phoneme, Result, VocalEngine};

enum Step {
    Emit(MusicalEvent),
    Delay(u32),
}

/// The opening of a short song: a voice, two sung notes and a vibrato change.
fn song() -> Result<Vec<Step>> {
    Ok(vec![
        Step::Emit(MusicalEvent::VoiceSelect {
            delay: 0,
            language: 0,
            voice: 0,
        }),
        Step::Delay(0x2d3b),
        Step::Emit(MusicalEvent::Note {
            delay: 3920,
            note: Note::new(0x45)?,
            velocity: 0x40,
            duration: 569,
            position: 3,
            phonetics: vec![Phoneme::from(('h', 0x40)), Phoneme::from(('a', 0x00))],
        }),
        Step::Delay(0x268),
        Step::Emit(MusicalEvent::Note {
            delay: 3920,
            note: Note::new(0x44)?,
            velocity: 0x40,
            duration: 0x0433,
            position: 3,
            phonetics: vec![Phoneme::from(('4', 0x40)), Phoneme::from(('o', 0x00))],
        }),
        Step::Delay(0x135),
        Step::Emit(MusicalEvent::VibratoChange {
            delay: 0x0f50,
            depth: 0x40,
            rate: 0x32,
        }),
    ])
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    };

    // Without a port to talk to, play into memory and log what would have been sent.
    let (mut engine, recording) = if config.output_port.is_some() {
        (backend::open(&config)?, None)
    } else {
        match list_output_ports(&config.client_name) {
            Ok(ports) => tracing::info!(
                available = %ports.iter().join(", "),
                "no output port configured, doing a dry run"
            ),
            Err(err) => tracing::warn!(%err, "could not list MIDI output ports"),
        }
        let (transport, recording) = RecordingTransport::new();
        (
            backend::open_with_transport(&config, Box::new(transport))?,
            Some(recording),
        )
    };

    engine.start()?;
    for step in song()? {
        match step {
            Step::Emit(event) => engine.emit(&event)?,
            Step::Delay(ticks) => engine.delay(ticks)?,
        }
    }
    engine.stop()?;

    if let Some(recording) = recording {
        for event in recording.take() {
            let bytes = event.to_raw().iter().map(|byte| format!("{:02x}", byte)).join(" ");
            tracing::info!(%bytes, "sent");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "engine failed");
            ExitCode::FAILURE
        }
    }
}
