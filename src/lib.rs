pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod interrupt;
pub mod midi;
pub mod note;
pub mod nrpn;
pub mod observer;
pub mod sequence;
pub mod time;
pub mod transport;
mod worker;

pub use backend::{NrpnEngine, SysExEngine};
pub use config::{BackendKind, EngineConfig};
pub use engine::{EngineState, VocalEngine};
pub use error::{EngineError, Result};
pub use interrupt::Interrupter;
pub use note::Note;
pub use sequence::{MusicalEvent, NoteShaping, Phoneme};
pub use time::TimeBase;
