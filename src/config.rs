use crate::sequence::NoteShaping;
use crate::time::TimeBase;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Which wire protocol the synthesis target speaks.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Every event as Non-Registered Parameter Number messages.
    #[default]
    Nrpn,
    /// Note on/off with lyrics selected through system-exclusive messages.
    SysEx,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Client name announced to the MIDI system.
    pub client_name: String,
    /// Part of the name of the output port the synthesis engine listens on.
    pub output_port: Option<String>,
    pub backend: BackendKind,
    pub microseconds_per_quarter_note: u32,
    /// Messages the queue between caller and worker can hold.
    pub queue_capacity: usize,
    pub note_shaping: NoteShaping,
}

impl EngineConfig {
    pub const DEFAULT_CLIENT_NAME: &'static str = "vocal-engine";
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            client_name: Self::DEFAULT_CLIENT_NAME.to_string(),
            output_port: None,
            backend: BackendKind::default(),
            microseconds_per_quarter_note: TimeBase::DEFAULT_MICROSECONDS_PER_QUARTER_NOTE,
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            note_shaping: NoteShaping::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "output_port": "VOCALOID", "backend": "sysex" }"#).unwrap();
        assert_eq!(config.output_port.as_deref(), Some("VOCALOID"));
        assert_eq!(config.backend, BackendKind::SysEx);
        assert_eq!(config.microseconds_per_quarter_note, 500_000);
        assert_eq!(config.queue_capacity, EngineConfig::DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.note_shaping, NoteShaping::default());
    }

    #[test]
    fn test_note_shaping_override() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "note_shaping": { "accent": 16 } }"#).unwrap();
        assert_eq!(config.note_shaping.accent, 16);
        assert_eq!(config.note_shaping.v1_mean, 0x04);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/vocal-engine.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_bad_json() {
        let path = std::env::temp_dir().join("vocal-engine-bad-config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Format(_)));
        std::fs::remove_file(&path).ok();
    }
}
