use crate::config::ConfigError;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid parameter: {field} = {value} is out of range")]
    InvalidParameter { field: &'static str, value: u32 },
    #[error("Engine already started")]
    AlreadyStarted,
    #[error("Engine not started")]
    NotStarted,
    #[error("Interrupted")]
    Interrupted,
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Worker terminated: {0}")]
    WorkerTerminated(String),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, value: impl Into<u32>) -> Self {
        Self::InvalidParameter {
            field,
            value: value.into(),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, EngineError::Interrupted)
    }
}

/// Checks that `value` fits in a 7-bit MIDI data byte.
pub(crate) fn check_7bit(field: &'static str, value: u8) -> Result<u8> {
    if value > 0x7f {
        return Err(EngineError::invalid(field, value));
    }
    Ok(value)
}
