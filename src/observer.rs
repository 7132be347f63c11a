use crate::midi::MidiEvent;
use crate::transport::TransportError;

/// Diagnostic notifications from an engine's worker. Nothing in the engine depends on them.
pub trait EngineObserver: Send + Sync {
    fn worker_started(&self, _transport: &str) {}

    fn worker_stopped(&self, _transport: &str) {}

    fn transmitted(&self, _event: &MidiEvent) {}

    fn worker_failed(&self, _error: &TransportError) {}
}

/// Forwards every notification to `tracing`.
#[derive(Copy, Clone, Default, Debug)]
pub struct LoggingObserver;

impl EngineObserver for LoggingObserver {
    fn worker_started(&self, transport: &str) {
        tracing::info!(transport, "worker started");
    }

    fn worker_stopped(&self, transport: &str) {
        tracing::info!(transport, "worker stopped");
    }

    fn transmitted(&self, event: &MidiEvent) {
        tracing::trace!(?event, "transmitted");
    }

    fn worker_failed(&self, error: &TransportError) {
        tracing::error!(%error, "worker failed");
    }
}
