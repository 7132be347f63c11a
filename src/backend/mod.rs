use crate::config::{BackendKind, EngineConfig};
use crate::engine::{EngineState, VocalEngine};
use crate::error::{EngineError, Result};
use crate::interrupt::Interrupter;
use crate::midi::{MidiEvent, TimedMidiEvent};
use crate::observer::{EngineObserver, LoggingObserver};
use crate::time::TimeBase;
use crate::transport::{MidirTransport, Transport};
use crate::worker::{Worker, WorkerParts};
use basedrop::Collector;
use ringbuf_basedrop as ringbuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

pub use nrpn::NrpnEngine;
pub use sysex::SysExEngine;

mod nrpn;
mod sysex;

/// How long a producer waits for the worker to free space before checking on it again.
const SPACE_TIMEOUT: Duration = Duration::from_millis(50);

/// Opens the configured output port and builds the configured backend on it.
pub fn open(config: &EngineConfig) -> Result<Box<dyn VocalEngine>> {
    let port = config
        .output_port
        .as_deref()
        .ok_or_else(|| EngineError::BackendUnavailable("no output port configured".into()))?;
    let transport = MidirTransport::open(&config.client_name, port)?;
    open_with_transport(config, Box::new(transport))
}

pub fn open_with_transport(config: &EngineConfig, transport: Box<dyn Transport>) -> Result<Box<dyn VocalEngine>> {
    let engine: Box<dyn VocalEngine> = match config.backend {
        BackendKind::Nrpn => Box::new(NrpnEngine::new(transport, config)?),
        BackendKind::SysEx => Box::new(SysExEngine::new(transport, config)?),
    };
    Ok(engine)
}

struct Running {
    worker: Worker,
    space: Receiver<()>,
}

/// Lifecycle, queueing and timing shared by every backend.
///
/// The host is the only producer on the queue and the worker the only consumer.
pub(crate) struct Host {
    time_base: TimeBase,
    /// Taken only when the host is shut down, so the ring can be reclaimed.
    producer: Option<ringbuf::Producer<TimedMidiEvent>>,
    idle: Option<WorkerParts>,
    running: Option<Running>,
    terminated: Option<String>,
    interrupter: Interrupter,
    observer: Arc<dyn EngineObserver>,
    /// Must outlive both halves of the ring.
    collector: Collector,
}

impl Host {
    pub fn new(transport: Box<dyn Transport>, config: &EngineConfig) -> Result<Self> {
        let time_base = TimeBase::new(config.microseconds_per_quarter_note)?;
        if config.queue_capacity == 0 {
            return Err(EngineError::invalid("queue capacity", 0u32));
        }

        let collector = Collector::new();
        let (producer, consumer) = ringbuf::RingBuffer::new(config.queue_capacity).split(&collector.handle());

        Ok(Self {
            time_base,
            producer: Some(producer),
            idle: Some(WorkerParts { consumer, transport }),
            running: None,
            terminated: None,
            interrupter: Interrupter::new(),
            observer: Arc::new(LoggingObserver),
            collector,
        })
    }

    pub fn set_observer(&mut self, observer: Arc<dyn EngineObserver>) {
        self.observer = observer;
    }

    pub fn state(&self) -> EngineState {
        if self.running.is_some() {
            EngineState::Running
        } else {
            EngineState::Stopped
        }
    }

    pub fn interrupter(&self) -> Interrupter {
        self.interrupter.clone()
    }

    pub fn set_tempo(&mut self, microseconds_per_quarter_note: u32) -> Result<()> {
        self.time_base = TimeBase::new(microseconds_per_quarter_note)?;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(EngineError::AlreadyStarted);
        }
        let parts = self.idle.take().ok_or_else(|| self.terminated_error())?;

        let (notify, space) = mpsc::sync_channel(1);
        let worker = Worker::spawn(parts, notify, self.observer.clone()).map_err(|err| {
            let reason = format!("could not spawn worker: {}", err);
            self.terminated = Some(reason.clone());
            EngineError::BackendUnavailable(reason)
        })?;

        self.running = Some(Running { worker, space });
        tracing::debug!("engine started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        // Only an interrupt raised while joining is reported, not one left over from `delay`.
        let interrupted_before = self.interrupter.is_interrupted();

        // The join always runs to completion; an interrupt only changes the reported result.
        let joined = running.worker.stop();

        match joined {
            Ok(parts) => self.idle = Some(parts),
            Err(err) => {
                self.terminated = Some(match &err {
                    EngineError::WorkerTerminated(reason) => reason.clone(),
                    other => other.to_string(),
                });
                return Err(err);
            }
        }
        tracing::debug!("engine stopped");

        if interrupted_before {
            return Ok(());
        }
        self.interrupter.check()
    }

    pub fn ensure_running(&self) -> Result<()> {
        let running = self.running.as_ref().ok_or(EngineError::NotStarted)?;
        if running.worker.is_finished() {
            return Err(EngineError::WorkerTerminated("worker exited".into()));
        }
        Ok(())
    }

    pub fn delay(&mut self, ticks: u32) -> Result<()> {
        self.ensure_running()?;
        self.interrupter.sleep(self.time_base.to_delay(ticks))
    }

    /// Queues events to be transmitted as soon as the worker sees them.
    pub fn send_now(&mut self, events: &[MidiEvent]) -> Result<()> {
        self.send(events.iter().copied().map(TimedMidiEvent::now))
    }

    /// Queues a batch of events. The batch is pushed as a whole before this returns, waiting
    /// for the worker to make space if the queue fills up.
    pub fn send(&mut self, events: impl IntoIterator<Item = TimedMidiEvent>) -> Result<()> {
        self.ensure_running()?;
        let (Some(running), Some(producer)) = (self.running.as_ref(), self.producer.as_mut()) else {
            return Err(EngineError::NotStarted);
        };

        for event in events {
            let mut event = event;
            while let Err(rejected) = producer.push(event) {
                event = rejected;
                running.worker.wake();
                match running.space.recv_timeout(SPACE_TIMEOUT) {
                    Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(EngineError::WorkerTerminated("worker exited".into()));
                    }
                }
                if running.worker.is_finished() {
                    return Err(EngineError::WorkerTerminated("worker exited".into()));
                }
            }
        }
        running.worker.wake();
        Ok(())
    }

    fn terminated_error(&self) -> EngineError {
        EngineError::WorkerTerminated(self.terminated.clone().unwrap_or_else(|| "transport lost".into()))
    }

    /// Stops the worker, drops both halves of the ring and reclaims it. The host cannot be
    /// started again afterwards.
    fn shutdown(&mut self) {
        if let Some(running) = self.running.take() {
            if let Err(err) = running.worker.stop() {
                tracing::warn!(%err, "worker failed during shutdown");
            }
        }
        self.producer = None;
        self.idle = None;
        self.collector.collect();
        if self.terminated.is_none() {
            self.terminated = Some("engine shut down".into());
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.shutdown();
    }
}
