use crate::error::EngineError;
use crate::midi::{MidiEvent, TimedMidiEvent};
use crate::observer::EngineObserver;
use crate::transport::{Transport, TransportError};
use ringbuf_basedrop as ringbuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest the worker sleeps when nothing is scheduled. Enqueueing wakes it earlier.
const IDLE_TIMEOUT: Duration = Duration::from_millis(10);

/// What the worker owns while running and hands back when it stops.
pub(crate) struct WorkerParts {
    pub consumer: ringbuf::Consumer<TimedMidiEvent>,
    pub transport: Box<dyn Transport>,
}

/// The background thread draining the queue into the transport.
pub(crate) struct Worker {
    handle: JoinHandle<Result<WorkerParts, TransportError>>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    pub fn spawn(
        parts: WorkerParts,
        notify: SyncSender<()>,
        observer: Arc<dyn EngineObserver>,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let handle = thread::Builder::new()
            .name("vocal-engine worker".into())
            .spawn(move || run(parts, &flag, &notify, observer.as_ref()))?;
        Ok(Self { handle, shutdown })
    }

    pub fn wake(&self) {
        self.handle.thread().unpark();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the worker to finish and waits until its thread has exited.
    pub fn stop(self) -> Result<WorkerParts, EngineError> {
        self.shutdown.store(true, Ordering::Release);
        self.wake();
        match self.handle.join() {
            Ok(Ok(parts)) => Ok(parts),
            Ok(Err(err)) => Err(EngineError::WorkerTerminated(err.to_string())),
            Err(_) => Err(EngineError::WorkerTerminated("worker panicked".into())),
        }
    }
}

fn run(
    mut parts: WorkerParts,
    shutdown: &AtomicBool,
    notify: &SyncSender<()>,
    observer: &dyn EngineObserver,
) -> Result<WorkerParts, TransportError> {
    observer.worker_started(parts.transport.name());

    // Sorted by due time; equal times keep queue order.
    let mut pending: Vec<(Instant, MidiEvent)> = vec![];

    loop {
        // Read the flag before draining so everything queued ahead of `stop` is still sent.
        let stopping = shutdown.load(Ordering::Acquire);
        let now = Instant::now();

        while let Some(timed) = parts.consumer.pop() {
            let due = now + Duration::from_millis(timed.time as u64);
            let idx = pending.partition_point(|(at, _)| *at <= due);
            pending.insert(idx, (due, timed.event));
        }
        // A full channel already holds a signal the producer has not read yet.
        notify.try_send(()).ok();

        let due = if stopping {
            pending.len()
        } else {
            pending.partition_point(|(at, _)| *at <= now)
        };
        for (_, event) in pending.drain(..due) {
            if let Err(err) = parts.transport.send(&event.to_raw()) {
                observer.worker_failed(&err);
                return Err(err);
            }
            observer.transmitted(&event);
        }

        if stopping {
            break;
        }

        let timeout = pending
            .first()
            .map(|(at, _)| at.saturating_duration_since(now))
            .unwrap_or(IDLE_TIMEOUT)
            .min(IDLE_TIMEOUT);
        thread::park_timeout(timeout);
    }

    observer.worker_stopped(parts.transport.name());
    Ok(parts)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::note::Note;
    use crate::observer::LoggingObserver;
    use crate::transport::RecordingTransport;
    use basedrop::Collector;
    use std::sync::mpsc;

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn name(&self) -> &str {
            "failing"
        }

        fn send(&mut self, _message: &[u8]) -> Result<(), TransportError> {
            Err(TransportError::Closed)
        }
    }

    #[test]
    fn test_drains_on_stop_in_due_order() {
        let collector = Collector::new();
        let (mut producer, consumer) = ringbuf::RingBuffer::new(16).split(&collector.handle());
        let (transport, recording) = RecordingTransport::new();
        let (tx, _rx) = mpsc::sync_channel(1);

        let note = Note::middle_c();
        producer
            .push(TimedMidiEvent {
                time: 60_000,
                event: MidiEvent::note_off(note),
            })
            .unwrap();
        producer
            .push(TimedMidiEvent::now(MidiEvent::note_on(note, 100).unwrap()))
            .unwrap();

        let parts = WorkerParts {
            consumer,
            transport: Box::new(transport),
        };
        let worker = Worker::spawn(parts, tx, Arc::new(LoggingObserver)).unwrap();
        let parts = worker.stop().unwrap();

        assert_eq!(
            recording.events(),
            vec![MidiEvent::note_on(note, 100).unwrap(), MidiEvent::note_off(note)]
        );
        assert!(parts.consumer.is_empty());
    }

    #[test]
    fn test_send_failure_terminates() {
        let collector = Collector::new();
        let (mut producer, consumer) = ringbuf::RingBuffer::new(4).split(&collector.handle());
        let (tx, _rx) = mpsc::sync_channel(1);
        producer
            .push(TimedMidiEvent::now(MidiEvent::note_off(Note::middle_c())))
            .unwrap();

        let parts = WorkerParts {
            consumer,
            transport: Box::new(FailingTransport),
        };
        let worker = Worker::spawn(parts, tx, Arc::new(LoggingObserver)).unwrap();
        while !worker.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(matches!(worker.stop(), Err(EngineError::WorkerTerminated(_))));
    }
}
