use crate::error::{EngineError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation flag for a caller waiting in [`VocalEngine::delay`](crate::VocalEngine::delay)
/// or [`VocalEngine::stop`](crate::VocalEngine::stop).
///
/// Once set, the flag stays set until [`Interrupter::clear`] is called, so every wait that
/// observes it fails with [`EngineError::Interrupted`] rather than consuming it.
#[derive(Clone, Default)]
pub struct Interrupter {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Interrupter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn interrupt(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock() = true;
        condvar.notify_all();
    }

    pub fn is_interrupted(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Clears the flag, returning whether it was set.
    pub fn clear(&self) -> bool {
        std::mem::replace(&mut *self.inner.0.lock(), false)
    }

    /// Fails with `Interrupted` if the flag is set, leaving it set.
    pub fn check(&self) -> Result<()> {
        if self.is_interrupted() {
            return Err(EngineError::Interrupted);
        }
        Ok(())
    }

    /// Blocks for `duration` unless interrupted first.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        let (flag, condvar) = &*self.inner;
        let mut interrupted = flag.lock();
        while !*interrupted {
            if condvar.wait_until(&mut interrupted, deadline).timed_out() {
                break;
            }
        }
        if *interrupted {
            return Err(EngineError::Interrupted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn test_sleep_elapses() {
        let interrupter = Interrupter::new();
        let start = Instant::now();
        interrupter.sleep(Duration::from_millis(20)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_interrupted_before_sleep() {
        let interrupter = Interrupter::new();
        interrupter.interrupt();
        assert!(interrupter.sleep(Duration::ZERO).unwrap_err().is_interrupted());
        // The flag survives the failed wait.
        assert!(interrupter.is_interrupted());
        assert!(interrupter.clear());
        assert!(!interrupter.clear());
        interrupter.sleep(Duration::ZERO).unwrap();
    }

    #[test]
    fn test_interrupted_during_sleep() {
        let interrupter = Interrupter::new();
        let remote = interrupter.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.interrupt();
        });

        let start = Instant::now();
        let result = interrupter.sleep(Duration::from_secs(30));
        assert!(matches!(result, Err(EngineError::Interrupted)));
        assert!(start.elapsed() < Duration::from_secs(30));
        assert!(interrupter.is_interrupted());
        handle.join().unwrap();
    }
}
