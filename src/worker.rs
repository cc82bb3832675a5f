//! A ready-made dedicated worker thread for callers that want one of the
//! core's `tick`/`sweep` hooks driven on a schedule without writing their
//! own loop (spec §5: "Long-running tasks... run on dedicated worker
//! threads"; "Shutdown... synchronously joins worker threads").
//!
//! Owning a [`PeriodicWorker`] is optional: an application built on an
//! async runtime, or one that already has its own timer infrastructure,
//! can call [`crate::tp::TpManager::tick`]/[`crate::sd::SdServer::tick`]/
//! etc. directly instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Drives `on_tick` once per `interval` on a dedicated thread until
/// [`PeriodicWorker::stop`] is called or the worker is dropped.
pub struct PeriodicWorker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicWorker {
    /// Spawns the worker thread. `on_tick` is called with the current time
    /// once every `interval`, starting after the first sleep (no tick fires
    /// at spawn time).
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> PeriodicWorker
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                on_tick(Instant::now());
            }
        });
        PeriodicWorker {
            stop,
            handle: Some(handle),
        }
    }

    /// Signals the worker to stop and synchronously joins its thread (spec
    /// §5 shutdown sequence). A consuming `drop` of the worker does the
    /// same, so explicit calls are only needed to observe a panic in
    /// `on_tick` via the returned `thread::Result`.
    pub fn stop(mut self) -> thread::Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        match self.handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

impl Drop for PeriodicWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn ticks_at_least_once_and_stops_cleanly() {
        let count = Arc::new(Mutex::new(0u32));
        let counted = count.clone();
        let worker = PeriodicWorker::spawn(Duration::from_millis(5), move |_now| {
            *counted.lock() += 1;
        });

        thread::sleep(Duration::from_millis(40));
        worker.stop().unwrap();

        assert!(*count.lock() >= 1);
    }

    #[test]
    fn dropping_joins_the_thread() {
        let count = Arc::new(Mutex::new(0u32));
        let counted = count.clone();
        {
            let _worker = PeriodicWorker::spawn(Duration::from_millis(5), move |_now| {
                *counted.lock() += 1;
            });
            thread::sleep(Duration::from_millis(20));
        }
        let seen = *count.lock();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(seen, *count.lock(), "no further ticks after drop");
    }
}
