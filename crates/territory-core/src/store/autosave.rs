//! Background autosave for an [`AssignmentStore`] shared behind a mutex.
//!
//! The worker wakes every `tick`, lets the store write if its debounce
//! deadline has passed, and performs a final flush when the handle is
//! dropped.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::debug;

use crate::store::assignments::AssignmentStore;

struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Stops the autosave worker (after a final flush) when dropped.
pub struct AutosaveHandle {
    signal: Arc<StopSignal>,
    worker: Option<JoinHandle<()>>,
}

/// Start polling `store` every `tick` on a background thread.
pub fn spawn_autosave(store: Arc<Mutex<AssignmentStore>>, tick: Duration) -> AutosaveHandle {
    let signal = Arc::new(StopSignal {
        stopped: Mutex::new(false),
        wake: Condvar::new(),
    });
    let worker_signal = signal.clone();
    let worker = thread::spawn(move || {
        let mut stopped = worker_signal.stopped.lock();
        while !*stopped {
            worker_signal.wake.wait_for(&mut stopped, tick);
            if *stopped {
                break;
            }
            // Release the stop flag while touching the store so `stop` never
            // waits on a slow write.
            MutexGuard::unlocked(&mut stopped, || {
                if store.lock().poll_persist() {
                    debug!("Autosave wrote assignments");
                }
            });
        }
        drop(stopped);
        store.lock().flush();
    });
    AutosaveHandle {
        signal,
        worker: Some(worker),
    }
}

impl AutosaveHandle {
    /// Stop the worker and wait for its final flush.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ASSIGNMENTS_KEY;
    use crate::store::kv::{KvStore, MemoryKv};
    use std::time::Instant;

    #[test]
    fn worker_writes_after_debounce() {
        let kv = Arc::new(MemoryKv::new());
        let store = Arc::new(Mutex::new(AssignmentStore::load_with(
            kv.clone(),
            Duration::from_millis(5),
            10,
        )));
        let handle = spawn_autosave(store.clone(), Duration::from_millis(2));
        store.lock().set_one("CA", "Alice");

        let started = Instant::now();
        while store.lock().is_dirty() && started.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!store.lock().is_dirty());
        assert!(kv.get(ASSIGNMENTS_KEY).unwrap().is_some());
        handle.stop();
    }

    #[test]
    fn stopping_flushes_pending_changes() {
        let kv = Arc::new(MemoryKv::new());
        let store = Arc::new(Mutex::new(AssignmentStore::load_with(
            kv.clone(),
            Duration::from_secs(3600),
            10,
        )));
        let handle = spawn_autosave(store.clone(), Duration::from_secs(3600));
        store.lock().set_one("TX", "Bob");
        drop(handle);

        assert!(!store.lock().is_dirty());
        let raw = kv.get(ASSIGNMENTS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"TX\""));
    }
}
