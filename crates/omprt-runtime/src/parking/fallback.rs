//! Fallback parking using std::sync::Condvar
//!
//! Used on platforms without futex support. The word is re-checked under
//! the mutex and `wake_all` takes the mutex before notifying, so a store
//! to the word followed by `wake_all` cannot slip between a waiter's check
//! and its sleep.

use super::WordParking;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub struct FallbackParking {
    mutex: Mutex<()>,
    condvar: Condvar,
    parked: AtomicUsize,
}

impl FallbackParking {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            parked: AtomicUsize::new(0),
        }
    }
}

impl Default for FallbackParking {
    fn default() -> Self {
        Self::new()
    }
}

impl WordParking for FallbackParking {
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) {
        self.parked.fetch_add(1, Ordering::SeqCst);
        {
            // The guarded data is (), so a poisoned mutex carries no broken state
            let guard = self.mutex.lock().unwrap_or_else(|e| e.into_inner());
            if word.load(Ordering::SeqCst) == expected {
                match timeout {
                    Some(t) => {
                        let _ = self.condvar.wait_timeout(guard, t);
                    }
                    None => {
                        let _ = self.condvar.wait(guard);
                    }
                }
            }
        }
        self.parked.fetch_sub(1, Ordering::SeqCst);
    }

    fn wake_all(&self, _word: &AtomicU32) {
        if self.parked.load(Ordering::SeqCst) == 0 {
            return;
        }
        drop(self.mutex.lock().unwrap_or_else(|e| e.into_inner()));
        self.condvar.notify_all();
    }

    fn parked_count(&self) -> usize {
        self.parked.load(Ordering::Relaxed)
    }
}
