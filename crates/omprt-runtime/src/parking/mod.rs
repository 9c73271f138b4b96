//! Parking on a 32-bit word
//!
//! Team threads block on the value of an atomic word: a barrier's
//! generation counter, the team's start gate. A waiter sleeps only while
//! the word still holds the value it last saw, so a wake issued between
//! the check and the sleep is never lost.
//!
//! Platform-specific implementations use the most efficient primitive available.

use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Platform-specific parking on an external word
///
/// Writers must change the word with a `SeqCst` operation before calling
/// `wake_all`; the parked count and the word form a Dekker pair.
pub trait WordParking: Send + Sync {
    /// Block while `word == expected`, or until `timeout`
    ///
    /// May return spuriously. Callers re-check the word in a loop.
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>);

    /// Wake every thread parked on `word`
    ///
    /// The word must be changed before calling this.
    fn wake_all(&self, word: &AtomicU32);

    /// Number of currently parked threads (hint, may be stale)
    fn parked_count(&self) -> usize;
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexParking as PlatformParking;
    } else {
        mod fallback;
        pub use fallback::FallbackParking as PlatformParking;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_returns_when_word_differs() {
        let parking = PlatformParking::new();
        let word = AtomicU32::new(5);
        // Expected value is stale: must not block
        parking.wait(&word, 4, None);
    }

    #[test]
    fn test_wait_timeout() {
        let parking = PlatformParking::new();
        let word = AtomicU32::new(0);
        let start = std::time::Instant::now();
        parking.wait(&word, 0, Some(Duration::from_millis(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wake_all() {
        let parking = Arc::new(PlatformParking::new());
        let word = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let parking = Arc::clone(&parking);
                let word = Arc::clone(&word);
                thread::spawn(move || {
                    while word.load(Ordering::Acquire) == 0 {
                        parking.wait(&word, 0, None);
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        word.store(1, Ordering::SeqCst);
        parking.wake_all(&word);

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(parking.parked_count(), 0);
    }
}
