//! Linux futex-based parking
//!
//! `FUTEX_WAIT_PRIVATE` on the caller's word sleeps only if the word still
//! equals the expected value; the kernel performs that check atomically
//! with queueing the waiter. `FUTEX_WAKE_PRIVATE` with `i32::MAX` releases
//! every waiter on the word.

use super::WordParking;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

pub struct FutexParking {
    /// Count of parked threads (lets `wake_all` skip the syscall)
    parked: AtomicUsize,
}

impl FutexParking {
    pub fn new() -> Self {
        Self { parked: AtomicUsize::new(0) }
    }
}

impl Default for FutexParking {
    fn default() -> Self {
        Self::new()
    }
}

impl WordParking for FutexParking {
    fn wait(&self, word: &AtomicU32, expected: u32, timeout: Option<Duration>) {
        self.parked.fetch_add(1, Ordering::SeqCst);

        if word.load(Ordering::SeqCst) == expected {
            let timespec = timeout.map(|d| libc::timespec {
                tv_sec: d.as_secs() as libc::time_t,
                tv_nsec: d.subsec_nanos() as libc::c_long,
            });
            let timespec_ptr = match &timespec {
                Some(ts) => ts as *const libc::timespec,
                None => std::ptr::null(),
            };

            // Result is ignored: ETIMEDOUT, EAGAIN (word changed) and EINTR
            // all mean "re-check the word", same as a real wake.
            unsafe {
                libc::syscall(
                    libc::SYS_futex,
                    word.as_ptr(),
                    libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                    expected,
                    timespec_ptr,
                    std::ptr::null::<u32>(),
                    0u32,
                );
            }
        }

        self.parked.fetch_sub(1, Ordering::SeqCst);
    }

    fn wake_all(&self, word: &AtomicU32) {
        if self.parked.load(Ordering::SeqCst) == 0 {
            return;
        }
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                word.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                i32::MAX,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }

    fn parked_count(&self) -> usize {
        self.parked.load(Ordering::Relaxed)
    }
}
