//! Team-wide mutual exclusion
//!
//! A test-and-test-and-set lock that spins with backoff for a short while
//! and then yields the OS thread. Critical sections in fork-join code are
//! usually short, so spinning first avoids a syscall; yielding afterwards
//! keeps oversubscribed teams (more threads than cores) making progress.
//!
//! The lock poisons itself when a guard is dropped during a panic. Later
//! acquisitions fail with `ResourceError::LockPoisoned`.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::ResourceError;

/// Spins before the first `yield_now`
const SPINS_BEFORE_YIELD: u32 = 64;

/// Spin-then-yield lock guarding a value of type `T`
pub struct TeamLock<T> {
    locked: AtomicBool,
    poisoned: AtomicBool,
    data: UnsafeCell<T>,
}

// Safety: TeamLock hands out access to T to one thread at a time
unsafe impl<T: Send> Send for TeamLock<T> {}
unsafe impl<T: Send> Sync for TeamLock<T> {}

impl<T> TeamLock<T> {
    pub const fn new(value: T) -> Self {
        TeamLock {
            locked: AtomicBool::new(false),
            poisoned: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, spinning then yielding until it is free
    pub fn lock(&self) -> Result<TeamLockGuard<'_, T>, ResourceError> {
        let mut spins = 0u32;
        loop {
            if self.poisoned.load(Ordering::Acquire) {
                return Err(ResourceError::LockPoisoned);
            }
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(TeamLockGuard { lock: self });
            }
            while self.locked.load(Ordering::Relaxed) {
                if spins < SPINS_BEFORE_YIELD {
                    spins += 1;
                    for _ in 0..spins {
                        core::hint::spin_loop();
                    }
                } else {
                    std::thread::yield_now();
                }
            }
        }
    }

    /// Acquire without waiting
    pub fn try_lock(&self) -> Option<TeamLockGuard<'_, T>> {
        if self.poisoned.load(Ordering::Acquire) {
            return None;
        }
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| TeamLockGuard { lock: self })
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Relaxed)
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for TeamLock<T> {
    fn default() -> Self {
        TeamLock::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TeamLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.try_lock() {
            Some(guard) => f.debug_struct("TeamLock").field("data", &*guard).finish(),
            None => f.debug_struct("TeamLock").field("data", &"<locked>").finish(),
        }
    }
}

/// Releases the lock when dropped
pub struct TeamLockGuard<'a, T> {
    lock: &'a TeamLock<T>,
}

impl<'a, T> Deref for TeamLockGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: we hold the lock
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> DerefMut for TeamLockGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: we hold the lock
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T> Drop for TeamLockGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.lock.poisoned.store(true, Ordering::Release);
        }
        self.lock.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_basic() {
        let lock = TeamLock::new(0u32);
        *lock.lock().unwrap() = 42;
        assert_eq!(*lock.lock().unwrap(), 42);
    }

    #[test]
    fn test_try_lock_while_held() {
        let lock = TeamLock::new(());
        let guard = lock.try_lock();
        assert!(guard.is_some());
        assert!(lock.try_lock().is_none());
        assert!(lock.is_locked());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_no_lost_updates() {
        let lock = Arc::new(TeamLock::new(0u64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..2000 {
                        *lock.lock().unwrap() += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock().unwrap(), 16_000);
    }

    #[test]
    fn test_poisoned_by_panic() {
        let lock = Arc::new(TeamLock::new(0u32));
        let inner = Arc::clone(&lock);
        let result = thread::spawn(move || {
            let _guard = inner.lock().unwrap();
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        assert!(lock.is_poisoned());
        assert!(matches!(lock.lock(), Err(ResourceError::LockPoisoned)));
    }
}
