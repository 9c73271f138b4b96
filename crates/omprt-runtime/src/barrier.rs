//! Cyclic team barrier
//!
//! Generation-counting barrier. Each arrival increments `arrived`; the last
//! one resets it and bumps `generation`, which releases everyone parked on
//! the old generation. The reset happens before the bump, so a thread that
//! races ahead into the next barrier always counts from zero.
//!
//! Memory ordering: every arrival is an AcqRel RMW on `arrived`, so the
//! last arriver acquires all earlier arrivals' writes and publishes them
//! with the generation bump. Writes made before `wait()` are visible to all
//! team members after it returns.
//!
//! A barrier can be broken when a team member fails. Waiters then unwind
//! instead of waiting for an arrival that will never come.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::parking::{PlatformParking, WordParking};

/// Spins before parking on the generation word
const SPIN_LIMIT: u32 = 100;

/// Payload of the unwind that releases waiters of a broken team
///
/// Raised with `resume_unwind`, so the panic hook does not print it.
#[derive(Debug)]
pub struct TeamBroken;

/// Unwind out of a wait loop on a broken team
pub(crate) fn unwind_broken() -> ! {
    std::panic::resume_unwind(Box::new(TeamBroken))
}

/// Result of `Barrier::wait`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    leader: bool,
}

impl BarrierWaitResult {
    /// True for exactly one thread per generation: the last to arrive
    pub fn is_leader(&self) -> bool {
        self.leader
    }
}

pub struct Barrier {
    size: u32,
    arrived: AtomicU32,
    generation: AtomicU32,
    broken: AtomicBool,
    parking: PlatformParking,
}

impl Barrier {
    /// Barrier for `size` threads; `size` of zero is treated as one
    pub fn new(size: usize) -> Self {
        Self {
            size: size.clamp(1, u32::MAX as usize) as u32,
            arrived: AtomicU32::new(0),
            generation: AtomicU32::new(0),
            broken: AtomicBool::new(false),
            parking: PlatformParking::new(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Completed generations so far
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// Block until all `size` threads have called `wait`
    ///
    /// Unwinds with `TeamBroken` if the barrier is broken while waiting.
    pub fn wait(&self) -> BarrierWaitResult {
        // Generation first: a break after this load still bumps it
        let gen = self.generation.load(Ordering::Acquire);
        if self.is_broken() {
            unwind_broken();
        }
        if self.size == 1 {
            return BarrierWaitResult { leader: true };
        }

        if self.arrived.fetch_add(1, Ordering::AcqRel) + 1 == self.size {
            self.arrived.store(0, Ordering::Relaxed);
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.parking.wake_all(&self.generation);
            return BarrierWaitResult { leader: true };
        }
        self.wait_past(gen)
    }

    /// Wait for the generation to move past `gen`
    fn wait_past(&self, gen: u32) -> BarrierWaitResult {
        let mut spins = 0u32;
        loop {
            if self.is_broken() {
                unwind_broken();
            }
            if self.generation.load(Ordering::Acquire) != gen {
                return BarrierWaitResult { leader: false };
            }
            if spins < SPIN_LIMIT {
                spins += 1;
                core::hint::spin_loop();
            } else {
                self.parking.wait(&self.generation, gen, None);
            }
        }
    }

    /// Release every waiter; current and future `wait` calls unwind
    pub fn break_barrier(&self) {
        self.broken.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.parking.wake_all(&self.generation);
    }
}

impl std::fmt::Debug for Barrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Barrier")
            .field("size", &self.size)
            .field("arrived", &self.arrived.load(Ordering::Relaxed))
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("broken", &self.is_broken())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_single_thread_barrier_is_trivial() {
        let barrier = Barrier::new(1);
        for _ in 0..3 {
            assert!(barrier.wait().is_leader());
        }
    }

    #[test]
    fn test_one_leader_per_generation() {
        let barrier = Barrier::new(4);
        let leaders = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..50 {
                        if barrier.wait().is_leader() {
                            leaders.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(leaders.load(Ordering::Relaxed), 50);
        assert_eq!(barrier.generation(), 50);
    }

    #[test]
    fn test_no_thread_leaves_before_all_arrive() {
        const THREADS: usize = 6;
        const ROUNDS: usize = 100;
        let barrier = Barrier::new(THREADS);
        let arrived = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for round in 0..ROUNDS {
                        arrived.fetch_add(1, Ordering::SeqCst);
                        barrier.wait();
                        // Everyone from this round has arrived
                        assert!(arrived.load(Ordering::SeqCst) >= (round + 1) * THREADS);
                        barrier.wait();
                    }
                });
            }
        });
        assert_eq!(arrived.load(Ordering::SeqCst), THREADS * ROUNDS);
    }

    #[test]
    fn test_writes_visible_after_barrier() {
        const THREADS: usize = 4;
        let barrier = Barrier::new(THREADS);
        let slots: Vec<AtomicUsize> = (0..THREADS).map(|_| AtomicUsize::new(0)).collect();

        thread::scope(|s| {
            for rank in 0..THREADS {
                let (barrier, slots) = (&barrier, &slots);
                s.spawn(move || {
                    slots[rank].store(rank + 1, Ordering::Relaxed);
                    barrier.wait();
                    for (other, slot) in slots.iter().enumerate() {
                        assert_eq!(slot.load(Ordering::Relaxed), other + 1);
                    }
                });
            }
        });
    }

    #[test]
    fn test_broken_barrier_releases_waiters() {
        let barrier = Barrier::new(3);
        thread::scope(|s| {
            let waiters: Vec<_> = (0..2)
                .map(|_| s.spawn(|| barrier.wait()))
                .collect();
            thread::sleep(std::time::Duration::from_millis(20));
            barrier.break_barrier();
            for w in waiters {
                let err = w.join().unwrap_err();
                assert!(err.downcast_ref::<TeamBroken>().is_some());
            }
        });
        assert!(barrier.is_broken());
    }

    #[test]
    fn test_wait_after_break_never_parks() {
        // Generation observed after the break already bumped it
        let barrier = Barrier::new(3);
        barrier.break_barrier();
        let gen = barrier.generation();
        let err = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| barrier.wait_past(gen)))
            .unwrap_err();
        assert!(err.downcast_ref::<TeamBroken>().is_some());
    }

    #[test]
    fn test_break_racing_arrival_releases_waiter() {
        for round in 0..200u32 {
            let barrier = Barrier::new(2);
            thread::scope(|s| {
                let waiter = s.spawn(|| barrier.wait());
                for _ in 0..(round % 16) * 8 {
                    core::hint::spin_loop();
                }
                barrier.break_barrier();
                let err = waiter.join().unwrap_err();
                assert!(err.downcast_ref::<TeamBroken>().is_some());
            });
        }
    }
}
