//! Per-member context
//!
//! Every team member receives a `Thread` for the duration of the region
//! body. Team constructs (barrier, critical, single, work-sharing loops)
//! are methods on it, so they can only be reached from inside a team.

use std::cell::Cell;

use omprt_core::icv::{self, IcvView};
use omprt_core::{OmpResult, Policy, Schedule};

use crate::schedule::{DynamicShare, Share, StaticShare, WorkQueue};
use crate::team::{SharedKey, Team};
use crate::workshare::ForLoop;

pub struct Thread<'t> {
    team: &'t Team,
    rank: usize,
    /// Number of the next `single` this member encounters
    single_seq: Cell<u64>,
    /// Number of the next scheduled loop this member encounters
    loop_seq: Cell<u64>,
}

impl<'t> Thread<'t> {
    pub(crate) fn new(team: &'t Team, rank: usize) -> Self {
        Self {
            team,
            rank,
            single_seq: Cell::new(0),
            loop_seq: Cell::new(0),
        }
    }

    /// Rank within the team, `0..team_size()`
    #[inline]
    pub fn thread_num(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn team_size(&self) -> usize {
        self.team.size()
    }

    #[inline]
    pub fn is_master(&self) -> bool {
        self.rank == 0
    }

    #[inline]
    pub fn team(&self) -> &'t Team {
        self.team
    }

    pub fn view(&self) -> IcvView {
        IcvView {
            thread_num: self.rank,
            team_size: self.team.size(),
        }
    }

    /// Wait until every member of the team has arrived
    ///
    /// Writes made before the barrier are visible to every member after it.
    /// If another member fails while this one waits, the region body is
    /// unwound and the region reports that member's failure.
    pub fn barrier(&self) {
        self.team.barrier().wait();
    }

    /// Run `f` while no other member of the team is inside a critical section
    pub fn critical<R>(&self, f: impl FnOnce() -> R) -> OmpResult<R> {
        let _guard = self.team.critical_lock().lock()?;
        Ok(f())
    }

    /// Run `f` on exactly one member, then wait for the whole team
    ///
    /// Returns `Some` on the member that ran `f`.
    pub fn single<R>(&self, f: impl FnOnce() -> R) -> OmpResult<Option<R>> {
        let result = self.single_nowait(f)?;
        self.barrier();
        Ok(result)
    }

    /// Run `f` on exactly one member; the others continue immediately
    ///
    /// Later singles and dynamic loops do not wait for `f` either.
    pub fn single_nowait<R>(&self, f: impl FnOnce() -> R) -> OmpResult<Option<R>> {
        let seq = self.single_seq.get();
        self.single_seq.set(seq + 1);

        if !self.team.claim_single(self.rank, seq) {
            return Ok(None);
        }
        Ok(Some(f()))
    }

    /// Run `f` on rank 0 only; no synchronization
    pub fn master<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if self.is_master() {
            Some(f())
        } else {
            None
        }
    }

    /// This member's share of `iterable` under `schedule`
    ///
    /// Every member must call this with an equivalent iterable and the same
    /// schedule. `runtime` resolves against the process ICV run-schedule.
    /// Static shares are computed locally; dynamic-class shares pull
    /// position batches from a queue filled by one member, which counts
    /// the loop on a clone of its iterator.
    pub fn schedule<I>(&self, schedule: Schedule, iterable: I) -> OmpResult<Share<'t, I::IntoIter>>
    where
        I: IntoIterator,
        I::IntoIter: Clone,
    {
        let resolved = schedule.resolve(icv::global().run_schedule())?;
        let seq = self.loop_seq.get();
        self.loop_seq.set(seq + 1);
        let iter = iterable.into_iter();

        match resolved.policy {
            Policy::Static => Ok(Share::Static(StaticShare::new(
                iter,
                self.rank,
                self.team_size(),
                resolved.chunk,
            ))),
            Policy::Dynamic => {
                let key = SharedKey::WorkQueue(seq);
                let size = self.team_size();
                let queue = self.team.shared_or_insert_with(key, || WorkQueue::new(size))?;
                self.single_nowait(|| queue.populate(iter.clone().count(), resolved.chunk))?;
                Ok(Share::Dynamic(DynamicShare::new(self.team, key, queue, iter)))
            }
        }
    }

    /// Work-sharing loop over `iterable`; configure, then `run`
    pub fn for_loop<I>(&self, iterable: I) -> ForLoop<'_, 't, I> {
        ForLoop::new(self, iterable)
    }
}

impl std::fmt::Debug for Thread<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("team", &self.team.id())
            .field("rank", &self.rank)
            .field("team_size", &self.team.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{parallel_with, ParallelConfig};
    use omprt_core::Schedule;
    use std::cell::UnsafeCell;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn team_of(n: usize) -> ParallelConfig {
        ParallelConfig::new().num_threads(n)
    }

    struct Unsynced(UnsafeCell<u64>);
    unsafe impl Sync for Unsynced {}

    impl Unsynced {
        /// Plain read-modify-write; lost updates would show in the total
        fn bump(&self) {
            unsafe { *self.0.get() += 1 };
        }
    }

    #[test]
    fn test_critical_mutual_exclusion() {
        const ROUNDS: u64 = 2000;
        let counter = Unsynced(UnsafeCell::new(0));
        let inside = AtomicBool::new(false);

        parallel_with(&team_of(4), |th| {
            for _ in 0..ROUNDS {
                th.critical(|| {
                    assert!(!inside.swap(true, Ordering::Relaxed));
                    counter.bump();
                    inside.store(false, Ordering::Relaxed);
                })?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(counter.0.into_inner(), 4 * ROUNDS);
    }

    #[test]
    fn test_single_runs_once_per_encounter() {
        let runs = AtomicUsize::new(0);
        let after = AtomicUsize::new(0);

        parallel_with(&team_of(4), |th| {
            for round in 0..10 {
                th.single(|| runs.fetch_add(1, Ordering::SeqCst))?;
                // Barrier at the end of single: the body's effect is visible
                assert_eq!(runs.load(Ordering::SeqCst), round + 1);
                after.fetch_add(1, Ordering::SeqCst);
                th.barrier();
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 10);
        assert_eq!(after.load(Ordering::SeqCst), 40);
    }

    #[test]
    fn test_single_nowait_runs_once() {
        let runs = AtomicUsize::new(0);
        parallel_with(&team_of(3), |th| {
            for _ in 0..25 {
                th.single_nowait(|| runs.fetch_add(1, Ordering::SeqCst))?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn test_single_nowait_does_not_hold_back_team() {
        const THREADS: usize = 4;
        let passed = AtomicUsize::new(0);
        let saw_others = AtomicBool::new(false);
        let total = AtomicUsize::new(0);

        parallel_with(&team_of(THREADS), |th| {
            th.single_nowait(|| {
                // Stay inside until every other member got through the loop below
                let deadline = Instant::now() + Duration::from_secs(10);
                while passed.load(Ordering::SeqCst) < THREADS - 1 && Instant::now() < deadline {
                    std::thread::yield_now();
                }
                saw_others.store(passed.load(Ordering::SeqCst) == THREADS - 1, Ordering::SeqCst);
            })?;
            for i in th.schedule(Schedule::dynamic(1), 0..100)? {
                total.fetch_add(i, Ordering::Relaxed);
            }
            th.single_nowait(|| ())?;
            passed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        assert!(saw_others.load(Ordering::SeqCst));
        assert_eq!(total.load(Ordering::Relaxed), 4950);
    }

    #[test]
    fn test_barrier_synchrony() {
        const THREADS: usize = 4;
        let phase1 = AtomicUsize::new(0);

        parallel_with(&team_of(THREADS), |th| {
            phase1.fetch_add(1, Ordering::SeqCst);
            th.barrier();
            assert_eq!(phase1.load(Ordering::SeqCst), THREADS);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_master_only_rank_zero() {
        let ran_on = AtomicUsize::new(usize::MAX);
        parallel_with(&team_of(3), |th| {
            if let Some(rank) = th.master(|| th.thread_num()) {
                ran_on.store(rank, Ordering::SeqCst);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(ran_on.load(Ordering::SeqCst), 0);
    }
}
