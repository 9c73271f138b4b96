//! Loop work distribution
//!
//! - `static_share` - Block-cyclic assignment computed per rank
//! - `work_queue` - Shared queue for dynamic, guided and auto schedules

mod static_share;
mod work_queue;

pub use static_share::StaticShare;
pub use work_queue::{DynamicShare, WorkQueue};

/// One member's portion of a scheduled loop
pub enum Share<'t, I: Iterator> {
    Static(StaticShare<I>),
    Dynamic(DynamicShare<'t, I>),
}

impl<I: Iterator> Share<'_, I> {
    pub fn is_static(&self) -> bool {
        matches!(self, Share::Static(_))
    }
}

impl<I: Iterator> Iterator for Share<'_, I> {
    type Item = I::Item;

    #[inline]
    fn next(&mut self) -> Option<I::Item> {
        match self {
            Share::Static(s) => s.next(),
            Share::Dynamic(d) => d.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{parallel_with, ParallelConfig};
    use omprt_core::{Schedule, ScheduleKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run_partition(schedule: Schedule, threads: usize, len: usize) -> Vec<Vec<usize>> {
        let hits: Vec<AtomicUsize> = (0..len).map(|_| AtomicUsize::new(0)).collect();
        let owners: Vec<AtomicUsize> = (0..len).map(|_| AtomicUsize::new(usize::MAX)).collect();

        parallel_with(&ParallelConfig::new().num_threads(threads), |th| {
            for i in th.schedule(schedule, 0..len)? {
                hits[i].fetch_add(1, Ordering::Relaxed);
                owners[i].store(th.thread_num(), Ordering::Relaxed);
            }
            Ok(())
        })
        .unwrap();

        for (i, h) in hits.iter().enumerate() {
            assert_eq!(h.load(Ordering::Relaxed), 1, "element {} under {}", i, schedule);
        }
        let mut by_rank = vec![Vec::new(); threads];
        for (i, owner) in owners.iter().enumerate() {
            by_rank[owner.load(Ordering::Relaxed)].push(i);
        }
        by_rank
    }

    #[test]
    fn test_static_partition_by_rank() {
        let by_rank = run_partition(Schedule::static_round_robin(), 3, 10);
        assert_eq!(by_rank[0], vec![0, 3, 6, 9]);
        assert_eq!(by_rank[1], vec![1, 4, 7]);
        assert_eq!(by_rank[2], vec![2, 5, 8]);
    }

    #[test]
    fn test_static_chunked_partition() {
        let by_rank = run_partition(Schedule::new(ScheduleKind::Static, 2), 2, 9);
        assert_eq!(by_rank[0], vec![0, 1, 4, 5, 8]);
        assert_eq!(by_rank[1], vec![2, 3, 6, 7]);
    }

    #[test]
    fn test_dynamic_class_covers_everything_once() {
        for kind in [ScheduleKind::Dynamic, ScheduleKind::Guided, ScheduleKind::Auto] {
            for chunk in [1, 7] {
                run_partition(Schedule::new(kind, chunk), 4, 1000);
            }
        }
    }

    #[test]
    fn test_consecutive_dynamic_loops() {
        let total = AtomicUsize::new(0);
        parallel_with(&ParallelConfig::new().num_threads(3), |th| {
            for round in 0..20 {
                // nowait style: no barrier between loops
                for i in th.schedule(Schedule::dynamic(2), 0..round)? {
                    total.fetch_add(i, Ordering::Relaxed);
                }
            }
            Ok(())
        })
        .unwrap();
        let expected: usize = (0..20).map(|r: usize| (0..r).sum::<usize>()).sum();
        assert_eq!(total.load(Ordering::Relaxed), expected);
    }

    #[test]
    fn test_empty_loop() {
        for schedule in [Schedule::static_round_robin(), Schedule::dynamic(1)] {
            let by_rank = run_partition(schedule, 4, 0);
            assert!(by_rank.iter().all(Vec::is_empty));
        }
    }
}
