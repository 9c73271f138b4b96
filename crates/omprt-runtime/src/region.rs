//! Parallel regions
//!
//! `parallel` forks a team, runs the body once per member and joins. The
//! join is the region's closing barrier: when it returns, every member's
//! writes are visible to the caller.
//!
//! A region started from inside another region's body runs on a team of
//! one, the calling thread alone.

use omprt_core::icv;
use omprt_core::{kdebug, Clause, Directive, OmpResult, Schedule};

use crate::config::ParallelConfig;
use crate::reduction::ReductionSet;
use crate::team;
use crate::thread::Thread;
use crate::tls;

/// Run `body` on a team sized by the ICV thread-count target
pub fn parallel<F>(body: F) -> OmpResult<()>
where
    F: Fn(&Thread<'_>) -> OmpResult<()> + Sync,
{
    parallel_with(&ParallelConfig::from_env(), body)
}

/// Run `body` on a team configured by `config`
///
/// Fails before any thread is spawned if the environment held an invalid
/// setting or the resolved team size is zero.
pub fn parallel_with<F>(config: &ParallelConfig, body: F) -> OmpResult<()>
where
    F: Fn(&Thread<'_>) -> OmpResult<()> + Sync,
{
    let icv = icv::global();
    icv.check()?;
    config.validate()?;

    let mut size = config.resolve_team_size(icv)?;
    if tls::in_team() {
        kdebug!("nested region serialized (requested {} threads)", size);
        size = 1;
    }
    team::run(config, size, body)
}

/// Combined `parallel for`
///
/// ```rust,ignore
/// let (_, sum) = parallel_for(1..=n)
///     .num_threads(4)
///     .schedule(Schedule::static_round_robin())
///     .reduction(Reduction::new(ReductionOp::Add, 0u64))
///     .run(|(_, acc), i| *acc += i)?;
/// assert_eq!(sum.into_inner(), n * (n + 1) / 2);
/// ```
pub fn parallel_for<I>(iterable: I) -> ParallelFor<I> {
    ParallelFor::new(iterable)
}

pub struct ParallelFor<I, R = ()> {
    iterable: I,
    config: ParallelConfig,
    schedule: Schedule,
    reductions: R,
    clauses: Vec<Clause>,
}

impl<I> ParallelFor<I, ()> {
    pub fn new(iterable: I) -> Self {
        Self {
            iterable,
            config: ParallelConfig::from_env(),
            schedule: Schedule::default(),
            reductions: (),
            clauses: Vec::new(),
        }
    }
}

impl<I, R> ParallelFor<I, R> {
    pub fn config(mut self, config: ParallelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn reduction<S: ReductionSet>(self, set: S) -> ParallelFor<I, (R, S)> {
        ParallelFor {
            iterable: self.iterable,
            config: self.config,
            schedule: self.schedule,
            reductions: (self.reductions, set),
            clauses: self.clauses,
        }
    }

    pub fn collapse<S: ReductionSet>(self, set: S) -> ParallelFor<I, (R, S)> {
        self.reduction(set)
    }

    /// Attach clause descriptors; `num_threads` and `schedule` configure the region
    pub fn clauses(mut self, clauses: &[Clause]) -> Self {
        for clause in clauses {
            match clause {
                Clause::NumThreads(n) => self.config.num_threads = Some(*n),
                Clause::Schedule(s) => self.schedule = *s,
                _ => {}
            }
        }
        self.clauses.extend_from_slice(clauses);
        self
    }
}

impl<I, R> ParallelFor<I, R>
where
    I: IntoIterator + Clone + Sync,
    I::IntoIter: Clone,
    R: ReductionSet,
{
    /// Fork, share the loop, combine, join; returns the accumulators
    pub fn run<F>(self, body: F) -> OmpResult<R>
    where
        F: Fn(&mut R::Private, I::Item) + Sync,
    {
        Directive::ParallelFor.validate(&self.clauses)?;
        let loop_clauses: Vec<Clause> = self
            .clauses
            .iter()
            .filter(|c| !matches!(c, Clause::NumThreads(_)))
            .cloned()
            .collect();

        let (iterable, schedule, reductions) = (&self.iterable, self.schedule, &self.reductions);
        parallel_with(&self.config, |th| {
            th.for_loop(iterable.clone())
                .schedule(schedule)
                .reduction(reductions)
                .clauses(&loop_clauses)
                .run(|(_, private), item| body(private, item))
        })?;
        Ok(self.reductions)
    }

    pub fn for_each<F>(self, body: F) -> OmpResult<R>
    where
        F: Fn(I::Item) + Sync,
    {
        self.run(|_, item| body(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduction::Reduction;
    use omprt_core::{ConfigError, ReductionOp, ScheduleKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_team_size_rejected() {
        let ran = AtomicUsize::new(0);
        let result = parallel_with(&ParallelConfig::new().num_threads(0), |_| {
            ran.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        assert_eq!(result, Err(ConfigError::ZeroTeamSize.into()));
        assert_eq!(ran.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_nested_region_is_team_of_one() {
        let inner_sizes = AtomicUsize::new(0);
        parallel_with(&ParallelConfig::new().num_threads(3), |_| {
            parallel_with(&ParallelConfig::new().num_threads(4), |inner| {
                assert_eq!(inner.thread_num(), 0);
                inner_sizes.fetch_add(inner.team_size(), Ordering::Relaxed);
                Ok(())
            })
        })
        .unwrap();
        assert_eq!(inner_sizes.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_parallel_for_returns_accumulators() {
        let (_, sum) = parallel_for(1..=100u64)
            .num_threads(4)
            .schedule(Schedule::new(ScheduleKind::Static, 8))
            .reduction(Reduction::new(ReductionOp::Add, 0u64))
            .run(|(_, acc), i| *acc += i)
            .unwrap();
        assert_eq!(sum.into_inner(), 5050);
    }

    #[test]
    fn test_parallel_for_over_slice() {
        let values: Vec<u64> = (1..=64).collect();
        let (_, sum) = parallel_for(values.as_slice())
            .num_threads(3)
            .schedule(Schedule::dynamic(5))
            .reduction(Reduction::new(ReductionOp::Add, 0u64))
            .run(|(_, acc), v| *acc += *v)
            .unwrap();
        assert_eq!(sum.into_inner(), 64 * 65 / 2);
    }

    #[test]
    fn test_parallel_for_clauses() {
        let visits = AtomicUsize::new(0);
        parallel_for(0..50)
            .clauses(&[Clause::NumThreads(2), Clause::Schedule(Schedule::dynamic(4))])
            .for_each(|_| {
                visits.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(visits.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn test_parallel_for_rejects_nowait() {
        let result = parallel_for(0..4).num_threads(1).clauses(&[Clause::NoWait]).for_each(|_| {});
        assert_eq!(
            result.map(|_| ()),
            Err(ConfigError::ClauseNotAllowed { clause: "nowait", directive: "parallel for" }.into())
        );
    }
}
