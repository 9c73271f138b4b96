//! Work-sharing loop builder
//!
//! ```rust,ignore
//! let sum = Reduction::new(ReductionOp::Add, 0u64);
//! parallel(|th| {
//!     th.for_loop(0..n)
//!         .schedule(Schedule::dynamic(64))
//!         .reduction(&sum)
//!         .run(|(_, acc), i| *acc += i)
//! })?;
//! ```
//!
//! Each `reduction`/`collapse` call pairs the accumulators carried so far
//! with the new set, so the private copies arrive as `((), first)`,
//! `(((), first), second)` and so on. Pass a tuple to add several at once.
//!
//! A loop resolves its schedule, creates one private copy per accumulator,
//! runs the body over this member's share, folds the copies back inside
//! the critical section and, unless `nowait` was given, waits at a barrier.

use omprt_core::{Clause, ConfigError, Directive, OmpResult, ReductionOp, Schedule};

use crate::reduction::ReductionSet;
use crate::thread::Thread;

pub struct ForLoop<'a, 't, I, R = ()> {
    thread: &'a Thread<'t>,
    iterable: I,
    schedule: Schedule,
    nowait: bool,
    reductions: R,
    clauses: Vec<Clause>,
}

impl<'a, 't, I> ForLoop<'a, 't, I, ()> {
    pub(crate) fn new(thread: &'a Thread<'t>, iterable: I) -> Self {
        Self {
            thread,
            iterable,
            schedule: Schedule::default(),
            nowait: false,
            reductions: (),
            clauses: Vec::new(),
        }
    }
}

impl<'a, 't, I, R> ForLoop<'a, 't, I, R> {
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Skip the barrier at the end of the loop
    pub fn nowait(mut self) -> Self {
        self.nowait = true;
        self
    }

    /// Add accumulators combined with their reduction operator
    pub fn reduction<S: ReductionSet>(self, set: S) -> ForLoop<'a, 't, I, (R, S)> {
        ForLoop {
            thread: self.thread,
            iterable: self.iterable,
            schedule: self.schedule,
            nowait: self.nowait,
            reductions: (self.reductions, set),
            clauses: self.clauses,
        }
    }

    /// Add accumulators for collapsed nested loops
    ///
    /// The combine step is the same as for `reduction`; the distinction
    /// only matters for matching declared `collapse(op:var)` clauses.
    pub fn collapse<S: ReductionSet>(self, set: S) -> ForLoop<'a, 't, I, (R, S)> {
        self.reduction(set)
    }

    /// Attach clause descriptors
    ///
    /// `schedule` and `nowait` clauses configure the loop. Declared
    /// `reduction`/`collapse` clauses must each match a carried accumulator
    /// by operator and, for named accumulators, by variable name.
    pub fn clauses(mut self, clauses: &[Clause]) -> Self {
        for clause in clauses {
            match clause {
                Clause::Schedule(s) => self.schedule = *s,
                Clause::NoWait => self.nowait = true,
                _ => {}
            }
        }
        self.clauses.extend_from_slice(clauses);
        self
    }
}

impl<'a, 't, I, R> ForLoop<'a, 't, I, R>
where
    I: IntoIterator,
    I::IntoIter: Clone,
    R: ReductionSet,
{
    /// Run `body` with this member's private accumulators on each element
    pub fn run<F>(self, mut body: F) -> OmpResult<()>
    where
        F: FnMut(&mut R::Private, I::Item),
    {
        Directive::For.validate(&self.clauses)?;
        check_declared(&self.clauses, &self.reductions)?;
        self.reductions.check()?;

        let mut private = self.reductions.privates()?;
        for item in self.thread.schedule(self.schedule, self.iterable)? {
            body(&mut private, item);
        }

        let reductions = &self.reductions;
        self.thread.critical(|| reductions.combine(private))??;

        if !self.nowait {
            self.thread.barrier();
        }
        Ok(())
    }

    /// Run `body` on each element, ignoring accumulators
    pub fn for_each<F>(self, mut body: F) -> OmpResult<()>
    where
        F: FnMut(I::Item),
    {
        self.run(|_, item| body(item))
    }
}

/// Every declared reduction/collapse clause must name a carried accumulator
pub(crate) fn check_declared<R: ReductionSet>(clauses: &[Clause], set: &R) -> Result<(), ConfigError> {
    let mut carried: Vec<(Option<String>, ReductionOp)> = Vec::new();
    set.describe(&mut carried);

    for clause in clauses {
        let (var, op) = match clause {
            Clause::Reduction { var, op } | Clause::Collapse { var, op } => (var, *op),
            _ => continue,
        };
        let matched = carried.iter().any(|(name, carried_op)| {
            *carried_op == op && name.as_deref().map_or(true, |n| n == var)
        });
        if !matched {
            return Err(ConfigError::MalformedClause(clause.to_string()));
        }
    }
    Ok(())
}
