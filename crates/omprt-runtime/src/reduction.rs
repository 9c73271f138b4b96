//! Reduction and collapse accumulators
//!
//! A `Reduction<T>` is the shared variable named in a `reduction(op:var)`
//! or `collapse(op:var)` clause. Inside a loop each member works on a
//! private copy that starts at the operator's identity; when the member's
//! share is done the copy is folded into the shared value under the team's
//! critical section.
//!
//! `ReductionSet` lets a loop carry any number of accumulators: a single
//! `Reduction`, a reference to one, or tuples of sets.

use omprt_core::{ConfigError, OmpResult, Reducible, ReductionOp, TeamLock};

pub struct Reduction<T> {
    name: Option<String>,
    op: ReductionOp,
    value: TeamLock<T>,
}

impl<T: Reducible> Reduction<T> {
    pub fn new(op: ReductionOp, init: T) -> Self {
        Self {
            name: None,
            op,
            value: TeamLock::new(init),
        }
    }

    /// Accumulator matched by name against declared clauses
    pub fn named(name: impl Into<String>, op: ReductionOp, init: T) -> Self {
        Self {
            name: Some(name.into()),
            op,
            value: TeamLock::new(init),
        }
    }

    #[inline]
    pub fn op(&self) -> ReductionOp {
        self.op
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Current shared value
    pub fn get(&self) -> OmpResult<T> {
        Ok(self.value.lock()?.clone())
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Starting value of a member's private copy
    pub fn private_copy(&self) -> OmpResult<T> {
        let shared = self.value.lock()?;
        Ok(T::identity(self.op, &shared)?)
    }

    /// Fold a private copy into the shared value
    pub fn combine(&self, private: T) -> OmpResult<()> {
        let mut shared = self.value.lock()?;
        let current = shared.clone();
        *shared = T::combine(self.op, current, private);
        Ok(())
    }
}

impl<T: Reducible + std::fmt::Debug> std::fmt::Debug for Reduction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reduction")
            .field("name", &self.name)
            .field("op", &self.op)
            .field("value", &self.value)
            .finish()
    }
}

/// Accumulators carried by one loop
pub trait ReductionSet: Sync {
    /// Private copies, one per accumulator
    type Private;

    /// Fails if an operator is not defined for its accumulator type
    fn check(&self) -> Result<(), ConfigError>;

    fn privates(&self) -> OmpResult<Self::Private>;

    fn combine(&self, private: Self::Private) -> OmpResult<()>;

    /// `(name, op)` of every accumulator, for matching declared clauses
    fn describe(&self, out: &mut Vec<(Option<String>, ReductionOp)>);
}

impl ReductionSet for () {
    type Private = ();

    fn check(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    fn privates(&self) -> OmpResult<()> {
        Ok(())
    }

    fn combine(&self, _private: ()) -> OmpResult<()> {
        Ok(())
    }

    fn describe(&self, _out: &mut Vec<(Option<String>, ReductionOp)>) {}
}

impl<T: Reducible> ReductionSet for Reduction<T> {
    type Private = T;

    fn check(&self) -> Result<(), ConfigError> {
        T::check(self.op)
    }

    fn privates(&self) -> OmpResult<T> {
        self.private_copy()
    }

    fn combine(&self, private: T) -> OmpResult<()> {
        Reduction::combine(self, private)
    }

    fn describe(&self, out: &mut Vec<(Option<String>, ReductionOp)>) {
        out.push((self.name.clone(), self.op));
    }
}

impl<R: ReductionSet + ?Sized> ReductionSet for &R {
    type Private = R::Private;

    fn check(&self) -> Result<(), ConfigError> {
        (**self).check()
    }

    fn privates(&self) -> OmpResult<R::Private> {
        (**self).privates()
    }

    fn combine(&self, private: R::Private) -> OmpResult<()> {
        (**self).combine(private)
    }

    fn describe(&self, out: &mut Vec<(Option<String>, ReductionOp)>) {
        (**self).describe(out)
    }
}

macro_rules! impl_reduction_set_tuple {
    ($(($($name:ident : $idx:tt),+)),+ $(,)?) => {$(
        impl<$($name: ReductionSet),+> ReductionSet for ($($name,)+) {
            type Private = ($($name::Private,)+);

            fn check(&self) -> Result<(), ConfigError> {
                $(self.$idx.check()?;)+
                Ok(())
            }

            fn privates(&self) -> OmpResult<Self::Private> {
                Ok(($(self.$idx.privates()?,)+))
            }

            fn combine(&self, private: Self::Private) -> OmpResult<()> {
                $(self.$idx.combine(private.$idx)?;)+
                Ok(())
            }

            fn describe(&self, out: &mut Vec<(Option<String>, ReductionOp)>) {
                $(self.$idx.describe(out);)+
            }
        }
    )+};
}

impl_reduction_set_tuple!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
);
