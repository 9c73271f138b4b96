//! Reduction operators
//!
//! `ReductionOp` is the operator symbol of a `reduction(op:var)` or
//! `collapse(op:var)` clause. `Reducible` gives each accumulator type its
//! identity element and combine step per operator. Combinations that make
//! no sense for a type (`&` on floats, `+` on bools) are rejected up front
//! with `ConfigError::UnsupportedOperator`.

use core::fmt;
use core::str::FromStr;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionOp {
    Add,
    Mul,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    /// Keep the shared value; private copies start from it
    Identity,
}

impl ReductionOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ReductionOp::Add => "+",
            ReductionOp::Mul => "*",
            ReductionOp::BitAnd => "&",
            ReductionOp::BitOr => "|",
            ReductionOp::BitXor => "^",
            ReductionOp::LogicalAnd => "&&",
            ReductionOp::LogicalOr => "||",
            ReductionOp::Identity => "identity",
        }
    }
}

impl fmt::Display for ReductionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ReductionOp {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(ReductionOp::Add),
            "*" => Ok(ReductionOp::Mul),
            "&" => Ok(ReductionOp::BitAnd),
            "|" => Ok(ReductionOp::BitOr),
            "^" => Ok(ReductionOp::BitXor),
            "&&" => Ok(ReductionOp::LogicalAnd),
            "||" => Ok(ReductionOp::LogicalOr),
            "identity" | "" => Ok(ReductionOp::Identity),
            other => Err(ConfigError::MalformedClause(format!("reduction operator '{}'", other))),
        }
    }
}

/// Accumulator types usable in reduction and collapse clauses
pub trait Reducible: Clone + Send {
    /// Type name for error messages
    const TYPE_NAME: &'static str;

    /// Initial value of a private copy
    ///
    /// `shared` is the accumulator's value when the loop starts; only the
    /// identity operator looks at it.
    fn identity(op: ReductionOp, shared: &Self) -> Result<Self, ConfigError>;

    /// `op(shared, private)`
    fn combine(op: ReductionOp, shared: Self, private: Self) -> Self;

    /// Fails if `op` is not defined for this type
    fn check(op: ReductionOp) -> Result<(), ConfigError>;
}

fn unsupported<T: Reducible>(op: ReductionOp) -> ConfigError {
    ConfigError::UnsupportedOperator { op: op.symbol(), ty: T::TYPE_NAME }
}

macro_rules! impl_reducible_int {
    ($($t:ty),* $(,)?) => {$(
        impl Reducible for $t {
            const TYPE_NAME: &'static str = stringify!($t);

            fn identity(op: ReductionOp, shared: &Self) -> Result<Self, ConfigError> {
                Ok(match op {
                    ReductionOp::Add | ReductionOp::BitOr | ReductionOp::BitXor => 0,
                    ReductionOp::Mul => 1,
                    ReductionOp::BitAnd => !0,
                    ReductionOp::LogicalAnd => 1,
                    ReductionOp::LogicalOr => 0,
                    ReductionOp::Identity => *shared,
                })
            }

            fn combine(op: ReductionOp, shared: Self, private: Self) -> Self {
                match op {
                    ReductionOp::Add => shared.wrapping_add(private),
                    ReductionOp::Mul => shared.wrapping_mul(private),
                    ReductionOp::BitAnd => shared & private,
                    ReductionOp::BitOr => shared | private,
                    ReductionOp::BitXor => shared ^ private,
                    ReductionOp::LogicalAnd => (shared != 0 && private != 0) as $t,
                    ReductionOp::LogicalOr => (shared != 0 || private != 0) as $t,
                    ReductionOp::Identity => shared,
                }
            }

            fn check(_op: ReductionOp) -> Result<(), ConfigError> {
                Ok(())
            }
        }
    )*};
}

impl_reducible_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

macro_rules! impl_reducible_float {
    ($($t:ty),* $(,)?) => {$(
        impl Reducible for $t {
            const TYPE_NAME: &'static str = stringify!($t);

            fn identity(op: ReductionOp, shared: &Self) -> Result<Self, ConfigError> {
                Self::check(op)?;
                Ok(match op {
                    ReductionOp::Mul | ReductionOp::LogicalAnd => 1.0,
                    ReductionOp::Identity => *shared,
                    _ => 0.0,
                })
            }

            fn combine(op: ReductionOp, shared: Self, private: Self) -> Self {
                match op {
                    ReductionOp::Add => shared + private,
                    ReductionOp::Mul => shared * private,
                    ReductionOp::LogicalAnd => (shared != 0.0 && private != 0.0) as u8 as $t,
                    ReductionOp::LogicalOr => (shared != 0.0 || private != 0.0) as u8 as $t,
                    _ => shared,
                }
            }

            fn check(op: ReductionOp) -> Result<(), ConfigError> {
                match op {
                    ReductionOp::BitAnd | ReductionOp::BitOr | ReductionOp::BitXor => {
                        Err(unsupported::<$t>(op))
                    }
                    _ => Ok(()),
                }
            }
        }
    )*};
}

impl_reducible_float!(f32, f64);

impl Reducible for bool {
    const TYPE_NAME: &'static str = "bool";

    fn identity(op: ReductionOp, shared: &Self) -> Result<Self, ConfigError> {
        Self::check(op)?;
        Ok(match op {
            ReductionOp::BitAnd | ReductionOp::LogicalAnd => true,
            ReductionOp::Identity => *shared,
            _ => false,
        })
    }

    fn combine(op: ReductionOp, shared: Self, private: Self) -> Self {
        match op {
            ReductionOp::BitAnd | ReductionOp::LogicalAnd => shared && private,
            ReductionOp::BitOr | ReductionOp::LogicalOr => shared || private,
            ReductionOp::BitXor => shared ^ private,
            _ => shared,
        }
    }

    fn check(op: ReductionOp) -> Result<(), ConfigError> {
        match op {
            ReductionOp::Add | ReductionOp::Mul => Err(unsupported::<bool>(op)),
            _ => Ok(()),
        }
    }
}
