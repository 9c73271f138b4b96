//! # omprt-core
//!
//! Core types for the omprt fork-join runtime.
//!
//! This crate holds everything that does not need a running team:
//! descriptors the front-end hands to the runtime, the ICV store, the
//! error taxonomy and the small utilities every other crate uses.
//!
//! ## Modules
//!
//! - `schedule` - Schedule kinds, descriptors and resolution
//! - `op` - Reduction operators and the `Reducible` trait
//! - `clause` - Directive and clause descriptors
//! - `icv` - Internal control variables seeded from the environment
//! - `lock` - Team-wide spin-then-yield lock
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities
//! - `platform` - Processor count probe

pub mod schedule;
pub mod op;
pub mod clause;
pub mod icv;
pub mod lock;
pub mod error;
pub mod kprint;
pub mod env;
pub mod platform;

// Re-exports for convenience
pub use schedule::{Policy, ResolvedSchedule, Schedule, ScheduleKind};
pub use op::{Reducible, ReductionOp};
pub use clause::{Clause, Directive};
pub use icv::{IcvStore, IcvView};
pub use lock::{TeamLock, TeamLockGuard};
pub use error::{ConfigError, OmpError, OmpResult, ResourceError};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set, env_lookup, EnvValue};
pub use platform::num_procs;
