//! # omprt-runtime
//!
//! Fork-join runtime for the omprt crates.
//!
//! This crate provides:
//! - Team creation and joining on scoped OS threads
//! - Barrier, critical section and single election
//! - Static and queue-based loop scheduling
//! - Reduction and collapse accumulators
//! - Futex parking on Linux, Condvar elsewhere

pub mod config;
pub mod parking;
pub mod barrier;
pub mod tls;
pub mod team;
pub mod thread;
pub mod schedule;
pub mod reduction;
pub mod workshare;
pub mod region;
pub mod api;

// Re-exports
pub use config::ParallelConfig;
pub use barrier::{Barrier, BarrierWaitResult, TeamBroken};
pub use team::Team;
pub use thread::Thread;
pub use schedule::{DynamicShare, Share, StaticShare, WorkQueue};
pub use reduction::{Reduction, ReductionSet};
pub use workshare::ForLoop;
pub use region::{parallel, parallel_for, parallel_with, ParallelFor};
pub use api::{
    get_dynamic, get_max_teams, get_max_threads, get_num_procs, get_num_threads, get_schedule,
    get_thread_num, in_parallel, set_num_teams, set_num_threads, set_schedule,
};
