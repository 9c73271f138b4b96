//! # omprt - OpenMP-style fork-join runtime
//!
//! Parallel regions, work-sharing loops and team synchronization on plain
//! OS threads, driven from ordinary Rust closures instead of directives.
//!
//! ## Features
//!
//! - **Teams**: scoped threads, so region bodies may borrow from the caller
//! - **Schedules**: static (block-cyclic), dynamic, guided, auto, runtime
//! - **Reductions**: `+ * & | ^ && ||` over integers, floats and bools
//! - **Synchronization**: barrier, critical, single, master
//! - **ICVs**: `OMP_NUM_THREADS`, `OMP_NUM_TEAMS`, `OMP_SCHEDULE`
//!
//! ## Quick Start
//!
//! ```ignore
//! use omprt::{parallel, Reduction, ReductionOp, Schedule};
//!
//! fn main() -> omprt::OmpResult<()> {
//!     let sum = Reduction::new(ReductionOp::Add, 0u64);
//!
//!     parallel(|th| {
//!         // Every member runs this closure
//!         th.single(|| println!("team of {}", th.team_size()))?;
//!
//!         // Iterations are shared out; partial sums combined at the end
//!         th.for_loop(1..1_000u64)
//!             .schedule(Schedule::dynamic(16))
//!             .reduction(&sum)
//!             .run(|(_, acc), i| *acc += i)?;
//!
//!         th.critical(|| println!("rank {} done", th.thread_num()))
//!     })?;
//!
//!     assert_eq!(sum.into_inner(), 999 * 1000 / 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │        parallel(), for_loop(), single(), critical()         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Team                                │
//! │    barrier, critical lock, single slot, shared values       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │  Rank 0   │      │  Rank 1   │      │  Rank N   │
//!    │ (caller)  │      │ omp-T-1   │      │ omp-T-N   │
//!    └───────────┘      └───────────┘      └───────────┘
//!          │                   │                   │
//!          └───────────────────┼───────────────────┘
//!                              ▼
//!    ┌─────────────────────────────────────────────────────────┐
//!    │        Static share  |  Shared work queue (SegQueue)    │
//!    └─────────────────────────────────────────────────────────┘
//! ```

// Re-export core types
pub use omprt_core::{
    Clause,
    ConfigError,
    Directive,
    IcvStore,
    IcvView,
    OmpError,
    OmpResult,
    Reducible,
    ReductionOp,
    ResourceError,
    Schedule,
    ScheduleKind,
};

// Re-export kprint macros for debug logging
pub use omprt_core::{kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use omprt_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use omprt_core::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set};

// Re-export runtime types
pub use omprt_runtime::{
    ForLoop,
    ParallelConfig,
    ParallelFor,
    Reduction,
    ReductionSet,
    Share,
    Team,
    Thread,
    parallel,
    parallel_for,
    parallel_with,
};

// Query and control functions
pub use omprt_runtime::api::{
    get_dynamic,
    get_max_teams,
    get_max_threads,
    get_num_procs,
    get_num_threads,
    get_schedule,
    get_thread_num,
    in_parallel,
    set_num_teams,
    set_num_threads,
    set_schedule,
};
