//! Free query and control functions
//!
//! Setters write the process-wide ICV store and affect regions started
//! afterwards. Per-thread queries read the calling OS thread's team view;
//! outside any region they answer for a team of one.

use omprt_core::icv;
use omprt_core::{OmpResult, ScheduleKind};

use crate::tls;

/// Online processors, probed once
pub fn get_num_procs() -> usize {
    icv::global().num_procs()
}

/// Team size for later regions without an explicit size
///
/// Zero is accepted here and rejected when the next region starts.
pub fn set_num_threads(n: usize) {
    icv::global().set_num_threads(n);
}

/// Team size a region started now would get
pub fn get_max_threads() -> usize {
    icv::global().num_threads()
}

pub fn set_num_teams(n: usize) {
    icv::global().set_num_teams(n);
}

pub fn get_max_teams() -> usize {
    icv::global().num_teams()
}

/// Rank of the calling thread in its team; 0 outside a region
pub fn get_thread_num() -> usize {
    tls::current_view().thread_num
}

/// Size of the calling thread's team; 1 outside a region
pub fn get_num_threads() -> usize {
    tls::current_view().team_size
}

/// Dynamic adjustment of team sizes is not supported
pub fn get_dynamic() -> bool {
    false
}

/// Schedule used by `schedule(runtime)` loops started later
pub fn set_schedule(kind: ScheduleKind, chunk: usize) -> OmpResult<()> {
    icv::global().set_run_schedule(kind, chunk)?;
    Ok(())
}

/// Current run-schedule as `(kind, chunk)`
pub fn get_schedule() -> (ScheduleKind, usize) {
    let schedule = icv::global().run_schedule();
    (schedule.kind, schedule.chunk.unwrap_or(icv::defaults::SCHEDULE_CHUNK))
}

/// Whether the calling thread is inside a parallel region
pub fn in_parallel() -> bool {
    tls::in_team()
}
