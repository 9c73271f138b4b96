//! Team lifecycle
//!
//! A `Team` is the set of OS threads executing one parallel region. The
//! calling thread becomes rank 0; ranks `1..size` are spawned as scoped
//! threads named `<prefix>-<team id>-<rank>` and joined before `run`
//! returns.
//!
//! Spawned members wait on a start gate until every member exists. If a
//! spawn fails the gate opens with "abort": the members already spawned
//! return without running the body and the region fails with
//! `ResourceError::SpawnFailed`.
//!
//! A member that panics or returns `Err` breaks the team. The barrier is
//! broken and every other member blocked in a team wait unwinds silently
//! with `TeamBroken`. The first breaking rank is remembered and its
//! failure is what the region reports.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use omprt_core::{kdebug, kerror, ktrace};
use omprt_core::{ConfigError, IcvView, OmpError, OmpResult, ResourceError, TeamLock};

use crate::barrier::{unwind_broken, Barrier, TeamBroken};
use crate::config::ParallelConfig;
use crate::parking::{PlatformParking, WordParking};
use crate::thread::Thread;
use crate::tls;

const GATE_CLOSED: u32 = 0;
const GATE_GO: u32 = 1;
const GATE_ABORT: u32 = 2;

/// No member has broken the team
const NOT_BROKEN: usize = usize::MAX;

/// No single has been won yet
const NO_WINNER: usize = usize::MAX;

static NEXT_TEAM_ID: AtomicUsize = AtomicUsize::new(0);

/// Key of a team-shared value created by the first member to reach a construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SharedKey {
    /// Work queue of the n-th scheduled loop in the region
    WorkQueue(u64),
}

/// Election state of `single` constructs
///
/// Every member numbers its singles 0, 1, 2, ... in encounter order.
/// `claimed` is one past the highest number already handed out, so a
/// member arriving with a lower number knows another rank won it. Bodies
/// of different instances may run at the same time.
struct SingleSlot {
    claimed: AtomicU64,
    /// Rank that won the most recent election
    winner: AtomicUsize,
}

/// Team state guarded by the team lock
#[derive(Default)]
struct TeamShared {
    shared_vars: HashMap<SharedKey, Arc<dyn Any + Send + Sync>>,
}

/// What one member's run of the body came to
enum Outcome {
    Done,
    /// Never ran the body: a spawn failed before the gate opened
    Aborted,
    /// Unwound because another member broke the team
    Released,
    Failed(OmpError),
    Panicked,
}

pub struct Team {
    id: usize,
    size: usize,
    barrier: Barrier,
    critical: TeamLock<()>,
    single: SingleSlot,
    state: TeamLock<TeamShared>,
    gate: AtomicU32,
    gate_parking: PlatformParking,
    origin: AtomicUsize,
}

impl Team {
    fn new(size: usize) -> Self {
        Self {
            id: NEXT_TEAM_ID.fetch_add(1, Ordering::Relaxed),
            size,
            barrier: Barrier::new(size),
            critical: TeamLock::new(()),
            single: SingleSlot {
                claimed: AtomicU64::new(0),
                winner: AtomicUsize::new(NO_WINNER),
            },
            state: TeamLock::new(TeamShared::default()),
            gate: AtomicU32::new(GATE_CLOSED),
            gate_parking: PlatformParking::new(),
            origin: AtomicUsize::new(NOT_BROKEN),
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_broken(&self) -> bool {
        self.origin.load(Ordering::Acquire) != NOT_BROKEN
    }

    /// Rank whose failure broke the team
    pub fn broken_by(&self) -> Option<usize> {
        match self.origin.load(Ordering::Acquire) {
            NOT_BROKEN => None,
            rank => Some(rank),
        }
    }

    pub(crate) fn barrier(&self) -> &Barrier {
        &self.barrier
    }

    pub(crate) fn critical_lock(&self) -> &TeamLock<()> {
        &self.critical
    }

    /// Unwind if another member broke the team
    #[inline]
    pub(crate) fn check_broken(&self) {
        if self.is_broken() {
            unwind_broken();
        }
    }

    fn break_team(&self, rank: usize) {
        if self
            .origin
            .compare_exchange(NOT_BROKEN, rank, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            kdebug!("team {} broken by rank {}", self.id, rank);
        }
        self.barrier.break_barrier();
    }

    // ── single election ──

    /// Try to win single number `seq`; false if another rank already did
    ///
    /// Never waits for the body of an earlier single to finish.
    pub(crate) fn claim_single(&self, rank: usize, seq: u64) -> bool {
        let mut claimed = self.single.claimed.load(Ordering::Acquire);
        loop {
            if claimed > seq {
                return false;
            }
            match self.single.claimed.compare_exchange_weak(
                claimed,
                seq + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.single.winner.store(rank, Ordering::Relaxed);
                    ktrace!("team {} rank {} won single {}", self.id, rank, seq);
                    return true;
                }
                Err(current) => claimed = current,
            }
        }
    }

    /// Rank that won the most recent single
    pub fn last_single_winner(&self) -> Option<usize> {
        match self.single.winner.load(Ordering::Relaxed) {
            NO_WINNER => None,
            rank => Some(rank),
        }
    }

    // ── team-shared values ──

    /// Value under `key`, created with `init` by the first caller
    ///
    /// Fails with `ConstructMismatch` if the stored value has another type,
    /// which means members reached different constructs at this point.
    pub(crate) fn shared_or_insert_with<T, F>(&self, key: SharedKey, init: F) -> OmpResult<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let value = {
            let mut state = self.state.lock()?;
            Arc::clone(
                state
                    .shared_vars
                    .entry(key)
                    .or_insert_with(|| Arc::new(init()) as Arc<dyn Any + Send + Sync>),
            )
        };
        value
            .downcast::<T>()
            .map_err(|_| OmpError::from(ConfigError::ConstructMismatch))
    }

    pub(crate) fn remove_shared(&self, key: SharedKey) -> OmpResult<()> {
        self.state.lock()?.shared_vars.remove(&key);
        Ok(())
    }

    #[cfg(test)]
    fn shared_count(&self) -> usize {
        self.state.lock().map(|s| s.shared_vars.len()).unwrap_or(0)
    }

    // ── start gate ──

    fn open_gate(&self, value: u32) {
        self.gate.store(value, Ordering::SeqCst);
        self.gate_parking.wake_all(&self.gate);
    }

    /// Block until the gate opens; true means run the body
    fn wait_gate(&self) -> bool {
        loop {
            match self.gate.load(Ordering::Acquire) {
                GATE_GO => return true,
                GATE_ABORT => return false,
                _ => self.gate_parking.wait(&self.gate, GATE_CLOSED, None),
            }
        }
    }

    // ── members ──

    fn thread_name(&self, prefix: &str, rank: usize) -> String {
        format!("{}-{}-{}", prefix, self.id, rank)
    }

    fn member<F>(&self, rank: usize, body: &F) -> Outcome
    where
        F: Fn(&Thread<'_>) -> OmpResult<()> + Sync,
    {
        if rank != 0 && !self.wait_gate() {
            return Outcome::Aborted;
        }

        let _view = tls::enter(IcvView {
            thread_num: rank,
            team_size: self.size,
        });
        let thread = Thread::new(self, rank);

        match panic::catch_unwind(AssertUnwindSafe(|| body(&thread))) {
            Ok(Ok(())) => Outcome::Done,
            Ok(Err(e)) => {
                kdebug!("team {} rank {} failed: {}", self.id, rank, e);
                self.break_team(rank);
                Outcome::Failed(e)
            }
            Err(payload) if payload.is::<TeamBroken>() => Outcome::Released,
            Err(payload) => {
                kerror!(
                    "team {} rank {} panicked: {}",
                    self.id,
                    rank,
                    panic_message(payload.as_ref())
                );
                self.break_team(rank);
                Outcome::Panicked
            }
        }
    }

    /// Region result from every member's outcome
    fn conclude(&self, mut outcomes: Vec<Outcome>) -> OmpResult<()> {
        let origin = match self.broken_by() {
            None => return Ok(()),
            Some(rank) => rank,
        };
        match outcomes.swap_remove(origin) {
            Outcome::Failed(e) => Err(e),
            _ => Err(ResourceError::ThreadPanicked { rank: origin }.into()),
        }
    }
}

impl std::fmt::Debug for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Team")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("broken_by", &self.broken_by())
            .field("last_single_winner", &self.last_single_winner())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

/// Run `body` on a fresh team of `size` threads and join it
///
/// `size` must be at least one; the caller validates it.
pub(crate) fn run<F>(config: &ParallelConfig, size: usize, body: F) -> OmpResult<()>
where
    F: Fn(&Thread<'_>) -> OmpResult<()> + Sync,
{
    let team = Team::new(size.max(1));
    kdebug!("team {} starting with {} threads", team.id, team.size);

    let outcomes = thread::scope(|s| -> OmpResult<Vec<Outcome>> {
        let (team, body) = (&team, &body);
        let mut handles = Vec::with_capacity(team.size - 1);

        for rank in 1..team.size {
            let mut builder = thread::Builder::new().name(team.thread_name(&config.name_prefix, rank));
            if let Some(stack) = config.stack_size {
                builder = builder.stack_size(stack);
            }
            match builder.spawn_scoped(s, move || team.member(rank, body)) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    kerror!("team {}: failed to spawn rank {}: {}", team.id, rank, e);
                    team.open_gate(GATE_ABORT);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(ResourceError::SpawnFailed {
                        rank,
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        }

        team.open_gate(GATE_GO);
        let mut outcomes = Vec::with_capacity(team.size);
        outcomes.push(team.member(0, body));

        for (i, handle) in handles.into_iter().enumerate() {
            let outcome = handle.join().unwrap_or_else(|_| {
                // Escaped the member's own catch_unwind
                team.break_team(i + 1);
                Outcome::Panicked
            });
            outcomes.push(outcome);
        }
        Ok(outcomes)
    })?;

    let result = team.conclude(outcomes);
    kdebug!("team {} joined: {:?}", team.id, result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn run_sized<F>(size: usize, body: F) -> OmpResult<()>
    where
        F: Fn(&Thread<'_>) -> OmpResult<()> + Sync,
    {
        run(&ParallelConfig::new(), size, body)
    }

    #[test]
    fn test_every_rank_runs_once() {
        let seen: Vec<AtomicUsize> = (0..5).map(|_| AtomicUsize::new(0)).collect();
        run_sized(5, |th| {
            assert_eq!(th.team_size(), 5);
            seen[th.thread_num()].fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
        for slot in &seen {
            assert_eq!(slot.load(Ordering::Relaxed), 1);
        }
    }

    #[test]
    fn test_master_runs_on_calling_thread() {
        let caller = thread::current().id();
        run_sized(3, |th| {
            if th.thread_num() == 0 {
                assert_eq!(thread::current().id(), caller);
            } else {
                assert_ne!(thread::current().id(), caller);
            }
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_member_thread_names() {
        let config = ParallelConfig::new().name_prefix("omptest");
        run(&config, 2, |th| {
            if th.thread_num() == 1 {
                let name = thread::current().name().map(str::to_string).unwrap_or_default();
                assert!(name.starts_with("omptest-"));
                assert!(name.ends_with("-1"));
            }
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_error_from_one_rank_is_reported() {
        let result = run_sized(4, |th| {
            if th.thread_num() == 2 {
                return Err(ConfigError::InvalidChunk.into());
            }
            th.barrier();
            Ok(())
        });
        assert_eq!(result, Err(ConfigError::InvalidChunk.into()));
    }

    #[test]
    fn test_panic_breaks_team() {
        let result = run_sized(3, |th| {
            if th.thread_num() == 1 {
                panic!("rank 1 gives up");
            }
            // Would deadlock without the broken barrier
            th.barrier();
            Ok(())
        });
        assert_eq!(result, Err(ResourceError::ThreadPanicked { rank: 1 }.into()));
    }

    #[test]
    fn test_single_claim_sequence() {
        let team = Team::new(2);
        assert_eq!(team.last_single_winner(), None);
        assert!(team.claim_single(0, 0));
        assert!(!team.claim_single(1, 0));
        assert!(team.claim_single(1, 1));
        assert!(!team.claim_single(0, 1));
        assert_eq!(team.last_single_winner(), Some(1));
    }

    #[test]
    fn test_later_single_claimable_while_earlier_runs() {
        let team = Team::new(3);
        // Rank 0 still inside single 0; rank 1 moves on to single 1
        assert!(team.claim_single(0, 0));
        assert!(team.claim_single(1, 1));
        // A late member skips both
        assert!(!team.claim_single(2, 0));
        assert!(!team.claim_single(2, 1));
        assert!(team.claim_single(2, 2));
    }

    #[test]
    fn test_shared_value_type_mismatch() {
        let team = Team::new(1);
        let key = SharedKey::WorkQueue(0);
        let a = team.shared_or_insert_with(key, || 7u32).unwrap();
        let b = team.shared_or_insert_with(key, || 9u32).unwrap();
        assert_eq!((*a, *b), (7, 7));
        assert_eq!(
            team.shared_or_insert_with(key, || "text").unwrap_err(),
            ConfigError::ConstructMismatch.into()
        );
        team.remove_shared(key).unwrap();
        assert_eq!(team.shared_count(), 0);
    }

    fn region_body<F>(f: F) -> F
    where
        F: Fn(&Thread<'_>) -> OmpResult<()> + Sync,
    {
        f
    }

    #[test]
    fn test_aborted_gate_skips_body() {
        let team = Team::new(2);
        let ran = AtomicUsize::new(0);
        let body = region_body(|_| {
            ran.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        thread::scope(|s| {
            let member = s.spawn(|| team.member(1, &body));
            team.open_gate(GATE_ABORT);
            assert!(matches!(member.join().unwrap(), Outcome::Aborted));
        });
        assert_eq!(ran.load(Ordering::Relaxed), 0);
    }
}
