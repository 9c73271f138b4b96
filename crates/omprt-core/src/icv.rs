//! Internal control variables
//!
//! Process-wide defaults seeded once from the environment on first use:
//!
//! - `OMP_NUM_THREADS` - team size target (default: online processors).
//!   A list such as `4,2` is accepted; only the first level is used.
//! - `OMP_NUM_TEAMS` - team count target (default: 0)
//! - `OMP_SCHEDULE` - `kind` or `kind,chunk` (default: `dynamic,1`)
//!
//! A malformed value falls back to the default for the query functions and
//! is kept as `seed_error`; region entry reports it through `check()`.
//!
//! The store is shared by every thread. Writers and readers are not ordered
//! against each other beyond single-value atomicity, so configuration must
//! be set before the team that depends on it is spawned.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::env::{env_lookup, env_lookup_first, EnvValue};
use crate::error::ConfigError;
use crate::platform::num_procs;
use crate::schedule::{Schedule, ScheduleKind};
use crate::kwarn;

pub const OMP_NUM_THREADS: &str = "OMP_NUM_THREADS";
pub const OMP_NUM_TEAMS: &str = "OMP_NUM_TEAMS";
pub const OMP_SCHEDULE: &str = "OMP_SCHEDULE";

/// Library defaults used when the environment is silent
pub mod defaults {
    use crate::schedule::ScheduleKind;

    pub const NUM_TEAMS: usize = 0;
    pub const SCHEDULE_KIND: ScheduleKind = ScheduleKind::Dynamic;
    pub const SCHEDULE_CHUNK: usize = 1;
}

const CHUNK_BITS: u32 = 56;
const CHUNK_MASK: u64 = (1 << CHUNK_BITS) - 1;

fn pack_schedule(kind: ScheduleKind, chunk: usize) -> u64 {
    (kind.index() << CHUNK_BITS) | (chunk as u64).min(CHUNK_MASK)
}

fn unpack_schedule(word: u64) -> Schedule {
    Schedule::new(ScheduleKind::from_index(word >> CHUNK_BITS), (word & CHUNK_MASK) as usize)
}

/// Process-wide ICV defaults
#[derive(Debug)]
pub struct IcvStore {
    num_procs: usize,
    num_threads: AtomicUsize,
    num_teams: AtomicUsize,
    run_schedule: AtomicU64,
    seed_error: Option<ConfigError>,
}

impl IcvStore {
    /// Library defaults, no environment lookup
    pub fn with_defaults(num_procs: usize) -> Self {
        Self {
            num_procs,
            num_threads: AtomicUsize::new(num_procs),
            num_teams: AtomicUsize::new(defaults::NUM_TEAMS),
            run_schedule: AtomicU64::new(pack_schedule(
                defaults::SCHEDULE_KIND,
                defaults::SCHEDULE_CHUNK,
            )),
            seed_error: None,
        }
    }

    /// Defaults overridden by `OMP_NUM_THREADS`, `OMP_NUM_TEAMS`, `OMP_SCHEDULE`
    pub fn from_env() -> Self {
        let mut store = Self::with_defaults(num_procs());
        let mut errors = Vec::new();

        match env_lookup_first::<usize>(OMP_NUM_THREADS) {
            EnvValue::Unset => {}
            EnvValue::Parsed(n) if n > 0 => store.num_threads = AtomicUsize::new(n),
            EnvValue::Parsed(_) => errors.push(ConfigError::InvalidEnv {
                var: OMP_NUM_THREADS,
                value: "0".to_string(),
            }),
            EnvValue::Invalid(value) => {
                errors.push(ConfigError::InvalidEnv { var: OMP_NUM_THREADS, value })
            }
        }

        match env_lookup::<usize>(OMP_NUM_TEAMS) {
            EnvValue::Unset => {}
            EnvValue::Parsed(n) => store.num_teams = AtomicUsize::new(n),
            EnvValue::Invalid(value) => {
                errors.push(ConfigError::InvalidEnv { var: OMP_NUM_TEAMS, value })
            }
        }

        if let Ok(raw) = std::env::var(OMP_SCHEDULE) {
            match parse_run_schedule(&raw) {
                Ok(s) => {
                    let chunk = s.chunk.unwrap_or(defaults::SCHEDULE_CHUNK);
                    store.run_schedule = AtomicU64::new(pack_schedule(s.kind, chunk));
                }
                Err(e) => errors.push(e),
            }
        }

        for e in &errors {
            kwarn!("ignoring environment setting: {}", e);
        }
        store.seed_error = errors.into_iter().next();
        store
    }

    #[inline]
    pub fn num_procs(&self) -> usize {
        self.num_procs
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.num_threads.load(Ordering::Relaxed)
    }

    /// Team size used by the next region without an explicit size
    ///
    /// Zero is stored as given; it is rejected when a team is created.
    pub fn set_num_threads(&self, n: usize) {
        self.num_threads.store(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn num_teams(&self) -> usize {
        self.num_teams.load(Ordering::Relaxed)
    }

    pub fn set_num_teams(&self, n: usize) {
        self.num_teams.store(n, Ordering::Relaxed);
    }

    /// Schedule that `schedule(runtime)` loops resolve to; chunk always set
    #[inline]
    pub fn run_schedule(&self) -> Schedule {
        unpack_schedule(self.run_schedule.load(Ordering::Relaxed))
    }

    pub fn set_run_schedule(&self, kind: ScheduleKind, chunk: usize) -> Result<(), ConfigError> {
        if kind == ScheduleKind::Runtime {
            return Err(ConfigError::UnresolvedRuntimeSchedule);
        }
        if chunk == 0 {
            return Err(ConfigError::InvalidChunk);
        }
        self.run_schedule.store(pack_schedule(kind, chunk), Ordering::Relaxed);
        Ok(())
    }

    /// First problem found while reading the environment
    pub fn seed_error(&self) -> Option<&ConfigError> {
        self.seed_error.as_ref()
    }

    /// Fails with the seeding problem, if there was one
    pub fn check(&self) -> Result<(), ConfigError> {
        match &self.seed_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn parse_run_schedule(raw: &str) -> Result<Schedule, ConfigError> {
    let schedule: Schedule = raw.parse()?;
    if schedule.kind == ScheduleKind::Runtime {
        return Err(ConfigError::UnresolvedRuntimeSchedule);
    }
    Ok(schedule)
}

static ICV: OnceLock<IcvStore> = OnceLock::new();

/// The process-wide store, seeded from the environment on first call
pub fn global() -> &'static IcvStore {
    ICV.get_or_init(IcvStore::from_env)
}

/// Per-thread ICV values fixed when a team member starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcvView {
    pub thread_num: usize,
    pub team_size: usize,
}

impl IcvView {
    /// View of a thread that is not part of any team
    pub const fn initial() -> Self {
        IcvView { thread_num: 0, team_size: 1 }
    }
}

impl Default for IcvView {
    fn default() -> Self {
        Self::initial()
    }
}
