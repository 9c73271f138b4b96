//! Loop schedule descriptors
//!
//! A `Schedule` is what a `schedule(kind[, chunk])` clause carries. Before a
//! loop runs it is resolved against the ICV run-schedule into a
//! `ResolvedSchedule`, which only distinguishes the two partitioning
//! policies the runtime actually implements.

use core::fmt;
use core::str::FromStr;

use crate::error::ConfigError;

/// Schedule kind named by a `schedule` clause or `OMP_SCHEDULE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    Static,
    Dynamic,
    Guided,
    Auto,
    Runtime,
}

impl ScheduleKind {
    pub const ALL: [ScheduleKind; 5] = [
        ScheduleKind::Static,
        ScheduleKind::Dynamic,
        ScheduleKind::Guided,
        ScheduleKind::Auto,
        ScheduleKind::Runtime,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScheduleKind::Static => "static",
            ScheduleKind::Dynamic => "dynamic",
            ScheduleKind::Guided => "guided",
            ScheduleKind::Auto => "auto",
            ScheduleKind::Runtime => "runtime",
        }
    }

    /// Kinds served from the shared work queue
    pub fn is_dynamic_class(&self) -> bool {
        matches!(
            self,
            ScheduleKind::Dynamic | ScheduleKind::Guided | ScheduleKind::Auto
        )
    }

    pub(crate) fn index(&self) -> u64 {
        match self {
            ScheduleKind::Static => 0,
            ScheduleKind::Dynamic => 1,
            ScheduleKind::Guided => 2,
            ScheduleKind::Auto => 3,
            ScheduleKind::Runtime => 4,
        }
    }

    pub(crate) fn from_index(i: u64) -> Self {
        match i {
            0 => ScheduleKind::Static,
            1 => ScheduleKind::Dynamic,
            2 => ScheduleKind::Guided,
            3 => ScheduleKind::Auto,
            _ => ScheduleKind::Runtime,
        }
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScheduleKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ScheduleKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownScheduleKind(wanted.to_string()))
    }
}

/// `(kind, chunk)` as written on a loop; `chunk: None` means "not given"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Schedule {
    pub kind: ScheduleKind,
    pub chunk: Option<usize>,
}

impl Schedule {
    /// Schedule with an explicit chunk
    pub const fn new(kind: ScheduleKind, chunk: usize) -> Self {
        Schedule { kind, chunk: Some(chunk) }
    }

    /// Schedule with the chunk left to the runtime
    pub const fn of(kind: ScheduleKind) -> Self {
        Schedule { kind, chunk: None }
    }

    pub const fn static_round_robin() -> Self {
        Schedule::of(ScheduleKind::Static)
    }

    pub const fn dynamic(chunk: usize) -> Self {
        Schedule::new(ScheduleKind::Dynamic, chunk)
    }

    pub const fn runtime() -> Self {
        Schedule::of(ScheduleKind::Runtime)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk == Some(0) {
            return Err(ConfigError::InvalidChunk);
        }
        Ok(())
    }

    /// Resolve `runtime` and the default chunk against the ICV run-schedule
    ///
    /// Static loops without an explicit chunk use chunk 1 (pure
    /// round-robin); dynamic-class loops inherit the ICV chunk.
    pub fn resolve(&self, run_schedule: Schedule) -> Result<ResolvedSchedule, ConfigError> {
        self.validate()?;
        let (kind, chunk) = if self.kind == ScheduleKind::Runtime {
            run_schedule.validate()?;
            (run_schedule.kind, self.chunk.or(run_schedule.chunk))
        } else {
            (self.kind, self.chunk)
        };

        let policy = match kind {
            ScheduleKind::Static => Policy::Static,
            ScheduleKind::Dynamic | ScheduleKind::Guided | ScheduleKind::Auto => Policy::Dynamic,
            ScheduleKind::Runtime => return Err(ConfigError::UnresolvedRuntimeSchedule),
        };
        let chunk = match policy {
            Policy::Static => chunk.unwrap_or(1),
            Policy::Dynamic => chunk.or(run_schedule.chunk).unwrap_or(1),
        };

        Ok(ResolvedSchedule { kind, policy, chunk })
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::runtime()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chunk {
            Some(chunk) => write!(f, "{},{}", self.kind, chunk),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Parses `OMP_SCHEDULE` syntax: `kind` or `kind,chunk`
impl FromStr for Schedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ',');
        let kind: ScheduleKind = parts.next().unwrap_or("").parse()?;
        let chunk = match parts.next() {
            Some(text) => {
                let chunk: usize = text
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::MalformedClause(s.trim().to_string()))?;
                Some(chunk)
            }
            None => None,
        };
        let schedule = Schedule { kind, chunk };
        schedule.validate()?;
        Ok(schedule)
    }
}

/// Partitioning policy a loop is executed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Deterministic block-cyclic assignment by rank
    Static,
    /// Shared FIFO queue; guided and auto map here as well
    Dynamic,
}

/// A schedule with `runtime` resolved and the chunk fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSchedule {
    /// Kind after `runtime` resolution, kept for diagnostics
    pub kind: ScheduleKind,
    pub policy: Policy,
    pub chunk: usize,
}
