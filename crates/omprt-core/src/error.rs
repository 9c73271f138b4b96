//! Error types for the omprt runtime

use core::fmt;

/// Result type for runtime operations
pub type OmpResult<T> = Result<T, OmpError>;

/// Errors surfaced by parallel regions and work-sharing constructs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OmpError {
    /// The caller asked for something the runtime cannot be configured to do
    Configuration(ConfigError),

    /// An OS resource (thread, lock) could not be obtained
    Resource(ResourceError),
}

impl OmpError {
    /// True for the configuration class of errors
    pub fn is_configuration(&self) -> bool {
        matches!(self, OmpError::Configuration(_))
    }

    /// True for the resource class of errors
    pub fn is_resource(&self) -> bool {
        matches!(self, OmpError::Resource(_))
    }
}

impl fmt::Display for OmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmpError::Configuration(e) => write!(f, "configuration error: {}", e),
            OmpError::Resource(e) => write!(f, "resource error: {}", e),
        }
    }
}

impl std::error::Error for OmpError {}

/// Invalid team sizes, schedules and clause descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A team must have at least one thread
    ZeroTeamSize,

    /// Schedule kind name not in {static, dynamic, guided, auto, runtime}
    UnknownScheduleKind(String),

    /// Chunk size of zero
    InvalidChunk,

    /// `runtime` schedule whose ICV default is itself `runtime`
    UnresolvedRuntimeSchedule,

    /// Clause text or descriptor that could not be understood
    MalformedClause(String),

    /// Clause attached to a directive that does not accept it
    ClauseNotAllowed {
        clause: &'static str,
        directive: &'static str,
    },

    /// Reduction operator not defined for the accumulator type
    UnsupportedOperator {
        op: &'static str,
        ty: &'static str,
    },

    /// Team members disagree about the work-sharing construct they are in
    ConstructMismatch,

    /// Thread stack below the platform minimum
    InvalidStackSize(usize),

    /// Environment variable set to an unusable value
    InvalidEnv {
        var: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTeamSize => write!(f, "team size must be at least 1"),
            ConfigError::UnknownScheduleKind(kind) => {
                write!(f, "unknown schedule kind '{}'", kind)
            }
            ConfigError::InvalidChunk => write!(f, "chunk size must be at least 1"),
            ConfigError::UnresolvedRuntimeSchedule => {
                write!(f, "runtime schedule cannot resolve to 'runtime'")
            }
            ConfigError::MalformedClause(text) => write!(f, "malformed clause '{}'", text),
            ConfigError::ClauseNotAllowed { clause, directive } => {
                write!(f, "clause '{}' is not allowed on '{}'", clause, directive)
            }
            ConfigError::UnsupportedOperator { op, ty } => {
                write!(f, "reduction operator '{}' is not defined for {}", op, ty)
            }
            ConfigError::ConstructMismatch => {
                write!(f, "team members reached different work-sharing constructs")
            }
            ConfigError::InvalidStackSize(size) => {
                write!(f, "thread stack size {} is too small", size)
            }
            ConfigError::InvalidEnv { var, value } => {
                write!(f, "invalid value '{}' for {}", value, var)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for OmpError {
    fn from(e: ConfigError) -> Self {
        OmpError::Configuration(e)
    }
}

/// Thread and lock failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The OS refused to create a team member
    SpawnFailed { rank: usize, reason: String },

    /// A team member panicked while holding the team lock
    LockPoisoned,

    /// A team member panicked during the region
    ThreadPanicked { rank: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::SpawnFailed { rank, reason } => {
                write!(f, "failed to spawn team thread {}: {}", rank, reason)
            }
            ResourceError::LockPoisoned => write!(f, "team lock poisoned by a panicking thread"),
            ResourceError::ThreadPanicked { rank } => write!(f, "team thread {} panicked", rank),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ResourceError> for OmpError {
    fn from(e: ResourceError) -> Self {
        OmpError::Resource(e)
    }
}
