//! Parallel region configuration
//!
//! Builder for the per-region knobs that are not ICVs: an explicit team
//! size (`num_threads` clause), the member stack size and thread naming.
//!
//! # Example
//!
//! ```rust,ignore
//! use omprt_runtime::ParallelConfig;
//!
//! // Library defaults with env overrides
//! let config = ParallelConfig::from_env();
//!
//! // Or customize programmatically
//! let config = ParallelConfig::from_env()
//!     .num_threads(8)
//!     .stack_size(4 << 20);
//! ```

use omprt_core::env::{env_lookup, EnvValue};
use omprt_core::{ConfigError, IcvStore};

pub const OMPRT_STACK_SIZE: &str = "OMPRT_STACK_SIZE";

/// Library defaults
pub mod defaults {
    /// Prefix of team member thread names
    pub const NAME_PREFIX: &str = "omp";
    /// Smallest stack the runtime will ask the OS for
    pub const MIN_STACK_SIZE: usize = 16 * 1024;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Team size; `None` uses the ICV thread-count target
    pub num_threads: Option<usize>,
    /// Member stack size; `None` uses the std default
    pub stack_size: Option<usize>,
    /// Member thread name prefix (`<prefix>-<team>-<rank>`)
    pub name_prefix: String,
    /// Unparsable environment setting, reported by `validate`
    invalid_env: Option<ConfigError>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ParallelConfig {
    /// Defaults with environment overrides
    ///
    /// Environment variables (optional):
    /// - `OMPRT_STACK_SIZE` - Member thread stack size in bytes
    ///
    /// A value that does not parse is kept back and fails `validate`.
    pub fn from_env() -> Self {
        Self::with_stack_env(env_lookup(OMPRT_STACK_SIZE))
    }

    fn with_stack_env(stack: EnvValue<usize>) -> Self {
        let mut config = Self::new();
        match stack {
            EnvValue::Unset => {}
            EnvValue::Parsed(size) => config.stack_size = Some(size),
            EnvValue::Invalid(value) => {
                config.invalid_env = Some(ConfigError::InvalidEnv {
                    var: OMPRT_STACK_SIZE,
                    value,
                })
            }
        }
        config
    }

    /// Library defaults, no environment lookup
    pub fn new() -> Self {
        Self {
            num_threads: None,
            stack_size: None,
            name_prefix: defaults::NAME_PREFIX.to_string(),
            invalid_env: None,
        }
    }

    // Builder methods

    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Explicit stack size; replaces any environment setting
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self.invalid_env = None;
        self
    }

    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(e) = &self.invalid_env {
            return Err(e.clone());
        }
        if self.num_threads == Some(0) {
            return Err(ConfigError::ZeroTeamSize);
        }
        if let Some(size) = self.stack_size {
            if size < defaults::MIN_STACK_SIZE {
                return Err(ConfigError::InvalidStackSize(size));
            }
        }
        Ok(())
    }

    /// Team size for a region started with this config
    pub fn resolve_team_size(&self, icv: &IcvStore) -> Result<usize, ConfigError> {
        match self.num_threads.unwrap_or_else(|| icv.num_threads()) {
            0 => Err(ConfigError::ZeroTeamSize),
            n => Ok(n),
        }
    }
}
