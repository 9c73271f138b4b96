//! Environment variable utilities
//!
//! The ICV store must tell "unset" apart from "set to garbage", so besides
//! the defaulting `env_get` family there is `env_lookup`, which keeps the
//! raw text of a value that failed to parse.
//!
//! # Usage
//!
//! ```ignore
//! use omprt_core::env::{env_get, env_lookup, EnvValue};
//!
//! let stack: usize = env_get("OMPRT_STACK_SIZE", 2 << 20);
//!
//! match env_lookup::<usize>("OMP_NUM_TEAMS") {
//!     EnvValue::Unset => {}
//!     EnvValue::Parsed(n) => println!("{} teams", n),
//!     EnvValue::Invalid(raw) => eprintln!("bad value {:?}", raw),
//! }
//! ```

use std::str::FromStr;

/// Outcome of reading and parsing one environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue<T> {
    /// Variable not present (or not unicode)
    Unset,
    /// Variable present and parsed
    Parsed(T),
    /// Variable present but unparsable; holds the raw text
    Invalid(String),
}

impl<T> EnvValue<T> {
    /// Parsed value, or `default` when unset or invalid
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            EnvValue::Parsed(v) => v,
            EnvValue::Unset | EnvValue::Invalid(_) => default,
        }
    }
}

/// Read `key` and parse it with `FromStr`, keeping failures visible
pub fn env_lookup<T>(key: &str) -> EnvValue<T>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => EnvValue::Parsed(v),
            Err(_) => EnvValue::Invalid(raw),
        },
        Err(_) => EnvValue::Unset,
    }
}

/// Like `env_lookup` but parses only the first entry of a comma separated
/// list (`OMP_NUM_THREADS=4,2` yields 4)
pub fn env_lookup_first<T>(key: &str) -> EnvValue<T>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) => {
            let first = raw.split(',').next().unwrap_or("").trim();
            match first.parse() {
                Ok(v) => EnvValue::Parsed(v),
                Err(_) => EnvValue::Invalid(raw),
            }
        }
        Err(_) => EnvValue::Unset,
    }
}

/// Get environment variable parsed as type T, or return default
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_lookup(key).unwrap_or(default)
}

/// Get environment variable as optional value
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    match env_lookup(key) {
        EnvValue::Parsed(v) => Some(v),
        _ => None,
    }
}

/// Get environment variable as boolean
///
/// Accepts: "1", "true", "yes", "on" (case-insensitive) as true.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check if environment variable is set (regardless of value)
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}
