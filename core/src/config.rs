//! Operation configuration.
//!
//! A [`Config`] controls how operations execute: when kernels fan out across `rayon`
//! worker threads and what division by zero does. The plain operation methods
//! (`add`, `matmul`, ...) use [`Config::global`], which is read from the environment
//! once per process; the `*_with` variants take an explicit configuration.
//!
//! ```rust
//! use ndmat::{Config, DivisionPolicy};
//!
//! let config = Config::default()
//!     .with_parallel_threshold(1 << 16)
//!     .with_division(DivisionPolicy::Error);
//! assert_eq!(config.division, DivisionPolicy::Error);
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Environment variable overriding [`Config::parallel_threshold`].
pub const ENV_PARALLEL_THRESHOLD: &str = "NDMAT_PARALLEL_THRESHOLD";
/// Environment variable overriding [`Config::division`].
pub const ENV_DIVISION: &str = "NDMAT_DIVISION";

const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

static GLOBAL: LazyLock<Config> = LazyLock::new(|| match Config::from_env() {
    Ok(config) => config,
    Err(e) => {
        log::warn!("{}; falling back to the default configuration", e);
        Config::default()
    }
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// What to do when a divisor element is exactly zero.
///
/// Integer arrays always reject zero divisors, since the result has no
/// representation; the policy only changes floating-point behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivisionPolicy {
    /// IEEE-754 semantics: `x / 0.0` yields `inf`, `-inf` or `NaN`. A warning is logged.
    #[default]
    Propagate,
    /// Fail with `ArrayError::DivisionByZero`.
    Error,
}

impl FromStr for DivisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(DivisionPolicy::Propagate),
            "error" => Ok(DivisionPolicy::Error),
            other => Err(format!("expected `propagate` or `error`, got `{}`", other)),
        }
    }
}

/// Execution settings for array operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum number of output elements before kernels run in parallel.
    pub parallel_threshold: usize,
    pub division: DivisionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            division: DivisionPolicy::default(),
        }
    }
}

impl Config {
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_division(mut self, division: DivisionPolicy) -> Self {
        self.division = division;
        self
    }

    /// The process-wide configuration used by the plain operation methods.
    ///
    /// Built from the environment ([`Config::from_env`]) on first use and fixed for
    /// the rest of the process. If a variable is invalid, a warning is logged and the
    /// defaults are used.
    pub fn global() -> &'static Config {
        &GLOBAL
    }

    /// Builds a configuration from `NDMAT_PARALLEL_THRESHOLD` and `NDMAT_DIVISION`.
    ///
    /// Unset variables keep their defaults. The result only affects the `*_with`
    /// operations it is passed to; the plain methods read [`Config::global`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup(ENV_PARALLEL_THRESHOLD) {
            config.parallel_threshold = value.trim().parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue {
                    key: ENV_PARALLEL_THRESHOLD,
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some(value) = lookup(ENV_DIVISION) {
            config.division = value
                .parse::<DivisionPolicy>()
                .map_err(|reason| ConfigError::InvalidValue {
                    key: ENV_DIVISION,
                    value: value.clone(),
                    reason,
                })?;
        }

        log::debug!("loaded config from environment: {:?}", config);
        Ok(config)
    }

    /// Whether an operation producing `numel` elements should use the parallel kernels.
    pub(crate) fn parallel_for(&self, numel: usize) -> bool {
        numel >= self.parallel_threshold
    }
}
