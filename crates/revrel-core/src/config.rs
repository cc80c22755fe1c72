//! Runtime configuration for the relation layer.
//!
//! Loaded from TOML; every key is optional and falls back to `Default`.
//!
//! ```toml
//! debug = true
//! snapshot_policy = "always_record"
//! max_snapshot_bytes = 1048576
//! ```

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    serialize::MAX_ROW_BYTES,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// SnapshotPolicy
///
/// Decides whether assigning a logical entity to an indirect relation
/// records a fresh snapshot on save.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Reuse the latest snapshot when its data equals the entity's current
    /// serialized state; record a new one otherwise.
    #[default]
    ReuseMatching,

    /// Record a new snapshot on every save of an assigned entity.
    AlwaysRecord,
}

///
/// RevrelConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevrelConfig {
    /// Emit `tracing` debug events for saves, snapshots and resolution.
    pub debug: bool,

    pub snapshot_policy: SnapshotPolicy,

    /// Upper bound on one snapshot payload, enforced when recording and when
    /// materializing.
    pub max_snapshot_bytes: usize,
}

impl Default for RevrelConfig {
    fn default() -> Self {
        Self {
            debug: false,
            snapshot_policy: SnapshotPolicy::ReuseMatching,
            max_snapshot_bytes: MAX_ROW_BYTES,
        }
    }
}

impl RevrelConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|err| ConfigError::Parse {
            message: err.to_string(),
        })?;

        if config.max_snapshot_bytes == 0 {
            return Err(ConfigError::Invalid {
                message: "max_snapshot_bytes must be greater than zero".to_string(),
            });
        }

        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        Self::from_toml_str(&source)
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub const fn with_snapshot_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.snapshot_policy = policy;
        self
    }
}

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config: {message}")]
    Parse { message: String },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        let class = match err {
            ConfigError::Read { .. } => ErrorClass::NotFound,
            ConfigError::Parse { .. } | ConfigError::Invalid { .. } => ErrorClass::Validation,
        };

        Self::new(class, ErrorOrigin::Config, err.to_string())
    }
}

///
/// TESTS
///
