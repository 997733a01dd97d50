// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core configuration
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! db_path = "/data/db"
//! max_payload_bytes = 512
//!
//! [yield]
//! reader_cost = "100us"
//! writer_cost = "500us"
//! max = "1s"
//! interrupted = "100us"
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for sessions, contexts and operation records
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Storage root used when a context is opened without an explicit path
    pub db_path: PathBuf,
    /// Request/update payloads larger than this are replaced by a placeholder
    pub max_payload_bytes: usize,
    #[serde(rename = "yield")]
    pub yield_advice: YieldConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("/data/db"),
            max_payload_bytes: 512,
            yield_advice: YieldConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_max_payload_bytes(mut self, bytes: usize) -> Self {
        self.max_payload_bytes = bytes;
        self
    }
}

/// Costs used by the lock-yield heuristic
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YieldConfig {
    /// Added per session waiting for a shared lock
    #[serde(with = "humantime_serde")]
    pub reader_cost: Duration,
    /// Added per session waiting for an exclusive lock
    #[serde(with = "humantime_serde")]
    pub writer_cost: Duration,
    /// Upper bound on the advice
    #[serde(with = "humantime_serde")]
    pub max: Duration,
    /// Advice for a caller whose own operation has been interrupted
    #[serde(with = "humantime_serde")]
    pub interrupted: Duration,
}

impl Default for YieldConfig {
    fn default() -> Self {
        Self {
            reader_cost: Duration::from_micros(100),
            writer_cost: Duration::from_micros(500),
            max: Duration::from_secs(1),
            interrupted: Duration::from_micros(100),
        }
    }
}

impl YieldConfig {
    /// How long a lock waiter should back off given the current contention
    pub fn advise(&self, readers: u32, writers: u32, interrupted: bool) -> Duration {
        if interrupted {
            return self.interrupted;
        }
        let wait = self
            .reader_cost
            .saturating_mul(readers)
            .saturating_add(self.writer_cost.saturating_mul(writers));
        wait.min(self.max)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
