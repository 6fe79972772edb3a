// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load diagnostic channel configuration from JSON and the environment.
// Author: Lukas Bower

//! Channel configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Environment overrides are applied after parsing:
//!
//! | variable | field |
//! |---|---|
//! | `DIAGCHAN_DIR` | `dir_name` |
//! | `DIAGCHAN_OUTPUT` | `output_name` |
//! | `DIAGCHAN_BASELINE` | `baseline_capacity` |
//! | `DIAGCHAN_MAX_CAPACITY` | `max_capacity` |

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::buffer::{BufferLimits, DEFAULT_BASELINE};
use crate::control::DEFAULT_MAX_COMMAND_LEN;

/// Environment variable overriding [`ChannelConfig::dir_name`].
pub const ENV_DIR: &str = "DIAGCHAN_DIR";
/// Environment variable overriding [`ChannelConfig::output_name`].
pub const ENV_OUTPUT: &str = "DIAGCHAN_OUTPUT";
/// Environment variable overriding [`ChannelConfig::baseline_capacity`].
pub const ENV_BASELINE: &str = "DIAGCHAN_BASELINE";
/// Environment variable overriding [`ChannelConfig::max_capacity`].
pub const ENV_MAX_CAPACITY: &str = "DIAGCHAN_MAX_CAPACITY";

/// Errors produced while loading a [`ChannelConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid JSON for this schema.
    #[error("invalid channel config: {0}")]
    Parse(#[from] serde_json::Error),
    /// An environment override does not parse.
    #[error("invalid value '{value}' for {var}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
    /// The values are inconsistent.
    #[error("invalid channel config: {0}")]
    Invalid(&'static str),
}

/// Names and limits of a diagnostic channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Directory holding the channel files.
    pub dir_name: String,
    /// Read-only file exposing the output buffer.
    pub output_name: String,
    /// Optional control file accepting `reset`, `mark <text>` and `status`.
    pub control_name: Option<String>,
    /// Optional read-only file with a capacity snapshot.
    pub stats_name: Option<String>,
    /// Initial capacity and growth increment of the buffer.
    pub baseline_capacity: usize,
    /// Capacity the buffer may never exceed.
    pub max_capacity: Option<usize>,
    /// Longest command the control file accepts.
    pub max_command_len: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            dir_name: "diagchan".to_owned(),
            output_name: "output".to_owned(),
            control_name: Some("ctl".to_owned()),
            stats_name: Some("stats".to_owned()),
            baseline_capacity: DEFAULT_BASELINE,
            max_capacity: None,
            max_command_len: DEFAULT_MAX_COMMAND_LEN,
        }
    }
}

impl ChannelConfig {
    /// Parse JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides looked up through `lookup`.
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup(ENV_DIR) {
            self.dir_name = dir;
        }
        if let Some(output) = lookup(ENV_OUTPUT) {
            self.output_name = output;
        }
        if let Some(value) = lookup(ENV_BASELINE) {
            self.baseline_capacity = parse_size(ENV_BASELINE, value)?;
        }
        if let Some(value) = lookup(ENV_MAX_CAPACITY) {
            self.max_capacity = Some(parse_size(ENV_MAX_CAPACITY, value)?);
        }
        self.validate()?;
        Ok(self)
    }

    /// Check the values for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dir_name.is_empty() || self.output_name.is_empty() {
            return Err(ConfigError::Invalid("file names must not be empty"));
        }
        if self.baseline_capacity == 0 {
            return Err(ConfigError::Invalid("baseline_capacity must be positive"));
        }
        if self
            .max_capacity
            .is_some_and(|max| max < self.baseline_capacity)
        {
            return Err(ConfigError::Invalid(
                "max_capacity must not be below baseline_capacity",
            ));
        }
        if self.max_command_len == 0 {
            return Err(ConfigError::Invalid("max_command_len must be positive"));
        }
        Ok(())
    }

    /// Growth policy for the channel buffer.
    #[must_use]
    pub fn limits(&self) -> BufferLimits {
        BufferLimits {
            baseline: self.baseline_capacity,
            max_capacity: self.max_capacity,
        }
    }
}

fn parse_size(var: &'static str, value: String) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}
