use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the configuration file searched for by [`Config::load()`]
pub const CONFIG_FILE: &str = "allot.toml";

/// How a processing pass reacts to a request that cannot be satisfied
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassMode {
    /// End the pass at the first unsatisfiable request
    ///
    /// Requests behind it wait for the next pass even if they could be served.
    #[default]
    StopAtFirstFailure,
    /// Re-queue unsatisfiable requests and keep going until every request that
    /// was pending at the start of the pass has been attempted once
    SkipAndContinue,
}

/// Configuration of the allocation core
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Behaviour of a processing pass on failure
    pub pass_mode: PassMode,
    /// Minimum number of whole days between a release and the commitment's
    /// target time
    ///
    /// Only applies to commitments that carry a target time.
    pub release_lead_days: u32,
}

/// Errors while loading a [`Config`]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for [`Config`]
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// An environment override could not be parsed
    #[error("invalid value {value:?} for {var}")]
    Env {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },
}

impl Config {
    /// Parse a configuration from TOML
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load the configuration for the current directory
    ///
    /// Walks up from the current directory looking for `allot.toml`. If none
    /// is found, the defaults are used. Afterwards the environment variables
    /// `ALLOT_PASS_MODE` and `ALLOT_RELEASE_LEAD_DAYS` take precedence.
    pub fn load() -> Result<Self, ConfigError> {
        let dir = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        let mut config = match Self::find(&dir)? {
            Some(contents) => Self::from_toml_str(&contents)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    fn find(start: &Path) -> Result<Option<String>, ConfigError> {
        let mut path = start.to_path_buf();
        loop {
            path.push(CONFIG_FILE);

            match std::fs::read_to_string(&path) {
                Ok(s) => return Ok(Some(s)),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(ConfigError::Io { path, source }),
            }

            path.pop();
            if !path.pop() {
                return Ok(None);
            }
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("ALLOT_PASS_MODE") {
            self.pass_mode = if v.eq_ignore_ascii_case("stop-at-first-failure") {
                PassMode::StopAtFirstFailure
            } else if v.eq_ignore_ascii_case("skip-and-continue") {
                PassMode::SkipAndContinue
            } else {
                return Err(ConfigError::Env {
                    var: "ALLOT_PASS_MODE",
                    value: v,
                });
            };
        }

        if let Ok(v) = std::env::var("ALLOT_RELEASE_LEAD_DAYS") {
            self.release_lead_days = v.parse().map_err(|_| ConfigError::Env {
                var: "ALLOT_RELEASE_LEAD_DAYS",
                value: v.clone(),
            })?;
        }

        Ok(())
    }
}
