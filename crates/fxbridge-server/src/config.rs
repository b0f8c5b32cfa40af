// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Process configuration, loaded from JSON and overridden from the command line.

use crate::cli::Invocation;
use fxbridge_infra::{LayoutError, SegmentConfig};
use fxbridge_runtime::{PumpConfig, PumpConfigError};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything the renderer process can be configured with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub segment: SegmentConfig,
    pub pump: PumpConfig,
    /// Loaded when no `--url` is given.
    pub default_url: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            segment: SegmentConfig::default(),
            pump: PumpConfig::default(),
            default_url: String::from("about:blank"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("segment configuration: {0}")]
    Segment(#[from] LayoutError),
    #[error("pump configuration: {0}")]
    Pump(#[from] PumpConfigError),
    #[error("default_url must not be empty")]
    EmptyUrl,
}

impl BridgeConfig {
    /// Reads a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds the effective configuration for `invocation`.
    pub fn resolve(invocation: &Invocation) -> Result<Self, ConfigError> {
        let mut config = match &invocation.config {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::load(path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(invocation);
        config.validate()?;
        Ok(config)
    }

    /// Command line values take precedence over the file.
    pub fn apply_overrides(&mut self, invocation: &Invocation) {
        if let Some(tick_ms) = invocation.tick_ms {
            self.pump.tick_interval_ms = tick_ms;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.segment.validate()?;
        self.pump.validate()?;
        if self.default_url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        Ok(())
    }

    /// The location to load first.
    pub fn startup_url<'a>(&'a self, invocation: &'a Invocation) -> &'a str {
        invocation.url.as_deref().unwrap_or(&self.default_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn invocation() -> Invocation {
        Invocation {
            name: String::from("view"),
            url: None,
            delete: false,
            config: None,
            tick_ms: None,
        }
    }

    fn write_config(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::resolve(&invocation()).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.segment.event_capacity, 1024);
        assert_eq!(config.pump.tick_interval_ms, 100);
        assert_eq!(config.startup_url(&invocation()), "about:blank");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config(r#"{ "segment": { "max_width": 1920 }, "default_url": "https://example.org" }"#);
        let config = BridgeConfig::load(file.path()).unwrap();

        assert_eq!(config.segment.max_width, 1920);
        assert_eq!(config.segment.max_height, 4096);
        assert_eq!(config.pump, PumpConfig::default());
        assert_eq!(config.default_url, "https://example.org");
    }

    #[test]
    fn command_line_overrides_the_file() {
        let file = write_config(r#"{ "pump": { "tick_interval_ms": 50 } }"#);
        let invocation = Invocation {
            config: Some(file.path().to_path_buf()),
            tick_ms: Some(16),
            url: Some(String::from("https://example.org/app")),
            ..invocation()
        };

        let config = BridgeConfig::resolve(&invocation).unwrap();
        assert_eq!(config.pump.tick_interval_ms, 16);
        assert_eq!(config.startup_url(&invocation), "https://example.org/app");
    }

    #[test]
    fn invalid_values_are_reported() {
        let file = write_config(r#"{ "segment": { "event_capacity": 1000 } }"#);
        let invocation = Invocation {
            config: Some(file.path().to_path_buf()),
            ..invocation()
        };
        assert!(matches!(
            BridgeConfig::resolve(&invocation),
            Err(ConfigError::Segment(LayoutError::InvalidCapacity { capacity: 1000 }))
        ));

        let zero_tick = Invocation {
            tick_ms: Some(0),
            ..self::invocation()
        };
        assert!(matches!(
            BridgeConfig::resolve(&zero_tick),
            Err(ConfigError::Pump(PumpConfigError::TickTooShort))
        ));
    }

    #[test]
    fn unreadable_or_malformed_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            BridgeConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));

        let file = write_config("{ not json");
        assert!(matches!(
            BridgeConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));

        let typo = write_config(r#"{ "segmnet": {} }"#);
        assert!(matches!(
            BridgeConfig::load(typo.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
