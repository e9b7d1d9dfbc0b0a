// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Declarative configuration settings.

use super::{ConfigurationBuilder, LogLevel};
use crate::error::ConfigError;
use crate::operation::OperationKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The serializable subset of a configuration: toggles and levels, no hooks.
///
/// Absent fields leave the builder untouched, so settings can be layered
/// over code-built configuration.
///
/// # Example JSON Configuration
///
/// ```json
/// {
///     "log": true,
///     "logLevel": "debug",
///     "enableTiming": true,
///     "kinds": {
///         "get": {"log": false},
///         "apply": {"level": "info", "debug": true}
///     }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSettings {
    pub log: Option<bool>,

    pub log_level: Option<LogLevel>,

    pub debug: Option<bool>,

    pub enable_timing: Option<bool>,

    pub enable_stack_trace: Option<bool>,

    /// Per-kind overrides, keyed by kind name (canonical or short alias).
    #[serde(default)]
    pub kinds: BTreeMap<String, KindSettings>,
}

/// Per-kind overrides in [`ConfigSettings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSettings {
    pub log: Option<bool>,
    pub level: Option<LogLevel>,
    pub debug: Option<bool>,
}

impl ConfigSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every per-kind key names a known kind, at most once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for name in self.kinds.keys() {
            let kind = name.parse::<OperationKind>()?;
            if !seen.insert(kind) {
                return Err(ConfigError::DuplicateKind(kind.to_string()));
            }
        }
        Ok(())
    }

    /// Applies these settings on top of `builder`.
    pub fn apply(
        &self,
        mut builder: ConfigurationBuilder,
    ) -> Result<ConfigurationBuilder, ConfigError> {
        if let Some(log) = self.log {
            builder = builder.log(log);
        }
        if let Some(debug) = self.debug {
            builder = builder.debug(debug);
        }
        if let Some(timing) = self.enable_timing {
            builder = builder.enable_timing(timing);
        }
        if let Some(stack) = self.enable_stack_trace {
            builder = builder.enable_stack_trace(stack);
        }
        if let Some(level) = self.log_level {
            builder = builder.log_level(level);
        }

        for (name, kind_settings) in &self.kinds {
            let kind: OperationKind = name.parse()?;
            if let Some(log) = kind_settings.log {
                builder = builder.kind_log(kind, log);
            }
            if let Some(level) = kind_settings.level {
                builder = builder.kind_level(kind, level);
            }
            if let Some(debug) = kind_settings.debug {
                builder = builder.kind_debug(kind, debug);
            }
        }
        Ok(builder)
    }

    pub fn into_builder(self) -> Result<ConfigurationBuilder, ConfigError> {
        self.apply(ConfigurationBuilder::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Toggle;

    #[test]
    fn test_parse_json_settings() {
        let json = r#"{
            "log": true,
            "logLevel": "debug",
            "enableTiming": true,
            "kinds": {
                "get": {"log": false},
                "call": {"level": "warn", "debug": true}
            }
        }"#;

        let settings = ConfigSettings::from_json(json).unwrap();
        assert_eq!(settings.log, Some(true));
        assert_eq!(settings.debug, None);
        assert_eq!(settings.log_level, Some(LogLevel::Debug));
        assert_eq!(settings.kinds.len(), 2);

        let config = settings.into_builder().unwrap().build();
        assert!(matches!(config.log, Toggle::On));
        assert!(config.enable_timing);
        let get = config.profile(OperationKind::Get).unwrap();
        assert!(matches!(get.log, Some(Toggle::Off)));
        let apply = config.profile(OperationKind::Apply).unwrap();
        assert_eq!(apply.level, Some(LogLevel::Warn));
        assert!(matches!(apply.debug, Some(Toggle::On)));
    }

    #[test]
    fn test_parse_toml_settings() {
        let toml_str = r#"
            log = true
            enableStackTrace = true

            [kinds.deleteProperty]
            log = false
        "#;

        let settings = ConfigSettings::from_toml(toml_str).unwrap();
        assert_eq!(settings.enable_stack_trace, Some(true));
        assert_eq!(settings.enable_timing, None);
        assert_eq!(settings.kinds["deleteProperty"].log, Some(false));
    }

    #[test]
    fn test_absent_fields_keep_builder_values() {
        let builder = ConfigurationBuilder::new()
            .enable_timing(true)
            .debug(true)
            .log_when(|ctx| ctx.kind() == OperationKind::Get);

        let settings = ConfigSettings::from_json(r#"{"logLevel": "debug"}"#).unwrap();
        let config = settings.apply(builder).unwrap().build();
        assert!(config.enable_timing);
        assert!(matches!(config.debug, Toggle::On));
        assert!(matches!(config.log, Toggle::When(_)));
        assert_eq!(config.log_level, Some(LogLevel::Debug));

        let explicit = ConfigSettings::from_json(r#"{"enableTiming": false}"#).unwrap();
        let config = explicit
            .apply(ConfigurationBuilder::new().enable_timing(true))
            .unwrap()
            .build();
        assert!(!config.enable_timing);
    }

    #[test]
    fn test_duplicate_kind_alias_rejected() {
        let json = r#"{"kinds": {"call": {"log": true}, "apply": {"log": false}}}"#;
        assert!(matches!(
            ConfigSettings::from_json(json),
            Err(ConfigError::DuplicateKind(_))
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = r#"{"kinds": {"teleport": {"log": true}}}"#;
        assert!(matches!(
            ConfigSettings::from_json(json),
            Err(ConfigError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ConfigSettings::from_json("{not json"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
