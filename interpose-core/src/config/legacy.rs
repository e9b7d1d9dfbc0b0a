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

//! Reduced, backward-compatible configuration shape.
//!
//! ```json
//! {
//!     "get": {"log": true, "debugger": false},
//!     "delete": {"log": true}
//! }
//! ```
//!
//! Each kind carries a log toggle, a debugger flag and one result modifier
//! (`onModResult`). The shape converts into a [`Configuration`], so the
//! engine runs it through the same pipeline as the rich profile. For `set`,
//! `deleteProperty` and `defineProperty` the modifier is a pre-attempt veto,
//! exactly as in the rich profile.

use super::{Configuration, ResultModifier, Toggle};
use crate::context::OperationContext;
use crate::error::{ConfigError, HookError};
use crate::operation::{OperationKind, Outcome};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One kind's entry in the reduced shape.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProfile {
    #[serde(default)]
    pub log: bool,

    #[serde(default)]
    pub debugger: bool,

    /// Not serializable; attach with [`LegacyProfile::on_mod_result`].
    #[serde(skip)]
    pub on_mod_result: Option<ResultModifier>,
}

impl LegacyProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    pub fn debugger(mut self, debugger: bool) -> Self {
        self.debugger = debugger;
        self
    }

    pub fn on_mod_result<F>(mut self, modifier: F) -> Self
    where
        F: Fn(Outcome, &OperationContext) -> Result<Outcome, HookError> + Send + Sync + 'static,
    {
        self.on_mod_result = Some(Arc::new(modifier));
        self
    }
}

impl fmt::Debug for LegacyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyProfile")
            .field("log", &self.log)
            .field("debugger", &self.debugger)
            .field("on_mod_result", &self.on_mod_result.is_some())
            .finish()
    }
}

/// Reduced configuration: one [`LegacyProfile`] per kind.
#[derive(Debug, Clone, Default)]
pub struct LegacyConfiguration {
    pub profiles: HashMap<OperationKind, LegacyProfile>,
}

impl LegacyConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(mut self, kind: OperationKind, profile: LegacyProfile) -> Self {
        self.profiles.insert(kind, profile);
        self
    }

    /// Parses the boolean part of the shape. Keys may be canonical kind
    /// names or the short aliases (`delete`, `define`, `call`, ...); naming
    /// the same kind under two keys is an error.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: HashMap<String, LegacyProfile> = serde_json::from_str(json)?;
        let mut profiles = HashMap::with_capacity(raw.len());
        for (name, profile) in raw {
            let kind = name.parse::<OperationKind>()?;
            if profiles.insert(kind, profile).is_some() {
                return Err(ConfigError::DuplicateKind(kind.to_string()));
            }
        }
        Ok(Self { profiles })
    }

    /// Attaches a result modifier to `kind`, creating its entry if needed.
    pub fn with_mod_result<F>(mut self, kind: OperationKind, modifier: F) -> Self
    where
        F: Fn(Outcome, &OperationContext) -> Result<Outcome, HookError> + Send + Sync + 'static,
    {
        self.profiles.entry(kind).or_default().on_mod_result = Some(Arc::new(modifier));
        self
    }
}

impl From<LegacyConfiguration> for Configuration {
    fn from(legacy: LegacyConfiguration) -> Self {
        let mut config = Configuration::default();
        for (kind, profile) in legacy.profiles {
            let target = config.profile_mut(kind);
            target.log = Some(Toggle::from(profile.log));
            target.debug = Some(Toggle::from(profile.debugger));
            target.modify_result = profile.on_mod_result;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_json() {
        let json = r#"{
            "get": {"log": true, "debugger": false},
            "delete": {"log": false, "debugger": true},
            "call": {}
        }"#;

        let legacy = LegacyConfiguration::from_json(json).unwrap();
        assert_eq!(legacy.profiles.len(), 3);
        assert!(legacy.profiles[&OperationKind::Get].log);
        assert!(legacy.profiles[&OperationKind::DeleteProperty].debugger);
        assert!(!legacy.profiles[&OperationKind::Apply].log);
    }

    #[test]
    fn test_unknown_legacy_kind() {
        assert!(matches!(
            LegacyConfiguration::from_json(r#"{"fly": {"log": true}}"#),
            Err(ConfigError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_alias_and_canonical_name_conflict() {
        let json = r#"{"delete": {"log": true}, "deleteProperty": {}}"#;
        assert!(matches!(
            LegacyConfiguration::from_json(json),
            Err(ConfigError::DuplicateKind(kind)) if kind == "deleteProperty"
        ));
    }

    #[test]
    fn test_converts_to_configuration() {
        let legacy = LegacyConfiguration::from_json(r#"{"set": {"log": true}}"#)
            .unwrap()
            .with_mod_result(OperationKind::Set, |outcome, _| Ok(outcome));

        let config = Configuration::from(legacy);
        let profile = config.profile(OperationKind::Set).unwrap();
        assert!(matches!(profile.log, Some(Toggle::On)));
        assert!(matches!(profile.debug, Some(Toggle::Off)));
        assert!(profile.modify_result.is_some());
        assert!(config.on_before.is_none());
    }
}
