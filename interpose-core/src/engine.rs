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

//! The interposition engine.
//!
//! An [`Interposer`] owns the session registry and the global observer
//! chain. Hosts create one explicitly and pass it to whatever code installs
//! sessions; there is no process-wide instance.

use crate::config::{Configuration, LogLevel};
use crate::context::OperationContext;
use crate::error::{ConfigError, InterposeError, Result};
use crate::facade::Facade;
use crate::object::ObjectRef;
use crate::observer::{GlobalObserver, ObserverChain, ObserverId};
use crate::operation::OperationKind;
use crate::pipeline::Pipeline;
use crate::registry::{Installed, SessionHandle, SessionRegistry};
use crate::value::Value;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which operation kinds get error containment and observer broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContainmentPolicy {
    /// All thirteen kinds.
    #[default]
    Uniform,
    /// Only `get`, `set`, `apply` and `construct`. Faults of the other kinds
    /// propagate without running the error hook and observers are not told
    /// about them.
    RichKindsOnly,
}

impl ContainmentPolicy {
    pub fn covers(self, kind: OperationKind) -> bool {
        match self {
            ContainmentPolicy::Uniform => true,
            ContainmentPolicy::RichKindsOnly => kind.is_rich(),
        }
    }
}

impl FromStr for ContainmentPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" | "all" => Ok(ContainmentPolicy::Uniform),
            "rich" | "rich-only" | "rich_kinds_only" => Ok(ContainmentPolicy::RichKindsOnly),
            other => Err(ConfigError::InvalidSetting {
                name: "containment".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Invoked when the debug gate of an operation is on.
pub type BreakHandler = Arc<dyn Fn(&OperationContext) + Send + Sync>;

fn default_break_handler() -> BreakHandler {
    Arc::new(|ctx: &OperationContext| {
        tracing::debug!(
            kind = %ctx.kind(),
            session = ctx.session().unwrap_or("-"),
            summary = %ctx.summary(),
            "Debug break"
        );
    })
}

/// Engine-wide settings.
#[derive(Clone)]
pub struct InterposerSettings {
    pub containment: ContainmentPolicy,
    /// Threshold for sessions whose configuration sets none.
    pub log_level: LogLevel,
    pub break_handler: BreakHandler,
}

impl Default for InterposerSettings {
    fn default() -> Self {
        Self {
            containment: ContainmentPolicy::default(),
            log_level: LogLevel::Trace,
            break_handler: default_break_handler(),
        }
    }
}

impl InterposerSettings {
    /// Loads settings from `INTERPOSE_CONTAINMENT` and `INTERPOSE_LOG_LEVEL`.
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            containment: env_setting("INTERPOSE_CONTAINMENT").unwrap_or(defaults.containment),
            log_level: env_setting("INTERPOSE_LOG_LEVEL").unwrap_or(defaults.log_level),
            break_handler: defaults.break_handler,
        }
    }

    pub fn with_containment(mut self, containment: ContainmentPolicy) -> Self {
        self.containment = containment;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_break_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&OperationContext) + Send + Sync + 'static,
    {
        self.break_handler = Arc::new(handler);
        self
    }
}

fn env_setting<T>(name: &str) -> Option<T>
where
    T: FromStr<Err = ConfigError>,
{
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(variable = name, error = %err, "Ignoring invalid environment setting");
            None
        }
    }
}

impl fmt::Debug for InterposerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterposerSettings")
            .field("containment", &self.containment)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

/// Interposition engine: session registry plus global observers.
pub struct Interposer {
    settings: InterposerSettings,
    registry: SessionRegistry,
    observers: Arc<ObserverChain>,
}

impl Default for Interposer {
    fn default() -> Self {
        Self::new()
    }
}

impl Interposer {
    pub fn new() -> Self {
        Self::with_settings(InterposerSettings::default())
    }

    pub fn with_settings(settings: InterposerSettings) -> Self {
        Self {
            settings,
            registry: SessionRegistry::new(),
            observers: Arc::new(ObserverChain::new()),
        }
    }

    pub fn settings(&self) -> &InterposerSettings {
        &self.settings
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn observers(&self) -> &ObserverChain {
        &self.observers
    }

    /// Starts a session on `target` and returns its facade.
    ///
    /// If `target` already has a live session, a warning is logged and the
    /// existing facade is returned; `configuration` is ignored.
    pub fn install(
        &self,
        target: impl Into<Value>,
        configuration: impl Into<Configuration>,
        name: Option<&str>,
    ) -> Result<Facade> {
        let target = match target.into() {
            Value::Object(object) => object,
            other => {
                return Err(InterposeError::InvalidTarget(format!(
                    "expected an object, got {}",
                    other.type_name()
                )))
            }
        };

        let configuration = configuration.into();
        let installed = self.registry.install(&target, name, |session| {
            Pipeline::build(
                target.clone(),
                session,
                configuration,
                Arc::clone(&self.observers),
                &self.settings,
            )
        });

        match installed {
            Installed::New(facade) => {
                tracing::info!(
                    session = %facade.session(),
                    object = %target,
                    session_name = name.unwrap_or("-"),
                    "Interposition installed"
                );
                Ok(facade)
            }
            Installed::Existing(facade) => {
                tracing::warn!(
                    session = %facade.session(),
                    object = %target,
                    "Target is already interposed; returning the existing facade"
                );
                Ok(facade)
            }
        }
    }

    /// Ends the session named by `handle` and returns the original target.
    pub fn revoke<'a>(&self, handle: impl Into<SessionHandle<'a>>) -> Option<ObjectRef> {
        let target = self.registry.revoke(handle)?;
        tracing::info!(object = %target, "Interposition revoked");
        Some(target)
    }

    pub fn add_global_observer(&self, observer: impl GlobalObserver + 'static) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_global_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }
}

impl fmt::Debug for Interposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interposer")
            .field("settings", &self.settings)
            .field("sessions", &self.registry.session_count())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::CallbackObserver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_install_rejects_primitives() {
        let engine = Interposer::new();
        let err = engine
            .install(42, Configuration::default(), None)
            .unwrap_err();
        assert!(matches!(err, InterposeError::InvalidTarget(_)));
        assert!(engine.install(Value::Null, Configuration::default(), None).is_err());
    }

    #[test]
    fn test_install_and_revoke() {
        let engine = Interposer::new();
        let target = ObjectRef::from_entries([("a", 1)]);

        let facade = engine
            .install(target.clone(), Configuration::default(), Some("t"))
            .unwrap();
        assert!(engine.registry().is_watched(&target));
        assert_eq!(engine.registry().session_names(), vec!["t".to_string()]);

        let again = engine
            .install(target.clone(), Configuration::builder(), None)
            .unwrap();
        assert_eq!(again, facade);

        assert!(engine.revoke("t").unwrap().ptr_eq(&target));
        assert!(facade.is_revoked());
        assert!(engine.revoke(&facade).is_none());
    }

    #[test]
    fn test_observers_shared_across_sessions() {
        let engine = Interposer::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let id = engine.add_global_observer(CallbackObserver::new("count", move |_, _| {
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let a = engine
            .install(ObjectRef::from_entries([("x", 1)]), Configuration::default(), None)
            .unwrap();
        let b = engine
            .install(ObjectRef::new(), Configuration::default(), None)
            .unwrap();
        a.get("x").unwrap();
        b.has("y").unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 4);

        assert!(engine.remove_global_observer(id));
        a.get("x").unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_containment_parse() {
        assert_eq!(
            "rich".parse::<ContainmentPolicy>().unwrap(),
            ContainmentPolicy::RichKindsOnly
        );
        assert_eq!(
            "Uniform".parse::<ContainmentPolicy>().unwrap(),
            ContainmentPolicy::Uniform
        );
        assert!("sometimes".parse::<ContainmentPolicy>().is_err());
        assert!(ContainmentPolicy::RichKindsOnly.covers(OperationKind::Apply));
        assert!(!ContainmentPolicy::RichKindsOnly.covers(OperationKind::OwnKeys));
    }

    #[test]
    fn test_settings_from_env() {
        env::set_var("INTERPOSE_CONTAINMENT", "rich");
        env::set_var("INTERPOSE_LOG_LEVEL", "bogus");
        let settings = InterposerSettings::from_env();
        assert_eq!(settings.containment, ContainmentPolicy::RichKindsOnly);
        assert_eq!(settings.log_level, LogLevel::Trace);
        env::remove_var("INTERPOSE_CONTAINMENT");
        env::remove_var("INTERPOSE_LOG_LEVEL");
    }
}
