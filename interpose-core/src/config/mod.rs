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

//! Session configuration.
//!
//! A [`Configuration`] is the hook and behaviour set of one session. It can
//! be produced three ways, all of which end up as the same struct:
//!
//! - [`ConfigurationBuilder`], the rich profile, for hooks written in Rust.
//! - [`ConfigSettings`], the declarative subset, from JSON or TOML.
//! - [`LegacyConfiguration`], the reduced `{log, debugger, onModResult}`
//!   per-kind shape.

mod builder;
mod legacy;
mod settings;

pub use builder::ConfigurationBuilder;
pub use legacy::{LegacyConfiguration, LegacyProfile};
pub use settings::{ConfigSettings, KindSettings};

use crate::context::OperationContext;
use crate::error::{ConfigError, HookError, InterposeError};
use crate::object::Callable;
use crate::operation::{OperationKind, Outcome};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Before/after hook. Failures are logged and suppressed.
pub type ContextHook = Arc<dyn Fn(&OperationContext) -> Result<(), HookError> + Send + Sync>;

/// Runs when an operation fault is about to be re-raised.
pub type ErrorHook =
    Arc<dyn Fn(&OperationContext, &InterposeError) -> Result<(), HookError> + Send + Sync>;

/// Pure predicate over a context (gates and toggles).
pub type Predicate = Arc<dyn Fn(&OperationContext) -> bool + Send + Sync>;

/// Full override. `Some(value)` short-circuits delegation.
pub type OverrideHook =
    Arc<dyn Fn(&OperationContext) -> Result<Option<Value>, HookError> + Send + Sync>;

/// Transforms the outcome of a kind. For vetoable kinds it is consulted
/// with the predicted outcome `Bool(true)` before delegation.
pub type ResultModifier =
    Arc<dyn Fn(Outcome, &OperationContext) -> Result<Outcome, HookError> + Send + Sync>;

/// Rewrites `apply`/`construct` arguments. `None` or an empty list keeps
/// the originals.
pub type ArgsModifier =
    Arc<dyn Fn(&[Value], &OperationContext) -> Result<Option<Vec<Value>>, HookError> + Send + Sync>;

/// Supplies a callable to run in place of the target for `apply`.
pub type FunctionReplacer = Arc<dyn Fn(&OperationContext) -> Option<Callable> + Send + Sync>;

/// A switch that is either fixed or decided per invocation.
#[derive(Clone, Default)]
pub enum Toggle {
    #[default]
    Off,
    On,
    When(Predicate),
}

impl Toggle {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&OperationContext) -> bool + Send + Sync + 'static,
    {
        Toggle::When(Arc::new(predicate))
    }

    pub fn evaluate(&self, ctx: &OperationContext) -> bool {
        match self {
            Toggle::Off => false,
            Toggle::On => true,
            Toggle::When(predicate) => predicate(ctx),
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, Toggle::Off)
    }
}

impl From<bool> for Toggle {
    fn from(on: bool) -> Self {
        if on {
            Toggle::On
        } else {
            Toggle::Off
        }
    }
}

impl fmt::Debug for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::Off => f.write_str("Off"),
            Toggle::On => f.write_str("On"),
            Toggle::When(_) => f.write_str("When(<predicate>)"),
        }
    }
}

/// Log severity, lowest first. `Off` as a threshold silences everything.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Whether a line at `level` passes this threshold.
    pub fn permits(self, level: LogLevel) -> bool {
        self != LogLevel::Off && level != LogLevel::Off && level >= self
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" | "log" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" | "silent" => Ok(LogLevel::Off),
            other => Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
    }
}

/// Per-kind part of a configuration. Unset fields fall back to the
/// engine-wide settings of the [`Configuration`].
#[derive(Clone, Default)]
pub struct KindProfile {
    pub log: Option<Toggle>,
    /// Level the log line for this kind is emitted at.
    pub level: Option<LogLevel>,
    pub debug: Option<Toggle>,
    pub before: Option<ContextHook>,
    pub after: Option<ContextHook>,
    pub intercept: Option<OverrideHook>,
    pub modify_result: Option<ResultModifier>,
}

impl fmt::Debug for KindProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindProfile")
            .field("log", &self.log)
            .field("level", &self.level)
            .field("debug", &self.debug)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("intercept", &self.intercept.is_some())
            .field("modify_result", &self.modify_result.is_some())
            .finish()
    }
}

/// Hook and behaviour set of one session.
#[derive(Clone, Default)]
pub struct Configuration {
    pub log: Toggle,
    /// Threshold for log lines. Falls back to the engine default.
    pub log_level: Option<LogLevel>,
    pub debug: Toggle,
    pub on_before: Option<ContextHook>,
    pub on_after: Option<ContextHook>,
    pub on_error: Option<ErrorHook>,
    /// Conditional gate. `false` bypasses the pipeline entirely.
    pub should_intercept: Option<Predicate>,
    pub modify_args: Option<ArgsModifier>,
    pub replace_function: Option<FunctionReplacer>,
    pub enable_timing: bool,
    pub enable_stack_trace: bool,
    pub kinds: HashMap<OperationKind, KindProfile>,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    pub fn profile(&self, kind: OperationKind) -> Option<&KindProfile> {
        self.kinds.get(&kind)
    }

    pub(crate) fn profile_mut(&mut self, kind: OperationKind) -> &mut KindProfile {
        self.kinds.entry(kind).or_default()
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("log", &self.log)
            .field("log_level", &self.log_level)
            .field("debug", &self.debug)
            .field("on_before", &self.on_before.is_some())
            .field("on_after", &self.on_after.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("should_intercept", &self.should_intercept.is_some())
            .field("modify_args", &self.modify_args.is_some())
            .field("replace_function", &self.replace_function.is_some())
            .field("enable_timing", &self.enable_timing)
            .field("enable_stack_trace", &self.enable_stack_trace)
            .field("kinds", &self.kinds)
            .finish()
    }
}

impl From<ConfigurationBuilder> for Configuration {
    fn from(builder: ConfigurationBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_threshold() {
        assert!(LogLevel::Info.permits(LogLevel::Info));
        assert!(LogLevel::Info.permits(LogLevel::Error));
        assert!(!LogLevel::Warn.permits(LogLevel::Info));
        assert!(!LogLevel::Off.permits(LogLevel::Error));
        assert!(LogLevel::Trace.permits(LogLevel::Debug));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("log".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_toggle_from_bool() {
        assert!(matches!(Toggle::from(true), Toggle::On));
        assert!(Toggle::from(false).is_off());
    }
}
