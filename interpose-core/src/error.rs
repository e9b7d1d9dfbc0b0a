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

//! Error types for the interposition engine.
//!
//! Three families are kept apart:
//!
//! - [`Fault`]: something raised by the entity model itself (a callable that
//!   fails, or a host type fault such as calling a non-callable).
//! - [`HookError`]: returned by user hooks, modifiers and observers.
//! - [`InterposeError`]: what callers of a facade or of the engine see.

use crate::operation::OperationKind;
use crate::value::Value;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, InterposeError>;

/// A fault raised while performing a fundamental operation on an entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    /// Host type fault, e.g. invoking something that is not callable.
    #[error("TypeError: {0}")]
    Type(String),

    /// A value raised by a callable.
    #[error("Uncaught {0}")]
    Thrown(Value),
}

impl Fault {
    pub fn type_error(message: impl Into<String>) -> Self {
        Fault::Type(message.into())
    }

    pub fn thrown(value: impl Into<Value>) -> Self {
        Fault::Thrown(value.into())
    }
}

/// Errors returned by user-supplied hooks, modifiers and observers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HookError {
    #[error("Hook failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Fault(#[from] Fault),
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }
}

/// Errors surfaced by facades and by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterposeError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Facade has been revoked")]
    Revoked,

    #[error(transparent)]
    Fault(Fault),

    #[error(transparent)]
    Hook(HookError),

    #[error("Pipeline produced an unexpected outcome for {kind}")]
    UnexpectedOutcome { kind: OperationKind },
}

impl InterposeError {
    /// The underlying entity fault, if this error carries one.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            InterposeError::Fault(fault) | InterposeError::Hook(HookError::Fault(fault)) => {
                Some(fault)
            }
            _ => None,
        }
    }
}

impl From<Fault> for InterposeError {
    fn from(fault: Fault) -> Self {
        InterposeError::Fault(fault)
    }
}

impl From<HookError> for InterposeError {
    fn from(error: HookError) -> Self {
        // A hook that re-raises an entity fault surfaces as that fault.
        match error {
            HookError::Fault(fault) => InterposeError::Fault(fault),
            other => InterposeError::Hook(other),
        }
    }
}

/// Errors that can occur while loading declarative configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Unknown operation kind: {0}")]
    UnknownKind(String),

    #[error("Operation kind configured twice: {0}")]
    DuplicateKind(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidSetting { name: String, value: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::ParseError(e.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::ParseError(e.to_string())
    }
}
