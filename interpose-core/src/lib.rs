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

//! Interpose Core
//!
//! An interposition engine: wrap a target object in a facade that routes
//! every fundamental operation through a configurable hook pipeline.
//!
//! # Architecture
//!
//! - **Entities**: [`ObjectRef`] is a shared handle to an object with
//!   identity, properties, a prototype and an optional callable.
//! - **Operations**: the thirteen [`OperationKind`]s with their payloads
//!   ([`Operation`]) and results ([`Outcome`]).
//! - **Pipeline**: gate, before-hooks, observers, debug break, override,
//!   argument and result modification, after-hooks and logging, driven by a
//!   [`Configuration`].
//! - **Sessions**: [`Interposer::install`] binds a target, a configuration
//!   and a [`Facade`]; [`Interposer::revoke`] unbinds them and poisons the
//!   facade. The [`SessionRegistry`] never keeps a session alive.
//! - **Observers**: [`GlobalObserver`]s are notified by every session of
//!   the same engine.
//!
//! # Capability boundary
//!
//! Rust offers no transparent proxy. A [`Facade`] is a distinct type with
//! one method per fundamental operation, and interposition only applies to
//! code that goes through it. Accessors and methods on the target run with
//! the target itself as receiver.
//!
//! # Example
//!
//! ```rust
//! use interpose_core::{Configuration, Interposer, ObjectRef, Value};
//!
//! let engine = Interposer::new();
//! let target = ObjectRef::from_entries([("a", 1)]);
//!
//! let config = Configuration::builder()
//!     .modify_get_result(|value, _| Ok(match value {
//!         Value::Number(n) => Value::Number(n * 10.0),
//!         other => other,
//!     }))
//!     .build();
//!
//! let facade = engine.install(target.clone(), config, Some("demo")).unwrap();
//! assert_eq!(facade.get("a").unwrap(), Value::from(10));
//!
//! let original = engine.revoke("demo").unwrap();
//! assert!(original.ptr_eq(&target));
//! assert!(facade.get("a").is_err());
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod facade;
pub mod object;
pub mod observer;
pub mod operation;
mod pipeline;
pub mod registry;
pub mod session;
pub mod value;

pub use config::{
    ConfigSettings, Configuration, ConfigurationBuilder, KindProfile, KindSettings,
    LegacyConfiguration, LegacyProfile, LogLevel, Toggle,
};
pub use context::{OperationContext, Resolution};
pub use engine::{BreakHandler, ContainmentPolicy, Interposer, InterposerSettings};
pub use error::{ConfigError, Fault, HookError, InterposeError, Result};
pub use facade::{Facade, FacadeId};
pub use object::{Callable, ObjectId, ObjectRef, WeakObjectRef};
pub use observer::{
    BroadcastReport, CallbackObserver, GlobalObserver, LoggingObserver, ObserverChain, ObserverId,
    Phase,
};
pub use operation::{Operation, OperationKind, Outcome};
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{SessionId, SessionInfo, SessionState};
pub use value::{PropertyDescriptor, PropertyKey, Value};
