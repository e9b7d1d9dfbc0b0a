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

//! Interposing facade.
//!
//! A [`Facade`] stands in for its target: every fundamental operation issued
//! through it runs the session pipeline. Rust has no transparent proxy
//! primitive, so the facade exposes one method per operation kind plus the
//! generic [`Facade::dispatch`]. Code that wants interposition must hold the
//! facade rather than the target; a facade is not itself a [`Value`].

use crate::error::{InterposeError, Result};
use crate::object::ObjectRef;
use crate::operation::{Operation, OperationKind, Outcome};
use crate::pipeline::Pipeline;
use crate::session::{SessionId, SessionState};
use crate::value::{PropertyDescriptor, PropertyKey, Value};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacadeId(pub(crate) u64);

impl fmt::Display for FacadeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "facade-{}", self.0)
    }
}

enum FacadeState {
    Active(Arc<Pipeline>),
    /// Revoked: every operation fails with [`InterposeError::Revoked`].
    Poisoned,
}

pub(crate) struct FacadeInner {
    id: FacadeId,
    session: SessionId,
    state: RwLock<FacadeState>,
}

/// Handle to an interposed target. Clones share the same session.
#[derive(Clone)]
pub struct Facade {
    inner: Arc<FacadeInner>,
}

/// Non-owning facade handle, held by the registry.
#[derive(Clone)]
pub(crate) struct WeakFacade(Weak<FacadeInner>);

impl WeakFacade {
    pub(crate) fn upgrade(&self) -> Option<Facade> {
        self.0.upgrade().map(|inner| Facade { inner })
    }
}

impl Facade {
    pub(crate) fn new(id: FacadeId, session: SessionId, pipeline: Pipeline) -> Self {
        Self {
            inner: Arc::new(FacadeInner {
                id,
                session,
                state: RwLock::new(FacadeState::Active(Arc::new(pipeline))),
            }),
        }
    }

    /// Registry-assigned identity of this facade.
    pub fn id(&self) -> FacadeId {
        self.inner.id
    }

    /// Session this facade belongs to.
    pub fn session(&self) -> SessionId {
        self.inner.session
    }

    /// Whether the session has been revoked.
    pub fn is_revoked(&self) -> bool {
        matches!(*self.inner.state.read(), FacadeState::Poisoned)
    }

    /// Lifecycle state of the session behind this facade.
    pub fn state(&self) -> SessionState {
        if self.is_revoked() {
            SessionState::Revoked
        } else {
            SessionState::Active
        }
    }

    /// Whether both handles share one session.
    pub fn ptr_eq(&self, other: &Facade) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakFacade {
        WeakFacade(Arc::downgrade(&self.inner))
    }

    /// Detaches the pipeline and returns the target it wrapped.
    /// `None` if the facade was already poisoned.
    pub(crate) fn poison(&self) -> Option<ObjectRef> {
        let previous = std::mem::replace(&mut *self.inner.state.write(), FacadeState::Poisoned);
        match previous {
            FacadeState::Active(pipeline) => Some(pipeline.target().clone()),
            FacadeState::Poisoned => None,
        }
    }

    /// Runs `operation` through the session pipeline.
    pub fn dispatch(&self, operation: Operation) -> Result<Outcome> {
        // The lock is released before any hook runs.
        let pipeline = match &*self.inner.state.read() {
            FacadeState::Active(pipeline) => Arc::clone(pipeline),
            FacadeState::Poisoned => return Err(InterposeError::Revoked),
        };
        pipeline.run(operation)
    }

    /// Reads a property (`get`).
    pub fn get(&self, key: impl Into<PropertyKey>) -> Result<Value> {
        let outcome = self.dispatch(Operation::Get { key: key.into() })?;
        expect_value(outcome, OperationKind::Get)
    }

    /// Writes a property (`set`). Returns whether the write succeeded.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<bool> {
        let outcome = self.dispatch(Operation::Set {
            key: key.into(),
            value: value.into(),
        })?;
        expect_bool(outcome, OperationKind::Set)
    }

    /// Membership test, prototype chain included (`has`).
    pub fn has(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        let outcome = self.dispatch(Operation::Has { key: key.into() })?;
        expect_bool(outcome, OperationKind::Has)
    }

    /// Removes an own property (`deleteProperty`).
    pub fn delete(&self, key: impl Into<PropertyKey>) -> Result<bool> {
        let outcome = self.dispatch(Operation::DeleteProperty { key: key.into() })?;
        expect_bool(outcome, OperationKind::DeleteProperty)
    }

    /// Defines or reconfigures an own property (`defineProperty`).
    pub fn define_property(
        &self,
        key: impl Into<PropertyKey>,
        descriptor: PropertyDescriptor,
    ) -> Result<bool> {
        let outcome = self.dispatch(Operation::DefineProperty {
            key: key.into(),
            descriptor,
        })?;
        expect_bool(outcome, OperationKind::DefineProperty)
    }

    /// Descriptor of an own property, `None` when absent.
    pub fn get_own_property_descriptor(
        &self,
        key: impl Into<PropertyKey>,
    ) -> Result<Option<PropertyDescriptor>> {
        let kind = OperationKind::GetOwnPropertyDescriptor;
        self.dispatch(Operation::GetOwnPropertyDescriptor { key: key.into() })?
            .into_descriptor()
            .ok_or(InterposeError::UnexpectedOutcome { kind })
    }

    /// Own property keys (`ownKeys`).
    pub fn own_keys(&self) -> Result<Vec<PropertyKey>> {
        let kind = OperationKind::OwnKeys;
        self.dispatch(Operation::OwnKeys)?
            .into_keys()
            .ok_or(InterposeError::UnexpectedOutcome { kind })
    }

    /// Prototype of the target (`getPrototypeOf`).
    pub fn get_prototype_of(&self) -> Result<Option<ObjectRef>> {
        let kind = OperationKind::GetPrototypeOf;
        self.dispatch(Operation::GetPrototypeOf)?
            .into_prototype()
            .ok_or(InterposeError::UnexpectedOutcome { kind })
    }

    /// Replaces the prototype (`setPrototypeOf`).
    pub fn set_prototype_of(&self, prototype: Option<ObjectRef>) -> Result<bool> {
        let outcome = self.dispatch(Operation::SetPrototypeOf { prototype })?;
        expect_bool(outcome, OperationKind::SetPrototypeOf)
    }

    /// Whether new properties may be added (`isExtensible`).
    pub fn is_extensible(&self) -> Result<bool> {
        let outcome = self.dispatch(Operation::IsExtensible)?;
        expect_bool(outcome, OperationKind::IsExtensible)
    }

    /// Forbids adding new properties (`preventExtensions`).
    pub fn prevent_extensions(&self) -> Result<bool> {
        let outcome = self.dispatch(Operation::PreventExtensions)?;
        expect_bool(outcome, OperationKind::PreventExtensions)
    }

    /// Invokes the target with an explicit receiver.
    pub fn call(&self, this: impl Into<Value>, args: Vec<Value>) -> Result<Value> {
        let outcome = self.dispatch(Operation::Apply {
            this: this.into(),
            args,
        })?;
        expect_value(outcome, OperationKind::Apply)
    }

    /// Constructs with the target itself as `new_target`.
    pub fn construct(&self, args: Vec<Value>) -> Result<Value> {
        let outcome = self.dispatch(Operation::Construct {
            args,
            new_target: None,
        })?;
        expect_value(outcome, OperationKind::Construct)
    }

    /// Constructs with an explicit `new_target`.
    pub fn construct_with(&self, args: Vec<Value>, new_target: ObjectRef) -> Result<Value> {
        let outcome = self.dispatch(Operation::Construct {
            args,
            new_target: Some(new_target),
        })?;
        expect_value(outcome, OperationKind::Construct)
    }
}

fn expect_value(outcome: Outcome, kind: OperationKind) -> Result<Value> {
    outcome
        .into_value()
        .ok_or(InterposeError::UnexpectedOutcome { kind })
}

fn expect_bool(outcome: Outcome, kind: OperationKind) -> Result<bool> {
    outcome
        .as_bool()
        .ok_or(InterposeError::UnexpectedOutcome { kind })
}

impl PartialEq for Facade {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Facade {}

impl fmt::Debug for Facade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facade")
            .field("id", &self.inner.id)
            .field("session", &self.inner.session)
            .field("revoked", &self.is_revoked())
            .finish()
    }
}
