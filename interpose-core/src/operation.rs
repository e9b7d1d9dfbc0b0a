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

//! The 13 fundamental operations as tagged descriptors.

use crate::error::{ConfigError, Fault};
use crate::object::ObjectRef;
use crate::value::{PropertyDescriptor, PropertyKey, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind tag of a fundamental operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Get,
    Set,
    Has,
    DeleteProperty,
    DefineProperty,
    GetOwnPropertyDescriptor,
    OwnKeys,
    GetPrototypeOf,
    SetPrototypeOf,
    IsExtensible,
    PreventExtensions,
    Apply,
    Construct,
}

impl OperationKind {
    pub const ALL: [OperationKind; 13] = [
        OperationKind::Get,
        OperationKind::Set,
        OperationKind::Has,
        OperationKind::DeleteProperty,
        OperationKind::DefineProperty,
        OperationKind::GetOwnPropertyDescriptor,
        OperationKind::OwnKeys,
        OperationKind::GetPrototypeOf,
        OperationKind::SetPrototypeOf,
        OperationKind::IsExtensible,
        OperationKind::PreventExtensions,
        OperationKind::Apply,
        OperationKind::Construct,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Get => "get",
            OperationKind::Set => "set",
            OperationKind::Has => "has",
            OperationKind::DeleteProperty => "deleteProperty",
            OperationKind::DefineProperty => "defineProperty",
            OperationKind::GetOwnPropertyDescriptor => "getOwnPropertyDescriptor",
            OperationKind::OwnKeys => "ownKeys",
            OperationKind::GetPrototypeOf => "getPrototypeOf",
            OperationKind::SetPrototypeOf => "setPrototypeOf",
            OperationKind::IsExtensible => "isExtensible",
            OperationKind::PreventExtensions => "preventExtensions",
            OperationKind::Apply => "apply",
            OperationKind::Construct => "construct",
        }
    }

    /// Position in [`OperationKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Access, mutate, invoke and construct. These always broadcast to
    /// global observers and always run the error hook.
    pub fn is_rich(self) -> bool {
        matches!(
            self,
            OperationKind::Get
                | OperationKind::Set
                | OperationKind::Apply
                | OperationKind::Construct
        )
    }

    /// Kinds whose result modifier is consulted before delegation and may
    /// veto the attempt.
    pub fn is_vetoable(self) -> bool {
        matches!(
            self,
            OperationKind::Set | OperationKind::DeleteProperty | OperationKind::DefineProperty
        )
    }

    /// Kinds whose full-override hook may short-circuit delegation.
    pub fn supports_override(self) -> bool {
        self.is_rich()
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ConfigError;

    /// Accepts the canonical names plus the short aliases of the reduced
    /// configuration shape (`delete`, `define`, `call`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "get" => OperationKind::Get,
            "set" => OperationKind::Set,
            "has" => OperationKind::Has,
            "deleteProperty" | "delete" => OperationKind::DeleteProperty,
            "defineProperty" | "define" => OperationKind::DefineProperty,
            "getOwnPropertyDescriptor" | "descriptor" => OperationKind::GetOwnPropertyDescriptor,
            "ownKeys" | "keys" => OperationKind::OwnKeys,
            "getPrototypeOf" | "prototype" => OperationKind::GetPrototypeOf,
            "setPrototypeOf" => OperationKind::SetPrototypeOf,
            "isExtensible" => OperationKind::IsExtensible,
            "preventExtensions" => OperationKind::PreventExtensions,
            "apply" | "call" => OperationKind::Apply,
            "construct" => OperationKind::Construct,
            other => return Err(ConfigError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

/// A fundamental operation together with its payload.
#[derive(Debug, Clone)]
pub enum Operation {
    Get { key: PropertyKey },
    Set { key: PropertyKey, value: Value },
    Has { key: PropertyKey },
    DeleteProperty { key: PropertyKey },
    DefineProperty { key: PropertyKey, descriptor: PropertyDescriptor },
    GetOwnPropertyDescriptor { key: PropertyKey },
    OwnKeys,
    GetPrototypeOf,
    SetPrototypeOf { prototype: Option<ObjectRef> },
    IsExtensible,
    PreventExtensions,
    Apply { this: Value, args: Vec<Value> },
    /// `new_target` defaults to the target itself.
    Construct { args: Vec<Value>, new_target: Option<ObjectRef> },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Get { .. } => OperationKind::Get,
            Operation::Set { .. } => OperationKind::Set,
            Operation::Has { .. } => OperationKind::Has,
            Operation::DeleteProperty { .. } => OperationKind::DeleteProperty,
            Operation::DefineProperty { .. } => OperationKind::DefineProperty,
            Operation::GetOwnPropertyDescriptor { .. } => OperationKind::GetOwnPropertyDescriptor,
            Operation::OwnKeys => OperationKind::OwnKeys,
            Operation::GetPrototypeOf => OperationKind::GetPrototypeOf,
            Operation::SetPrototypeOf { .. } => OperationKind::SetPrototypeOf,
            Operation::IsExtensible => OperationKind::IsExtensible,
            Operation::PreventExtensions => OperationKind::PreventExtensions,
            Operation::Apply { .. } => OperationKind::Apply,
            Operation::Construct { .. } => OperationKind::Construct,
        }
    }

    pub fn key(&self) -> Option<&PropertyKey> {
        match self {
            Operation::Get { key }
            | Operation::Set { key, .. }
            | Operation::Has { key }
            | Operation::DeleteProperty { key }
            | Operation::DefineProperty { key, .. }
            | Operation::GetOwnPropertyDescriptor { key } => Some(key),
            _ => None,
        }
    }

    pub fn arguments(&self) -> Option<&[Value]> {
        match self {
            Operation::Apply { args, .. } | Operation::Construct { args, .. } => Some(args),
            _ => None,
        }
    }

    pub(crate) fn arguments_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Operation::Apply { args, .. } | Operation::Construct { args, .. } => Some(args),
            _ => None,
        }
    }

    /// Performs the operation directly on `target`, with no interposition.
    pub fn perform(&self, target: &ObjectRef) -> Result<Outcome, Fault> {
        let receiver = Value::Object(target.clone());
        let outcome = match self {
            Operation::Get { key } => Outcome::Value(target.get(key, &receiver)?),
            Operation::Set { key, value } => {
                Outcome::Bool(target.set(key, value.clone(), &receiver)?)
            }
            Operation::Has { key } => Outcome::Bool(target.has(key)),
            Operation::DeleteProperty { key } => Outcome::Bool(target.delete(key)),
            Operation::DefineProperty { key, descriptor } => {
                Outcome::Bool(target.define_own_property(key, descriptor))
            }
            Operation::GetOwnPropertyDescriptor { key } => {
                Outcome::Descriptor(target.get_own_property(key))
            }
            Operation::OwnKeys => Outcome::Keys(target.own_keys()),
            Operation::GetPrototypeOf => Outcome::Prototype(target.get_prototype_of()),
            Operation::SetPrototypeOf { prototype } => {
                Outcome::Bool(target.set_prototype_of(prototype.clone()))
            }
            Operation::IsExtensible => Outcome::Bool(target.is_extensible()),
            Operation::PreventExtensions => Outcome::Bool(target.prevent_extensions()),
            Operation::Apply { this, args } => Outcome::Value(target.call(this, args)?),
            Operation::Construct { args, new_target } => {
                let new_target = new_target.as_ref().unwrap_or(target);
                Outcome::Value(target.construct(args, new_target)?)
            }
        };
        Ok(outcome)
    }
}

/// Result of a fundamental operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    /// `get`, `apply`, `construct`.
    Value(Value),
    /// Success flags and boolean queries.
    Bool(bool),
    /// `ownKeys`.
    Keys(Vec<PropertyKey>),
    /// `getOwnPropertyDescriptor`.
    Descriptor(Option<PropertyDescriptor>),
    /// `getPrototypeOf`.
    Prototype(Option<ObjectRef>),
}

impl Outcome {
    /// Whether this outcome has the shape `kind` produces.
    pub fn fits(&self, kind: OperationKind) -> bool {
        use OperationKind::*;
        match self {
            Outcome::Value(_) => matches!(kind, Get | Apply | Construct),
            Outcome::Bool(_) => matches!(
                kind,
                Set | Has | DeleteProperty | DefineProperty | SetPrototypeOf | IsExtensible
                    | PreventExtensions
            ),
            Outcome::Keys(_) => kind == OwnKeys,
            Outcome::Descriptor(_) => kind == GetOwnPropertyDescriptor,
            Outcome::Prototype(_) => kind == GetPrototypeOf,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Outcome::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_keys(self) -> Option<Vec<PropertyKey>> {
        match self {
            Outcome::Keys(keys) => Some(keys),
            _ => None,
        }
    }

    pub fn into_descriptor(self) -> Option<Option<PropertyDescriptor>> {
        match self {
            Outcome::Descriptor(desc) => Some(desc),
            _ => None,
        }
    }

    pub fn into_prototype(self) -> Option<Option<ObjectRef>> {
        match self {
            Outcome::Prototype(proto) => Some(proto),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(value) => write!(f, "{}", value),
            Outcome::Bool(b) => write!(f, "{}", b),
            Outcome::Keys(keys) => {
                let keys: Vec<&str> = keys.iter().map(PropertyKey::as_str).collect();
                write!(f, "[{}]", keys.join(", "))
            }
            Outcome::Descriptor(Some(_)) => f.write_str("<descriptor>"),
            Outcome::Descriptor(None) => f.write_str("undefined"),
            Outcome::Prototype(Some(proto)) => write!(f, "{}", proto),
            Outcome::Prototype(None) => f.write_str("null"),
        }
    }
}
