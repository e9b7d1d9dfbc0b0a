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

//! Shared entities with ordinary-object semantics.
//!
//! An [`ObjectRef`] is an identity-bearing handle to a mutable aggregate of
//! ordered properties, an optional prototype and an extensible flag. It may
//! also carry a [`Callable`], which makes it an invocable (and, when flagged,
//! a constructor).
//!
//! Each of the 13 fundamental operations has an inherent method here. These
//! are the operations a facade delegates to.
//!
//! # Locking
//!
//! The object lock is never held while user code runs. Accessors, callables
//! and prototype walks clone what they need out of the lock first, so a
//! getter may freely read or write the object it is defined on.

use crate::error::Fault;
use crate::value::{PropertyDescriptor, PropertyKey, Value};
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Native call behaviour: `(receiver, arguments) -> result`.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync;

/// Call behaviour attached to an invocable entity.
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Arc<NativeFn>,
    constructor: bool,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            constructor: false,
        }
    }

    /// Mark this callable as usable with `construct`.
    pub fn as_constructor(mut self) -> Self {
        self.constructor = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_constructor(&self) -> bool {
        self.constructor
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, Fault> {
        (self.func)(this, args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("constructor", &self.constructor)
            .finish()
    }
}

/// Stable identity of an entity for as long as it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Data {
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
        enumerable: bool,
        configurable: bool,
    },
}

impl Slot {
    fn plain(value: Value) -> Self {
        Slot::Data {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    fn from_descriptor(desc: &PropertyDescriptor) -> Self {
        let enumerable = desc.enumerable.unwrap_or(false);
        let configurable = desc.configurable.unwrap_or(false);
        if desc.is_accessor() {
            Slot::Accessor {
                get: desc.get.as_ref().and_then(|v| v.as_object().cloned()),
                set: desc.set.as_ref().and_then(|v| v.as_object().cloned()),
                enumerable,
                configurable,
            }
        } else {
            Slot::Data {
                value: desc.value.clone().unwrap_or_default(),
                writable: desc.writable.unwrap_or(false),
                enumerable,
                configurable,
            }
        }
    }

    fn enumerable(&self) -> bool {
        match self {
            Slot::Data { enumerable, .. } | Slot::Accessor { enumerable, .. } => *enumerable,
        }
    }

    fn configurable(&self) -> bool {
        match self {
            Slot::Data { configurable, .. } | Slot::Accessor { configurable, .. } => *configurable,
        }
    }

    fn to_descriptor(&self) -> PropertyDescriptor {
        match self {
            Slot::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => PropertyDescriptor {
                value: Some(value.clone()),
                writable: Some(*writable),
                enumerable: Some(*enumerable),
                configurable: Some(*configurable),
                ..Default::default()
            },
            Slot::Accessor {
                get,
                set,
                enumerable,
                configurable,
            } => PropertyDescriptor {
                get: Some(get.clone().map(Value::Object).unwrap_or_default()),
                set: Some(set.clone().map(Value::Object).unwrap_or_default()),
                enumerable: Some(*enumerable),
                configurable: Some(*configurable),
                ..Default::default()
            },
        }
    }

    /// Whether `desc` may be applied to this non-configurable slot.
    fn accepts_on_frozen(&self, desc: &PropertyDescriptor) -> bool {
        if desc.configurable == Some(true) {
            return false;
        }
        if desc.enumerable.is_some_and(|e| e != self.enumerable()) {
            return false;
        }
        match self {
            Slot::Data {
                value, writable, ..
            } => {
                if desc.is_accessor() {
                    return false;
                }
                if !*writable {
                    if desc.writable == Some(true) {
                        return false;
                    }
                    if desc.value.as_ref().is_some_and(|v| v != value) {
                        return false;
                    }
                }
                true
            }
            Slot::Accessor { get, set, .. } => {
                if desc.is_data() {
                    return false;
                }
                let same = |current: &Option<ObjectRef>, requested: &Option<Value>| {
                    requested.as_ref().map_or(true, |v| {
                        v.as_object().map(|o| o.id()) == current.as_ref().map(|o| o.id())
                    })
                };
                same(get, &desc.get) && same(set, &desc.set)
            }
        }
    }

    fn apply(&mut self, desc: &PropertyDescriptor) {
        let enumerable = desc.enumerable.unwrap_or(self.enumerable());
        let configurable = desc.configurable.unwrap_or(self.configurable());

        // Switching between data and accessor keeps only the shared attributes.
        match self {
            Slot::Data { .. } if desc.is_accessor() => {
                *self = Slot::Accessor {
                    get: None,
                    set: None,
                    enumerable,
                    configurable,
                };
            }
            Slot::Accessor { .. } if desc.is_data() => {
                *self = Slot::Data {
                    value: Value::Undefined,
                    writable: false,
                    enumerable,
                    configurable,
                };
            }
            _ => {}
        }

        match self {
            Slot::Data {
                value,
                writable,
                enumerable: e,
                configurable: c,
            } => {
                if let Some(v) = &desc.value {
                    *value = v.clone();
                }
                if let Some(w) = desc.writable {
                    *writable = w;
                }
                *e = enumerable;
                *c = configurable;
            }
            Slot::Accessor {
                get,
                set,
                enumerable: e,
                configurable: c,
            } => {
                if let Some(g) = &desc.get {
                    *get = g.as_object().cloned();
                }
                if let Some(s) = &desc.set {
                    *set = s.as_object().cloned();
                }
                *e = enumerable;
                *c = configurable;
            }
        }
    }
}

/// Own properties in insertion order.
#[derive(Debug, Default)]
struct PropertyTable {
    slots: HashMap<PropertyKey, Slot>,
    order: Vec<PropertyKey>,
}

impl PropertyTable {
    fn get(&self, key: &PropertyKey) -> Option<&Slot> {
        self.slots.get(key)
    }

    fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut Slot> {
        self.slots.get_mut(key)
    }

    fn insert(&mut self, key: PropertyKey, slot: Slot) {
        if self.slots.insert(key.clone(), slot).is_none() {
            self.order.push(key);
        }
    }

    fn remove(&mut self, key: &PropertyKey) {
        if self.slots.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    /// Index keys ascending, then the remaining keys in insertion order.
    fn keys(&self) -> Vec<PropertyKey> {
        let mut indexed: Vec<(u32, &PropertyKey)> = self
            .order
            .iter()
            .filter_map(|k| k.as_index().map(|i| (i, k)))
            .collect();
        indexed.sort_by_key(|(i, _)| *i);

        indexed
            .into_iter()
            .map(|(_, k)| k.clone())
            .chain(self.order.iter().filter(|k| k.as_index().is_none()).cloned())
            .collect()
    }
}

#[derive(Debug)]
struct ObjectData {
    prototype: Option<ObjectRef>,
    extensible: bool,
    properties: PropertyTable,
    callable: Option<Callable>,
}

/// Shared handle to an entity. Cloning the handle does not clone the entity.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<ObjectData>>);

/// Non-owning counterpart of [`ObjectRef`].
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RwLock<ObjectData>>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakObjectRef")
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRef {
    /// A new empty, extensible entity with no prototype.
    pub fn new() -> Self {
        Self::with_prototype(None)
    }

    pub fn with_prototype(prototype: Option<ObjectRef>) -> Self {
        ObjectRef(Arc::new(RwLock::new(ObjectData {
            prototype,
            extensible: true,
            properties: PropertyTable::default(),
            callable: None,
        })))
    }

    /// An entity populated with plain data properties, in order.
    pub fn from_entries<K, V, I>(entries: I) -> Self
    where
        K: Into<PropertyKey>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let object = Self::new();
        {
            let mut data = object.0.write();
            for (key, value) in entries {
                data.properties.insert(key.into(), Slot::plain(value.into()));
            }
        }
        object
    }

    /// An invocable entity.
    pub fn function<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::from_callable(Callable::new(name, func))
    }

    /// An invocable entity usable with `construct`. It receives a fresh
    /// `prototype` object, like an ordinary constructor.
    pub fn constructor<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        let object = Self::from_callable(Callable::new(name, func).as_constructor());
        object.0.write().properties.insert(
            PropertyKey::from("prototype"),
            Slot::Data {
                value: Value::Object(ObjectRef::new()),
                writable: true,
                enumerable: false,
                configurable: false,
            },
        );
        object
    }

    pub fn from_callable(callable: Callable) -> Self {
        let object = Self::new();
        object.0.write().callable = Some(callable);
        object
    }

    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    pub fn is_callable(&self) -> bool {
        self.0.read().callable.is_some()
    }

    pub fn is_constructor(&self) -> bool {
        self.0
            .read()
            .callable
            .as_ref()
            .is_some_and(Callable::is_constructor)
    }

    /// Own data value for `key`, without running accessors.
    pub fn peek(&self, key: &PropertyKey) -> Option<Value> {
        match self.0.read().properties.get(key) {
            Some(Slot::Data { value, .. }) => Some(value.clone()),
            _ => None,
        }
    }

    /// Looks `key` up along the prototype chain.
    fn lookup(&self, key: &PropertyKey) -> Option<Slot> {
        let mut current = self.clone();
        loop {
            let (slot, prototype) = {
                let data = current.0.read();
                (data.properties.get(key).cloned(), data.prototype.clone())
            };
            if slot.is_some() {
                return slot;
            }
            current = prototype?;
        }
    }

    pub fn get(&self, key: &PropertyKey, receiver: &Value) -> Result<Value, Fault> {
        match self.lookup(key) {
            Some(Slot::Data { value, .. }) => Ok(value),
            Some(Slot::Accessor {
                get: Some(getter), ..
            }) => getter.call(receiver, &[]),
            Some(Slot::Accessor { get: None, .. }) | None => Ok(Value::Undefined),
        }
    }

    pub fn set(&self, key: &PropertyKey, value: Value, receiver: &Value) -> Result<bool, Fault> {
        match self.lookup(key) {
            Some(Slot::Accessor {
                set: Some(setter), ..
            }) => {
                setter.call(receiver, &[value])?;
                Ok(true)
            }
            Some(Slot::Accessor { set: None, .. }) => Ok(false),
            Some(Slot::Data {
                writable: false, ..
            }) => Ok(false),
            _ => match receiver {
                Value::Object(target) => Ok(target.write_own_data(key, value)),
                _ => Ok(false),
            },
        }
    }

    fn write_own_data(&self, key: &PropertyKey, value: Value) -> bool {
        let mut guard = self.0.write();
        let data = &mut *guard;
        let extensible = data.extensible;
        match data.properties.get_mut(key) {
            Some(Slot::Data {
                value: current,
                writable: true,
                ..
            }) => {
                *current = value;
                true
            }
            Some(_) => false,
            None if extensible => {
                data.properties.insert(key.clone(), Slot::plain(value));
                true
            }
            None => false,
        }
    }

    pub fn has(&self, key: &PropertyKey) -> bool {
        self.lookup(key).is_some()
    }

    pub fn delete(&self, key: &PropertyKey) -> bool {
        let mut data = self.0.write();
        match data.properties.get(key).map(Slot::configurable) {
            None => true,
            Some(false) => false,
            Some(true) => {
                data.properties.remove(key);
                true
            }
        }
    }

    pub fn define_own_property(&self, key: &PropertyKey, desc: &PropertyDescriptor) -> bool {
        let mut guard = self.0.write();
        let data = &mut *guard;
        let extensible = data.extensible;
        match data.properties.get_mut(key) {
            None if !extensible => false,
            None => {
                data.properties
                    .insert(key.clone(), Slot::from_descriptor(desc));
                true
            }
            Some(slot) => {
                if !slot.configurable() && !slot.accepts_on_frozen(desc) {
                    return false;
                }
                slot.apply(desc);
                true
            }
        }
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.0.read().properties.get(key).map(Slot::to_descriptor)
    }

    pub fn own_keys(&self) -> Vec<PropertyKey> {
        self.0.read().properties.keys()
    }

    pub fn get_prototype_of(&self) -> Option<ObjectRef> {
        self.0.read().prototype.clone()
    }

    pub fn set_prototype_of(&self, prototype: Option<ObjectRef>) -> bool {
        let (current, extensible) = {
            let data = self.0.read();
            (data.prototype.clone(), data.extensible)
        };
        let unchanged = match (&current, &prototype) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return true;
        }
        if !extensible {
            return false;
        }

        // Reject cycles.
        let mut cursor = prototype.clone();
        while let Some(candidate) = cursor {
            if candidate.ptr_eq(self) {
                return false;
            }
            cursor = candidate.get_prototype_of();
        }

        self.0.write().prototype = prototype;
        true
    }

    pub fn is_extensible(&self) -> bool {
        self.0.read().extensible
    }

    pub fn prevent_extensions(&self) -> bool {
        self.0.write().extensible = false;
        true
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value, Fault> {
        let callable = self.0.read().callable.clone();
        match callable {
            Some(callable) => callable.call(this, args),
            None => Err(Fault::type_error(format!("{} is not a function", self))),
        }
    }

    /// Creates a new instance. `new_target` supplies the `prototype` of the
    /// created entity.
    pub fn construct(&self, args: &[Value], new_target: &ObjectRef) -> Result<Value, Fault> {
        let callable = self.0.read().callable.clone();
        let callable = match callable {
            Some(callable) if callable.is_constructor() => callable,
            _ => return Err(Fault::type_error(format!("{} is not a constructor", self))),
        };

        let prototype = new_target
            .get(&PropertyKey::from("prototype"), &Value::Object(new_target.clone()))?
            .as_object()
            .cloned();
        let instance = ObjectRef::with_prototype(prototype);

        match callable.call(&Value::Object(instance.clone()), args)? {
            result @ Value::Object(_) => Ok(result),
            _ => Ok(Value::Object(instance)),
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.id())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.read().callable {
            Some(callable) => write!(f, "[function {}]", callable.name()),
            None => write!(f, "[object {}]", self.id()),
        }
    }
}

impl Serialize for ObjectRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(k: &str) -> PropertyKey {
        PropertyKey::from(k)
    }

    #[test]
    fn test_get_walks_prototype_chain() {
        let proto = ObjectRef::from_entries([("greeting", "hi")]);
        let object = ObjectRef::with_prototype(Some(proto));
        let receiver = Value::Object(object.clone());

        assert_eq!(object.get(&key("greeting"), &receiver).unwrap(), Value::from("hi"));
        assert!(object.has(&key("greeting")));
        assert!(object.get_own_property(&key("greeting")).is_none());
        assert_eq!(object.get(&key("missing"), &receiver).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_set_creates_own_property_and_respects_readonly() {
        let object = ObjectRef::new();
        let receiver = Value::Object(object.clone());

        assert!(object.set(&key("a"), Value::from(1), &receiver).unwrap());
        assert_eq!(object.peek(&key("a")), Some(Value::from(1)));

        object.define_own_property(&key("ro"), &PropertyDescriptor::data(5).writable(false));
        assert!(!object.set(&key("ro"), Value::from(6), &receiver).unwrap());
        assert_eq!(object.peek(&key("ro")), Some(Value::from(5)));
    }

    #[test]
    fn test_non_extensible_rejects_new_properties() {
        let object = ObjectRef::from_entries([("a", 1)]);
        let receiver = Value::Object(object.clone());
        assert!(object.prevent_extensions());
        assert!(!object.is_extensible());

        assert!(!object.set(&key("b"), Value::from(2), &receiver).unwrap());
        assert!(object.set(&key("a"), Value::from(3), &receiver).unwrap());
        assert!(!object.define_own_property(&key("c"), &PropertyDescriptor::data(1)));
    }

    #[test]
    fn test_delete_respects_configurable() {
        let object = ObjectRef::from_entries([("a", 1)]);
        object.define_own_property(
            &key("fixed"),
            &PropertyDescriptor::data(1).configurable(false),
        );

        assert!(object.delete(&key("a")));
        assert!(object.delete(&key("never_existed")));
        assert!(!object.delete(&key("fixed")));
        assert!(object.has(&key("fixed")));
    }

    #[test]
    fn test_redefine_frozen_property() {
        let object = ObjectRef::new();
        let frozen = PropertyDescriptor {
            value: Some(Value::from(1)),
            ..Default::default()
        };
        assert!(object.define_own_property(&key("x"), &frozen));

        // Same value is accepted, anything else is not.
        let same = PropertyDescriptor::default().with_value(1);
        let changed = PropertyDescriptor::default().with_value(2);
        let unlocked = PropertyDescriptor::default().writable(true);
        assert!(object.define_own_property(&key("x"), &same));
        assert!(!object.define_own_property(&key("x"), &changed));
        assert!(!object.define_own_property(&key("x"), &unlocked));
    }

    #[test]
    fn test_own_keys_order() {
        let object = ObjectRef::from_entries([("b", 1), ("2", 1), ("a", 1), ("0", 1)]);
        let keys: Vec<String> = object.own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "2", "b", "a"]);

        object.delete(&key("b"));
        object.set(&key("b"), Value::from(1), &Value::Object(object.clone())).unwrap();
        let keys: Vec<String> = object.own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "2", "a", "b"]);
    }

    #[test]
    fn test_accessor_runs_without_holding_lock() {
        let object = ObjectRef::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let getter = ObjectRef::function("get_size", move |this, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Reentrant read of the receiver.
            let own = this.as_object().map(|o| o.own_keys().len()).unwrap_or(0);
            Ok(Value::from(own as f64))
        });
        object.define_own_property(&key("size"), &PropertyDescriptor::accessor(Some(getter), None));

        let value = object.get(&key("size"), &Value::Object(object.clone())).unwrap();
        assert_eq!(value, Value::from(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Getter-only accessors reject writes.
        assert!(!object.set(&key("size"), Value::from(3), &Value::Object(object.clone())).unwrap());
    }

    #[test]
    fn test_set_prototype_rejects_cycles() {
        let a = ObjectRef::new();
        let b = ObjectRef::with_prototype(Some(a.clone()));
        assert!(!a.set_prototype_of(Some(b.clone())));
        assert!(a.set_prototype_of(None));

        b.prevent_extensions();
        assert!(b.set_prototype_of(Some(a.clone())));
        assert!(!b.set_prototype_of(None));
    }

    #[test]
    fn test_call_and_construct() {
        let add = ObjectRef::function("add", |_, args| {
            let sum: f64 = args.iter().filter_map(Value::as_number).sum();
            Ok(Value::from(sum))
        });
        let args = [Value::from(1), Value::from(2)];
        assert_eq!(add.call(&Value::Undefined, &args).unwrap(), Value::from(3));
        assert!(matches!(add.construct(&[], &add), Err(Fault::Type(_))));

        let point = ObjectRef::constructor("Point", |this, args| {
            let this = this.as_object().cloned().unwrap_or_default();
            let x = args.first().cloned().unwrap_or_default();
            this.set(&PropertyKey::from("x"), x, &Value::Object(this.clone()))?;
            Ok(Value::Undefined)
        });
        let instance = point.construct(&[Value::from(7)], &point).unwrap();
        let instance = instance.as_object().unwrap();
        assert_eq!(instance.peek(&key("x")), Some(Value::from(7)));

        let proto = point.peek(&key("prototype")).unwrap();
        assert_eq!(instance.get_prototype_of().map(Value::Object), Some(proto));
    }

    #[test]
    fn test_calling_plain_object_faults() {
        let object = ObjectRef::new();
        let err = object.call(&Value::Undefined, &[]).unwrap_err();
        assert!(err.to_string().contains("is not a function"));
    }
}
