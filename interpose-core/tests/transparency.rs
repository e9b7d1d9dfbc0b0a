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

//! Property tests: an empty configuration is invisible

use interpose_core::{
    Configuration, Interposer, ObjectRef, Operation, PropertyDescriptor, PropertyKey, Value,
};
use proptest::prelude::*;

fn key() -> impl Strategy<Value = PropertyKey> {
    prop::sample::select(vec!["a", "b", "c", "0", "7"]).prop_map(PropertyKey::from)
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        key().prop_map(|key| Operation::Get { key }),
        (key(), any::<i32>()).prop_map(|(key, v)| Operation::Set {
            key,
            value: Value::from(v),
        }),
        key().prop_map(|key| Operation::Has { key }),
        key().prop_map(|key| Operation::DeleteProperty { key }),
        (key(), any::<i32>(), any::<bool>()).prop_map(|(key, v, locked)| {
            Operation::DefineProperty {
                key,
                descriptor: PropertyDescriptor::data(v)
                    .writable(!locked)
                    .configurable(!locked),
            }
        }),
        key().prop_map(|key| Operation::GetOwnPropertyDescriptor { key }),
        Just(Operation::OwnKeys),
        Just(Operation::GetPrototypeOf),
        Just(Operation::IsExtensible),
        Just(Operation::PreventExtensions),
    ]
}

fn seeded() -> ObjectRef {
    ObjectRef::from_entries([("a", 1), ("b", 2)])
}

proptest! {
    /// Test that every operation through an unconfigured facade matches the
    /// same operation on an identical, unwrapped object
    #[test]
    fn prop_empty_configuration_is_transparent(ops in prop::collection::vec(operation(), 1..40)) {
        let engine = Interposer::new();
        let wrapped = seeded();
        let mirror = seeded();
        let facade = engine.install(wrapped.clone(), Configuration::default(), None).unwrap();

        for op in ops {
            let direct = op.perform(&mirror);
            let interposed = facade.dispatch(op.clone());
            match (direct, interposed) {
                (Ok(expected), Ok(actual)) => prop_assert_eq!(expected, actual, "{:?}", op),
                (Err(expected), Err(actual)) => {
                    prop_assert_eq!(Some(&expected), actual.fault(), "{:?}", op)
                }
                (expected, actual) => {
                    prop_assert!(false, "{:?}: {:?} vs {:?}", op, expected, actual)
                }
            }
        }

        prop_assert_eq!(wrapped.own_keys(), mirror.own_keys());
        prop_assert_eq!(wrapped.is_extensible(), mirror.is_extensible());
    }

    /// Test that invocation results pass through unchanged
    #[test]
    fn prop_invocation_is_transparent(args in prop::collection::vec(-1000i32..1000, 0..8)) {
        let engine = Interposer::new();
        let sum = ObjectRef::function("sum", |_, args| {
            Ok(Value::from(args.iter().filter_map(Value::as_number).sum::<f64>()))
        });
        let facade = engine.install(sum.clone(), Configuration::default(), None).unwrap();

        let args: Vec<Value> = args.into_iter().map(Value::from).collect();
        let direct = sum.call(&Value::Undefined, &args).unwrap();
        let interposed = facade.call(Value::Undefined, args).unwrap();
        prop_assert_eq!(direct, interposed);
    }
}
