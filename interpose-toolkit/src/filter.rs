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

//! Property membership gate.

use interpose_core::{ConfigurationBuilder, OperationContext, PropertyKey};
use std::collections::HashSet;
use std::sync::Arc;

/// Restricts a session to a fixed set of properties.
///
/// Operations on other properties, and operations that carry no property
/// (`ownKeys`, `apply`, ...), bypass the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    properties: Arc<HashSet<PropertyKey>>,
}

impl PropertyFilter {
    pub fn new<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PropertyKey>,
    {
        Self {
            properties: Arc::new(properties.into_iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.properties.contains(key)
    }

    /// The gate verdict for `ctx`.
    pub fn admits(&self, ctx: &OperationContext) -> bool {
        ctx.property().is_some_and(|key| self.contains(key))
    }

    /// Installs this filter as the gate of `builder`.
    pub fn apply(&self, builder: ConfigurationBuilder) -> ConfigurationBuilder {
        let filter = self.clone();
        builder.should_intercept(move |ctx| filter.admits(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpose_core::{Configuration, Interposer, ObjectRef, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_only_listed_properties_are_observed() {
        let engine = Interposer::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();

        let filter = PropertyFilter::new(["password", "token"]);
        assert_eq!(filter.len(), 2);

        let builder = Configuration::builder().on_before(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let target = ObjectRef::from_entries([("password", "hunter2"), ("user", "ann")]);
        let facade = engine.install(target, filter.apply(builder), None).unwrap();

        assert_eq!(facade.get("user").unwrap(), Value::from("ann"));
        facade.own_keys().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert_eq!(facade.get("password").unwrap(), Value::from("hunter2"));
        assert!(facade.set("token", "t").unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_filter_admits_nothing() {
        let filter = PropertyFilter::default();
        assert!(filter.is_empty());
        assert!(!filter.contains(&PropertyKey::from("a")));
    }
}
