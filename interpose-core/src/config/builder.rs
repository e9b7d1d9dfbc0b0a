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

//! Builder for the rich configuration profile.

use super::{Configuration, ContextHook, LogLevel, ResultModifier, Toggle};
use crate::context::OperationContext;
use crate::error::{HookError, InterposeError};
use crate::object::{Callable, ObjectRef};
use crate::operation::{OperationKind, Outcome};
use crate::value::{PropertyDescriptor, PropertyKey, Value};
use std::sync::Arc;

/// Builder for [`Configuration`].
///
/// Setting a hook twice replaces the earlier one, except for
/// [`also_on_after`](Self::also_on_after) which chains.
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    config: Configuration,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: Configuration) -> Self {
        Self { config }
    }

    pub fn log(mut self, log: impl Into<Toggle>) -> Self {
        self.config.log = log.into();
        self
    }

    pub fn log_when<F>(self, predicate: F) -> Self
    where
        F: Fn(&OperationContext) -> bool + Send + Sync + 'static,
    {
        self.log(Toggle::when(predicate))
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = Some(level);
        self
    }

    pub fn debug(mut self, debug: impl Into<Toggle>) -> Self {
        self.config.debug = debug.into();
        self
    }

    pub fn debug_when<F>(self, predicate: F) -> Self
    where
        F: Fn(&OperationContext) -> bool + Send + Sync + 'static,
    {
        self.debug(Toggle::when(predicate))
    }

    pub fn on_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.on_before = Some(Arc::new(hook));
        self
    }

    pub fn on_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.on_after = Some(Arc::new(hook));
        self
    }

    /// Adds an engine-wide after-hook that runs after any existing one.
    pub fn also_on_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        let chained: ContextHook = match self.config.on_after.take() {
            Some(first) => Arc::new(move |ctx: &OperationContext| {
                let first_result = first(ctx);
                let second_result = hook(ctx);
                first_result.and(second_result)
            }),
            None => Arc::new(hook),
        };
        self.config.on_after = Some(chained);
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&OperationContext, &InterposeError) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.on_error = Some(Arc::new(hook));
        self
    }

    /// Kind-specific before-hook.
    pub fn before<F>(mut self, kind: OperationKind, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.profile_mut(kind).before = Some(Arc::new(hook));
        self
    }

    /// Kind-specific after-hook. It sees the result of the operation.
    pub fn on<F>(mut self, kind: OperationKind, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.config.profile_mut(kind).after = Some(Arc::new(hook));
        self
    }

    pub fn on_get<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(OperationKind::Get, hook)
    }

    pub fn on_set<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(OperationKind::Set, hook)
    }

    pub fn on_call<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(OperationKind::Apply, hook)
    }

    pub fn on_construct<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(OperationKind::Construct, hook)
    }

    pub fn on_define<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(OperationKind::DefineProperty, hook)
    }

    pub fn on_delete<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(OperationKind::DeleteProperty, hook)
    }

    pub fn on_has<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.on(OperationKind::Has, hook)
    }

    /// Full override for `kind`. Only `get`, `set`, `apply` and `construct`
    /// consult it; on other kinds it is ignored with a warning at install.
    pub fn intercept<F>(mut self, kind: OperationKind, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
    {
        self.config.profile_mut(kind).intercept = Some(Arc::new(hook));
        self
    }

    pub fn intercept_get<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
    {
        self.intercept(OperationKind::Get, hook)
    }

    /// Override for `set`. A `Value::Bool` short-circuits with that success
    /// flag; any other value lets the pipeline continue.
    pub fn intercept_set<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
    {
        self.intercept(OperationKind::Set, hook)
    }

    pub fn intercept_call<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
    {
        self.intercept(OperationKind::Apply, hook)
    }

    pub fn intercept_construct<F>(self, hook: F) -> Self
    where
        F: Fn(&OperationContext) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
    {
        self.intercept(OperationKind::Construct, hook)
    }

    pub fn modify_args<F>(mut self, modifier: F) -> Self
    where
        F: Fn(&[Value], &OperationContext) -> Result<Option<Vec<Value>>, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.config.modify_args = Some(Arc::new(modifier));
        self
    }

    /// Raw outcome modifier for any kind.
    pub fn modify_outcome<F>(mut self, kind: OperationKind, modifier: F) -> Self
    where
        F: Fn(Outcome, &OperationContext) -> Result<Outcome, HookError> + Send + Sync + 'static,
    {
        self.config.profile_mut(kind).modify_result = Some(Arc::new(modifier));
        self
    }

    /// Result modifier for `apply` and `construct`.
    pub fn modify_result<F>(mut self, modifier: F) -> Self
    where
        F: Fn(Value, &OperationContext) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        let modifier = value_modifier(modifier);
        self.config.profile_mut(OperationKind::Apply).modify_result = Some(modifier.clone());
        self.config.profile_mut(OperationKind::Construct).modify_result = Some(modifier);
        self
    }

    pub fn modify_get_result<F>(mut self, modifier: F) -> Self
    where
        F: Fn(Value, &OperationContext) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        self.config.profile_mut(OperationKind::Get).modify_result = Some(value_modifier(modifier));
        self
    }

    /// Veto for `set`, consulted before the write is attempted.
    pub fn modify_set_result<F>(self, modifier: F) -> Self
    where
        F: Fn(bool, &OperationContext) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        self.modify_bool(OperationKind::Set, modifier)
    }

    pub fn modify_has_result<F>(self, modifier: F) -> Self
    where
        F: Fn(bool, &OperationContext) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        self.modify_bool(OperationKind::Has, modifier)
    }

    /// Veto for `deleteProperty`, consulted before the delete is attempted.
    pub fn modify_delete_result<F>(self, modifier: F) -> Self
    where
        F: Fn(bool, &OperationContext) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        self.modify_bool(OperationKind::DeleteProperty, modifier)
    }

    /// Veto for `defineProperty`, consulted before the definition is attempted.
    pub fn modify_define_result<F>(self, modifier: F) -> Self
    where
        F: Fn(bool, &OperationContext) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        self.modify_bool(OperationKind::DefineProperty, modifier)
    }

    pub fn modify_own_keys_result<F>(self, modifier: F) -> Self
    where
        F: Fn(Vec<PropertyKey>, &OperationContext) -> Result<Vec<PropertyKey>, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.modify_outcome(OperationKind::OwnKeys, move |outcome, ctx| match outcome {
            Outcome::Keys(keys) => modifier(keys, ctx).map(Outcome::Keys),
            other => Ok(other),
        })
    }

    pub fn modify_descriptor_result<F>(self, modifier: F) -> Self
    where
        F: Fn(
                Option<PropertyDescriptor>,
                &OperationContext,
            ) -> Result<Option<PropertyDescriptor>, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.modify_outcome(
            OperationKind::GetOwnPropertyDescriptor,
            move |outcome, ctx| match outcome {
                Outcome::Descriptor(desc) => modifier(desc, ctx).map(Outcome::Descriptor),
                other => Ok(other),
            },
        )
    }

    pub fn modify_prototype_result<F>(self, modifier: F) -> Self
    where
        F: Fn(Option<ObjectRef>, &OperationContext) -> Result<Option<ObjectRef>, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.modify_outcome(OperationKind::GetPrototypeOf, move |outcome, ctx| match outcome {
            Outcome::Prototype(proto) => modifier(proto, ctx).map(Outcome::Prototype),
            other => Ok(other),
        })
    }

    fn modify_bool<F>(self, kind: OperationKind, modifier: F) -> Self
    where
        F: Fn(bool, &OperationContext) -> Result<bool, HookError> + Send + Sync + 'static,
    {
        self.modify_outcome(kind, move |outcome, ctx| match outcome {
            Outcome::Bool(b) => modifier(b, ctx).map(Outcome::Bool),
            other => Ok(other),
        })
    }

    /// For `apply`, runs the callable `replacer` returns in place of the target.
    pub fn replace_function<F>(mut self, replacer: F) -> Self
    where
        F: Fn(&OperationContext) -> Option<Callable> + Send + Sync + 'static,
    {
        self.config.replace_function = Some(Arc::new(replacer));
        self
    }

    pub fn should_intercept<F>(mut self, gate: F) -> Self
    where
        F: Fn(&OperationContext) -> bool + Send + Sync + 'static,
    {
        self.config.should_intercept = Some(Arc::new(gate));
        self
    }

    pub fn enable_timing(mut self, enabled: bool) -> Self {
        self.config.enable_timing = enabled;
        self
    }

    pub fn enable_stack_trace(mut self, enabled: bool) -> Self {
        self.config.enable_stack_trace = enabled;
        self
    }

    /// Log toggle for one kind, overriding the engine-wide one.
    pub fn kind_log(mut self, kind: OperationKind, log: impl Into<Toggle>) -> Self {
        self.config.profile_mut(kind).log = Some(log.into());
        self
    }

    /// Level the log line of `kind` is emitted at.
    pub fn kind_level(mut self, kind: OperationKind, level: LogLevel) -> Self {
        self.config.profile_mut(kind).level = Some(level);
        self
    }

    /// Debug gate for one kind, overriding the engine-wide one.
    pub fn kind_debug(mut self, kind: OperationKind, debug: impl Into<Toggle>) -> Self {
        self.config.profile_mut(kind).debug = Some(debug.into());
        self
    }

    pub fn build(self) -> Configuration {
        self.config
    }
}

fn value_modifier<F>(modifier: F) -> ResultModifier
where
    F: Fn(Value, &OperationContext) -> Result<Value, HookError> + Send + Sync + 'static,
{
    Arc::new(move |outcome: Outcome, ctx: &OperationContext| match outcome {
        Outcome::Value(value) => modifier(value, ctx).map(Outcome::Value),
        other => Ok(other),
    })
}
