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

//! Per-invocation operation context.
//!
//! A context is created when a pipeline invocation starts and is enriched as
//! it moves through the stages. Enrichment is additive: fields are only ever
//! filled in, never cleared, so a hook running late sees everything an early
//! hook saw plus the result, timing and resolution.
//!
//! Contexts are not retained by the engine. A hook that wants to keep one
//! (for aggregation, say) clones it.

use crate::error::InterposeError;
use crate::object::ObjectRef;
use crate::operation::{Operation, OperationKind, Outcome};
use crate::value::{PropertyDescriptor, PropertyKey, Value};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::backtrace::Backtrace;
use std::time::Duration;

/// How the outcome of an invocation was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// The real operation ran against the target.
    Delegated,
    /// A full-override hook supplied the result.
    Overridden,
    /// A replacement callable ran instead of the target.
    Replaced,
    /// A result modifier vetoed the attempt before delegation.
    Vetoed,
}

/// Record carried through one pipeline invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationContext {
    kind: OperationKind,
    timestamp: DateTime<Utc>,
    target: ObjectRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    property: Option<PropertyKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receiver: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified_arguments: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    descriptor: Option<PropertyDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prototype: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_target: Option<ObjectRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl OperationContext {
    /// Minimal context: kind, timestamp, target and the operation payload.
    /// This is what the conditional gate sees.
    pub(crate) fn new(target: &ObjectRef, operation: &Operation, session: Option<&str>) -> Self {
        let mut ctx = Self {
            kind: operation.kind(),
            timestamp: Utc::now(),
            target: target.clone(),
            session: session.map(str::to_string),
            property: operation.key().cloned(),
            receiver: None,
            arguments: None,
            modified_arguments: None,
            old_value: None,
            new_value: None,
            descriptor: None,
            prototype: None,
            new_target: None,
            stack: None,
            result: None,
            success: None,
            duration: None,
            resolution: None,
            error: None,
        };

        match operation {
            Operation::Set { value, .. } => ctx.new_value = Some(value.clone()),
            Operation::DefineProperty { descriptor, .. } => {
                ctx.descriptor = Some(descriptor.clone())
            }
            Operation::SetPrototypeOf { prototype } => {
                ctx.prototype = Some(Value::from(prototype.clone()))
            }
            Operation::Apply { this, args } => {
                ctx.receiver = Some(this.clone());
                ctx.arguments = Some(args.clone());
            }
            Operation::Construct { args, new_target } => {
                ctx.arguments = Some(args.clone());
                ctx.new_target = Some(new_target.clone().unwrap_or_else(|| target.clone()));
            }
            _ => {}
        }
        ctx
    }

    /// Records the prior own value for `set` and `deleteProperty`.
    ///
    /// Reads the own data slot only; accessors are not run, so observing a
    /// mutation never triggers a getter on the target.
    pub(crate) fn capture_prior_value(&mut self) {
        if matches!(self.kind, OperationKind::Set | OperationKind::DeleteProperty) {
            if let Some(key) = &self.property {
                self.old_value = Some(self.target.peek(key).unwrap_or_default());
            }
        }
    }

    pub(crate) fn capture_stack(&mut self) {
        self.stack = Some(Backtrace::force_capture().to_string());
    }

    pub(crate) fn record_modified_arguments(&mut self, args: Vec<Value>) {
        self.modified_arguments = Some(args);
    }

    pub(crate) fn record_resolution(&mut self, resolution: Resolution) {
        self.resolution = Some(resolution);
    }

    pub(crate) fn record_duration(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    pub(crate) fn record_outcome(&mut self, outcome: &Outcome) {
        if let Outcome::Bool(success) = outcome {
            if self.kind.is_vetoable()
                || matches!(
                    self.kind,
                    OperationKind::SetPrototypeOf | OperationKind::PreventExtensions
                )
            {
                self.success = Some(*success);
            }
        }
        self.result = Some(outcome.clone());
    }

    pub(crate) fn record_error(&mut self, error: &InterposeError) {
        self.error = Some(error.to_string());
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Name of the session the invocation belongs to, if it was named.
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn property(&self) -> Option<&PropertyKey> {
        self.property.as_ref()
    }

    /// Receiver of an `apply`.
    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_ref()
    }

    /// Arguments as originally passed.
    pub fn arguments(&self) -> Option<&[Value]> {
        self.arguments.as_deref()
    }

    /// Arguments as rewritten by the argument modifier, if it ran.
    pub fn modified_arguments(&self) -> Option<&[Value]> {
        self.modified_arguments.as_deref()
    }

    /// Arguments actually used for delegation.
    pub fn effective_arguments(&self) -> Option<&[Value]> {
        self.modified_arguments().or_else(|| self.arguments())
    }

    /// Own value before a `set` or `deleteProperty`. Only the own data slot
    /// is read: an inherited or accessor property reports `Undefined`.
    pub fn old_value(&self) -> Option<&Value> {
        self.old_value.as_ref()
    }

    pub fn new_value(&self) -> Option<&Value> {
        self.new_value.as_ref()
    }

    pub fn descriptor(&self) -> Option<&PropertyDescriptor> {
        self.descriptor.as_ref()
    }

    /// Requested prototype of a `setPrototypeOf` (`Null` for none).
    pub fn prototype(&self) -> Option<&Value> {
        self.prototype.as_ref()
    }

    pub fn new_target(&self) -> Option<&ObjectRef> {
        self.new_target.as_ref()
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn result(&self) -> Option<&Outcome> {
        self.result.as_ref()
    }

    /// The result as a value, for `get`, `apply` and `construct`.
    pub fn value(&self) -> Option<&Value> {
        self.result.as_ref().and_then(Outcome::as_value)
    }

    /// Success flag of a mutating operation.
    pub fn success(&self) -> Option<bool> {
        self.success
    }

    /// Time spent in delegation, when timing is enabled.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// One-line description used for log output.
    pub fn summary(&self) -> String {
        let mut line = self.kind.to_string();
        if let Some(property) = &self.property {
            line.push(' ');
            line.push_str(property.as_str());
        }
        if let Some(args) = self.effective_arguments() {
            let args: Vec<String> = args.iter().map(Value::to_string).collect();
            line.push_str(&format!("({})", args.join(", ")));
        }
        if let Some(value) = &self.new_value {
            line.push_str(&format!(" = {}", value));
        }
        if let Some(result) = &self.result {
            line.push_str(&format!(" -> {}", result));
        }
        if let Some(duration) = self.duration {
            line.push_str(&format!(" [{:?}]", duration));
        }
        line
    }

    /// JSON rendering, for audit sinks.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_context_payload() {
        let target = ObjectRef::from_entries([("a", 1)]);
        let op = Operation::Set {
            key: "a".into(),
            value: Value::from(2),
        };
        let ctx = OperationContext::new(&target, &op, Some("audit"));

        assert_eq!(ctx.kind(), OperationKind::Set);
        assert_eq!(ctx.session(), Some("audit"));
        assert_eq!(ctx.property().map(PropertyKey::as_str), Some("a"));
        assert_eq!(ctx.new_value(), Some(&Value::from(2)));
        assert!(ctx.old_value().is_none());
        assert!(ctx.result().is_none());
    }

    #[test]
    fn test_enrichment_is_additive() {
        let target = ObjectRef::from_entries([("a", 1)]);
        let op = Operation::DeleteProperty { key: "a".into() };
        let mut ctx = OperationContext::new(&target, &op, None);

        ctx.capture_prior_value();
        ctx.record_duration(Duration::from_micros(5));
        ctx.record_outcome(&Outcome::Bool(true));

        assert_eq!(ctx.property().map(PropertyKey::as_str), Some("a"));
        assert_eq!(ctx.old_value(), Some(&Value::from(1)));
        assert_eq!(ctx.success(), Some(true));
        assert_eq!(ctx.duration(), Some(Duration::from_micros(5)));
    }

    #[test]
    fn test_effective_arguments() {
        let target = ObjectRef::function("f", |_, _| Ok(Value::Undefined));
        let op = Operation::Apply {
            this: Value::Undefined,
            args: vec![Value::from(1)],
        };
        let mut ctx = OperationContext::new(&target, &op, None);
        assert_eq!(ctx.effective_arguments(), Some(&[Value::from(1)][..]));

        ctx.record_modified_arguments(vec![Value::from(2)]);
        assert_eq!(ctx.arguments(), Some(&[Value::from(1)][..]));
        assert_eq!(ctx.effective_arguments(), Some(&[Value::from(2)][..]));
    }

    #[test]
    fn test_summary_and_json() {
        let target = ObjectRef::from_entries([("name", "x")]);
        let op = Operation::Get { key: "name".into() };
        let mut ctx = OperationContext::new(&target, &op, None);
        ctx.record_outcome(&Outcome::Value(Value::from("x")));

        assert_eq!(ctx.summary(), "get name -> \"x\"");
        let json = ctx.to_json();
        assert_eq!(json["kind"], "get");
        assert_eq!(json["property"], "name");
        assert_eq!(json["result"], "x");
    }
}
