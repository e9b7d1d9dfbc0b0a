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

//! Interceptor pipeline.
//!
//! A [`Pipeline`] is built once per session. At build time every operation
//! kind gets an [`Interceptor`]: the engine-wide settings of the
//! configuration merged with that kind's profile. An invocation then runs:
//!
//! 1. gate (a `false` verdict delegates directly and returns)
//! 2. context construction
//! 3. engine-wide and kind before-hooks
//! 4. `before` broadcast
//! 5. debug gate
//! 6. full override
//! 7. function replacement (`apply`)
//! 8. argument modifier (`apply`, `construct`)
//! 9. delegation, optionally timed
//! 10. result modifier (a pre-attempt veto for `set`, `deleteProperty`,
//!     `defineProperty`)
//! 11. kind and engine-wide after-hooks, `after` broadcast
//! 12. log line
//!
//! Faults from steps 6 to 10 run the error hook and are re-raised. Faults
//! from hooks and observers are logged and suppressed.

use crate::config::{
    ArgsModifier, Configuration, ContextHook, ErrorHook, FunctionReplacer, LogLevel,
    OverrideHook, Predicate, ResultModifier, Toggle,
};
use crate::context::{OperationContext, Resolution};
use crate::engine::{BreakHandler, ContainmentPolicy, InterposerSettings};
use crate::error::{InterposeError, Result};
use crate::object::ObjectRef;
use crate::observer::{ObserverChain, Phase};
use crate::operation::{Operation, OperationKind, Outcome};
use crate::value::Value;
use std::sync::Arc;
use std::time::Instant;

/// Resolved stages for one operation kind.
struct Interceptor {
    kind: OperationKind,
    log: Toggle,
    level: LogLevel,
    debug: Toggle,
    before: Option<ContextHook>,
    after: Option<ContextHook>,
    intercept: Option<OverrideHook>,
    modify_result: Option<ResultModifier>,
    /// Error hook runs on operation faults.
    contained: bool,
    /// Global observers are notified.
    broadcast: bool,
}

impl Interceptor {
    fn build(kind: OperationKind, config: &Configuration, containment: ContainmentPolicy) -> Self {
        let profile = config.profile(kind).cloned().unwrap_or_default();

        if profile.intercept.is_some() && !kind.supports_override() {
            tracing::warn!(kind = %kind, "Full override not supported for this kind; ignoring it");
        }

        let rich = containment.covers(kind);
        Self {
            kind,
            log: profile.log.unwrap_or_else(|| config.log.clone()),
            level: profile.level.unwrap_or_default(),
            debug: profile.debug.unwrap_or_else(|| config.debug.clone()),
            before: profile.before,
            after: profile.after,
            intercept: profile.intercept.filter(|_| kind.supports_override()),
            modify_result: profile.modify_result,
            contained: rich,
            broadcast: rich,
        }
    }
}

/// Per-session hook pipeline.
pub(crate) struct Pipeline {
    target: ObjectRef,
    session: Option<String>,
    gate: Option<Predicate>,
    on_before: Option<ContextHook>,
    on_after: Option<ContextHook>,
    on_error: Option<ErrorHook>,
    modify_args: Option<ArgsModifier>,
    replace_function: Option<FunctionReplacer>,
    enable_timing: bool,
    enable_stack_trace: bool,
    interceptors: Vec<Interceptor>,
    observers: Arc<ObserverChain>,
    log_threshold: LogLevel,
    break_handler: BreakHandler,
}

impl Pipeline {
    pub(crate) fn build(
        target: ObjectRef,
        session: Option<String>,
        config: Configuration,
        observers: Arc<ObserverChain>,
        settings: &InterposerSettings,
    ) -> Self {
        let interceptors = OperationKind::ALL
            .iter()
            .map(|kind| Interceptor::build(*kind, &config, settings.containment))
            .collect();

        Self {
            target,
            session,
            gate: config.should_intercept,
            on_before: config.on_before,
            on_after: config.on_after,
            on_error: config.on_error,
            modify_args: config.modify_args,
            replace_function: config.replace_function,
            enable_timing: config.enable_timing,
            enable_stack_trace: config.enable_stack_trace,
            interceptors,
            observers,
            log_threshold: config.log_level.unwrap_or(settings.log_level),
            break_handler: settings.break_handler.clone(),
        }
    }

    pub(crate) fn target(&self) -> &ObjectRef {
        &self.target
    }

    pub(crate) fn run(&self, operation: Operation) -> Result<Outcome> {
        let interceptor = &self.interceptors[operation.kind().index()];

        let mut ctx = OperationContext::new(&self.target, &operation, self.session.as_deref());
        if let Some(gate) = &self.gate {
            if !gate(&ctx) {
                return operation.perform(&self.target).map_err(InterposeError::from);
            }
        }

        ctx.capture_prior_value();
        if self.enable_stack_trace {
            ctx.capture_stack();
        }

        match self.execute(interceptor, operation, &mut ctx) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if interceptor.contained {
                    ctx.record_error(&err);
                    self.report_error(&ctx, &err);
                }
                Err(err)
            }
        }
    }

    fn execute(
        &self,
        interceptor: &Interceptor,
        operation: Operation,
        ctx: &mut OperationContext,
    ) -> Result<Outcome> {
        run_hook("onBefore", self.on_before.as_ref(), ctx);
        run_hook("before", interceptor.before.as_ref(), ctx);

        if interceptor.broadcast {
            self.observers.broadcast(Phase::Before, ctx);
        }

        if interceptor.debug.evaluate(ctx) {
            (self.break_handler)(ctx);
        }

        let outcome = self.resolve(interceptor, operation, ctx)?;
        ctx.record_outcome(&outcome);

        run_hook("after", interceptor.after.as_ref(), ctx);
        run_hook("onAfter", self.on_after.as_ref(), ctx);

        if interceptor.broadcast {
            self.observers.broadcast(Phase::After, ctx);
        }

        if interceptor.log.evaluate(ctx) && self.log_threshold.permits(interceptor.level) {
            emit_log(interceptor.level, ctx);
        }

        Ok(outcome)
    }

    /// Steps 6 to 10: produce the outcome.
    fn resolve(
        &self,
        interceptor: &Interceptor,
        mut operation: Operation,
        ctx: &mut OperationContext,
    ) -> Result<Outcome> {
        let kind = interceptor.kind;

        if let Some(intercept) = &interceptor.intercept {
            let overridden = match intercept(ctx)? {
                Some(Value::Bool(success)) if kind == OperationKind::Set => {
                    Some(Outcome::Bool(success))
                }
                Some(_) if kind == OperationKind::Set => None,
                Some(value) if !value.is_undefined() => Some(Outcome::Value(value)),
                _ => None,
            };
            if let Some(outcome) = overridden {
                ctx.record_resolution(Resolution::Overridden);
                return self.modify(interceptor, outcome, ctx);
            }
        }

        if let (Operation::Apply { this, args }, Some(replacer)) =
            (&operation, &self.replace_function)
        {
            if let Some(replacement) = replacer(ctx) {
                ctx.record_resolution(Resolution::Replaced);
                let value = self.timed(ctx, || replacement.call(this, args))?;
                return self.modify(interceptor, Outcome::Value(value), ctx);
            }
        }

        if let (Some(modify_args), Some(args)) = (&self.modify_args, operation.arguments_mut()) {
            if let Some(rewritten) = modify_args(args.as_slice(), ctx)?.filter(|a| !a.is_empty()) {
                ctx.record_modified_arguments(rewritten.clone());
                *args = rewritten;
            }
        }

        if kind.is_vetoable() {
            if let Some(modifier) = &interceptor.modify_result {
                // Predictive veto: the modifier never sees the real outcome.
                if modifier(Outcome::Bool(true), ctx)? == Outcome::Bool(false) {
                    ctx.record_resolution(Resolution::Vetoed);
                    return Ok(Outcome::Bool(false));
                }
            }
            ctx.record_resolution(Resolution::Delegated);
            return self.delegate(&operation, ctx);
        }

        ctx.record_resolution(Resolution::Delegated);
        let outcome = self.delegate(&operation, ctx)?;
        self.modify(interceptor, outcome, ctx)
    }

    fn delegate(&self, operation: &Operation, ctx: &mut OperationContext) -> Result<Outcome> {
        let target = &self.target;
        self.timed(ctx, || operation.perform(target))
    }

    fn timed<T, F>(&self, ctx: &mut OperationContext, f: F) -> Result<T>
    where
        F: FnOnce() -> std::result::Result<T, crate::error::Fault>,
    {
        if !self.enable_timing {
            return f().map_err(InterposeError::from);
        }
        let start = Instant::now();
        let result = f();
        ctx.record_duration(start.elapsed());
        result.map_err(InterposeError::from)
    }

    fn modify(
        &self,
        interceptor: &Interceptor,
        outcome: Outcome,
        ctx: &OperationContext,
    ) -> Result<Outcome> {
        let Some(modifier) = &interceptor.modify_result else {
            return Ok(outcome);
        };
        let modified = modifier(outcome.clone(), ctx)?;
        if modified.fits(interceptor.kind) {
            Ok(modified)
        } else {
            tracing::warn!(
                kind = %interceptor.kind,
                "Result modifier returned an outcome of the wrong shape; keeping the original"
            );
            Ok(outcome)
        }
    }

    fn report_error(&self, ctx: &OperationContext, err: &InterposeError) {
        tracing::debug!(kind = %ctx.kind(), error = %err, "Operation fault");
        if let Some(on_error) = &self.on_error {
            if let Err(hook_err) = on_error(ctx, err) {
                tracing::warn!(
                    kind = %ctx.kind(),
                    error = %hook_err,
                    "Error hook failed"
                );
            }
        }
    }
}

fn run_hook(stage: &'static str, hook: Option<&ContextHook>, ctx: &OperationContext) {
    if let Some(hook) = hook {
        if let Err(err) = hook(ctx) {
            tracing::warn!(
                stage,
                kind = %ctx.kind(),
                error = %err,
                "Interceptor hook failed"
            );
        }
    }
}

fn emit_log(level: LogLevel, ctx: &OperationContext) {
    let kind = ctx.kind();
    let session = ctx.session().unwrap_or("-");
    let summary = ctx.summary();
    match level {
        LogLevel::Trace => tracing::trace!(kind = %kind, session, "{}", summary),
        LogLevel::Debug => tracing::debug!(kind = %kind, session, "{}", summary),
        LogLevel::Info => tracing::info!(kind = %kind, session, "{}", summary),
        LogLevel::Warn => tracing::warn!(kind = %kind, session, "{}", summary),
        LogLevel::Error => tracing::error!(kind = %kind, session, "{}", summary),
        LogLevel::Off => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Fault, HookError};
    use crate::object::Callable;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pipeline(target: &ObjectRef, config: Configuration) -> Pipeline {
        Pipeline::build(
            target.clone(),
            None,
            config,
            Arc::new(ObserverChain::new()),
            &InterposerSettings::default(),
        )
    }

    fn get(key: &str) -> Operation {
        Operation::Get { key: key.into() }
    }

    #[test]
    fn test_stage_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let record = |label: &'static str| {
            let order = order.clone();
            move |_: &OperationContext| {
                order.lock().push(label);
                Ok::<(), HookError>(())
            }
        };

        let config = Configuration::builder()
            .on_before(record("onBefore"))
            .before(OperationKind::Get, record("before"))
            .on_get(record("after"))
            .on_after(record("onAfter"))
            .build();

        let target = ObjectRef::from_entries([("a", 1)]);
        pipeline(&target, config).run(get("a")).unwrap();
        assert_eq!(
            order.lock().as_slice(),
            &["onBefore", "before", "after", "onAfter"]
        );
    }

    #[test]
    fn test_hook_failure_is_suppressed() {
        let config = Configuration::builder()
            .on_before(|_| Err(HookError::failed("before broke")))
            .on_after(|_| Err(HookError::failed("after broke")))
            .build();

        let target = ObjectRef::from_entries([("a", 1)]);
        let outcome = pipeline(&target, config).run(get("a")).unwrap();
        assert_eq!(outcome, Outcome::Value(Value::from(1)));
    }

    #[test]
    fn test_after_hook_sees_enriched_context() {
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let config = Configuration::builder()
            .enable_timing(true)
            .on_set(move |ctx| {
                *s.lock() = Some(ctx.clone());
                Ok(())
            })
            .build();

        let target = ObjectRef::from_entries([("a", 1)]);
        let op = Operation::Set {
            key: "a".into(),
            value: Value::from(2),
        };
        pipeline(&target, config).run(op).unwrap();

        let ctx = seen.lock().take().unwrap();
        assert_eq!(ctx.old_value(), Some(&Value::from(1)));
        assert_eq!(ctx.new_value(), Some(&Value::from(2)));
        assert_eq!(ctx.success(), Some(true));
        assert!(ctx.duration().is_some());
        assert_eq!(ctx.resolution(), Some(Resolution::Delegated));
    }

    #[test]
    fn test_set_override_requires_bool() {
        let config = Configuration::builder()
            .intercept_set(|ctx| {
                let value = ctx.new_value().cloned().unwrap_or_default();
                Ok(match value.as_str() {
                    Some("blocked") => Some(Value::Bool(false)),
                    _ => Some(Value::from("ignored")),
                })
            })
            .build();

        let target = ObjectRef::new();
        let p = pipeline(&target, config);

        let blocked = Operation::Set {
            key: "a".into(),
            value: Value::from("blocked"),
        };
        assert_eq!(p.run(blocked).unwrap(), Outcome::Bool(false));
        assert!(!target.has(&"a".into()));

        let allowed = Operation::Set {
            key: "a".into(),
            value: Value::from("ok"),
        };
        assert_eq!(p.run(allowed).unwrap(), Outcome::Bool(true));
        assert_eq!(target.peek(&"a".into()), Some(Value::from("ok")));
    }

    #[test]
    fn test_undefined_override_falls_through() {
        let config = Configuration::builder()
            .intercept_get(|_| Ok(Some(Value::Undefined)))
            .build();

        let target = ObjectRef::from_entries([("a", 1)]);
        let outcome = pipeline(&target, config).run(get("a")).unwrap();
        assert_eq!(outcome, Outcome::Value(Value::from(1)));
    }

    #[test]
    fn test_replace_function_bypasses_target() {
        let target_calls = Arc::new(AtomicUsize::new(0));
        let calls = target_calls.clone();
        let target = ObjectRef::function("original", move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::from("original"))
        });

        let config = Configuration::builder()
            .replace_function(|_| {
                Some(Callable::new("shim", |_, args| {
                    Ok(Value::from(format!("shim:{}", args.len())))
                }))
            })
            .modify_args(|_, _| Ok(Some(vec![Value::Null, Value::Null, Value::Null])))
            .build();

        let op = Operation::Apply {
            this: Value::Undefined,
            args: vec![Value::from(1)],
        };
        let outcome = pipeline(&target, config).run(op).unwrap();
        // Replacement receives the original arguments.
        assert_eq!(outcome, Outcome::Value(Value::from("shim:1")));
        assert_eq!(target_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_modify_args_rewrites_and_empty_keeps_original() {
        let target = ObjectRef::function("count", |_, args| Ok(Value::from(args.len() as f64)));
        let apply = |n: usize| Operation::Apply {
            this: Value::Undefined,
            args: vec![Value::Null; n],
        };

        let rewrite = Configuration::builder()
            .modify_args(|args, _| Ok(Some(args.iter().chain(args).cloned().collect())))
            .build();
        assert_eq!(
            pipeline(&target, rewrite).run(apply(2)).unwrap(),
            Outcome::Value(Value::from(4))
        );

        let empty = Configuration::builder()
            .modify_args(|_, _| Ok(Some(Vec::new())))
            .build();
        assert_eq!(
            pipeline(&target, empty).run(apply(2)).unwrap(),
            Outcome::Value(Value::from(2))
        );
    }

    #[test]
    fn test_define_veto_skips_attempt() {
        let target = ObjectRef::new();
        let config = Configuration::builder()
            .modify_define_result(|_, ctx| {
                Ok(ctx.property().map(|k| k.as_str()) != Some("locked"))
            })
            .build();
        let p = pipeline(&target, config);

        let locked = Operation::DefineProperty {
            key: "locked".into(),
            descriptor: crate::value::PropertyDescriptor::data(1),
        };
        assert_eq!(p.run(locked).unwrap(), Outcome::Bool(false));
        assert!(!target.has(&"locked".into()));

        let open = Operation::DefineProperty {
            key: "open".into(),
            descriptor: crate::value::PropertyDescriptor::data(1),
        };
        assert_eq!(p.run(open).unwrap(), Outcome::Bool(true));
        assert!(target.has(&"open".into()));
    }

    #[test]
    fn test_real_failure_reported_after_allowed_veto() {
        // The modifier allows the attempt; the real (failed) outcome wins.
        let target = ObjectRef::new();
        target.prevent_extensions();
        let config = Configuration::builder()
            .modify_set_result(|_, _| Ok(true))
            .build();
        let op = Operation::Set {
            key: "a".into(),
            value: Value::from(1),
        };
        assert_eq!(pipeline(&target, config).run(op).unwrap(), Outcome::Bool(false));
    }

    #[test]
    fn test_wrong_shape_modifier_is_ignored() {
        let target = ObjectRef::from_entries([("a", 1)]);
        let config = Configuration::builder()
            .modify_outcome(OperationKind::Has, |_, _| Ok(Outcome::Keys(vec![])))
            .build();
        let op = Operation::Has { key: "a".into() };
        assert_eq!(pipeline(&target, config).run(op).unwrap(), Outcome::Bool(true));
    }

    #[test]
    fn test_error_hook_then_reraise() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = errors.clone();
        let config = Configuration::builder()
            .on_error(move |ctx, err| {
                e.lock().push((ctx.kind(), err.to_string(), ctx.error().is_some()));
                Ok(())
            })
            .build();

        let target = ObjectRef::function("explode", |_, _| Err(Fault::thrown("kaboom")));
        let op = Operation::Apply {
            this: Value::Undefined,
            args: vec![],
        };
        let err = pipeline(&target, config).run(op).unwrap_err();
        assert_eq!(err, InterposeError::Fault(Fault::Thrown(Value::from("kaboom"))));

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, OperationKind::Apply);
        assert!(errors[0].2);
    }

    #[test]
    fn test_modifier_fault_is_an_operation_fault() {
        let hooked = Arc::new(AtomicUsize::new(0));
        let h = hooked.clone();
        let config = Configuration::builder()
            .modify_get_result(|_, _| Err(HookError::failed("cannot modify")))
            .on_error(move |_, _| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build();

        let target = ObjectRef::from_entries([("a", 1)]);
        let err = pipeline(&target, config).run(get("a")).unwrap_err();
        assert!(matches!(err, InterposeError::Hook(HookError::Failed(_))));
        assert_eq!(hooked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rich_kinds_only_policy() {
        let errors = Arc::new(AtomicUsize::new(0));
        let broadcasts = Arc::new(AtomicUsize::new(0));

        let observers = Arc::new(ObserverChain::new());
        let b = broadcasts.clone();
        observers.add(crate::observer::CallbackObserver::new("count", move |_, _| {
            b.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let e = errors.clone();
        let config = Configuration::builder()
            .modify_outcome(OperationKind::Has, |_, _| Err(HookError::failed("bad")))
            .on_error(move |_, _| {
                e.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build();

        let settings = InterposerSettings {
            containment: ContainmentPolicy::RichKindsOnly,
            ..Default::default()
        };
        let target = ObjectRef::from_entries([("a", 1)]);
        let p = Pipeline::build(target, None, config, observers, &settings);

        assert!(p.run(Operation::Has { key: "a".into() }).is_err());
        assert_eq!(errors.load(Ordering::SeqCst), 0);
        assert_eq!(broadcasts.load(Ordering::SeqCst), 0);

        p.run(get("a")).unwrap();
        assert_eq!(broadcasts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_gate_does_not_change_result() {
        let breaks = Arc::new(AtomicUsize::new(0));
        let b = breaks.clone();
        let settings = InterposerSettings::default().with_break_handler(move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        });
        let config = Configuration::builder()
            .debug_when(|ctx| ctx.property().map(|k| k.as_str()) == Some("a"))
            .build();

        let target = ObjectRef::from_entries([("a", 1), ("b", 2)]);
        let p = Pipeline::build(
            target,
            None,
            config,
            Arc::new(ObserverChain::new()),
            &settings,
        );

        assert_eq!(p.run(get("a")).unwrap(), Outcome::Value(Value::from(1)));
        assert_eq!(p.run(get("b")).unwrap(), Outcome::Value(Value::from(2)));
        assert_eq!(breaks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stack_capture() {
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        let config = Configuration::builder()
            .enable_stack_trace(true)
            .on_get(move |ctx| {
                *s.lock() = ctx.stack().map(str::to_string);
                Ok(())
            })
            .build();

        let target = ObjectRef::from_entries([("a", 1)]);
        pipeline(&target, config).run(get("a")).unwrap();
        assert!(seen.lock().is_some());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Runs `get a` on `{a: 1}` under `config` and returns the formatted log output.
    fn logged_get(config: Configuration) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();

        let target = ObjectRef::from_entries([("a", 1)]);
        tracing::subscriber::with_default(subscriber, || {
            pipeline(&target, config).run(get("a")).unwrap();
        });
        let bytes = captured.0.lock().clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_log_line_follows_toggle() {
        let on = logged_get(Configuration::builder().log(true).build());
        assert!(on.contains("get a -> 1"));
        assert!(on.contains("INFO"));

        let off = logged_get(Configuration::builder().build());
        assert!(!off.contains("get a"));
    }

    #[test]
    fn test_log_line_predicate_and_kind_override() {
        let matched = logged_get(
            Configuration::builder()
                .log_when(|ctx| ctx.property().map(|k| k.as_str()) == Some("a"))
                .build(),
        );
        assert!(matched.contains("get a -> 1"));

        let missed = logged_get(
            Configuration::builder()
                .log_when(|ctx| ctx.property().map(|k| k.as_str()) == Some("b"))
                .build(),
        );
        assert!(!missed.contains("get a"));

        let per_kind = logged_get(
            Configuration::builder()
                .kind_log(OperationKind::Get, true)
                .kind_level(OperationKind::Get, LogLevel::Warn)
                .build(),
        );
        assert!(per_kind.contains("get a -> 1"));
        assert!(per_kind.contains("WARN"));
    }

    #[test]
    fn test_log_threshold_filters_lower_levels() {
        let quiet = logged_get(
            Configuration::builder()
                .log(true)
                .log_level(LogLevel::Error)
                .build(),
        );
        assert!(!quiet.contains("get a"));

        let loud = logged_get(
            Configuration::builder()
                .log(true)
                .kind_level(OperationKind::Get, LogLevel::Error)
                .log_level(LogLevel::Error)
                .build(),
        );
        assert!(loud.contains("get a -> 1"));
    }
}
