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

//! Global observer chain.
//!
//! Observers are cross-session: every session built by the same engine
//! broadcasts to the same chain. Observers run in registration order and a
//! failing observer never prevents the rest from running.

use crate::context::OperationContext;
use crate::error::HookError;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Pipeline phase an observer is notified in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Before => f.write_str("before"),
            Phase::After => f.write_str("after"),
        }
    }
}

/// A cross-session callback.
pub trait GlobalObserver: Send + Sync {
    fn observe(&self, phase: Phase, ctx: &OperationContext) -> Result<(), HookError>;

    /// Get the observer name.
    fn name(&self) -> &str {
        "observer"
    }

    /// Phases this observer subscribes to.
    fn phases(&self) -> &[Phase] {
        &[Phase::Before, Phase::After]
    }
}

/// Handle returned by [`ObserverChain::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone)]
struct RegisteredObserver {
    id: ObserverId,
    observer: Arc<dyn GlobalObserver>,
}

/// Ordered list of global observers.
pub struct ObserverChain {
    next_id: AtomicU64,
    observers: RwLock<Vec<RegisteredObserver>>,
}

impl Default for ObserverChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverChain {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, observer: impl GlobalObserver + 'static) -> ObserverId {
        self.add_shared(Arc::new(observer))
    }

    pub fn add_shared(&self, observer: Arc<dyn GlobalObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(observer = %observer.name(), id = %id, "Global observer added");
        self.observers.write().push(RegisteredObserver { id, observer });
        id
    }

    /// Detaches an observer. Returns `false` if `id` is not registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| o.id != id);
        let removed = observers.len() != before;
        if removed {
            tracing::debug!(id = %id, "Global observer removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    pub fn clear(&self) {
        self.observers.write().clear();
    }

    /// Notifies every observer subscribed to `phase`.
    ///
    /// Iterates over a snapshot, so observers may add or remove observers
    /// while being notified; changes apply from the next broadcast.
    pub fn broadcast(&self, phase: Phase, ctx: &OperationContext) -> BroadcastReport {
        let snapshot: Vec<RegisteredObserver> = self.observers.read().clone();
        let mut report = BroadcastReport::default();

        for entry in snapshot {
            if !entry.observer.phases().contains(&phase) {
                continue;
            }
            match entry.observer.observe(phase, ctx) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        observer = %entry.observer.name(),
                        id = %entry.id,
                        phase = %phase,
                        kind = %ctx.kind(),
                        error = %err,
                        "Global observer failed"
                    );
                }
            }
        }
        report
    }
}

/// Observer that invokes a callback function.
pub struct CallbackObserver<F>
where
    F: Fn(Phase, &OperationContext) -> Result<(), HookError> + Send + Sync,
{
    name: String,
    phases: Vec<Phase>,
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: Fn(Phase, &OperationContext) -> Result<(), HookError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            phases: vec![Phase::Before, Phase::After],
            callback,
        }
    }

    /// Restrict the observer to a single phase.
    pub fn only(mut self, phase: Phase) -> Self {
        self.phases = vec![phase];
        self
    }
}

impl<F> GlobalObserver for CallbackObserver<F>
where
    F: Fn(Phase, &OperationContext) -> Result<(), HookError> + Send + Sync,
{
    fn observe(&self, phase: Phase, ctx: &OperationContext) -> Result<(), HookError> {
        (self.callback)(phase, ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn phases(&self) -> &[Phase] {
        &self.phases
    }
}

/// Observer that logs every notification (for debugging).
pub struct LoggingObserver {
    name: String,
}

impl LoggingObserver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl GlobalObserver for LoggingObserver {
    fn observe(&self, phase: Phase, ctx: &OperationContext) -> Result<(), HookError> {
        tracing::info!(
            observer = %self.name,
            phase = %phase,
            kind = %ctx.kind(),
            session = ctx.session().unwrap_or("-"),
            summary = %ctx.summary(),
            "Operation observed"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;
    use crate::operation::Operation;
    use std::sync::atomic::AtomicUsize;

    fn test_context() -> OperationContext {
        OperationContext::new(&ObjectRef::new(), &Operation::OwnKeys, None)
    }

    #[test]
    fn test_broadcast_in_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let chain = ObserverChain::new();

        for name in ["first", "second", "third"] {
            let order = order.clone();
            chain.add(CallbackObserver::new(name, move |_, _| {
                order.lock().push(name);
                Ok(())
            }));
        }

        let report = chain.broadcast(Phase::Before, &test_context());
        assert_eq!(report.delivered, 3);
        assert_eq!(order.lock().as_slice(), &["first", "second", "third"]);
    }

    #[test]
    fn test_failing_observer_is_isolated() {
        let count = Arc::new(AtomicUsize::new(0));
        let chain = ObserverChain::new();

        chain.add(CallbackObserver::new("broken", |_, _| {
            Err(HookError::failed("observer exploded"))
        }));
        let c = count.clone();
        chain.add(CallbackObserver::new("counter", move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let report = chain.broadcast(Phase::After, &test_context());
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_phase_subscription() {
        let count = Arc::new(AtomicUsize::new(0));
        let chain = ObserverChain::new();
        let c = count.clone();
        chain.add(
            CallbackObserver::new("after_only", move |phase, _| {
                assert_eq!(phase, Phase::After);
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .only(Phase::After),
        );

        chain.broadcast(Phase::Before, &test_context());
        chain.broadcast(Phase::After, &test_context());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_observer() {
        let chain = ObserverChain::new();
        let id = chain.add(LoggingObserver::new("log"));
        assert_eq!(chain.len(), 1);

        assert!(chain.remove(id));
        assert!(!chain.remove(id));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_observer_may_remove_itself() {
        let chain = Arc::new(ObserverChain::new());
        let slot = Arc::new(parking_lot::Mutex::new(None::<ObserverId>));

        let chain_ref = chain.clone();
        let slot_ref = slot.clone();
        let id = chain.add(CallbackObserver::new("once", move |_, _| {
            if let Some(id) = slot_ref.lock().take() {
                chain_ref.remove(id);
            }
            Ok(())
        }));
        *slot.lock() = Some(id);

        assert_eq!(chain.broadcast(Phase::Before, &test_context()).delivered, 1);
        assert_eq!(chain.broadcast(Phase::Before, &test_context()).delivered, 0);
    }
}
