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

//! Session registry.
//!
//! Maps targets, facades and session names to each other. The registry never
//! keeps a session alive: it holds weak handles only, and entries whose
//! facade has been dropped are pruned lazily on the next access. All indexes
//! sit behind one lock so a lookup never sees a half-updated state.

use crate::facade::{Facade, FacadeId, WeakFacade};
use crate::object::{ObjectId, ObjectRef, WeakObjectRef};
use crate::pipeline::Pipeline;
use crate::session::{SessionEvent, SessionId, SessionInfo, SessionState};
use parking_lot::Mutex;
use std::collections::HashMap;

struct SessionEntry {
    id: SessionId,
    name: Option<String>,
    target: WeakObjectRef,
    facade: WeakFacade,
    facade_id: FacadeId,
}

impl SessionEntry {
    fn live_facade(&self) -> Option<Facade> {
        self.facade.upgrade().filter(|f| !f.is_revoked())
    }

    fn state(&self) -> SessionState {
        self.facade
            .upgrade()
            .map_or(SessionState::Revoked, |facade| facade.state())
    }

    fn wraps(&self, target: &ObjectRef) -> bool {
        self.target.upgrade().is_some_and(|t| t.ptr_eq(target))
    }
}

#[derive(Default)]
struct RegistryInner {
    next_session: u64,
    next_facade: u64,
    by_target: HashMap<ObjectId, SessionEntry>,
    by_name: HashMap<String, ObjectId>,
    by_facade: HashMap<FacadeId, ObjectId>,
}

impl RegistryInner {
    fn prune(&mut self) {
        let stale: Vec<ObjectId> = self
            .by_target
            .iter()
            .filter(|(_, entry)| entry.live_facade().is_none())
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.remove(id);
        }
    }

    fn remove(&mut self, target_id: ObjectId) -> Option<SessionEntry> {
        let entry = self.by_target.remove(&target_id)?;
        self.by_facade.remove(&entry.facade_id);
        if let Some(name) = &entry.name {
            self.by_name.remove(name);
        }
        Some(entry)
    }

    fn entry_for(&self, target: &ObjectRef) -> Option<&SessionEntry> {
        self.by_target.get(&target.id()).filter(|e| e.wraps(target))
    }
}

/// Result of [`SessionRegistry::install`].
pub(crate) enum Installed {
    New(Facade),
    /// The target already had a live session.
    Existing(Facade),
}

/// Identifies a session to revoke.
#[derive(Debug, Clone, Copy)]
pub enum SessionHandle<'a> {
    Facade(&'a Facade),
    Name(&'a str),
}

impl<'a> From<&'a Facade> for SessionHandle<'a> {
    fn from(facade: &'a Facade) -> Self {
        SessionHandle::Facade(facade)
    }
}

impl<'a> From<&'a str> for SessionHandle<'a> {
    fn from(name: &'a str) -> Self {
        SessionHandle::Name(name)
    }
}

impl<'a> From<&'a String> for SessionHandle<'a> {
    fn from(name: &'a String) -> Self {
        SessionHandle::Name(name)
    }
}

/// Weak-owning index of active sessions.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live facade for `target`, or builds a new session with
    /// `build`. A name already held by another live session is dropped.
    pub(crate) fn install<F>(&self, target: &ObjectRef, name: Option<&str>, build: F) -> Installed
    where
        F: FnOnce(Option<String>) -> Pipeline,
    {
        let mut inner = self.inner.lock();
        inner.prune();

        if let Some(existing) = inner.entry_for(target).and_then(SessionEntry::live_facade) {
            return Installed::Existing(existing);
        }

        let name = match name {
            Some(name) if inner.by_name.contains_key(name) => {
                tracing::warn!(
                    session_name = name,
                    "Session name already in use; installing without a name"
                );
                None
            }
            other => other.map(str::to_string),
        };

        inner.next_session += 1;
        inner.next_facade += 1;
        let session = SessionId(inner.next_session);
        let facade_id = FacadeId(inner.next_facade);
        let facade = Facade::new(facade_id, session, build(name.clone()));

        let target_id = target.id();
        inner.remove(target_id);
        if let Some(name) = &name {
            inner.by_name.insert(name.clone(), target_id);
        }
        inner.by_facade.insert(facade_id, target_id);
        inner.by_target.insert(
            target_id,
            SessionEntry {
                id: session,
                name,
                target: target.downgrade(),
                facade: facade.downgrade(),
                facade_id,
            },
        );

        tracing::debug!(
            session = %session,
            facade = %facade_id,
            object = %target_id,
            "Session installed"
        );
        Installed::New(facade)
    }

    /// Ends a session and returns its target. `None` if the handle names no
    /// live session.
    pub fn revoke<'a>(&self, handle: impl Into<SessionHandle<'a>>) -> Option<ObjectRef> {
        let handle = handle.into();
        let entry = {
            let mut inner = self.inner.lock();
            inner.prune();
            let target_id = match handle {
                SessionHandle::Facade(facade) => inner.by_facade.get(&facade.id()).copied(),
                SessionHandle::Name(name) => inner.by_name.get(name).copied(),
            };
            target_id.and_then(|id| inner.remove(id))
        };

        let Some(entry) = entry else {
            match handle {
                SessionHandle::Facade(facade) => {
                    tracing::warn!(facade = %facade.id(), "Revoke of unknown session")
                }
                SessionHandle::Name(name) => {
                    tracing::warn!(session_name = name, "Revoke of unknown session")
                }
            }
            return None;
        };

        let facade = entry.facade.upgrade();
        if let Err(err) = entry.state().transition(SessionEvent::Revoke) {
            tracing::warn!(session = %entry.id, error = %err, "Session already revoked");
        }

        let target = facade.and_then(|f| f.poison());
        tracing::debug!(session = %entry.id, "Session revoked");
        target.or_else(|| entry.target.upgrade())
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.prune();
        inner.by_target.len()
    }

    /// Whether `target` has a live session.
    pub fn is_watched(&self, target: &ObjectRef) -> bool {
        self.facade_for(target).is_some()
    }

    /// Live facade wrapping `target`, if any.
    pub fn facade_for(&self, target: &ObjectRef) -> Option<Facade> {
        let inner = self.inner.lock();
        inner.entry_for(target).and_then(SessionEntry::live_facade)
    }

    /// Target of a live facade. `None` once the facade is revoked.
    pub fn target_of(&self, facade: &Facade) -> Option<ObjectRef> {
        let inner = self.inner.lock();
        let target_id = inner.by_facade.get(&facade.id())?;
        let entry = inner.by_target.get(target_id)?;
        entry.live_facade()?;
        entry.target.upgrade()
    }

    /// Live facade registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<Facade> {
        let inner = self.inner.lock();
        let target_id = inner.by_name.get(name)?;
        inner.by_target.get(target_id)?.live_facade()
    }

    /// Names of live named sessions, sorted.
    pub fn session_names(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        inner.prune();
        let mut names: Vec<String> = inner.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every live session, ordered by session id.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut inner = self.inner.lock();
        inner.prune();
        let mut sessions: Vec<SessionInfo> = inner
            .by_target
            .iter()
            .map(|(target, entry)| SessionInfo {
                id: entry.id,
                name: entry.name.clone(),
                target: *target,
                facade: entry.facade_id,
                state: entry.state(),
            })
            .collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }
}
