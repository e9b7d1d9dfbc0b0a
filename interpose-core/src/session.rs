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

//! Session lifecycle state machine.

use crate::facade::FacadeId;
use crate::object::ObjectId;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub(crate) u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Revoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Revoke,
}

#[derive(Debug, Error)]
#[error("Invalid transition: {current:?} -> {event:?}")]
pub struct InvalidTransition {
    pub current: SessionState,
    pub event: SessionEvent,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        self == SessionState::Active
    }

    /// Revoked is terminal: a session is never reactivated.
    pub fn transition(self, event: SessionEvent) -> Result<SessionState, InvalidTransition> {
        match (self, event) {
            (SessionState::Active, SessionEvent::Revoke) => Ok(SessionState::Revoked),
            _ => Err(InvalidTransition {
                current: self,
                event,
            }),
        }
    }
}

/// Read-only view of a registered session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub name: Option<String>,
    pub target: ObjectId,
    pub facade: FacadeId,
    pub state: SessionState,
}
