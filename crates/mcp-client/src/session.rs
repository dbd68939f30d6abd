//! Session lifecycle
//!
//! A session moves `Uninitialized -> Initialized -> Closed`, or straight to
//! `Closed` when the handshake fails. `Closed` is terminal.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::Result;
use crate::error::MCPError;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Closed,
}

impl SessionState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initialized => 1,
            Self::Closed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Initialized,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lock-free guard over a [`SessionState`]
///
/// Shared by every transport so that the "no calls before the handshake"
/// and "no calls after close" rules live in one place.
#[derive(Debug)]
pub struct SessionGate {
    state: AtomicU8,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Uninitialized.as_u8()),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Record a completed handshake
    ///
    /// Fails if the session was closed while the handshake was in flight.
    pub fn mark_initialized(&self) -> Result<()> {
        match self.state.compare_exchange(
            SessionState::Uninitialized.as_u8(),
            SessionState::Initialized.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(current) if SessionState::from_u8(current) == SessionState::Initialized => Ok(()),
            Err(_) => Err(MCPError::SessionClosed),
        }
    }

    /// Move to `Closed`, returning the previous state
    pub fn close(&self) -> SessionState {
        SessionState::from_u8(
            self.state
                .swap(SessionState::Closed.as_u8(), Ordering::AcqRel),
        )
    }

    /// Admit an operation that needs a completed handshake
    pub fn ensure_initialized(&self, operation: &str) -> Result<()> {
        match self.state() {
            SessionState::Initialized => Ok(()),
            SessionState::Uninitialized => Err(MCPError::NotInitialized(operation.to_string())),
            SessionState::Closed => Err(MCPError::SessionClosed),
        }
    }
}
