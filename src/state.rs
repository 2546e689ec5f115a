//! Transfer state: the session cell, busy flags and their transitions.
//!
//! [`transition`] is a pure function of (context, event). [`SharedContext`]
//! wraps a context in a mutex so the UI loop and transfer tasks can share it;
//! the lock is never held across an `.await`.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};

/// Opaque session token issued by the service after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse phase derived from a [`TransferContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPhase {
    /// No usable session, or the last archive was delivered.
    Idle,
    /// At least one upload is in flight.
    Uploading,
    /// A session exists and its archive has not been delivered yet.
    Ready(SessionId),
    /// A conversion is in flight.
    Converting,
}

/// Inputs to [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    UploadStarted,
    /// The last completion to arrive sets the session.
    UploadSucceeded { session: SessionId },
    UploadFailed,
    ConvertStarted,
    ConvertSucceeded,
    ConvertFailed,
}

/// Everything the transfer client remembers between calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferContext {
    session: Option<SessionId>,
    uploads_in_flight: usize,
    converts_in_flight: usize,
    /// Conversions started so far; numbers each call's scratch file.
    converts_issued: u64,
    delivered: bool,
}

impl TransferContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current session, if an upload has succeeded.
    #[must_use]
    pub const fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Busy flag for uploads.
    #[must_use]
    pub const fn is_uploading(&self) -> bool {
        self.uploads_in_flight > 0
    }

    /// Busy flag for conversions.
    #[must_use]
    pub const fn is_converting(&self) -> bool {
        self.converts_in_flight > 0
    }

    /// Number of the most recently started conversion, starting at 1.
    #[must_use]
    pub const fn converts_issued(&self) -> u64 {
        self.converts_issued
    }

    /// Whether the archive for the current session has been delivered.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        self.delivered
    }

    /// Whether the UI should offer the convert action right now.
    #[must_use]
    pub const fn can_convert(&self) -> bool {
        self.session.is_some() && !self.is_uploading() && !self.is_converting()
    }

    #[must_use]
    pub fn phase(&self) -> TransferPhase {
        if self.is_uploading() {
            TransferPhase::Uploading
        } else if self.is_converting() {
            TransferPhase::Converting
        } else {
            match &self.session {
                Some(session) if !self.delivered => TransferPhase::Ready(session.clone()),
                _ => TransferPhase::Idle,
            }
        }
    }
}

/// Applies `event` to `ctx` and returns the resulting context.
///
/// # Errors
///
/// Returns [`Error::NoSession`] for `ConvertStarted` when no session exists.
pub fn transition(ctx: &TransferContext, event: &StateEvent) -> Result<TransferContext> {
    let mut next = ctx.clone();
    match event {
        StateEvent::UploadStarted => {
            next.uploads_in_flight += 1;
        }
        StateEvent::UploadSucceeded { session } => {
            next.uploads_in_flight = next.uploads_in_flight.saturating_sub(1);
            next.session = Some(session.clone());
            next.delivered = false;
        }
        StateEvent::UploadFailed => {
            next.uploads_in_flight = next.uploads_in_flight.saturating_sub(1);
        }
        StateEvent::ConvertStarted => {
            if next.session.is_none() {
                return Err(Error::NoSession);
            }
            next.converts_in_flight += 1;
            next.converts_issued += 1;
        }
        StateEvent::ConvertSucceeded => {
            next.converts_in_flight = next.converts_in_flight.saturating_sub(1);
            next.delivered = true;
        }
        StateEvent::ConvertFailed => {
            next.converts_in_flight = next.converts_in_flight.saturating_sub(1);
        }
    }
    Ok(next)
}

/// A [`TransferContext`] shared between the UI loop and transfer tasks.
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    inner: Arc<Mutex<TransferContext>>,
}

impl SharedContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current context.
    #[must_use]
    pub fn snapshot(&self) -> TransferContext {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `event` atomically and returns the (before, after) contexts.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`transition`]; the stored context is left untouched.
    pub fn apply(&self, event: &StateEvent) -> Result<(TransferContext, TransferContext)> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let next = transition(&guard, event)?;
        let before = std::mem::replace(&mut *guard, next.clone());
        Ok((before, next))
    }
}
