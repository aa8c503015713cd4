//! Rewrite Sessions
//!
//! A rewrite session turns a burst of edits (a project-wide replace, a formatter
//! run) into one atomic transition. While a session is active, requests are queued
//! instead of applied; ending the session replays them in order through the same
//! entry point used outside sessions.
//!
//! Readers never see a half-applied batch: any read while a session is active flushes
//! the queue first, which also ends the session. A later `end` with that token is
//! then a no-op.

use crate::error::{DocumentError, Result};
use crate::line_tracker::LineTracker;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

/// Token identifying a rewrite session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RewriteSession {
    id: u64,
}

impl RewriteSession {
    /// Numeric session id, unique per coordinator.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Something that can be driven by a [`RewriteSessionCoordinator`].
pub trait RewriteTarget {
    /// A deferred mutation.
    type Request;

    /// Apply one request immediately.
    fn apply(&mut self, request: Self::Request) -> Result<()>;
}

/// Text change request understood by [`LineTracker`].
///
/// A bare tracker has no text to look at, so `Replace` fails for delimiter tables
/// that [need context](crate::DelimiterSet::needs_context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRequest {
    /// Full replacement of the text.
    Set(String),
    /// Partial replacement.
    Replace {
        /// Start offset.
        offset: usize,
        /// Replaced length.
        length: usize,
        /// Inserted text.
        text: String,
    },
}

impl RewriteTarget for LineTracker {
    type Request = TextRequest;

    fn apply(&mut self, request: TextRequest) -> Result<()> {
        match request {
            TextRequest::Set(text) => {
                self.set(&text);
                Ok(())
            }
            TextRequest::Replace {
                offset,
                length,
                text,
            } => self.replace(offset, length, &text),
        }
    }
}

struct ActiveSession<R> {
    session: RewriteSession,
    pending: Vec<R>,
}

struct SessionState<R> {
    active: Option<ActiveSession<R>>,
    next_id: u64,
}

/// Queues requests for a target while a session is active.
///
/// Lock order is always session state, then target.
pub struct RewriteSessionCoordinator<T: RewriteTarget> {
    state: Mutex<SessionState<T::Request>>,
    target: RwLock<T>,
}

impl<T: RewriteTarget> RewriteSessionCoordinator<T> {
    /// Wrap `target`.
    pub fn new(target: T) -> Self {
        Self {
            state: Mutex::new(SessionState {
                active: None,
                next_id: 1,
            }),
            target: RwLock::new(target),
        }
    }

    /// Start a session. Fails with `IllegalState` if one is already active.
    pub fn begin(&self) -> Result<RewriteSession> {
        let mut state = self.state.lock();
        if state.active.is_some() {
            return Err(DocumentError::IllegalState(
                "a rewrite session is already active",
            ));
        }
        let session = RewriteSession { id: state.next_id };
        state.next_id += 1;
        state.active = Some(ActiveSession {
            session,
            pending: Vec::new(),
        });
        debug!(session = session.id, "rewrite session started");
        Ok(session)
    }

    /// End `session` and replay its queue. A stale token is ignored.
    pub fn end(&self, session: RewriteSession) -> Result<()> {
        let mut state = self.state.lock();
        if state.active.as_ref().map(|active| active.session) != Some(session) {
            trace!(session = session.id, "ignoring stale rewrite session");
            return Ok(());
        }
        self.flush_locked(&mut state)
    }

    /// Drop the queue of `session` without applying it; returns the number of
    /// discarded requests.
    ///
    /// Fails with `IllegalState` if `session` is not the active session, which
    /// includes a session that was already flushed.
    pub fn abandon(&self, session: RewriteSession) -> Result<usize> {
        let mut state = self.state.lock();
        match state.active.take() {
            Some(active) if active.session == session => {
                debug!(
                    session = session.id,
                    discarded = active.pending.len(),
                    "rewrite session abandoned"
                );
                Ok(active.pending.len())
            }
            other => {
                state.active = other;
                Err(DocumentError::IllegalState(
                    "rewrite session is not active (already flushed or ended)",
                ))
            }
        }
    }

    /// The active session, if any.
    pub fn active_session(&self) -> Option<RewriteSession> {
        self.state.lock().active.as_ref().map(|active| active.session)
    }

    /// Whether a session is active.
    pub fn is_active(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Queue `request` if a session is active, otherwise apply it.
    pub fn submit(&self, request: T::Request) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(active) = state.active.as_mut() {
            active.pending.push(request);
            return Ok(());
        }
        self.target.write().apply(request)
    }

    /// Apply any pending requests now, ending the active session.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.flush_locked(&mut state)
    }

    /// Shared access to the target after flushing.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, T>> {
        let mut state = self.state.lock();
        self.flush_locked(&mut state)?;
        Ok(self.target.read())
    }

    /// Exclusive access to the target after flushing.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, T>> {
        let mut state = self.state.lock();
        self.flush_locked(&mut state)?;
        Ok(self.target.write())
    }

    /// Exclusive access through a unique borrow, without flushing.
    pub fn target_mut(&mut self) -> &mut T {
        self.target.get_mut()
    }

    /// Consume the coordinator, flushing first.
    pub fn into_inner(self) -> Result<T> {
        self.flush()?;
        Ok(self.target.into_inner())
    }

    fn flush_locked(&self, state: &mut SessionState<T::Request>) -> Result<()> {
        let Some(active) = state.active.take() else {
            return Ok(());
        };
        debug!(
            session = active.session.id,
            pending = active.pending.len(),
            "flushing rewrite session"
        );
        let mut target = self.target.write();
        // The queue is consumed either way; the first failure is reported.
        for request in active.pending {
            target.apply(request)?;
        }
        Ok(())
    }
}

impl<T: RewriteTarget + Default> Default for RewriteSessionCoordinator<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
