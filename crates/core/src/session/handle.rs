// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner-side session handle

use super::{clear_current, Registry, SessionId, SessionInfo};
use crate::adapters::{LockManager, LockMode};
use crate::clock::{Clock, SystemClock};
use crate::context::ContextInfo;
use crate::curop::{OpKind, OpRecord};
use crate::error::Interrupted;
use crate::kill::CancelToken;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// A worker thread's session.
///
/// Not `Send`: contexts and nested operations borrow it, which confines
/// them to the thread that attached it.
pub struct Session<C: Clock = SystemClock> {
    info: Arc<SessionInfo>,
    registry: Arc<Registry<C>>,
    contexts: RefCell<Vec<ContextInfo>>,
    next_frame: Cell<u64>,
    elevated: Cell<bool>,
    shut_down: Cell<bool>,
    _not_send: PhantomData<Rc<()>>,
}

impl<C: Clock> Session<C> {
    pub(super) fn new(info: Arc<SessionInfo>, registry: Arc<Registry<C>>) -> Self {
        Self {
            info,
            registry,
            contexts: RefCell::new(Vec::new()),
            next_frame: Cell::new(1),
            elevated: Cell::new(false),
            shut_down: Cell::new(false),
            _not_send: PhantomData,
        }
    }

    pub fn id(&self) -> SessionId {
        self.info.id()
    }

    pub fn info(&self) -> &Arc<SessionInfo> {
        &self.info
    }

    pub fn registry(&self) -> &Arc<Registry<C>> {
        &self.registry
    }

    pub(crate) fn now(&self) -> Instant {
        self.registry.clock().now()
    }

    /// Leave the registry.
    ///
    /// Idempotent and always returns false. The thread-local slot is
    /// cleared so the thread can attach again. During process shutdown the
    /// registry is left alone; only the flag and the thread-local slot
    /// change.
    pub fn shutdown(&self) -> bool {
        if self.shut_down.replace(true) {
            return false;
        }
        clear_current(self.id());
        if self.registry.lifecycle().in_shutdown() {
            return false;
        }
        self.registry.remove(self.id());
        debug!(session = %self.id(), "session shut down");
        false
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.get()
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Innermost operation record
    pub fn current_op(&self) -> Arc<OpRecord> {
        self.info.current_op()
    }

    /// Start a new request.
    ///
    /// A fresh record replaces the root until the scope drops; then it is
    /// marked done and the previous (idle) root is current again.
    pub fn begin_request(&self, kind: OpKind) -> RequestScope<'_, C> {
        let op = Arc::new(OpRecord::new(kind, self.registry.config().max_payload_bytes));
        let prior = self.info.replace_root(op.clone());
        RequestScope {
            session: self,
            op,
            prior,
        }
    }

    /// Push a nested operation; it is popped when the scope drops
    pub fn begin_op(&self, kind: OpKind) -> OpScope<'_, C> {
        let op = Arc::new(OpRecord::new(kind, self.registry.config().max_payload_bytes));
        self.info.push_op(op.clone());
        OpScope { session: self, op }
    }

    /// True if the current operation must stop
    pub fn is_interrupted(&self) -> bool {
        self.check_for_interrupt().is_err()
    }

    /// Cooperative checkpoint
    pub fn check_for_interrupt(&self) -> Result<(), Interrupted> {
        self.cancel_token().check()
    }

    /// Token for the current operation, usable from helper code that does
    /// not have the session at hand
    pub fn cancel_token(&self) -> CancelToken {
        let op = self.current_op();
        CancelToken::new(
            op.id(),
            op.killed_flag(),
            Arc::clone(self.registry.kill_all_flag()),
            self.registry.lifecycle(),
        )
    }

    // -------------------------------------------------------------------------
    // Locks and privileges
    // -------------------------------------------------------------------------

    /// Take the database lock, showing the current operation as waiting
    /// while blocked
    pub fn lock(&self, mode: LockMode) -> HeldLock {
        let locks = Arc::clone(&self.registry.collaborators().locks);
        let op = self.current_op();
        op.waiting_for_lock(mode.into());
        locks.acquire(mode);
        op.got_lock();
        HeldLock {
            locks,
            mode,
            _not_send: PhantomData,
        }
    }

    /// Bypass authorization until the guard drops
    pub fn elevate(&self) -> ElevatedGuard<'_> {
        let prior = self.elevated.replace(true);
        ElevatedGuard {
            flag: &self.elevated,
            prior,
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated.get()
    }

    // -------------------------------------------------------------------------
    // Descriptive
    // -------------------------------------------------------------------------

    pub fn client_address(&self) -> String {
        self.info.client_address()
    }

    pub fn set_last_op(&self, ts: u64) {
        self.info.set_last_op(ts);
    }

    pub fn last_op(&self) -> u64 {
        self.info.last_op()
    }

    /// Status of the current operation as a JSON document
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.info.status(self.now()))
    }

    // -------------------------------------------------------------------------
    // Context stack
    // -------------------------------------------------------------------------

    pub fn current_context(&self) -> Option<ContextInfo> {
        self.contexts.borrow().last().cloned()
    }

    pub fn context_depth(&self) -> usize {
        self.contexts.borrow().len()
    }

    /// Push a frame, returning the depth to restore when it closes
    pub(crate) fn push_context(&self, mut frame: ContextInfo) -> (u64, usize) {
        let id = self.next_frame.get();
        self.next_frame.set(id + 1);
        frame.id = id;
        let mut contexts = self.contexts.borrow_mut();
        let prior = contexts.len();
        contexts.push(frame);
        (id, prior)
    }

    /// Restore the stack to `depth`, returning the frame now on top
    pub(crate) fn restore_contexts(&self, depth: usize) -> Option<ContextInfo> {
        let mut contexts = self.contexts.borrow_mut();
        contexts.truncate(depth);
        contexts.last().cloned()
    }

    pub(crate) fn top_frame_id(&self) -> Option<u64> {
        self.contexts.borrow().last().map(|frame| frame.id)
    }
}

impl<C: Clock> Drop for Session<C> {
    fn drop(&mut self) {
        let depth = self.contexts.get_mut().len();
        if depth > 0 {
            error!(session = %self.id(), depth, "session dropped with contexts still attached");
        }
        if !self.shut_down.get() {
            error!(session = %self.id(), "session dropped without shutdown");
            if !self.registry.lifecycle().in_shutdown() {
                self.registry.remove(self.id());
            }
        }
        clear_current(self.id());
    }
}

impl<C: Clock> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("desc", &self.info.description())
            .field("contexts", &self.context_depth())
            .finish()
    }
}

/// Database lock held through the lock manager; released on drop
pub struct HeldLock {
    locks: Arc<dyn LockManager>,
    mode: LockMode,
    _not_send: PhantomData<*const ()>,
}

impl HeldLock {
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        self.locks.release(self.mode);
    }
}

/// Nested operation; pops itself off the session when dropped
pub struct OpScope<'s, C: Clock = SystemClock> {
    session: &'s Session<C>,
    op: Arc<OpRecord>,
}

impl<C: Clock> OpScope<'_, C> {
    pub fn op(&self) -> &Arc<OpRecord> {
        &self.op
    }
}

impl<C: Clock> Deref for OpScope<'_, C> {
    type Target = OpRecord;

    fn deref(&self) -> &OpRecord {
        &self.op
    }
}

impl<C: Clock> Drop for OpScope<'_, C> {
    fn drop(&mut self) {
        self.op.done(self.session.now());
        if !self.session.info.pop_op(self.op.id()) {
            error!(op = %self.op.id(), "operation closed out of order");
        }
    }
}

/// One request's root operation; the previous root returns when dropped
pub struct RequestScope<'s, C: Clock = SystemClock> {
    session: &'s Session<C>,
    op: Arc<OpRecord>,
    prior: Arc<OpRecord>,
}

impl<C: Clock> RequestScope<'_, C> {
    pub fn op(&self) -> &Arc<OpRecord> {
        &self.op
    }
}

impl<C: Clock> Deref for RequestScope<'_, C> {
    type Target = OpRecord;

    fn deref(&self) -> &OpRecord {
        &self.op
    }
}

impl<C: Clock> Drop for RequestScope<'_, C> {
    fn drop(&mut self) {
        self.op.done(self.session.now());
        if !self
            .session
            .info
            .restore_root(self.op.id(), Arc::clone(&self.prior))
        {
            error!(op = %self.op.id(), "request closed out of order");
        }
    }
}

/// Restores the session's previous privilege level on drop
pub struct ElevatedGuard<'s> {
    flag: &'s Cell<bool>,
    prior: bool,
}

impl Drop for ElevatedGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.prior);
    }
}
