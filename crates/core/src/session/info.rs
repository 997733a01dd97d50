// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The part of a session other threads may look at

use super::SessionId;
use crate::curop::{OpId, OpRecord, OpStatus};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Operation records of one session, outermost first
#[derive(Debug)]
struct OpStack {
    root: Arc<OpRecord>,
    nested: Vec<Arc<OpRecord>>,
}

#[derive(Debug)]
pub struct SessionInfo {
    id: SessionId,
    description: String,
    connection_id: u64,
    thread_label: String,
    remote: Option<SocketAddr>,
    ops: Mutex<OpStack>,
    last_op: AtomicU64,
}

impl SessionInfo {
    pub(super) fn new(
        description: String,
        connection_id: u64,
        remote: Option<SocketAddr>,
        root: OpRecord,
    ) -> Self {
        Self {
            id: SessionId::next(),
            description,
            connection_id,
            thread_label: format!("{:?}", std::thread::current().id()),
            remote,
            ops: Mutex::new(OpStack {
                root: Arc::new(root),
                nested: Vec::new(),
            }),
            last_op: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Zero for sessions without a client connection
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    pub fn thread_label(&self) -> &str {
        &self.thread_label
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    /// Remote peer as `host:port`, or empty for internal sessions
    pub fn client_address(&self) -> String {
        self.remote.map(|addr| addr.to_string()).unwrap_or_default()
    }

    /// Innermost operation record
    pub fn current_op(&self) -> Arc<OpRecord> {
        let ops = self.ops.lock();
        ops.nested.last().unwrap_or(&ops.root).clone()
    }

    /// Every record from the innermost out to the root
    pub fn op_chain(&self) -> Vec<Arc<OpRecord>> {
        let ops = self.ops.lock();
        ops.nested
            .iter()
            .rev()
            .chain(std::iter::once(&ops.root))
            .cloned()
            .collect()
    }

    pub fn op_depth(&self) -> usize {
        self.ops.lock().nested.len()
    }

    /// Timestamp of the last replicated write this session made
    pub fn last_op(&self) -> u64 {
        self.last_op.load(Ordering::Relaxed)
    }

    pub fn set_last_op(&self, ts: u64) {
        self.last_op.store(ts, Ordering::Relaxed);
    }

    /// Status of the current operation, tagged with this session's identity
    pub fn status(&self, now: Instant) -> OpStatus {
        let mut status = self.current_op().status(now);
        status.client = self.remote.map(|addr| addr.to_string());
        status.desc = self.description.clone();
        status.thread_id = self.thread_label.clone();
        status.connection_id = self.connection_id;
        status
    }

    /// Install `op` as the root, returning the one it replaced
    pub(super) fn replace_root(&self, op: Arc<OpRecord>) -> Arc<OpRecord> {
        let mut ops = self.ops.lock();
        debug_assert!(
            ops.nested.is_empty(),
            "new request started with nested operations open"
        );
        std::mem::replace(&mut ops.root, op)
    }

    /// Put `prior` back as the root if `current` is still the root.
    ///
    /// Nested records left open are discarded. False unless `current` was
    /// the root and nothing was nested inside it.
    pub(super) fn restore_root(&self, current: OpId, prior: Arc<OpRecord>) -> bool {
        let mut ops = self.ops.lock();
        if ops.root.id() != current {
            return false;
        }
        let clean = ops.nested.is_empty();
        ops.nested.clear();
        ops.root = prior;
        clean
    }

    pub(super) fn push_op(&self, op: Arc<OpRecord>) {
        self.ops.lock().nested.push(op);
    }

    /// Pop `id` and everything nested inside it.
    ///
    /// False unless `id` was the innermost open record.
    pub(super) fn pop_op(&self, id: OpId) -> bool {
        let mut ops = self.ops.lock();
        match ops.nested.iter().rposition(|op| op.id() == id) {
            Some(pos) => {
                let innermost = pos + 1 == ops.nested.len();
                ops.nested.truncate(pos);
                innermost
            }
            None => false,
        }
    }
}
