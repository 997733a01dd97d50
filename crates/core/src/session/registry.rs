// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide set of live sessions

use super::{set_current, Session, SessionId, SessionInfo};
use crate::adapters::Collaborators;
use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::curop::{OpKind, OpRecord, OpStatus};
use crate::error::SessionError;
use crate::lifecycle::Lifecycle;
use crate::sync::{lock_order, BasicLock};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

const REGISTRY_LOCK: &str = "session.registry";

/// Live sessions plus the collaborators they share.
///
/// Membership changes only on attach and shutdown. Scans (status, kill,
/// yield advice, active counts) hold the registry lock for their full
/// duration and must not call out to collaborators while doing so.
pub struct Registry<C: Clock = SystemClock> {
    sessions: BasicLock<Vec<Arc<SessionInfo>>>,
    collaborators: Collaborators,
    config: CoreConfig,
    clock: C,
    lifecycle: &'static Lifecycle,
    kill_all: Arc<AtomicBool>,
    next_connection: AtomicU64,
}

impl<C: Clock> Registry<C> {
    pub fn new(collaborators: Collaborators, clock: C) -> Self {
        Self {
            sessions: BasicLock::new(REGISTRY_LOCK, Vec::new()),
            collaborators,
            config: CoreConfig::default(),
            clock,
            lifecycle: Lifecycle::process(),
            kill_all: Arc::new(AtomicBool::new(false)),
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn with_config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: &'static Lifecycle) -> Self {
        self.sessions = BasicLock::with_lifecycle(REGISTRY_LOCK, Vec::new(), lifecycle);
        self.lifecycle = lifecycle;
        self
    }

    /// Attach an internal (connection-less) session to the calling thread
    pub fn attach(
        self: &Arc<Self>,
        description: impl Into<String>,
    ) -> Result<Session<C>, SessionError> {
        self.attach_inner(description.into(), 0, None)
    }

    /// Attach a session serving the client at `remote`
    pub fn attach_connection(
        self: &Arc<Self>,
        description: impl Into<String>,
        remote: SocketAddr,
    ) -> Result<Session<C>, SessionError> {
        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        self.attach_inner(description.into(), connection_id, Some(remote))
    }

    fn attach_inner(
        self: &Arc<Self>,
        description: String,
        connection_id: u64,
        remote: Option<SocketAddr>,
    ) -> Result<Session<C>, SessionError> {
        let root = OpRecord::new(OpKind::None, self.config.max_payload_bytes);
        let info = Arc::new(SessionInfo::new(description, connection_id, remote, root));
        if !set_current(info.clone()) {
            warn!(desc = info.description(), "thread already has a session attached");
            return Err(SessionError::AlreadyAttached);
        }
        self.sessions.acquire().push(info.clone());
        debug!(
            session = %info.id(),
            desc = info.description(),
            connection_id,
            "session attached"
        );
        Ok(Session::new(info, Arc::clone(self)))
    }

    /// Run `visitor` on every live session while holding the registry lock.
    ///
    /// Not re-entrant: `visitor` must not call back into the registry.
    pub fn for_each(&self, mut visitor: impl FnMut(&SessionInfo)) {
        debug_assert!(
            !lock_order::held_by_current_thread(REGISTRY_LOCK),
            "Registry::for_each called re-entrantly"
        );
        let sessions = self.sessions.acquire();
        for info in sessions.iter() {
            visitor(info);
        }
    }

    /// Status of every session's current operation
    pub fn status(&self) -> Vec<OpStatus> {
        let now = self.clock.now();
        let mut all = Vec::new();
        self.for_each(|info| all.push(info.status(now)));
        all
    }

    pub fn len(&self) -> usize {
        self.sessions.acquire().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.acquire().iter().any(|info| info.id() == id)
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn lifecycle(&self) -> &'static Lifecycle {
        self.lifecycle
    }

    pub(crate) fn kill_all_flag(&self) -> &Arc<AtomicBool> {
        &self.kill_all
    }

    pub(crate) fn remove(&self, id: SessionId) {
        self.sessions.acquire().retain(|info| info.id() != id);
    }
}
