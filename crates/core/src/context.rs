// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution contexts: nested scopes of access to one namespace
//!
//! Opening a context pushes a frame on the session's context stack and
//! enters the current operation record; dropping it records the time spent
//! with the timing sink and restores the stack to the depth it had when the
//! context was opened, whichever way the scope exits.
//!
//! Contexts borrow their [`Session`], which is `!Send`, so a context can
//! only be closed on the thread that opened it.

use crate::adapters::{Database, LockMode, LockState};
use crate::clock::{Clock, SystemClock};
use crate::curop::OpRecord;
use crate::error::ContextError;
use crate::ns;
use crate::session::{HeldLock, Session};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error, warn};

/// One frame of a session's context stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    /// Unique within the session
    pub id: u64,
    pub ns: String,
    pub path: PathBuf,
    pub database: String,
    /// The database did not exist before this context opened it
    pub just_created: bool,
}

pub struct ExecutionContext<'s, C: Clock = SystemClock> {
    session: &'s Session<C>,
    frame: ContextInfo,
    db: Arc<Database>,
    op: Arc<OpRecord>,
    prior_depth: usize,
    owner: ThreadId,
}

impl<'s, C: Clock> ExecutionContext<'s, C> {
    /// Open a context on an already-resolved database
    pub fn with_database(
        session: &'s Session<C>,
        ns: &str,
        db: Arc<Database>,
    ) -> Result<Self, ContextError> {
        Self::attach(session, ns, db, false)
    }

    /// Open a context on `ns`, creating its database if needed.
    ///
    /// The caller must already hold the database lock.
    pub fn open(session: &'s Session<C>, ns: &str, path: &Path) -> Result<Self, ContextError> {
        let collab = session.registry().collaborators();
        let state = collab.locks.state();
        if state.is_none() {
            error!(ns, "context opened without holding a lock");
            return Err(ContextError::LockNotHeld { ns: ns.to_string() });
        }
        if state.is_exclusive() && collab.databases.storage_exhausted() {
            warn!(ns, "refusing write lock while out of disk space");
            return Err(ContextError::OutOfDiskSpace { ns: ns.to_string() });
        }
        let (db, just_created) = collab.databases.resolve_or_create(ns, path);
        Self::attach(session, ns, db, just_created)
    }

    /// [`open`](Self::open) under the configured storage root
    pub fn open_default(session: &'s Session<C>, ns: &str) -> Result<Self, ContextError> {
        let path = session.registry().config().db_path.clone();
        Self::open(session, ns, &path)
    }

    fn attach(
        session: &'s Session<C>,
        ns: &str,
        db: Arc<Database>,
        just_created: bool,
    ) -> Result<Self, ContextError> {
        let collab = session.registry().collaborators();
        let op = session.current_op();

        if !op.kind().checks_own_shard_version() {
            if let Err(reason) = collab.shard_versions.is_current(ns) {
                let message = format!("[{ns}] shard version not ok in context: {reason}");
                warn!(ns, %message, "stale shard config");
                return Err(ContextError::StaleConfig {
                    ns: ns.to_string(),
                    message,
                });
            }
        }

        let (id, prior_depth) = session.push_context(ContextInfo {
            id: 0,
            ns: ns.to_string(),
            path: db.path().to_path_buf(),
            database: db.name().to_string(),
            just_created,
        });

        let lock_state = collab.locks.state();
        if !session.is_elevated() && !collab.auth.is_authorized(db.name(), lock_state) {
            session.restore_contexts(prior_depth);
            let client = session.client_address();
            warn!(db = db.name(), %lock_state, client, "unauthorized");
            return Err(ContextError::Unauthorized {
                database: db.name().to_string(),
                lock_state,
                client,
            });
        }

        op.enter(ns, db.profile(), session.now());
        check_collection_lock(collab.locks.locked_collection(), ns);
        debug!(ns, depth = prior_depth + 1, just_created, "context entered");

        Ok(Self {
            session,
            frame: ContextInfo {
                id,
                ns: ns.to_string(),
                path: db.path().to_path_buf(),
                database: db.name().to_string(),
                just_created,
            },
            db,
            op,
            prior_depth,
            owner: thread::current().id(),
        })
    }

    pub fn ns(&self) -> &str {
        &self.frame.ns
    }

    pub fn path(&self) -> &Path {
        &self.frame.path
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn just_created(&self) -> bool {
        self.frame.just_created
    }

    pub fn info(&self) -> &ContextInfo {
        &self.frame
    }

    /// Operation record this context entered
    pub fn op(&self) -> &Arc<OpRecord> {
        &self.op
    }

    /// True if this context is on database `db` under storage root `path`
    pub fn in_db(&self, db: &str, path: &Path) -> bool {
        self.frame.path == path && ns::is_subcollection_of(db, &self.frame.ns)
    }
}

impl<C: Clock> Drop for ExecutionContext<'_, C> {
    fn drop(&mut self) {
        debug_assert_eq!(
            thread::current().id(),
            self.owner,
            "context closed on a thread other than its owner"
        );
        if self.session.top_frame_id() != Some(self.frame.id) {
            error!(ns = %self.frame.ns, "context closed out of order");
        }
        let enclosing = self.session.restore_contexts(self.prior_depth);
        let sample = self.op.leave(
            self.session.now(),
            enclosing.as_ref().map(|frame| frame.ns.as_str()),
        );
        self.session
            .registry()
            .collaborators()
            .timing
            .record(&sample);
        debug!(ns = %self.frame.ns, depth = self.prior_depth, "context left");
    }
}

impl<C: Clock> std::fmt::Debug for ExecutionContext<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("frame", &self.frame)
            .field("op", &self.op.id())
            .finish()
    }
}

fn check_collection_lock(locked: Option<String>, ns: &str) {
    if let Some(collection) = locked {
        if !ns::is_subcollection_of(&collection, ns) {
            error!(ns, locked = %collection, "context outside the locked collection");
        }
    }
}

/// Shared lock plus a context, opening an absent database if it can.
///
/// The context is declared first so it closes before the lock is released.
pub struct ReadContext<'s, C: Clock = SystemClock> {
    ctx: ExecutionContext<'s, C>,
    lock: HeldLock,
}

impl<C: Clock> std::fmt::Debug for ReadContext<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadContext")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl<'s, C: Clock> ReadContext<'s, C> {
    pub fn open(session: &'s Session<C>, ns: &str, path: &Path) -> Result<Self, ContextError> {
        let collab = session.registry().collaborators();
        let lock = session.lock(LockMode::Shared);
        if let Some(db) = collab.databases.resolve(ns, path) {
            let ctx = ExecutionContext::with_database(session, ns, db)?;
            return Ok(Self { ctx, lock });
        }

        match collab.locks.state() {
            state if state.is_exclusive() => {
                debug!(ns, "write locked on read context construction");
                let ctx = ExecutionContext::open(session, ns, path)?;
                Ok(Self { ctx, lock })
            }
            LockState::SHARED => {
                drop(lock);
                let created = {
                    let _write = session.lock(LockMode::Exclusive);
                    let ctx = ExecutionContext::open(session, ns, path)?;
                    ctx.just_created()
                };
                let lock = session.lock(LockMode::Shared);
                let Some(db) = collab.databases.resolve(ns, path) else {
                    warn!(ns, "database closed before it could be read");
                    return Err(ContextError::DatabaseNotFound { ns: ns.to_string() });
                };
                let ctx = ExecutionContext::attach(session, ns, db, created)?;
                Ok(Self { ctx, lock })
            }
            state if state.is_nested_shared() => {
                warn!(ns, %state, "can't open a database from a nested read lock");
                Err(ContextError::NestedReadLock { ns: ns.to_string() })
            }
            _ => {
                error!(ns, "shared lock not reported after acquiring it");
                Err(ContextError::LockNotHeld { ns: ns.to_string() })
            }
        }
    }

    pub fn lock_mode(&self) -> LockMode {
        self.lock.mode()
    }
}

impl<'s, C: Clock> Deref for ReadContext<'s, C> {
    type Target = ExecutionContext<'s, C>;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
