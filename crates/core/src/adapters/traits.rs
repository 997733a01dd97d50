// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborator trait definitions
//!
//! The storage lock manager, database catalog, authorization policy, shard
//! routing, script engine and timing table all live outside this crate.
//! Sessions and contexts only reach them through these traits.

use crate::curop::{LockType, OpId, OpKind};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

// =============================================================================
// Lock manager
// =============================================================================

/// Lock state of the calling thread as reported by the lock manager.
///
/// Zero means no lock, positive means exclusive, negative means shared.
/// A magnitude above one means the lock is held recursively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LockState(pub i32);

impl LockState {
    pub const NONE: LockState = LockState(0);
    pub const SHARED: LockState = LockState(-1);
    pub const EXCLUSIVE: LockState = LockState(1);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_exclusive(self) -> bool {
        self.0 > 0
    }

    pub fn is_shared(self) -> bool {
        self.0 < 0
    }

    /// Shared and already held at least once further out
    pub fn is_nested_shared(self) -> bool {
        self.0 < -1
    }

    pub fn mode(self) -> Option<LockMode> {
        match self.0 {
            0 => None,
            n if n > 0 => Some(LockMode::Exclusive),
            _ => Some(LockMode::Shared),
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl From<LockMode> for LockType {
    fn from(mode: LockMode) -> Self {
        match mode {
            LockMode::Shared => LockType::Read,
            LockMode::Exclusive => LockType::Write,
        }
    }
}

/// The storage engine's database lock.
///
/// Lock state is per thread: `state` reports what the calling thread holds.
pub trait LockManager: Send + Sync + 'static {
    fn state(&self) -> LockState;

    /// Block until the calling thread holds the lock in `mode`
    fn acquire(&self, mode: LockMode);

    fn release(&self, mode: LockMode);

    /// Namespace of a collection-level lock held by the calling thread, if any
    fn locked_collection(&self) -> Option<String> {
        None
    }
}

// =============================================================================
// Databases
// =============================================================================

/// Handle to an open database
#[derive(Debug)]
pub struct Database {
    name: String,
    path: PathBuf,
    profile: AtomicI32,
}

impl Database {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            profile: AtomicI32::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Profiling level (0 off, 1 slow operations, 2 everything)
    pub fn profile(&self) -> i32 {
        self.profile.load(Ordering::Relaxed)
    }

    pub fn set_profile(&self, level: i32) {
        self.profile.store(level, Ordering::Relaxed);
    }
}

/// Catalog of open databases keyed by storage root and database name
pub trait DatabaseResolver: Send + Sync + 'static {
    /// Look up an already-open database for `ns`
    fn resolve(&self, ns: &str, path: &Path) -> Option<Arc<Database>>;

    /// Open the database for `ns`, creating it if needed.
    ///
    /// The flag is true when the database did not exist before this call.
    fn resolve_or_create(&self, ns: &str, path: &Path) -> (Arc<Database>, bool);

    /// True once the storage layer can no longer allocate files
    fn storage_exhausted(&self) -> bool {
        false
    }
}

// =============================================================================
// Policy predicates
// =============================================================================

/// Shard routing freshness check
pub trait ShardVersionCheck: Send + Sync + 'static {
    /// `Err` carries the reason the caller's routing data is stale
    fn is_current(&self, ns: &str) -> Result<(), String>;
}

pub trait Authorizer: Send + Sync + 'static {
    fn is_authorized(&self, database: &str, lock_state: LockState) -> bool;
}

/// Interrupt hook into the embedded script engine
pub trait ScriptInterrupt: Send + Sync + 'static {
    fn interrupt(&self, op: OpId);
    fn interrupt_all(&self);
}

// =============================================================================
// Timing
// =============================================================================

/// Time spent by one operation inside one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingSample {
    pub ns: String,
    pub kind: OpKind,
    pub lock_type: LockType,
    pub elapsed_micros: u64,
    pub is_command: bool,
}

/// Per-namespace usage table
pub trait TimingSink: Send + Sync + 'static {
    fn record(&self, sample: &TimingSample);
}

// =============================================================================
// Shared handles
// =============================================================================

impl<T: LockManager + ?Sized> LockManager for Arc<T> {
    fn state(&self) -> LockState {
        (**self).state()
    }

    fn acquire(&self, mode: LockMode) {
        (**self).acquire(mode)
    }

    fn release(&self, mode: LockMode) {
        (**self).release(mode)
    }

    fn locked_collection(&self) -> Option<String> {
        (**self).locked_collection()
    }
}

impl<T: DatabaseResolver + ?Sized> DatabaseResolver for Arc<T> {
    fn resolve(&self, ns: &str, path: &Path) -> Option<Arc<Database>> {
        (**self).resolve(ns, path)
    }

    fn resolve_or_create(&self, ns: &str, path: &Path) -> (Arc<Database>, bool) {
        (**self).resolve_or_create(ns, path)
    }

    fn storage_exhausted(&self) -> bool {
        (**self).storage_exhausted()
    }
}

impl<T: ScriptInterrupt + ?Sized> ScriptInterrupt for Arc<T> {
    fn interrupt(&self, op: OpId) {
        (**self).interrupt(op)
    }

    fn interrupt_all(&self) {
        (**self).interrupt_all()
    }
}

impl<T: TimingSink + ?Sized> TimingSink for Arc<T> {
    fn record(&self, sample: &TimingSample) {
        (**self).record(sample)
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// Every collaborator a registry needs, shared between its sessions
#[derive(Clone)]
pub struct Collaborators {
    pub locks: Arc<dyn LockManager>,
    pub databases: Arc<dyn DatabaseResolver>,
    pub shard_versions: Arc<dyn ShardVersionCheck>,
    pub auth: Arc<dyn Authorizer>,
    pub scripts: Arc<dyn ScriptInterrupt>,
    pub timing: Arc<dyn TimingSink>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
