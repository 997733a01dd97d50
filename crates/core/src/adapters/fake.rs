// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborator implementations for testing

use super::traits::*;
use crate::curop::OpId;
use crate::ns;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Recorded call to a collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorCall {
    // Lock manager
    Acquire {
        mode: LockMode,
    },
    Release {
        mode: LockMode,
    },

    // Database resolver
    Resolve {
        ns: String,
    },
    ResolveOrCreate {
        ns: String,
    },

    // Predicates
    ShardCheck {
        ns: String,
    },
    Authorize {
        database: String,
        lock_state: LockState,
    },

    // Script engine
    Interrupt {
        op: OpId,
    },
    InterruptAll,

    // Timing
    Timing(TimingSample),
}

/// Shared state for fake collaborators
#[derive(Default)]
struct FakeState {
    calls: Vec<CollaboratorCall>,
    lock_states: HashMap<ThreadId, i32>,
    locked_collection: Option<String>,
    databases: HashMap<(PathBuf, String), Arc<Database>>,
    // Configurable failure modes
    storage_exhausted: bool,
    drop_on_create: bool,
    stale: HashMap<String, String>,
    denied: HashSet<String>,
}

/// Fake collaborators with call recording for testing.
///
/// The lock manager never blocks; it only tracks each thread's lock state
/// the way the real one reports it. A shared acquisition inside an exclusive
/// lock nests as exclusive.
#[derive(Clone, Default)]
pub struct FakeCollaborators {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle for a registry, every handle backed by this fake
    pub fn collaborators(&self) -> Collaborators {
        let shared = Arc::new(self.clone());
        Collaborators {
            locks: shared.clone(),
            databases: shared.clone(),
            shard_versions: shared.clone(),
            auth: shared.clone(),
            scripts: shared.clone(),
            timing: shared,
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<CollaboratorCall> {
        self.state.lock().calls.clone()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Recorded timing samples, in order
    pub fn timings(&self) -> Vec<TimingSample> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                CollaboratorCall::Timing(sample) => Some(sample.clone()),
                _ => None,
            })
            .collect()
    }

    /// Force the calling thread's lock state
    pub fn set_lock_state(&self, state: LockState) {
        self.state
            .lock()
            .lock_states
            .insert(thread::current().id(), state.0);
    }

    pub fn set_locked_collection(&self, ns: Option<&str>) {
        self.state.lock().locked_collection = ns.map(str::to_string);
    }

    /// Add a pre-existing database
    pub fn add_database(&self, name: &str, path: impl Into<PathBuf>) -> Arc<Database> {
        let path = path.into();
        let db = Arc::new(Database::new(name, path.clone()));
        self.state
            .lock()
            .databases
            .insert((path, name.to_string()), db.clone());
        db
    }

    pub fn has_database(&self, name: &str, path: &Path) -> bool {
        self.state
            .lock()
            .databases
            .contains_key(&(path.to_path_buf(), name.to_string()))
    }

    pub fn set_storage_exhausted(&self, exhausted: bool) {
        self.state.lock().storage_exhausted = exhausted;
    }

    /// Forget databases as soon as they are created (a concurrent drop)
    pub fn set_drop_on_create(&self, drop: bool) {
        self.state.lock().drop_on_create = drop;
    }

    /// Report `ns` as stale with `message` until cleared with `None`
    pub fn set_stale(&self, ns: &str, message: Option<&str>) {
        let mut state = self.state.lock();
        match message {
            Some(message) => state.stale.insert(ns.to_string(), message.to_string()),
            None => state.stale.remove(ns),
        };
    }

    pub fn deny(&self, database: &str) {
        self.state.lock().denied.insert(database.to_string());
    }
}

impl LockManager for FakeCollaborators {
    fn state(&self) -> LockState {
        let state = self.state.lock();
        LockState(
            state
                .lock_states
                .get(&thread::current().id())
                .copied()
                .unwrap_or(0),
        )
    }

    fn acquire(&self, mode: LockMode) {
        let mut state = self.state.lock();
        state.calls.push(CollaboratorCall::Acquire { mode });
        let current = state.lock_states.entry(thread::current().id()).or_insert(0);
        *current = match mode {
            LockMode::Shared if *current > 0 => *current + 1,
            LockMode::Shared => *current - 1,
            LockMode::Exclusive => current.abs() + 1,
        };
    }

    fn release(&self, mode: LockMode) {
        let mut state = self.state.lock();
        state.calls.push(CollaboratorCall::Release { mode });
        let current = state.lock_states.entry(thread::current().id()).or_insert(0);
        *current -= current.signum();
    }

    fn locked_collection(&self) -> Option<String> {
        self.state.lock().locked_collection.clone()
    }
}

impl DatabaseResolver for FakeCollaborators {
    fn resolve(&self, ns: &str, path: &Path) -> Option<Arc<Database>> {
        let mut state = self.state.lock();
        state
            .calls
            .push(CollaboratorCall::Resolve { ns: ns.to_string() });
        let key = (path.to_path_buf(), ns::database_of(ns).to_string());
        state.databases.get(&key).cloned()
    }

    fn resolve_or_create(&self, ns: &str, path: &Path) -> (Arc<Database>, bool) {
        let mut state = self.state.lock();
        state
            .calls
            .push(CollaboratorCall::ResolveOrCreate { ns: ns.to_string() });
        let name = ns::database_of(ns);
        let key = (path.to_path_buf(), name.to_string());
        if let Some(db) = state.databases.get(&key) {
            return (db.clone(), false);
        }
        let db = Arc::new(Database::new(name, path));
        if !state.drop_on_create {
            state.databases.insert(key, db.clone());
        }
        (db, true)
    }

    fn storage_exhausted(&self) -> bool {
        self.state.lock().storage_exhausted
    }
}

impl ShardVersionCheck for FakeCollaborators {
    fn is_current(&self, ns: &str) -> Result<(), String> {
        let mut state = self.state.lock();
        state
            .calls
            .push(CollaboratorCall::ShardCheck { ns: ns.to_string() });
        match state.stale.get(ns) {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }
}

impl Authorizer for FakeCollaborators {
    fn is_authorized(&self, database: &str, lock_state: LockState) -> bool {
        let mut state = self.state.lock();
        state.calls.push(CollaboratorCall::Authorize {
            database: database.to_string(),
            lock_state,
        });
        !state.denied.contains(database)
    }
}

impl ScriptInterrupt for FakeCollaborators {
    fn interrupt(&self, op: OpId) {
        self.state
            .lock()
            .calls
            .push(CollaboratorCall::Interrupt { op });
    }

    fn interrupt_all(&self) {
        self.state.lock().calls.push(CollaboratorCall::InterruptAll);
    }
}

impl TimingSink for FakeCollaborators {
    fn record(&self, sample: &TimingSample) {
        self.state
            .lock()
            .calls
            .push(CollaboratorCall::Timing(sample.clone()));
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
