// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory catalog of open databases

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strata_core::{ns, Database, DatabaseResolver};

/// Open databases keyed by storage root and database name.
///
/// Opening is just registration: no files are touched. Storage exhaustion
/// is a flag the storage layer flips when allocation fails.
#[derive(Debug, Default)]
pub struct DatabaseHolder {
    open: Mutex<HashMap<(PathBuf, String), Arc<Database>>>,
    exhausted: AtomicBool,
}

impl DatabaseHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, name: &str, path: &Path) -> bool {
        self.open
            .lock()
            .contains_key(&(path.to_path_buf(), name.to_string()))
    }

    /// Names of the databases open under `path`, sorted
    pub fn names(&self, path: &Path) -> Vec<String> {
        let mut names: Vec<String> = self
            .open
            .lock()
            .keys()
            .filter(|(root, _)| root == path)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Forget an open database. Existing handles stay valid.
    pub fn close_database(&self, name: &str, path: &Path) -> bool {
        let closed = self
            .open
            .lock()
            .remove(&(path.to_path_buf(), name.to_string()))
            .is_some();
        if closed {
            tracing::debug!(db = name, path = %path.display(), "database closed");
        }
        closed
    }

    pub fn set_storage_exhausted(&self, exhausted: bool) {
        let was = self.exhausted.swap(exhausted, Ordering::Relaxed);
        if exhausted && !was {
            tracing::warn!("storage exhausted, refusing writes");
        }
    }
}

impl DatabaseResolver for DatabaseHolder {
    fn resolve(&self, ns: &str, path: &Path) -> Option<Arc<Database>> {
        let key = (path.to_path_buf(), ns::database_of(ns).to_string());
        self.open.lock().get(&key).cloned()
    }

    fn resolve_or_create(&self, ns: &str, path: &Path) -> (Arc<Database>, bool) {
        let name = ns::database_of(ns);
        let mut open = self.open.lock();
        if let Some(db) = open.get(&(path.to_path_buf(), name.to_string())) {
            return (db.clone(), false);
        }
        let db = Arc::new(Database::new(name, path));
        open.insert((path.to_path_buf(), name.to_string()), db.clone());
        tracing::debug!(db = name, path = %path.display(), "database opened");
        (db, true)
    }

    fn storage_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "holder_tests.rs"]
mod tests;
