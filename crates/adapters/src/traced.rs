// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced collaborator wrappers for consistent observability

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use strata_core::{
    Database, DatabaseResolver, LockManager, LockMode, LockState, OpId, ScriptInterrupt,
    TimingSample, TimingSink,
};

/// Wrapper that adds tracing to any LockManager
#[derive(Clone, Debug)]
pub struct TracedLockManager<L> {
    inner: L,
}

impl<L> TracedLockManager<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<L: LockManager> LockManager for TracedLockManager<L> {
    fn state(&self) -> LockState {
        self.inner.state()
    }

    fn acquire(&self, mode: LockMode) {
        let span = tracing::info_span!("lock.acquire", ?mode);
        let _guard = span.enter();

        let before = self.inner.state();
        let start = Instant::now();
        self.inner.acquire(mode);
        let elapsed = start.elapsed();

        tracing::debug!(
            %before,
            after = %self.inner.state(),
            elapsed_us = elapsed.as_micros() as u64,
            "acquired"
        );
    }

    fn release(&self, mode: LockMode) {
        let span = tracing::info_span!("lock.release", ?mode);
        let _guard = span.enter();

        self.inner.release(mode);
        tracing::debug!(after = %self.inner.state(), "released");
    }

    fn locked_collection(&self) -> Option<String> {
        self.inner.locked_collection()
    }
}

/// Wrapper that adds tracing to any DatabaseResolver
#[derive(Clone, Debug)]
pub struct TracedDatabaseResolver<R> {
    inner: R,
}

impl<R> TracedDatabaseResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: DatabaseResolver> DatabaseResolver for TracedDatabaseResolver<R> {
    fn resolve(&self, ns: &str, path: &Path) -> Option<Arc<Database>> {
        let result = self.inner.resolve(ns, path);
        tracing::trace!(ns, found = result.is_some(), "resolved");
        result
    }

    fn resolve_or_create(&self, ns: &str, path: &Path) -> (Arc<Database>, bool) {
        let span = tracing::info_span!("database.open", ns, path = %path.display());
        let _guard = span.enter();

        let start = Instant::now();
        let (db, created) = self.inner.resolve_or_create(ns, path);
        let elapsed = start.elapsed();

        if created {
            tracing::info!(
                db = db.name(),
                elapsed_us = elapsed.as_micros() as u64,
                "database created"
            );
        } else {
            tracing::trace!("already open");
        }
        (db, created)
    }

    fn storage_exhausted(&self) -> bool {
        let exhausted = self.inner.storage_exhausted();
        if exhausted {
            tracing::warn!("storage exhausted");
        }
        exhausted
    }
}

/// Wrapper that adds tracing to any ScriptInterrupt
#[derive(Clone, Debug)]
pub struct TracedScriptInterrupt<S> {
    inner: S,
}

impl<S> TracedScriptInterrupt<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: ScriptInterrupt> ScriptInterrupt for TracedScriptInterrupt<S> {
    fn interrupt(&self, op: OpId) {
        let span = tracing::info_span!("script.interrupt", %op);
        let _guard = span.enter();

        self.inner.interrupt(op);
        tracing::info!("interrupted");
    }

    fn interrupt_all(&self) {
        let span = tracing::info_span!("script.interrupt_all");
        let _guard = span.enter();

        self.inner.interrupt_all();
        tracing::info!("interrupted");
    }
}

/// Wrapper that adds tracing to any TimingSink
#[derive(Clone, Debug)]
pub struct TracedTimingSink<T> {
    inner: T,
}

impl<T> TracedTimingSink<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: TimingSink> TimingSink for TracedTimingSink<T> {
    fn record(&self, sample: &TimingSample) {
        tracing::trace!(
            ns = %sample.ns,
            kind = sample.kind.as_str(),
            lock = ?sample.lock_type,
            elapsed_us = sample.elapsed_micros,
            command = sample.is_command,
            "timing"
        );
        self.inner.record(sample);
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
