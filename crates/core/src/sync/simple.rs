// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain lock/unlock with no recursion
//!
//! The lock is a gate (`locked` flag + condvar) rather than a guard-owning
//! mutex so that [`RecursiveLock`](super::RecursiveLock) can release it from
//! a different stack frame than the one that took it.

use super::{check_teardown, decrement_hold, hold_count, increment_hold, next_lock_id, ScopedLock};
use crate::lifecycle::Lifecycle;
use parking_lot::{Condvar, Mutex};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub(super) struct Gate {
    locked: Mutex<bool>,
    released: Condvar,
}

/// Non-recursive lock. Re-acquiring on the owning thread is a bug; debug
/// builds assert on it instead of deadlocking.
pub struct SimpleLock {
    name: &'static str,
    id: u64,
    pub(super) gate: Arc<Gate>,
    acquisitions: AtomicU64,
    lifecycle: &'static Lifecycle,
}

impl SimpleLock {
    pub fn new(name: &'static str) -> Self {
        Self::with_lifecycle(name, Lifecycle::process())
    }

    pub fn with_lifecycle(name: &'static str, lifecycle: &'static Lifecycle) -> Self {
        Self {
            name,
            id: next_lock_id(),
            gate: Arc::new(Gate::default()),
            acquisitions: AtomicU64::new(0),
            lifecycle,
        }
    }

    pub fn acquire(&self) -> SimpleGuard<'_> {
        self.assert_not_held();
        self.lock_raw();
        increment_hold(self.id);
        SimpleGuard::new(self)
    }

    pub fn try_acquire(&self, timeout: Duration) -> Option<SimpleGuard<'_>> {
        self.assert_not_held();
        if !self.try_lock_raw(timeout) {
            return None;
        }
        increment_hold(self.id);
        Some(SimpleGuard::new(self))
    }

    /// True if the calling thread holds this lock
    pub fn is_locked_by_me(&self) -> bool {
        hold_count(self.id) > 0
    }

    /// Number of times the underlying gate has been closed
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    fn assert_not_held(&self) {
        debug_assert_eq!(
            hold_count(self.id),
            0,
            "SimpleLock {} re-acquired by the thread that holds it",
            self.name
        );
    }

    pub(super) fn lock_raw(&self) {
        check_teardown(self.lifecycle, self.name);
        let mut locked = self.gate.locked.lock();
        while *locked {
            self.gate.released.wait(&mut locked);
        }
        *locked = true;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn try_lock_raw(&self, timeout: Duration) -> bool {
        check_teardown(self.lifecycle, self.name);
        let deadline = Instant::now() + timeout;
        let mut locked = self.gate.locked.lock();
        while *locked {
            if self.gate.released.wait_until(&mut locked, deadline).timed_out() && *locked {
                return false;
            }
        }
        *locked = true;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub(super) fn unlock_raw(&self) {
        let mut locked = self.gate.locked.lock();
        debug_assert!(*locked, "SimpleLock {} unlocked while open", self.name);
        *locked = false;
        drop(locked);
        self.gate.released.notify_one();
    }
}

impl Drop for SimpleLock {
    fn drop(&mut self) {
        if self.lifecycle.is_tearing_down() {
            std::mem::forget(Arc::clone(&self.gate));
            tracing::debug!(lock = self.name, "leaking lock during teardown");
        }
    }
}

impl std::fmt::Debug for SimpleLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleLock")
            .field("name", &self.name)
            .field("acquisitions", &self.acquisitions())
            .finish()
    }
}

/// Ownership of a [`SimpleLock`]; releases on drop. Not `Send`: the hold
/// count it maintains is per thread.
pub struct SimpleGuard<'a> {
    lock: &'a SimpleLock,
    _not_send: PhantomData<*const ()>,
}

impl<'a> SimpleGuard<'a> {
    fn new(lock: &'a SimpleLock) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }
}

impl Drop for SimpleGuard<'_> {
    fn drop(&mut self) {
        decrement_hold(self.lock.id);
        self.lock.unlock_raw();
    }
}

impl ScopedLock for SimpleLock {
    type Guard<'a> = SimpleGuard<'a> where Self: 'a;

    const RECURSIVE: bool = false;

    fn name(&self) -> &'static str {
        self.name
    }

    fn acquire(&self) -> Self::Guard<'_> {
        SimpleLock::acquire(self)
    }

    fn try_acquire(&self, timeout: Duration) -> Option<Self::Guard<'_>> {
        SimpleLock::try_acquire(self, timeout)
    }
}
