// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-entrant lock built on [`SimpleLock`]
//!
//! The first acquisition on a thread closes the underlying lock; nested
//! acquisitions only bump the thread's recursion count. The underlying lock
//! opens again when the outermost guard drops.

use super::{decrement_hold, hold_count, increment_hold, next_lock_id, ScopedLock, SimpleLock};
use crate::lifecycle::Lifecycle;
use std::marker::PhantomData;
use std::time::Duration;

#[derive(Debug)]
pub struct RecursiveLock {
    pub(super) inner: SimpleLock,
    id: u64,
}

impl RecursiveLock {
    pub fn new(name: &'static str) -> Self {
        Self::with_lifecycle(name, Lifecycle::process())
    }

    pub fn with_lifecycle(name: &'static str, lifecycle: &'static Lifecycle) -> Self {
        Self {
            inner: SimpleLock::with_lifecycle(name, lifecycle),
            id: next_lock_id(),
        }
    }

    pub fn acquire(&self) -> RecursiveGuard<'_> {
        if hold_count(self.id) == 0 {
            self.inner.lock_raw();
        }
        increment_hold(self.id);
        RecursiveGuard::new(self)
    }

    pub fn try_acquire(&self, timeout: Duration) -> Option<RecursiveGuard<'_>> {
        if hold_count(self.id) == 0 && !self.inner.try_lock_raw(timeout) {
            return None;
        }
        increment_hold(self.id);
        Some(RecursiveGuard::new(self))
    }

    /// True while the calling thread holds the lock at any depth.
    ///
    /// Only meaningful for assertions about the caller's own state.
    pub fn is_locked(&self) -> bool {
        hold_count(self.id) > 0
    }

    /// Current recursion depth on the calling thread
    pub fn depth(&self) -> u32 {
        hold_count(self.id)
    }

    /// Number of times the underlying lock has been closed
    pub fn acquisitions(&self) -> u64 {
        self.inner.acquisitions()
    }
}

/// One level of ownership of a [`RecursiveLock`]
pub struct RecursiveGuard<'a> {
    lock: &'a RecursiveLock,
    _not_send: PhantomData<*const ()>,
}

impl<'a> RecursiveGuard<'a> {
    fn new(lock: &'a RecursiveLock) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }
}

impl Drop for RecursiveGuard<'_> {
    fn drop(&mut self) {
        if decrement_hold(self.lock.id) == 0 {
            self.lock.inner.unlock_raw();
        }
    }
}

impl ScopedLock for RecursiveLock {
    type Guard<'a> = RecursiveGuard<'a> where Self: 'a;

    const RECURSIVE: bool = true;

    fn name(&self) -> &'static str {
        ScopedLock::name(&self.inner)
    }

    fn acquire(&self) -> Self::Guard<'_> {
        RecursiveLock::acquire(self)
    }

    fn try_acquire(&self, timeout: Duration) -> Option<Self::Guard<'_>> {
        RecursiveLock::try_acquire(self, timeout)
    }
}
