// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named, non-recursive mutex with bounded try-acquire

use super::{check_teardown, lock_order, ScopedLock};
use crate::lifecycle::Lifecycle;
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

/// A named mutex protecting `T`.
///
/// In debug builds every acquisition and release is fed to the lock-order
/// debugger. If the lock is dropped while its lifecycle is tearing down, the
/// underlying mutex is leaked: another thread may still be inside it.
pub struct BasicLock<T = ()> {
    name: &'static str,
    raw: Arc<Mutex<T>>,
    lifecycle: &'static Lifecycle,
}

impl<T> BasicLock<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self::with_lifecycle(name, value, Lifecycle::process())
    }

    pub fn with_lifecycle(name: &'static str, value: T, lifecycle: &'static Lifecycle) -> Self {
        Self {
            name,
            raw: Arc::new(Mutex::new(value)),
            lifecycle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Block until the calling thread owns the lock
    pub fn acquire(&self) -> BasicGuard<'_, T> {
        check_teardown(self.lifecycle, self.name);
        self.check_reentry();
        let inner = self.raw.lock();
        BasicGuard::entered(self.name, inner)
    }

    /// Wait up to `timeout` for the lock; `None` if it stayed contended
    pub fn try_acquire(&self, timeout: Duration) -> Option<BasicGuard<'_, T>> {
        check_teardown(self.lifecycle, self.name);
        self.check_reentry();
        let inner = self.raw.try_lock_for(timeout)?;
        Some(BasicGuard::entered(self.name, inner))
    }

    /// Approximate: true if any thread holds the lock right now
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Same-thread re-entry would block forever; say so first
    fn check_reentry(&self) {
        if cfg!(debug_assertions) {
            if let Err(violation) = lock_order::check_reentry(self.name) {
                tracing::error!(lock = self.name, %violation, "lock order violation");
            }
        }
    }
}

impl<T> Drop for BasicLock<T> {
    fn drop(&mut self) {
        if self.lifecycle.is_tearing_down() {
            // The extra strong count is never released, so the mutex outlives us
            std::mem::forget(Arc::clone(&self.raw));
            tracing::debug!(lock = self.name, "leaking lock during teardown");
        }
    }
}

impl<T> std::fmt::Debug for BasicLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicLock")
            .field("name", &self.name)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Ownership of a [`BasicLock`]; releases on drop
pub struct BasicGuard<'a, T> {
    name: &'static str,
    inner: MutexGuard<'a, T>,
}

impl<'a, T> BasicGuard<'a, T> {
    fn entered(name: &'static str, inner: MutexGuard<'a, T>) -> Self {
        if cfg!(debug_assertions) {
            if let Err(violation) = lock_order::entering(name) {
                tracing::error!(lock = name, %violation, "lock order violation");
            }
        }
        Self { name, inner }
    }
}

impl<T> Deref for BasicGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for BasicGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T> Drop for BasicGuard<'_, T> {
    fn drop(&mut self) {
        // Runs before `inner` unlocks
        if cfg!(debug_assertions) {
            if let Err(violation) = lock_order::leaving(self.name) {
                tracing::error!(lock = self.name, %violation, "lock order violation");
            }
        }
    }
}

impl<T> ScopedLock for BasicLock<T> {
    type Guard<'a> = BasicGuard<'a, T> where Self: 'a;

    const RECURSIVE: bool = false;

    fn name(&self) -> &'static str {
        self.name
    }

    fn acquire(&self) -> Self::Guard<'_> {
        BasicLock::acquire(self)
    }

    fn try_acquire(&self, timeout: Duration) -> Option<Self::Guard<'_>> {
        BasicLock::try_acquire(self, timeout)
    }
}
