// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock primitives
//!
//! This module provides:
//! - **BasicLock** - Non-recursive mutex with bounded `try_acquire` and
//!   lock-order checking in debug builds
//! - **SimpleLock** - Non-recursive lock with no extras; asserts against
//!   same-thread re-acquisition in debug builds
//! - **RecursiveLock** - SimpleLock plus a per-thread recursion count
//!
//! All three release on guard drop, and all three consult a [`Lifecycle`]
//! so acquisitions during teardown are reported and the underlying primitive
//! is leaked rather than freed.

pub mod basic;
pub mod lock_order;
pub mod recursive;
pub mod simple;

pub use basic::{BasicGuard, BasicLock};
pub use lock_order::LockOrderViolation;
pub use recursive::{RecursiveGuard, RecursiveLock};
pub use simple::{SimpleGuard, SimpleLock};

use crate::lifecycle::Lifecycle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Common surface of the lock primitives
///
/// Release is always tied to dropping the guard.
pub trait ScopedLock {
    type Guard<'a>
    where
        Self: 'a;

    /// Whether the owning thread may re-acquire while holding
    const RECURSIVE: bool;

    fn name(&self) -> &'static str;

    /// Block until the calling thread owns the lock
    fn acquire(&self) -> Self::Guard<'_>;

    /// Wait at most `timeout` for ownership
    fn try_acquire(&self, timeout: Duration) -> Option<Self::Guard<'_>>;
}

static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

fn next_lock_id() -> u64 {
    NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
    /// Per-thread hold counts keyed by lock id
    static HOLD_COUNTS: RefCell<HashMap<u64, u32>> = RefCell::new(HashMap::new());
}

fn hold_count(id: u64) -> u32 {
    HOLD_COUNTS.with(|counts| counts.borrow().get(&id).copied().unwrap_or(0))
}

/// Increment this thread's count for `id`, returning the new value
fn increment_hold(id: u64) -> u32 {
    HOLD_COUNTS.with(|counts| {
        let mut counts = counts.borrow_mut();
        let count = counts.entry(id).or_insert(0);
        *count += 1;
        *count
    })
}

/// Decrement this thread's count for `id`, returning the new value
fn decrement_hold(id: u64) -> u32 {
    HOLD_COUNTS.with(|counts| {
        let mut counts = counts.borrow_mut();
        let remaining = match counts.get_mut(&id) {
            Some(count) => {
                debug_assert!(*count > 0, "hold count underflow for lock {id}");
                *count = count.saturating_sub(1);
                *count
            }
            None => {
                debug_assert!(false, "released lock {id} not held by this thread");
                0
            }
        };
        if remaining == 0 {
            counts.remove(&id);
        }
        remaining
    })
}

/// Report an acquisition that happens while the process is tearing down
fn check_teardown(lifecycle: &Lifecycle, name: &'static str) {
    if cfg!(debug_assertions) && lifecycle.is_tearing_down() {
        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!(lock = name, %backtrace, "acquiring lock during process teardown");
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
