// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock-order debugger for named locks
//!
//! Each thread keeps the stack of named locks it holds. Every time lock `B`
//! is entered while `A` is held, the edge `A -> B` is remembered process
//! wide; a later `B -> A` is an inversion that can deadlock two threads.
//! Releases must be LIFO.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// A lock-order problem detected on the calling thread
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockOrderViolation {
    #[error("lock {name} re-entered by the thread that holds it")]
    Reentrant { name: &'static str },
    #[error("lock order inversion: {held} held while entering {entering}, but {entering} -> {held} was seen before")]
    Inversion {
        held: &'static str,
        entering: &'static str,
    },
    #[error("lock {released} released while {innermost} is the innermost lock")]
    OutOfOrder {
        released: &'static str,
        innermost: &'static str,
    },
}

thread_local! {
    static HELD: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

/// `FOLLOWERS[a]` contains every lock entered while `a` was held
static FOLLOWERS: Mutex<BTreeMap<&'static str, BTreeSet<&'static str>>> =
    parking_lot::const_mutex(BTreeMap::new());

static VIOLATIONS: AtomicU64 = AtomicU64::new(0);

/// Record that the calling thread is entering `name`.
///
/// The lock is pushed onto the held stack even when a violation is reported.
pub fn entering(name: &'static str) -> Result<(), LockOrderViolation> {
    let held: Vec<&'static str> = HELD.with(|h| h.borrow().clone());

    let mut result = Ok(());
    if held.contains(&name) {
        result = Err(LockOrderViolation::Reentrant { name });
    } else if !held.is_empty() {
        let mut followers = FOLLOWERS.lock();
        for &outer in &held {
            let inverted = followers
                .get(name)
                .is_some_and(|after| after.contains(outer));
            if inverted && result.is_ok() {
                result = Err(LockOrderViolation::Inversion {
                    held: outer,
                    entering: name,
                });
            }
            followers.entry(outer).or_default().insert(name);
        }
    }

    HELD.with(|h| h.borrow_mut().push(name));
    if result.is_err() {
        VIOLATIONS.fetch_add(1, Ordering::Relaxed);
    }
    result
}

/// Record that the calling thread released `name`
pub fn leaving(name: &'static str) -> Result<(), LockOrderViolation> {
    HELD.with(|h| {
        let mut held = h.borrow_mut();
        match held.last().copied() {
            Some(top) if top == name => {
                held.pop();
                Ok(())
            }
            Some(innermost) => {
                if let Some(pos) = held.iter().rposition(|&n| n == name) {
                    held.remove(pos);
                }
                VIOLATIONS.fetch_add(1, Ordering::Relaxed);
                Err(LockOrderViolation::OutOfOrder {
                    released: name,
                    innermost,
                })
            }
            None => {
                VIOLATIONS.fetch_add(1, Ordering::Relaxed);
                Err(LockOrderViolation::OutOfOrder {
                    released: name,
                    innermost: "<none>",
                })
            }
        }
    })
}

/// Report `name` if the calling thread already holds it.
///
/// Call before blocking on a non-recursive lock; nothing is pushed.
pub fn check_reentry(name: &'static str) -> Result<(), LockOrderViolation> {
    if !held_by_current_thread(name) {
        return Ok(());
    }
    VIOLATIONS.fetch_add(1, Ordering::Relaxed);
    Err(LockOrderViolation::Reentrant { name })
}

/// Whether the calling thread currently holds `name`
pub fn held_by_current_thread(name: &'static str) -> bool {
    HELD.with(|h| h.borrow().contains(&name))
}

/// Total violations reported in this process
pub fn violation_count() -> u64 {
    VIOLATIONS.load(Ordering::Relaxed)
}

#[cfg(test)]
#[path = "lock_order_tests.rs"]
mod tests;
