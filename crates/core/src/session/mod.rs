// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-thread sessions and the registry that tracks them
//!
//! Each worker thread attaches exactly one [`Session`]. The owner handle is
//! `!Send`, so everything that mutates the session's structure (contexts,
//! nested operations) stays on that thread. Other threads see the session
//! only through its shared [`SessionInfo`], reached via the [`Registry`].

mod handle;
mod info;
mod registry;

pub use handle::{ElevatedGuard, HeldLock, OpScope, RequestScope, Session};
pub use info::SessionInfo;
pub use registry::Registry;

use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

thread_local! {
    // Written only by attach, shutdown and the owner's drop on this thread
    static CURRENT: RefCell<Option<Arc<SessionInfo>>> = const { RefCell::new(None) };
}

/// Session attached to the calling thread, if any.
///
/// This is how the lock manager reaches the current operation record of the
/// thread that is calling into it.
pub fn current() -> Option<Arc<SessionInfo>> {
    CURRENT.try_with(|slot| slot.borrow().clone()).ok().flatten()
}

fn set_current(info: Arc<SessionInfo>) -> bool {
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(info);
        true
    })
}

fn clear_current(id: SessionId) {
    let _ = CURRENT.try_with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.as_ref().is_some_and(|info| info.id() == id) {
            *slot = None;
        }
    });
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
