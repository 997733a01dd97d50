// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-thread kill, lock-yield advice and active counts
//!
//! Killing never preempts anything: it sets flags that the owning thread
//! observes at its next cooperative checkpoint.

use crate::clock::{Clock, SystemClock};
use crate::curop::{LockType, OpId};
use crate::error::Interrupted;
use crate::lifecycle::Lifecycle;
use crate::session::{self, Registry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace};

/// How long a lock waiter should back off, with the counts it was based on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldAdvice {
    pub wait: Duration,
    pub writers: u32,
    pub readers: u32,
}

impl YieldAdvice {
    pub fn micros(&self) -> u64 {
        u64::try_from(self.wait.as_micros()).unwrap_or(u64::MAX)
    }
}

/// Sessions whose current operation is running, by lock held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveCounts {
    pub writers: u32,
    pub readers: u32,
}

pub struct KillCoordinator<C: Clock = SystemClock> {
    registry: Arc<Registry<C>>,
}

impl<C: Clock> KillCoordinator<C> {
    pub fn new(registry: Arc<Registry<C>>) -> Self {
        Self { registry }
    }

    /// Kill operation `id` and every operation nested inside it.
    ///
    /// Returns false if no live session is running `id`.
    pub fn kill_by_id(&self, id: OpId) -> bool {
        let mut found = false;
        self.registry.for_each(|info| {
            if found {
                return;
            }
            let chain = info.op_chain();
            if let Some(pos) = chain.iter().position(|op| op.id() == id) {
                for op in &chain[..=pos] {
                    op.kill();
                }
                found = true;
            }
        });

        // Registry lock is released by now
        if found {
            info!(op = %id, "operation killed");
            self.registry.collaborators().scripts.interrupt(id);
        }
        found
    }

    /// Interrupt every current and future operation
    pub fn kill_all(&self) {
        self.registry.kill_all_flag().store(true, Ordering::Release);
        info!("all operations killed");
        self.registry.collaborators().scripts.interrupt_all();
    }

    pub fn kill_all_requested(&self) -> bool {
        self.registry.kill_all_flag().load(Ordering::Acquire)
    }

    /// Back-off for a thread about to wait on the database lock.
    ///
    /// Scales with the number of sessions already waiting. A caller whose
    /// own operation must stop gets a short fixed wait so it notices soon.
    pub fn recommended_yield(&self) -> YieldAdvice {
        let mut readers = 0u32;
        let mut writers = 0u32;
        self.registry.for_each(|info| {
            let op = info.current_op();
            if op.is_waiting_for_lock() {
                if op.lock_type() == LockType::Write {
                    writers += 1;
                } else {
                    readers += 1;
                }
            }
        });

        let wait = self
            .registry
            .config()
            .yield_advice
            .advise(readers, writers, self.caller_interrupted());
        trace!(
            wait = %humantime::format_duration(wait),
            readers,
            writers,
            "yield advice"
        );
        YieldAdvice {
            wait,
            writers,
            readers,
        }
    }

    fn caller_interrupted(&self) -> bool {
        self.registry.lifecycle().in_shutdown()
            || self.kill_all_requested()
            || session::current().is_some_and(|info| info.current_op().is_killed())
    }

    pub fn active_client_count(&self) -> ActiveCounts {
        let mut counts = ActiveCounts::default();
        self.registry.for_each(|info| {
            let op = info.current_op();
            if !op.is_active() {
                return;
            }
            match op.lock_type() {
                LockType::Write => counts.writers += 1,
                LockType::Read => counts.readers += 1,
                LockType::None => {}
            }
        });
        counts
    }
}

/// Cancellation state of one operation, checkable without its session
#[derive(Debug, Clone)]
pub struct CancelToken {
    op: OpId,
    killed: Arc<AtomicBool>,
    kill_all: Arc<AtomicBool>,
    lifecycle: &'static Lifecycle,
}

impl CancelToken {
    pub(crate) fn new(
        op: OpId,
        killed: Arc<AtomicBool>,
        kill_all: Arc<AtomicBool>,
        lifecycle: &'static Lifecycle,
    ) -> Self {
        Self {
            op,
            killed,
            kill_all,
            lifecycle,
        }
    }

    pub fn op(&self) -> OpId {
        self.op
    }

    pub fn check(&self) -> Result<(), Interrupted> {
        if self.lifecycle.in_shutdown() {
            return Err(Interrupted::Shutdown);
        }
        if self.kill_all.load(Ordering::Acquire) {
            return Err(Interrupted::KillAll);
        }
        if self.killed.load(Ordering::Acquire) {
            return Err(Interrupted::Killed { op: self.op });
        }
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }
}

#[cfg(test)]
#[path = "kill_tests.rs"]
mod tests;
