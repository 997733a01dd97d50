// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process lifecycle phases
//!
//! The phase only moves forward:
//!
//! ```text
//! Running -> ShuttingDown -> TearingDown
//! ```
//!
//! - `ShuttingDown`: global shutdown has begun. Sessions stop touching the
//!   registry on shutdown/drop and every interruption check fails.
//! - `TearingDown`: process-wide objects are being destroyed while other
//!   threads may still hold global locks. Locks log a backtrace when acquired
//!   and leak their underlying primitive instead of freeing it.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    Running = 0,
    ShuttingDown = 1,
    TearingDown = 2,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::Running,
            1 => Phase::ShuttingDown,
            _ => Phase::TearingDown,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Running => "running",
            Phase::ShuttingDown => "shutting down",
            Phase::TearingDown => "tearing down",
        };
        f.write_str(name)
    }
}

/// Monotonic phase tracker consulted by locks and sessions
#[derive(Debug)]
pub struct Lifecycle {
    phase: AtomicU8,
}

static PROCESS: Lifecycle = Lifecycle::new();

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Running as u8),
        }
    }

    /// The lifecycle of this process
    pub fn process() -> &'static Lifecycle {
        &PROCESS
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// True once global shutdown has begun (including teardown)
    pub fn in_shutdown(&self) -> bool {
        self.phase() >= Phase::ShuttingDown
    }

    /// True once process-wide objects are being destroyed
    pub fn is_tearing_down(&self) -> bool {
        self.phase() == Phase::TearingDown
    }

    pub fn begin_shutdown(&self) {
        self.advance(Phase::ShuttingDown);
    }

    pub fn begin_teardown(&self) {
        self.advance(Phase::TearingDown);
    }

    /// Sentinel that moves this lifecycle to `TearingDown` when dropped.
    ///
    /// Keep it as the last local of `main` so it drops before the remaining
    /// process-wide objects.
    pub fn teardown_sentinel(&'static self) -> TeardownSentinel {
        TeardownSentinel { lifecycle: self }
    }

    fn advance(&self, to: Phase) {
        let previous = Phase::from_u8(self.phase.fetch_max(to as u8, Ordering::AcqRel));
        if previous < to {
            tracing::info!(from = %previous, to = %to, "process lifecycle advanced");
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop guard that marks the start of teardown
#[derive(Debug)]
pub struct TeardownSentinel {
    lifecycle: &'static Lifecycle,
}

impl Drop for TeardownSentinel {
    fn drop(&mut self) {
        self.lifecycle.begin_teardown();
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
