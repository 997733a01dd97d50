// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! strata-core: session and concurrency substrate for the document server
//!
//! This crate provides:
//! - Lock primitives with lock-order checking and teardown safety
//! - The process-wide registry of per-thread sessions
//! - Nested execution contexts (namespace access scopes)
//! - Nested operation records for timing, status and kill propagation
//! - Cross-thread kill and the lock-yield heuristic
//! - Collaborator traits for the lock manager, database resolver, auth,
//!   shard versioning, script engine and timing table

pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod ns;
pub mod sync;

pub mod adapters;

// Session state (order matters for dependencies)
pub mod curop;
pub mod session;
pub mod context;
pub mod kill;

#[cfg(test)]
mod test_logs;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, CoreConfig, YieldConfig};
pub use error::{ContextError, Interrupted, SessionError};
pub use lifecycle::{Lifecycle, Phase, TeardownSentinel};

pub use adapters::{
    Authorizer, CollaboratorCall, Collaborators, Database, DatabaseResolver, FakeCollaborators,
    LockManager, LockMode, LockState, ScriptInterrupt, ShardVersionCheck, TimingSample,
    TimingSink,
};

pub use context::{ContextInfo, ExecutionContext, ReadContext};
pub use curop::{ExceptionInfo, LockType, OpDebug, OpId, OpKind, OpRecord, OpStatus, Progress};
pub use kill::{ActiveCounts, CancelToken, KillCoordinator, YieldAdvice};
pub use session::{
    ElevatedGuard, HeldLock, OpScope, Registry, RequestScope, Session, SessionId, SessionInfo,
};
pub use sync::{BasicLock, LockOrderViolation, RecursiveLock, ScopedLock, SimpleLock};
