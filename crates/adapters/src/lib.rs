// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Concrete collaborators for a standalone server
//!
//! `strata-core` reaches storage, policy and the script engine only through
//! traits. This crate supplies the implementations a single-node server runs
//! with, plus tracing wrappers that can sit in front of any of them.

pub mod holder;
pub mod noop;
pub mod top;
pub mod traced;

pub use holder::DatabaseHolder;
pub use noop::{standalone, AllowAllAuthorizer, NoOpScriptEngine, Unsharded};
pub use top::{CollectionUsage, Top, UsageData};
pub use traced::{
    TracedDatabaseResolver, TracedLockManager, TracedScriptInterrupt, TracedTimingSink,
};

#[cfg(test)]
mod test_logs;
