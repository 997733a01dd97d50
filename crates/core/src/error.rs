// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced to the request layer

use crate::adapters::LockState;
use crate::curop::OpId;
use thiserror::Error;

/// Errors from attaching a session to a thread
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("thread already has an attached session")]
    AlreadyAttached,
}

/// Errors from opening an execution context
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// Routing data for the namespace is out of date
    #[error("stale config for {ns}: {message}")]
    StaleConfig { ns: String, message: String },

    #[error("unauthorized db:{database} lock type:{lock_state} client:{client}")]
    Unauthorized {
        database: String,
        lock_state: LockState,
        client: String,
    },

    #[error("can't create database {ns}: out of disk space")]
    OutOfDiskSpace { ns: String },

    #[error("can't open absent database {ns} under a nested read lock")]
    NestedReadLock { ns: String },

    #[error("no lock held while opening {ns}")]
    LockNotHeld { ns: String },

    /// The database was removed between creating it and re-reading it
    #[error("database for {ns} disappeared before it could be read")]
    DatabaseNotFound { ns: String },
}

impl ContextError {
    /// Numeric code reported to clients, where one exists
    pub fn code(&self) -> Option<i32> {
        match self {
            ContextError::StaleConfig { .. } => Some(9996),
            ContextError::Unauthorized { .. } => Some(10057),
            ContextError::OutOfDiskSpace { .. } => Some(14031),
            ContextError::NestedReadLock { .. } => Some(15928),
            ContextError::LockNotHeld { .. } | ContextError::DatabaseNotFound { .. } => None,
        }
    }

    /// True if the caller can retry after refreshing its view of the cluster
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ContextError::StaleConfig { .. } | ContextError::DatabaseNotFound { .. }
        )
    }
}

/// Raised at a cooperative checkpoint when the operation must stop
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("operation {op} interrupted")]
    Killed { op: OpId },
    #[error("interrupted: all operations killed")]
    KillAll,
    #[error("interrupted at shutdown")]
    Shutdown,
}

impl Interrupted {
    pub fn code(&self) -> i32 {
        match self {
            Interrupted::Killed { .. } => 11601,
            Interrupted::KillAll | Interrupted::Shutdown => 11600,
        }
    }
}
