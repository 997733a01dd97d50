// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation records: timing, status and kill state for units of work

mod debug;
mod record;

pub use debug::{ExceptionInfo, OpDebug};
pub use record::{OpRecord, OpStatus, Progress};

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide operation id, increasing in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OpId(pub u64);

impl OpId {
    pub(crate) fn next() -> Self {
        OpId(NEXT_OP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a request asked the server to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum OpKind {
    None,
    Reply,
    Msg,
    Query,
    GetMore,
    Insert,
    Update,
    Delete,
    KillCursors,
    Command,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::None => "none",
            OpKind::Reply => "reply",
            OpKind::Msg => "msg",
            OpKind::Query => "query",
            OpKind::GetMore => "getmore",
            OpKind::Insert => "insert",
            OpKind::Update => "update",
            OpKind::Delete => "remove",
            OpKind::KillCursors => "killcursors",
            OpKind::Command => "command",
        }
    }

    /// Kinds that validate shard versions themselves
    pub fn checks_own_shard_version(self) -> bool {
        matches!(self, OpKind::GetMore | OpKind::Update | OpKind::Delete)
    }
}

impl From<OpKind> for &'static str {
    fn from(kind: OpKind) -> Self {
        kind.as_str()
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock type an operation holds or waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    None,
    Read,
    Write,
}

impl LockType {
    /// Signed code: negative read, positive write, zero none
    pub fn code(self) -> i8 {
        match self {
            LockType::None => 0,
            LockType::Read => -1,
            LockType::Write => 1,
        }
    }

    pub fn from_code(code: i8) -> Self {
        match code {
            0 => LockType::None,
            n if n > 0 => LockType::Write,
            _ => LockType::Read,
        }
    }
}
