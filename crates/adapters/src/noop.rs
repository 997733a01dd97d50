// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborators for a single-node server without auth or scripting.

use crate::{DatabaseHolder, Top};
use std::sync::Arc;
use strata_core::{
    Authorizer, Collaborators, LockManager, LockState, OpId, ScriptInterrupt, ShardVersionCheck,
};

/// Script engine hook for servers without an embedded engine
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpScriptEngine;

impl NoOpScriptEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptInterrupt for NoOpScriptEngine {
    fn interrupt(&self, _op: OpId) {}

    fn interrupt_all(&self) {}
}

/// Authorizes every database for every lock state.
///
/// Used when the server runs without authentication.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAllAuthorizer;

impl AllowAllAuthorizer {
    pub fn new() -> Self {
        Self
    }
}

impl Authorizer for AllowAllAuthorizer {
    fn is_authorized(&self, _database: &str, _lock_state: LockState) -> bool {
        true
    }
}

/// Shard check for a server that is not part of a cluster
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsharded;

impl Unsharded {
    pub fn new() -> Self {
        Self
    }
}

impl ShardVersionCheck for Unsharded {
    fn is_current(&self, _ns: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Collaborators for a standalone server on top of `locks`
pub fn standalone(
    locks: Arc<dyn LockManager>,
    databases: Arc<DatabaseHolder>,
    top: Arc<Top>,
) -> Collaborators {
    Collaborators {
        locks,
        databases,
        shard_versions: Arc::new(Unsharded),
        auth: Arc::new(AllowAllAuthorizer),
        scripts: Arc::new(NoOpScriptEngine),
        timing: top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::FakeCollaborators;
    use yare::parameterized;

    #[parameterized(
        none = { LockState::NONE },
        shared = { LockState::SHARED },
        exclusive = { LockState::EXCLUSIVE },
        nested = { LockState(-3) },
    )]
    fn allow_all_allows_every_lock_state(state: LockState) {
        assert!(AllowAllAuthorizer::new().is_authorized("admin", state));
    }

    #[test]
    fn unsharded_is_always_current() {
        assert_eq!(Unsharded::new().is_current("shop.orders"), Ok(()));
    }

    #[test]
    fn standalone_wires_holder_and_top() {
        let holder = Arc::new(DatabaseHolder::new());
        let top = Arc::new(Top::new());
        let collab = standalone(
            Arc::new(FakeCollaborators::new()),
            holder.clone(),
            top.clone(),
        );

        collab
            .databases
            .resolve_or_create("shop.orders", std::path::Path::new("/data/db"));
        assert!(holder.is_open("shop", std::path::Path::new("/data/db")));
        collab.scripts.interrupt(OpId(1));
        collab.scripts.interrupt_all();
        assert!(collab.auth.is_authorized("shop", LockState::SHARED));
    }
}
