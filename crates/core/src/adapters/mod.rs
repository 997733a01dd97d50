// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contracts for the collaborators this core consumes

pub mod fake;
pub mod traits;

// Re-export traits
pub use traits::{
    Authorizer, Collaborators, Database, DatabaseResolver, LockManager, LockMode, LockState,
    ScriptInterrupt, ShardVersionCheck, TimingSample, TimingSink,
};

// Re-export fake adapters
pub use fake::{CollaboratorCall, FakeCollaborators};
