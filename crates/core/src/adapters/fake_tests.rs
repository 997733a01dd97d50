// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::curop::{LockType, OpKind};

#[test]
fn lock_state_tracks_nesting_per_thread() {
    let fake = FakeCollaborators::new();
    assert_eq!(fake.state(), LockState::NONE);

    fake.acquire(LockMode::Shared);
    fake.acquire(LockMode::Shared);
    assert_eq!(fake.state(), LockState(-2));
    assert!(fake.state().is_nested_shared());

    let other = fake.clone();
    let seen_elsewhere = std::thread::spawn(move || other.state()).join().unwrap();
    assert_eq!(seen_elsewhere, LockState::NONE);

    fake.release(LockMode::Shared);
    fake.release(LockMode::Shared);
    assert!(fake.state().is_none());
}

#[test]
fn shared_inside_exclusive_nests_as_exclusive() {
    let fake = FakeCollaborators::new();
    fake.acquire(LockMode::Exclusive);
    fake.acquire(LockMode::Shared);
    assert_eq!(fake.state(), LockState(2));
    fake.release(LockMode::Shared);
    assert_eq!(fake.state(), LockState::EXCLUSIVE);
    fake.release(LockMode::Exclusive);
    assert_eq!(fake.state(), LockState::NONE);
}

#[test]
fn resolve_or_create_reports_fresh_databases() {
    let fake = FakeCollaborators::new();
    let path = Path::new("/data/db");
    assert!(fake.resolve("shop.orders", path).is_none());

    let (db, created) = fake.resolve_or_create("shop.orders", path);
    assert!(created);
    assert_eq!(db.name(), "shop");

    let (again, created) = fake.resolve_or_create("shop.users", path);
    assert!(!created);
    assert!(Arc::ptr_eq(&db, &again));
    assert!(fake.resolve("shop.orders", Path::new("/other")).is_none());
}

#[test]
fn drop_on_create_forgets_new_databases() {
    let fake = FakeCollaborators::new();
    fake.set_drop_on_create(true);
    let (_, created) = fake.resolve_or_create("shop.orders", Path::new("/data/db"));
    assert!(created);
    assert!(!fake.has_database("shop", Path::new("/data/db")));
}

#[test]
fn predicates_follow_configuration() {
    let fake = FakeCollaborators::new();
    fake.set_stale("shop.orders", Some("version mismatch"));
    fake.deny("admin");

    assert_eq!(
        fake.is_current("shop.orders"),
        Err("version mismatch".to_string())
    );
    assert!(fake.is_current("shop.users").is_ok());
    assert!(!fake.is_authorized("admin", LockState::SHARED));
    assert!(fake.is_authorized("shop", LockState::SHARED));

    fake.set_stale("shop.orders", None);
    assert!(fake.is_current("shop.orders").is_ok());
}

#[test]
fn records_calls_in_order() {
    let fake = FakeCollaborators::new();
    let collab = fake.collaborators();
    collab.locks.acquire(LockMode::Exclusive);
    collab.scripts.interrupt(OpId(3));
    collab.scripts.interrupt_all();
    collab.timing.record(&TimingSample {
        ns: "shop.orders".into(),
        kind: OpKind::Insert,
        lock_type: LockType::Write,
        elapsed_micros: 40,
        is_command: false,
    });

    let calls = fake.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(
        calls[0],
        CollaboratorCall::Acquire {
            mode: LockMode::Exclusive
        }
    );
    assert_eq!(calls[1], CollaboratorCall::Interrupt { op: OpId(3) });
    assert_eq!(calls[2], CollaboratorCall::InterruptAll);
    assert_eq!(fake.timings()[0].elapsed_micros, 40);

    fake.clear_calls();
    assert!(fake.calls().is_empty());
}
