// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! A registry wired to the standalone collaborators

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strata_adapters::{standalone, DatabaseHolder, Top, TracedTimingSink};
use strata_core::{
    ExecutionContext, FakeClock, FakeCollaborators, Lifecycle, LockMode, OpKind, ReadContext,
    Registry,
};

struct Server {
    holder: Arc<DatabaseHolder>,
    top: Arc<Top>,
    clock: FakeClock,
    registry: Arc<Registry<FakeClock>>,
}

fn server() -> Server {
    let holder = Arc::new(DatabaseHolder::new());
    let top = Arc::new(Top::new());
    let clock = FakeClock::new();
    let mut collab = standalone(Arc::new(FakeCollaborators::new()), holder.clone(), top.clone());
    collab.timing = Arc::new(TracedTimingSink::new(top.clone()));
    let lifecycle: &'static Lifecycle = Box::leak(Box::new(Lifecycle::new()));
    let registry = Arc::new(Registry::new(collab, clock.clone()).with_lifecycle(lifecycle));
    Server {
        holder,
        top,
        clock,
        registry,
    }
}

#[test]
fn write_context_creates_database_and_reports_usage() {
    let s = server();
    let session = s.registry.attach("conn").unwrap();
    let _request = session.begin_request(OpKind::Insert);
    {
        let _lock = session.lock(LockMode::Exclusive);
        let ctx = ExecutionContext::open(&session, "shop.orders", Path::new("/data/db")).unwrap();
        assert!(ctx.just_created());
        s.clock.advance(Duration::from_micros(300));
    }

    assert!(s.holder.is_open("shop", Path::new("/data/db")));
    let usage = s.top.usage("shop.orders").unwrap();
    assert_eq!(usage.insert.time_micros, 300);
    assert_eq!(usage.write_lock.count, 1);
    session.shutdown();
}

#[test]
fn nested_contexts_attribute_time_to_each_namespace() {
    let s = server();
    let session = s.registry.attach("conn").unwrap();
    let _request = session.begin_request(OpKind::Update);
    {
        let _lock = session.lock(LockMode::Exclusive);
        let _outer = ExecutionContext::open_default(&session, "shop.orders").unwrap();
        s.clock.advance(Duration::from_micros(100));
        {
            let _inner = ExecutionContext::open_default(&session, "shop.audit").unwrap();
            s.clock.advance(Duration::from_micros(40));
        }
        assert_eq!(session.current_op().ns(), "shop.orders");
        s.clock.advance(Duration::from_micros(10));
    }

    let snapshot = s.top.snapshot();
    assert_eq!(snapshot["shop.audit"].update.time_micros, 140);
    assert_eq!(snapshot["shop.orders"].update.time_micros, 10);
    assert_eq!(s.top.global().update.count, 2);
    session.shutdown();
}

#[test]
fn read_context_opens_missing_database_through_holder() {
    let s = server();
    let session = s.registry.attach("conn").unwrap();
    let _request = session.begin_request(OpKind::Query);
    {
        let ctx = ReadContext::open(&session, "blog.posts", Path::new("/data/db")).unwrap();
        assert!(ctx.just_created());
        assert_eq!(ctx.lock_mode(), LockMode::Shared);
    }

    assert_eq!(s.holder.names(Path::new("/data/db")), vec!["blog"]);
    assert_eq!(s.top.usage("blog.posts").unwrap().read_lock.count, 1);
    session.shutdown();
}

#[test]
fn exhausted_storage_refuses_write_contexts() {
    let s = server();
    let session = s.registry.attach("conn").unwrap();
    s.holder.set_storage_exhausted(true);
    {
        let _lock = session.lock(LockMode::Exclusive);
        let err = ExecutionContext::open_default(&session, "shop.orders").unwrap_err();
        assert_eq!(err.code(), Some(14031));
    }
    assert!(!s.holder.is_open("shop", Path::new("/data/db")));
    session.shutdown();
}
