// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};
use serde_json::json;
use std::time::Duration;

fn record(kind: OpKind) -> OpRecord {
    OpRecord::new(kind, 512)
}

#[test]
fn enter_starts_the_clock_once() {
    let clock = FakeClock::new();
    let op = record(OpKind::Query);
    assert!(!op.is_active());

    op.enter("shop.orders", 1, clock.now());
    clock.advance(Duration::from_millis(5));
    op.enter("shop.users", 0, clock.now());

    assert!(op.is_active());
    assert_eq!(op.ns(), "shop.users");
    assert_eq!(op.db_profile(), 0);
    assert_eq!(op.elapsed_micros(clock.now()), 5_000);
}

#[test]
fn leave_attributes_time_since_last_checkpoint() {
    let clock = FakeClock::new();
    let op = record(OpKind::Update);
    op.waiting_for_lock(LockType::Write);
    op.got_lock();

    op.enter("shop.orders", 0, clock.now());
    clock.advance(Duration::from_micros(300));
    op.enter("shop.orders.$_id_", 0, clock.now());
    clock.advance(Duration::from_micros(200));

    let inner = op.leave(clock.now(), Some("shop.orders"));
    assert_eq!(inner.ns, "shop.orders.$_id_");
    assert_eq!(inner.elapsed_micros, 500);
    assert_eq!(inner.lock_type, LockType::Write);
    assert_eq!(inner.kind, OpKind::Update);
    assert_eq!(op.ns(), "shop.orders");

    clock.advance(Duration::from_micros(50));
    let outer = op.leave(clock.now(), None);
    assert_eq!(outer.ns, "shop.orders");
    assert_eq!(outer.elapsed_micros, 50);
}

#[test]
fn oversized_payload_is_replaced_by_placeholder() {
    let op = OpRecord::new(OpKind::Insert, 32);
    op.set_query(&json!({ "sku": "a1" }));
    assert_eq!(op.query(), Some(json!({ "sku": "a1" })));

    op.set_update(&json!({ "$set": { "note": "x".repeat(64) } }));
    assert_eq!(
        op.update(),
        Some(json!({ "$msg": "query not recording (too large)" }))
    );
}

#[test]
fn progress_renders_into_message() {
    let op = record(OpKind::Command);
    op.set_progress("index build", 200);
    op.hit(50);
    assert_eq!(op.message().as_deref(), Some("index build 50/200 25%"));
    assert_eq!(op.progress(), Some(Progress { done: 50, total: 200 }));

    op.finish_progress();
    assert_eq!(op.message().as_deref(), Some("index build"));

    op.set_progress("compact", 10);
    op.set_message("waiting");
    assert_eq!(op.progress(), None);
    assert_eq!(op.message().as_deref(), Some("waiting"));
}

#[test]
fn kill_is_terminal_and_shared_with_tokens() {
    let op = record(OpKind::Query);
    let flag = op.killed_flag();
    assert!(!op.is_killed());
    op.kill();
    op.kill();
    assert!(op.is_killed());
    assert!(flag.load(Ordering::Acquire));
}

#[test]
fn status_reports_running_time_only_while_active() {
    let clock = FakeClock::new();
    let op = record(OpKind::Query);
    op.set_query(&json!({ "status": "open" }));
    op.enter("shop.orders", 0, clock.now());
    op.yielded();
    clock.advance(Duration::from_secs(3));

    let status = op.status(clock.now());
    assert!(status.active);
    assert_eq!(status.secs_running, Some(3));
    assert_eq!(status.num_yields, 1);
    assert_eq!(status.query, Some(json!({ "status": "open" })));

    op.done(clock.now());
    let status = op.status(clock.now());
    assert!(!status.active);
    assert_eq!(status.secs_running, None);
    assert_eq!(op.with_debug(|d| d.millis), 3_000);
}

#[test]
fn status_serializes_without_empty_fields() {
    let op = record(OpKind::Delete);
    let doc = serde_json::to_value(op.status(FakeClock::new().now())).unwrap();
    assert_eq!(doc["op"], "remove");
    assert_eq!(doc["lock_type"], "none");
    assert!(doc.get("secs_running").is_none());
    assert!(doc.get("progress").is_none());
}

#[test]
fn debug_summary_includes_kind_namespace_and_counters() {
    let op = record(OpKind::Query);
    op.set_ns("shop.orders");
    op.set_query(&json!({ "a": 1 }));
    op.with_debug(|d| {
        d.n_scanned = Some(4);
        d.millis = 120;
    });
    assert_eq!(
        op.debug_summary(),
        r#"query shop.orders query: {"a":1} nscanned:4 120ms"#
    );
}
