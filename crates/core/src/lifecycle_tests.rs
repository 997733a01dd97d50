// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn leaked() -> &'static Lifecycle {
    Box::leak(Box::new(Lifecycle::new()))
}

#[test]
fn new_lifecycle_is_running() {
    let lifecycle = Lifecycle::new();
    assert_eq!(lifecycle.phase(), Phase::Running);
    assert!(!lifecycle.in_shutdown());
    assert!(!lifecycle.is_tearing_down());
}

#[test]
fn shutdown_is_observed_but_not_teardown() {
    let lifecycle = Lifecycle::new();
    lifecycle.begin_shutdown();
    assert!(lifecycle.in_shutdown());
    assert!(!lifecycle.is_tearing_down());
}

#[test]
fn phase_never_moves_backwards() {
    let lifecycle = Lifecycle::new();
    lifecycle.begin_teardown();
    lifecycle.begin_shutdown();
    assert_eq!(lifecycle.phase(), Phase::TearingDown);
    assert!(lifecycle.in_shutdown());
}

#[test]
fn sentinel_drop_starts_teardown() {
    let lifecycle = leaked();
    {
        let _sentinel = lifecycle.teardown_sentinel();
        assert!(!lifecycle.is_tearing_down());
    }
    assert!(lifecycle.is_tearing_down());
}
