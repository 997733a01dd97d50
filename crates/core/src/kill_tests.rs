// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::{CollaboratorCall, FakeCollaborators};
use crate::clock::{Clock, FakeClock};
use crate::config::CoreConfig;
use crate::curop::OpKind;
use crate::session::Session;
use std::sync::Barrier;
use std::thread;
use yare::parameterized;

struct Setup {
    fake: FakeCollaborators,
    clock: FakeClock,
    lifecycle: &'static Lifecycle,
    registry: Arc<Registry<FakeClock>>,
    killer: KillCoordinator<FakeClock>,
}

fn setup_with(config: CoreConfig) -> Setup {
    let fake = FakeCollaborators::new();
    let clock = FakeClock::new();
    let lifecycle: &'static Lifecycle = Box::leak(Box::new(Lifecycle::new()));
    let registry = Arc::new(
        Registry::new(fake.collaborators(), clock.clone())
            .with_config(config)
            .with_lifecycle(lifecycle),
    );
    let killer = KillCoordinator::new(registry.clone());
    Setup {
        fake,
        clock,
        lifecycle,
        registry,
        killer,
    }
}

fn setup() -> Setup {
    setup_with(CoreConfig::default())
}

/// How a background session's current operation should look
#[derive(Clone, Copy)]
struct Peer {
    lock: LockType,
    waiting: bool,
    active: bool,
}

const READ_WAITER: Peer = Peer {
    lock: LockType::Read,
    waiting: true,
    active: false,
};

const WRITE_WAITER: Peer = Peer {
    lock: LockType::Write,
    waiting: true,
    active: false,
};

/// Run `f` while one attached session per entry of `peers` sits on its own
/// thread in the described state
fn with_peers<R>(s: &Setup, peers: &[Peer], f: impl FnOnce() -> R) -> R {
    let ready = Barrier::new(peers.len() + 1);
    let release = Barrier::new(peers.len() + 1);
    thread::scope(|scope| {
        for peer in peers.iter().copied() {
            let (ready, release, registry, clock) = (&ready, &release, &s.registry, &s.clock);
            scope.spawn(move || {
                let session = registry.attach("peer").unwrap();
                let op = session.current_op();
                if peer.active {
                    op.ensure_started(clock.now());
                }
                op.waiting_for_lock(peer.lock);
                if !peer.waiting {
                    op.got_lock();
                }
                ready.wait();
                release.wait();
                session.shutdown();
            });
        }
        ready.wait();
        let result = f();
        release.wait();
        result
    })
}

// =============================================================================
// Kill by id
// =============================================================================

#[test]
fn kill_marks_match_and_everything_nested_inside_it() {
    let s = setup();
    let session = s.registry.attach("conn").unwrap();
    let op1 = session.begin_request(OpKind::Command);
    let op2 = session.begin_op(OpKind::Query);
    let op3 = session.begin_op(OpKind::GetMore);

    assert!(s.killer.kill_by_id(op2.id()));

    assert!(!op1.is_killed());
    assert!(op2.is_killed());
    assert!(op3.is_killed());
    assert_eq!(
        s.fake.calls(),
        vec![CollaboratorCall::Interrupt { op: op2.id() }]
    );

    drop(op3);
    drop(op2);
    assert!(session.check_for_interrupt().is_ok());
    session.shutdown();
}

#[test]
fn kill_of_unknown_id_is_a_silent_no_op() {
    let s = setup();
    let session = s.registry.attach("conn").unwrap();
    let op = session.begin_request(OpKind::Query);

    assert!(!s.killer.kill_by_id(OpId(u64::MAX)));
    assert!(!op.is_killed());
    assert!(s.fake.calls().is_empty());
    session.shutdown();
}

#[test]
fn kill_reaches_session_on_another_thread() {
    let s = setup();
    let (id_tx, id_rx) = std::sync::mpsc::channel();
    let (killed_tx, killed_rx) = std::sync::mpsc::channel::<()>();

    let outcome = thread::scope(|scope| {
        let registry = &s.registry;
        let worker = scope.spawn(move || {
            let session = registry.attach("worker").unwrap();
            let op = session.begin_request(OpKind::Query);
            let token = session.cancel_token();
            id_tx.send(op.id()).unwrap();
            killed_rx.recv().unwrap();
            let outcome = (token.check(), session.check_for_interrupt());
            session.shutdown();
            outcome
        });

        let id = id_rx.recv().unwrap();
        assert!(s.killer.kill_by_id(id));
        killed_tx.send(()).unwrap();
        (id, worker.join().unwrap())
    });

    let (id, (token, session)) = outcome;
    assert_eq!(token, Err(Interrupted::Killed { op: id }));
    assert_eq!(session, Err(Interrupted::Killed { op: id }));
}

// =============================================================================
// Kill all
// =============================================================================

#[test]
fn kill_all_interrupts_current_and_future_sessions() {
    let s = setup();
    let before = s.registry.attach("before").unwrap();
    s.killer.kill_all();

    assert!(s.killer.kill_all_requested());
    assert_eq!(before.check_for_interrupt(), Err(Interrupted::KillAll));
    assert_eq!(s.fake.calls(), vec![CollaboratorCall::InterruptAll]);
    before.shutdown();
    drop(before);

    let after = s.registry.attach("after").unwrap();
    let _request = after.begin_request(OpKind::Insert);
    assert_eq!(after.check_for_interrupt(), Err(Interrupted::KillAll));
    after.shutdown();
}

// =============================================================================
// Yield advice
// =============================================================================

#[parameterized(
    idle = { 0, 0, 0 },
    two_readers = { 2, 0, 200 },
    one_writer = { 0, 1, 500 },
    mixed = { 3, 2, 1_300 },
)]
fn yield_scales_with_waiters(readers: usize, writers: usize, expected_micros: u64) {
    let s = setup();
    let mut peers = vec![READ_WAITER; readers];
    peers.extend(std::iter::repeat(WRITE_WAITER).take(writers));

    let advice = with_peers(&s, &peers, || s.killer.recommended_yield());

    assert_eq!(advice.micros(), expected_micros);
    assert_eq!(advice.readers as usize, readers);
    assert_eq!(advice.writers as usize, writers);
}

#[test]
fn yield_is_capped() {
    let mut config = CoreConfig::default();
    config.yield_advice.reader_cost = Duration::from_millis(400);
    let s = setup_with(config);

    let advice = with_peers(&s, &[READ_WAITER; 3], || s.killer.recommended_yield());
    assert_eq!(advice.wait, Duration::from_secs(1));
    assert_eq!(advice.readers, 3);
}

#[test]
fn holders_are_not_counted_as_waiters() {
    let s = setup();
    let holder = Peer {
        lock: LockType::Write,
        waiting: false,
        active: true,
    };
    let advice = with_peers(&s, &[holder, READ_WAITER], || s.killer.recommended_yield());
    assert_eq!((advice.readers, advice.writers), (1, 0));
    assert_eq!(advice.micros(), 100);
}

#[test]
fn killed_caller_yields_briefly_regardless_of_contention() {
    let s = setup();
    let session = s.registry.attach("caller").unwrap();
    let request = session.begin_request(OpKind::Update);
    request.kill();

    let advice = with_peers(&s, &[WRITE_WAITER; 3], || s.killer.recommended_yield());
    assert_eq!(advice.micros(), 100);
    assert_eq!(advice.writers, 3);
    session.shutdown();
}

#[test]
fn kill_all_and_shutdown_shorten_yield() {
    let s = setup();
    let advice = with_peers(&s, &[WRITE_WAITER; 2], || {
        s.lifecycle.begin_shutdown();
        s.killer.recommended_yield()
    });
    assert_eq!(advice.micros(), 100);

    let s = setup();
    s.killer.kill_all();
    let advice = with_peers(&s, &[WRITE_WAITER; 2], || s.killer.recommended_yield());
    assert_eq!(advice.micros(), 100);
}

// =============================================================================
// Active counts
// =============================================================================

#[test]
fn active_count_splits_by_held_lock() {
    let s = setup();
    let active_writer = Peer {
        lock: LockType::Write,
        waiting: false,
        active: true,
    };
    let active_reader = Peer {
        lock: LockType::Read,
        waiting: false,
        active: true,
    };
    let idle = Peer {
        lock: LockType::Read,
        waiting: false,
        active: false,
    };

    let counts = with_peers(&s, &[active_writer, active_reader, active_reader, idle], || {
        s.killer.active_client_count()
    });
    assert_eq!(
        counts,
        ActiveCounts {
            writers: 1,
            readers: 2
        }
    );
}

#[test]
fn session_is_not_counted_once_its_request_ends() {
    let s = setup();
    let session = s.registry.attach("conn").unwrap();
    {
        let _request = session.begin_request(OpKind::Query);
        let _lock = session.lock(crate::adapters::LockMode::Shared);
        session.current_op().ensure_started(s.clock.now());
        assert_eq!(
            s.killer.active_client_count(),
            ActiveCounts {
                writers: 0,
                readers: 1
            }
        );
    }
    assert_eq!(s.killer.active_client_count(), ActiveCounts::default());
    session.shutdown();
}

#[test]
fn active_session_without_lock_is_not_counted() {
    let s = setup();
    let session: Session<FakeClock> = s.registry.attach("conn").unwrap();
    session.current_op().ensure_started(s.clock.now());
    assert_eq!(s.killer.active_client_count(), ActiveCounts::default());
    session.shutdown();
}
