// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One nested unit of work
//!
//! The owning thread drives a record through `enter`/`leave` as contexts come
//! and go. Other threads only read status fields and set the kill flag, so
//! those live in atomics or behind a short-lived mutex.

use super::{LockType, OpDebug, OpId, OpKind};
use crate::adapters::TimingSample;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicI8, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

const TOO_LARGE: &str = "query not recording (too large)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub done: u64,
    pub total: u64,
}

impl Progress {
    fn percent(self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        self.done.saturating_mul(100) / self.total
    }
}

#[derive(Debug, Default)]
struct Detail {
    ns: String,
    started: Option<Instant>,
    checkpoint: Option<Instant>,
    query: Option<Value>,
    update: Option<Value>,
    message: Option<String>,
    progress: Option<Progress>,
    db_profile: i32,
    debug: OpDebug,
}

#[derive(Debug)]
pub struct OpRecord {
    id: OpId,
    kind: OpKind,
    max_payload_bytes: usize,
    is_command: AtomicBool,
    active: AtomicBool,
    killed: Arc<AtomicBool>,
    lock_type: AtomicI8,
    waiting: AtomicBool,
    yields: AtomicU32,
    detail: Mutex<Detail>,
}

impl OpRecord {
    pub fn new(kind: OpKind, max_payload_bytes: usize) -> Self {
        Self {
            id: OpId::next(),
            kind,
            max_payload_bytes,
            is_command: AtomicBool::new(false),
            active: AtomicBool::new(false),
            killed: Arc::new(AtomicBool::new(false)),
            lock_type: AtomicI8::new(0),
            waiting: AtomicBool::new(false),
            yields: AtomicU32::new(0),
            detail: Mutex::new(Detail::default()),
        }
    }

    pub fn id(&self) -> OpId {
        self.id
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn ns(&self) -> String {
        self.detail.lock().ns.clone()
    }

    pub fn set_ns(&self, ns: &str) {
        self.detail.lock().ns = ns.to_string();
    }

    pub fn mark_command(&self) {
        self.is_command.store(true, Ordering::Relaxed);
    }

    pub fn is_command(&self) -> bool {
        self.is_command.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Start the clock if it is not already running
    pub fn ensure_started(&self, now: Instant) {
        let mut detail = self.detail.lock();
        if detail.started.is_none() {
            detail.started = Some(now);
            detail.checkpoint = Some(now);
        }
        self.active.store(true, Ordering::Release);
    }

    /// A context on `ns` became current for this record
    pub fn enter(&self, ns: &str, db_profile: i32, now: Instant) {
        self.ensure_started(now);
        let mut detail = self.detail.lock();
        detail.ns = ns.to_string();
        detail.db_profile = db_profile;
    }

    /// A context on this record closed.
    ///
    /// Returns the time since the last checkpoint, attributed to the
    /// record's current namespace, and moves the namespace back to
    /// `enclosing_ns` when the closed context had a parent.
    pub fn leave(&self, now: Instant, enclosing_ns: Option<&str>) -> TimingSample {
        let mut detail = self.detail.lock();
        let since = detail.checkpoint.unwrap_or(now);
        detail.checkpoint = Some(now);
        let sample = TimingSample {
            ns: detail.ns.clone(),
            kind: self.kind,
            lock_type: self.lock_type(),
            elapsed_micros: micros_between(since, now),
            is_command: self.is_command(),
        };
        if let Some(ns) = enclosing_ns {
            detail.ns = ns.to_string();
        }
        sample
    }

    /// Mark the operation finished and fill in its total duration
    pub fn done(&self, now: Instant) {
        let mut detail = self.detail.lock();
        if let Some(started) = detail.started {
            detail.debug.millis = micros_between(started, now) / 1000;
        }
        self.active.store(false, Ordering::Release);
    }

    pub fn elapsed_micros(&self, now: Instant) -> u64 {
        self.detail
            .lock()
            .started
            .map_or(0, |started| micros_between(started, now))
    }

    /// Profiling level of the database last entered
    pub fn db_profile(&self) -> i32 {
        self.detail.lock().db_profile
    }

    // -------------------------------------------------------------------------
    // Payloads
    // -------------------------------------------------------------------------

    pub fn set_query(&self, query: &Value) {
        let capped = self.capped(query);
        self.detail.lock().query = Some(capped);
    }

    pub fn set_update(&self, update: &Value) {
        let capped = self.capped(update);
        self.detail.lock().update = Some(capped);
    }

    pub fn query(&self) -> Option<Value> {
        self.detail.lock().query.clone()
    }

    pub fn update(&self) -> Option<Value> {
        self.detail.lock().update.clone()
    }

    fn capped(&self, payload: &Value) -> Value {
        let too_large = serde_json::to_vec(payload)
            .map_or(true, |bytes| bytes.len() > self.max_payload_bytes);
        if too_large {
            serde_json::json!({ "$msg": TOO_LARGE })
        } else {
            payload.clone()
        }
    }

    // -------------------------------------------------------------------------
    // Lock hooks
    // -------------------------------------------------------------------------

    pub fn waiting_for_lock(&self, lock_type: LockType) {
        self.lock_type.store(lock_type.code(), Ordering::Relaxed);
        self.waiting.store(true, Ordering::Release);
    }

    pub fn got_lock(&self) {
        self.waiting.store(false, Ordering::Release);
    }

    pub fn is_waiting_for_lock(&self) -> bool {
        self.waiting.load(Ordering::Acquire)
    }

    pub fn lock_type(&self) -> LockType {
        LockType::from_code(self.lock_type.load(Ordering::Relaxed))
    }

    /// The lock manager made this operation give up its lock once
    pub fn yielded(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
    }

    pub fn yields(&self) -> u32 {
        self.yields.load(Ordering::Relaxed)
    }

    // -------------------------------------------------------------------------
    // Kill
    // -------------------------------------------------------------------------

    /// Request cancellation. Never cleared.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    pub(crate) fn killed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.killed)
    }

    // -------------------------------------------------------------------------
    // Messages and progress
    // -------------------------------------------------------------------------

    /// Replace the status message, ending any progress meter
    pub fn set_message(&self, message: impl Into<String>) {
        let mut detail = self.detail.lock();
        detail.message = Some(message.into());
        detail.progress = None;
    }

    /// Start a progress meter of `total` units labelled `message`
    pub fn set_progress(&self, message: impl Into<String>, total: u64) {
        let mut detail = self.detail.lock();
        detail.message = Some(message.into());
        detail.progress = Some(Progress { done: 0, total });
    }

    pub fn hit(&self, units: u64) {
        if let Some(progress) = self.detail.lock().progress.as_mut() {
            progress.done = progress.done.saturating_add(units);
        }
    }

    pub fn finish_progress(&self) {
        self.detail.lock().progress = None;
    }

    pub fn progress(&self) -> Option<Progress> {
        self.detail.lock().progress
    }

    /// Message as shown in status, with the meter appended while one runs
    pub fn message(&self) -> Option<String> {
        let detail = self.detail.lock();
        render_message(detail.message.as_deref(), detail.progress)
    }

    // -------------------------------------------------------------------------
    // Debug and status
    // -------------------------------------------------------------------------

    pub fn with_debug<R>(&self, f: impl FnOnce(&mut OpDebug) -> R) -> R {
        f(&mut self.detail.lock().debug)
    }

    /// One-line summary for the slow-operation log
    pub fn debug_summary(&self) -> String {
        let detail = self.detail.lock();
        let mut line = format!("{} {}", self.kind, detail.ns);
        if let Some(query) = &detail.query {
            line.push_str(&format!(" query: {query}"));
        }
        if let Some(update) = &detail.update {
            line.push_str(&format!(" update: {update}"));
        }
        line.push_str(&detail.debug.to_string());
        line
    }

    /// Snapshot for status listings. Session fields are left empty.
    pub fn status(&self, now: Instant) -> OpStatus {
        let detail = self.detail.lock();
        let active = self.is_active();
        let secs_running = match (active, detail.started) {
            (true, Some(started)) => Some(now.saturating_duration_since(started).as_secs()),
            _ => None,
        };
        OpStatus {
            opid: self.id,
            active,
            lock_type: self.lock_type(),
            waiting_for_lock: self.is_waiting_for_lock(),
            secs_running,
            op: self.kind,
            ns: detail.ns.clone(),
            query: detail.query.clone(),
            client: None,
            desc: String::new(),
            thread_id: String::new(),
            connection_id: 0,
            msg: render_message(detail.message.as_deref(), detail.progress),
            progress: detail.progress,
            killed: self.is_killed(),
            num_yields: self.yields(),
        }
    }
}

fn render_message(message: Option<&str>, progress: Option<Progress>) -> Option<String> {
    match (message, progress) {
        (Some(message), Some(p)) => Some(format!(
            "{message} {}/{} {}%",
            p.done,
            p.total,
            p.percent()
        )),
        (Some(message), None) => Some(message.to_string()),
        (None, _) => None,
    }
}

fn micros_between(earlier: Instant, later: Instant) -> u64 {
    u64::try_from(later.saturating_duration_since(earlier).as_micros()).unwrap_or(u64::MAX)
}

/// Read-only summary of one operation and the session running it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpStatus {
    pub opid: OpId,
    pub active: bool,
    pub lock_type: LockType,
    pub waiting_for_lock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secs_running: Option<u64>,
    pub op: OpKind,
    pub ns: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub desc: String,
    pub thread_id: String,
    pub connection_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    pub killed: bool,
    pub num_yields: u32,
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
