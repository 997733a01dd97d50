// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-namespace usage table ("top")
//!
//! Every closed context reports the time its operation spent in one
//! namespace. `Top` folds those samples into per-collection totals split by
//! lock type and operation kind, plus a process-wide total.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use strata_core::{LockType, OpKind, TimingSample, TimingSink};

/// Accumulated time and hit count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageData {
    pub time_micros: u64,
    pub count: u64,
}

impl UsageData {
    fn add(&mut self, micros: u64) {
        self.time_micros = self.time_micros.saturating_add(micros);
        self.count += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionUsage {
    pub total: UsageData,
    pub read_lock: UsageData,
    pub write_lock: UsageData,
    pub queries: UsageData,
    pub getmore: UsageData,
    pub insert: UsageData,
    pub update: UsageData,
    pub remove: UsageData,
    pub commands: UsageData,
}

impl CollectionUsage {
    fn record(&mut self, sample: &TimingSample) {
        let micros = sample.elapsed_micros;
        self.total.add(micros);
        match sample.lock_type {
            LockType::Write => self.write_lock.add(micros),
            LockType::Read => self.read_lock.add(micros),
            LockType::None => {}
        }
        match sample.kind {
            OpKind::Query if sample.is_command => self.commands.add(micros),
            OpKind::Query => self.queries.add(micros),
            OpKind::Command => self.commands.add(micros),
            OpKind::GetMore => self.getmore.add(micros),
            OpKind::Insert => self.insert.add(micros),
            OpKind::Update => self.update.add(micros),
            OpKind::Delete => self.remove.add(micros),
            OpKind::None | OpKind::KillCursors => {}
            OpKind::Reply | OpKind::Msg => {
                tracing::debug!(kind = sample.kind.as_str(), ns = %sample.ns, "unexpected op in usage table");
            }
        }
    }
}

#[derive(Debug, Default)]
struct TopState {
    usage: BTreeMap<String, CollectionUsage>,
    global: CollectionUsage,
    last_dropped: Option<String>,
}

/// Usage table shared by every session of a server
#[derive(Debug, Default)]
pub struct Top {
    state: Mutex<TopState>,
}

impl Top {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the per-namespace table
    pub fn snapshot(&self) -> BTreeMap<String, CollectionUsage> {
        self.state.lock().usage.clone()
    }

    pub fn usage(&self, ns: &str) -> Option<CollectionUsage> {
        self.state.lock().usage.get(ns).cloned()
    }

    /// Totals across every namespace, including dropped ones
    pub fn global(&self) -> CollectionUsage {
        self.state.lock().global.clone()
    }

    /// Forget `ns`.
    ///
    /// The drop command itself closes its context on `ns` after this call;
    /// that one sample is swallowed so the entry does not reappear.
    pub fn collection_dropped(&self, ns: &str) {
        let mut state = self.state.lock();
        state.usage.remove(ns);
        state.last_dropped = Some(ns.to_string());
    }
}

impl TimingSink for Top {
    fn record(&self, sample: &TimingSample) {
        if sample.ns.is_empty() || sample.ns.starts_with('?') {
            return;
        }
        let mut state = self.state.lock();
        let query_like = sample.is_command || sample.kind == OpKind::Query;
        if query_like && state.last_dropped.as_deref() == Some(sample.ns.as_str()) {
            state.last_dropped = None;
            return;
        }
        state
            .usage
            .entry(sample.ns.clone())
            .or_default()
            .record(sample);
        state.global.record(sample);
    }
}

#[cfg(test)]
#[path = "top_tests.rs"]
mod tests;
