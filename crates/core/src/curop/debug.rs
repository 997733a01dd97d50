// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-operation statistics for the slow-operation log and the profiler

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub message: String,
    pub code: i32,
}

/// Counters an operation fills in as it runs.
///
/// `None` and `false` fields are left out of both renderings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpDebug {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_to_return: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_to_skip: Option<i32>,
    #[serde(skip_serializing_if = "is_false")]
    pub exhaust: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_scanned: Option<u64>,
    #[serde(skip_serializing_if = "is_false")]
    pub id_hack: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub scan_and_order: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub moved: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub fastmod: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub fastmod_insert: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub upsert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_updates: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_returned: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_length: Option<u64>,
    pub millis: u64,
}

fn is_false(value: &bool) -> bool {
    !value
}

impl OpDebug {
    pub fn reset(&mut self) {
        *self = OpDebug::default();
    }
}

impl fmt::Display for OpDebug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(
            f: &mut fmt::Formatter<'_>,
            label: &str,
            value: &Option<T>,
        ) -> fmt::Result {
            match value {
                Some(v) => write!(f, " {label}:{v}"),
                None => Ok(()),
            }
        }
        fn flag(f: &mut fmt::Formatter<'_>, label: &str, value: bool) -> fmt::Result {
            if value {
                write!(f, " {label}:1")?;
            }
            Ok(())
        }

        opt(f, "cursorid", &self.cursor_id)?;
        opt(f, "ntoreturn", &self.n_to_return)?;
        opt(f, "ntoskip", &self.n_to_skip)?;
        flag(f, "exhaust", self.exhaust)?;
        opt(f, "nscanned", &self.n_scanned)?;
        flag(f, "idhack", self.id_hack)?;
        flag(f, "scanAndOrder", self.scan_and_order)?;
        flag(f, "moved", self.moved)?;
        flag(f, "fastmod", self.fastmod)?;
        flag(f, "fastmodinsert", self.fastmod_insert)?;
        flag(f, "upsert", self.upsert)?;
        opt(f, "keyUpdates", &self.key_updates)?;
        if let Some(exception) = &self.exception {
            write!(
                f,
                " exception: {} code:{}",
                exception.message, exception.code
            )?;
        }
        opt(f, "nreturned", &self.n_returned)?;
        opt(f, "reslen", &self.response_length)?;
        write!(f, " {}ms", self.millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_debug_renders_only_duration() {
        assert_eq!(OpDebug::default().to_string(), " 0ms");
    }

    #[test]
    fn renders_set_fields_in_log_order() {
        let debug = OpDebug {
            n_to_return: Some(10),
            n_scanned: Some(1200),
            scan_and_order: true,
            n_returned: Some(10),
            response_length: Some(812),
            millis: 143,
            ..OpDebug::default()
        };
        assert_eq!(
            debug.to_string(),
            " ntoreturn:10 nscanned:1200 scanAndOrder:1 nreturned:10 reslen:812 143ms"
        );
    }

    #[test]
    fn exception_is_rendered_with_code() {
        let debug = OpDebug {
            exception: Some(ExceptionInfo {
                message: "interrupted".into(),
                code: 11601,
            }),
            millis: 5,
            ..OpDebug::default()
        };
        assert_eq!(debug.to_string(), " exception: interrupted code:11601 5ms");
    }

    #[test]
    fn profile_document_skips_unset_fields() {
        let debug = OpDebug {
            upsert: true,
            millis: 2,
            ..OpDebug::default()
        };
        let doc = serde_json::to_value(&debug).unwrap();
        assert_eq!(doc, serde_json::json!({ "upsert": true, "millis": 2 }));
    }

    #[test]
    fn reset_clears_everything() {
        let mut debug = OpDebug {
            moved: true,
            millis: 9,
            ..OpDebug::default()
        };
        debug.reset();
        assert_eq!(debug, OpDebug::default());
    }
}
