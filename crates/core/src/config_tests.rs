// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn empty_document_gives_defaults() {
    let config = CoreConfig::from_toml_str("").unwrap();
    assert_eq!(config, CoreConfig::default());
    assert_eq!(config.max_payload_bytes, 512);
    assert_eq!(config.db_path, PathBuf::from("/data/db"));
}

#[test]
fn yield_section_accepts_humantime_durations() {
    let config = CoreConfig::from_toml_str(
        r#"
        db_path = "/srv/strata"

        [yield]
        reader_cost = "1ms"
        max = "250ms"
        "#,
    )
    .unwrap();

    assert_eq!(config.db_path, PathBuf::from("/srv/strata"));
    assert_eq!(config.yield_advice.reader_cost, Duration::from_millis(1));
    assert_eq!(config.yield_advice.writer_cost, Duration::from_micros(500));
    assert_eq!(config.yield_advice.max, Duration::from_millis(250));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = CoreConfig::from_toml_str("max_sessions = 3").unwrap_err();
    assert!(err.to_string().contains("max_sessions"), "got: {err}");
}

#[test]
fn builder_overrides() {
    let config = CoreConfig::default()
        .with_db_path("/tmp/strata")
        .with_max_payload_bytes(64);
    assert_eq!(config.db_path, PathBuf::from("/tmp/strata"));
    assert_eq!(config.max_payload_bytes, 64);
}

#[parameterized(
    idle = { 0, 0, false, 0 },
    two_readers = { 2, 0, false, 200 },
    one_writer = { 0, 1, false, 500 },
    mixed = { 3, 2, false, 1_300 },
    many_readers = { 3_000, 0, false, 300_000 },
    capped_readers = { 10_000, 0, false, 1_000_000 },
    capped_writers = { 0, 2_001, false, 1_000_000 },
    interrupted_idle = { 0, 0, true, 100 },
    interrupted_busy = { 3_000, 40, true, 100 },
)]
fn yield_advice(readers: u32, writers: u32, interrupted: bool, expected_micros: u64) {
    let advice = YieldConfig::default().advise(readers, writers, interrupted);
    assert_eq!(advice, Duration::from_micros(expected_micros));
}
