//! Replay Tests
//!
//! Recordings and configuration read from disk, the way the binary does.

use listsync_cli::{parse_batches, replay, run_simulator, ReplayOutcome, SimulatorConfig};
use listsync_core::{BufferPolicy, SyncConfig};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn replay_recording_from_disk() {
    let recording = write_temp(
        r#"[
            [{ "op": "append", "values": ["!a", "!b", "!c"] }],
            [{ "op": "remove", "index": 0 }, { "op": "push_front", "value": "!z" }],
            [{ "op": "truncate", "length": 2 }]
        ]"#,
    );
    let config = write_temp(
        r#"
        resync_on_desync = false

        [buffer_policy]
        kind = "drop_oldest"
        capacity = 4
        "#,
    );

    let config = SyncConfig::load(config.path()).unwrap();
    assert_eq!(config.buffer_policy, BufferPolicy::DropOldest { capacity: 4 });

    let source = std::fs::read_to_string(recording.path()).unwrap();
    let outcome = replay(parse_batches(&source).unwrap(), &config).unwrap();
    assert_eq!(
        outcome,
        ReplayOutcome {
            applied: 3,
            skipped: 0,
            version: 3,
            items: vec!["!z".to_string(), "!b".to_string()],
        }
    );
}

#[test]
fn replay_stops_at_first_malformed_batch() {
    let batches = parse_batches(
        r#"[
            [{ "op": "push_back", "value": "a" }],
            [{ "op": "remove", "index": 1 }],
            [{ "op": "reset", "values": ["b"] }]
        ]"#,
    )
    .unwrap();

    let err = replay(batches, &SyncConfig::default()).unwrap_err();
    assert!(err.is_desynchronized());
    assert!(err.to_string().contains("remove index 1"));
}

#[test]
fn simulator_passes_across_seeds() {
    for seed in [0, 1, 99, 12_345] {
        let report = run_simulator(SimulatorConfig {
            seed,
            batches: 300,
            max_ops_per_batch: 6,
        });
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.batches, 300);
    }
}
