//! Recorded diff stream replay
//!
//! A recording is a JSON array of batches, each an array of operations:
//!
//! ```json
//! [
//!   [{ "op": "reset", "values": ["a", "b"] }],
//!   [{ "op": "insert", "index": 1, "value": "c" }, { "op": "pop_front" }]
//! ]
//! ```

use listsync_core::{BatchOutcome, Detached, ScopeId, ScopeWriter, SyncConfig, SyncError};
use listsync_diff::DiffBatch;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Final state of a replayed stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayOutcome {
    /// Batches that published a snapshot
    pub applied: usize,
    /// Batches that were empty
    pub skipped: usize,
    /// Version of the final snapshot
    pub version: u64,
    /// Items of the final snapshot
    pub items: Vec<String>,
}

/// Parse a recording
///
/// # Errors
/// Returns the `serde_json` error for malformed input.
pub fn parse_batches(source: &str) -> Result<Vec<DiffBatch<String>>, serde_json::Error> {
    serde_json::from_str(source)
}

fn identity(raw: String) -> String {
    raw
}

/// Replay `batches` through a fresh scope writer
///
/// Stops at the first malformed batch.
///
/// # Errors
/// Returns `SyncError::Reconcile` with the failing operation's position.
pub fn replay(batches: Vec<DiffBatch<String>>, config: &SyncConfig) -> Result<ReplayOutcome, SyncError> {
    let mut writer = ScopeWriter::new(
        ScopeId::new("replay"),
        identity as fn(String) -> String,
        Arc::new(Detached),
        config,
    );
    let (mut applied, mut skipped) = (0, 0);

    for (index, batch) in batches.into_iter().enumerate() {
        match writer.apply_batch(batch).into_result()? {
            BatchOutcome::Applied { version, len } => {
                debug!(batch = index, version, len, "replayed batch");
                applied += 1;
            }
            _ => skipped += 1,
        }
    }

    let snapshot = writer.snapshot();
    Ok(ReplayOutcome {
        applied,
        skipped,
        version: snapshot.version(),
        items: snapshot.to_vec(),
    })
}
