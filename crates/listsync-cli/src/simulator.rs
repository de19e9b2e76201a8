//! Randomized reconciler simulation
//!
//! Generates always-valid operation sequences from a seed, applies them
//! through [`ListReconciler`] and through a plain `Vec` model, and records
//! every batch where the two disagree.

use listsync_diff::{DiffBatch, DiffOperation, ListReconciler};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::{debug, warn};

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of batches to apply
    pub batches: usize,
    /// Upper bound on operations per batch (at least 1)
    pub max_ops_per_batch: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            batches: 1_000,
            max_ops_per_batch: 8,
        }
    }
}

/// One batch where reconciler and model disagreed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// 0-based batch index
    pub batch: usize,
    /// What went wrong
    pub detail: String,
}

/// Counters collected during a run
#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    pub batches: usize,
    pub operations: u64,
    pub by_kind: BTreeMap<&'static str, u64>,
    pub max_len: usize,
}

/// Result of a simulation run
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: SimulatorStats,
    pub divergences: Vec<Divergence>,
    pub final_len: usize,
    pub final_version: u64,
}

impl SimulatorReport {
    /// Check if no divergence was found
    #[must_use]
    pub fn passed(&self) -> bool {
        self.divergences.is_empty()
    }

    /// Render a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        let _ = writeln!(report, "=== listsync Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Batches: {}", self.stats.batches);
        let _ = writeln!(report, "Operations: {}", self.stats.operations);
        for (kind, count) in &self.stats.by_kind {
            let _ = writeln!(report, "  {kind}: {count}");
        }
        let _ = writeln!(report, "Max Length: {}", self.stats.max_len);
        let _ = writeln!(report, "Final Length: {}", self.final_len);
        let _ = writeln!(report, "Final Version: {}", self.final_version);
        let _ = writeln!(report, "Divergences: {}", self.divergences.len());

        if !self.divergences.is_empty() {
            let _ = writeln!(report, "\n=== Divergences ===");
            for (i, divergence) in self.divergences.iter().enumerate() {
                let _ = writeln!(report, "{}. batch {}: {}", i + 1, divergence.batch, divergence.detail);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Reference semantics of one operation on a `Vec`
///
/// Out-of-range operations leave the model unchanged; the generator never
/// produces them.
pub fn apply_to_model(model: &mut Vec<String>, op: &DiffOperation<String>) {
    match op {
        DiffOperation::Append { values } => model.extend(values.iter().cloned()),
        DiffOperation::PushBack { value } => model.push(value.clone()),
        DiffOperation::PushFront { value } => model.insert(0, value.clone()),
        DiffOperation::Set { index, value } => {
            if let Some(slot) = model.get_mut(*index) {
                slot.clone_from(value);
            }
        }
        DiffOperation::Insert { index, value } => {
            if *index <= model.len() {
                model.insert(*index, value.clone());
            }
        }
        DiffOperation::Remove { index } => {
            if *index < model.len() {
                model.remove(*index);
            }
        }
        DiffOperation::PopBack => {
            model.pop();
        }
        DiffOperation::PopFront => {
            if !model.is_empty() {
                model.remove(0);
            }
        }
        DiffOperation::Clear => model.clear(),
        DiffOperation::Truncate { length } => model.truncate(*length),
        DiffOperation::Reset { values } => model.clone_from(values),
    }
}

struct OpGenerator {
    rng: StdRng,
    next_value: u64,
}

impl OpGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_value: 0,
        }
    }

    fn value(&mut self) -> String {
        self.next_value += 1;
        format!("v{}", self.next_value)
    }

    fn values(&mut self, max: usize) -> Vec<String> {
        let count = self.rng.gen_range(0..=max);
        (0..count).map(|_| self.value()).collect()
    }

    /// An operation valid for a list of length `len`
    ///
    /// Clear and Reset are kept rare so lists get long enough to exercise
    /// index-addressed operations.
    fn operation(&mut self, len: usize) -> DiffOperation<String> {
        let roll = self.rng.gen_range(0..100);
        match roll {
            0..=11 => DiffOperation::Append { values: self.values(3) },
            12..=25 => DiffOperation::PushBack { value: self.value() },
            26..=35 => DiffOperation::PushFront { value: self.value() },
            36..=49 if len > 0 => DiffOperation::Set {
                index: self.rng.gen_range(0..len),
                value: self.value(),
            },
            50..=63 => DiffOperation::Insert {
                index: self.rng.gen_range(0..=len),
                value: self.value(),
            },
            64..=79 if len > 0 => DiffOperation::Remove {
                index: self.rng.gen_range(0..len),
            },
            80..=84 => DiffOperation::PopBack,
            85..=89 => DiffOperation::PopFront,
            90..=94 => DiffOperation::Truncate {
                length: self.rng.gen_range(0..=len + 2),
            },
            95..=97 => DiffOperation::Reset { values: self.values(6) },
            98..=99 => DiffOperation::Clear,
            _ => DiffOperation::PushBack { value: self.value() },
        }
    }

    fn batch(&mut self, len: usize, max_ops: usize) -> DiffBatch<String> {
        let count = self.rng.gen_range(1..=max_ops.max(1));
        let mut batch = DiffBatch::empty();
        let mut len = len;
        for _ in 0..count {
            let op = self.operation(len);
            len = op.resulting_len(len);
            batch.push(op);
        }
        batch
    }
}

fn identity(raw: String) -> String {
    raw
}

/// Run the simulator
#[must_use]
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut generator = OpGenerator::new(config.seed);
    let mut reconciler = ListReconciler::new(identity as fn(String) -> String);
    let mut model: Vec<String> = Vec::new();
    let mut stats = SimulatorStats::default();
    let mut divergences = Vec::new();

    for batch_index in 0..config.batches {
        let batch = generator.batch(model.len(), config.max_ops_per_batch);
        for op in &batch {
            apply_to_model(&mut model, op);
            *stats.by_kind.entry(op.kind().as_str()).or_insert(0) += 1;
        }
        stats.batches += 1;
        stats.operations += batch.len() as u64;
        stats.max_len = stats.max_len.max(model.len());

        let expected_version = batch_index as u64 + 1;
        match reconciler.apply(batch) {
            Ok(snapshot) => {
                if snapshot.to_vec() != model {
                    warn!(batch = batch_index, "snapshot differs from model");
                    divergences.push(Divergence {
                        batch: batch_index,
                        detail: format!(
                            "snapshot has {} items, model has {}",
                            snapshot.len(),
                            model.len()
                        ),
                    });
                } else if snapshot.version() != expected_version {
                    divergences.push(Divergence {
                        batch: batch_index,
                        detail: format!(
                            "version {} (expected {expected_version})",
                            snapshot.version()
                        ),
                    });
                }
            }
            Err(err) => {
                warn!(batch = batch_index, error = %err, "valid batch rejected");
                divergences.push(Divergence {
                    batch: batch_index,
                    detail: err.to_string(),
                });
                // Resynchronize the model to keep comparing later batches.
                model = reconciler.snapshot().to_vec();
            }
        }
    }

    debug!(seed = config.seed, divergences = divergences.len(), "simulation finished");
    let snapshot = reconciler.snapshot();
    SimulatorReport {
        final_len: snapshot.len(),
        final_version: snapshot.version(),
        config,
        stats,
        divergences,
    }
}
