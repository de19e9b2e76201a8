//! listsync CLI - Replay and Simulation Tooling
//!
//! Library half of the `listsync` binary:
//! - [`replay`]: Drive a recorded diff stream through a scope writer
//! - [`simulator`]: Compare the reconciler with a `Vec` model on random streams
//! - [`report`]: Describe the effective configuration

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod replay;
pub mod report;
pub mod simulator;

pub use replay::{parse_batches, replay, ReplayOutcome};
pub use report::ConfigReport;
pub use simulator::{run_simulator, Divergence, SimulatorConfig, SimulatorReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
