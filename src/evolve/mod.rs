//! Evolution control loop — checkpointed, gated rewrites of one artifact.
//!
//! One cycle: snapshot → generate → extract → safety gate → diff review →
//! operator confirmation → apply or skip → optional out-of-process run.

pub mod checkpoint;
pub mod controller;
pub mod diff;
pub mod extract;
pub mod prompts;
pub mod runner;
pub mod safety;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use controller::{CycleOutcome, EvolveConfig, Evolution, Review};
pub use extract::extract_code;
pub use safety::{SafetyReport, SafetyVerdict};

use crate::llm::LlmError;

/// Errors from the evolution loop.
#[derive(Debug, thiserror::Error)]
pub enum EvolveError {
    /// Snapshot I/O failed. Fatal: without a rollback point the loop stops.
    #[error("checkpoint I/O failure: {0}")]
    Checkpoint(std::io::Error),

    /// Reading or writing the artifact itself failed.
    #[error("artifact I/O failure: {0}")]
    Artifact(std::io::Error),

    /// Reading the operator's keyboard input failed.
    #[error("operator input failed: {0}")]
    Input(std::io::Error),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl EvolveError {
    /// Only checkpoint failures halt the loop; everything else degrades to
    /// "skip this cycle and continue".
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvolveError::Checkpoint(_))
    }
}
