//! Static batch plan for the pipeline.
//!
//! A graph is an ordered list of batches. Members of a batch run
//! concurrently; every dependency must live in a strictly earlier batch,
//! which also rules out cycles.

use std::collections::HashMap;

use mysterykit_utils::error::ConfigError;
use mysterykit_utils::types::PhaseId;
use thiserror::Error;

use crate::phase::PhaseSpec;

/// Widest batch the orchestrator will run at once
pub const MAX_BATCH_WIDTH: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph has no batches")]
    Empty,

    #[error("batch {batch} is empty")]
    EmptyBatch { batch: usize },

    #[error("phase '{phase}' appears more than once")]
    DuplicatePhase { phase: PhaseId },

    #[error("batch {batch} has {width} phases (maximum {MAX_BATCH_WIDTH})")]
    BatchTooWide { batch: usize, width: usize },

    #[error("phase '{phase}' depends on itself")]
    SelfDependency { phase: PhaseId },

    #[error("phase '{phase}' depends on '{dependency}', which is not in the graph")]
    DanglingDependency { phase: PhaseId, dependency: PhaseId },

    #[error(
        "phase '{phase}' in batch {batch} depends on '{dependency}' in batch {dependency_batch}; dependencies must be in an earlier batch"
    )]
    ForwardReference {
        phase: PhaseId,
        batch: usize,
        dependency: PhaseId,
        dependency_batch: usize,
    },
}

impl From<GraphError> for ConfigError {
    fn from(err: GraphError) -> Self {
        ConfigError::InvalidGraph(err.to_string())
    }
}

/// Validated batch plan
#[derive(Debug, Clone)]
pub struct PhaseGraph {
    batches: Vec<Vec<PhaseSpec>>,
    /// Phase → batch index
    index: HashMap<PhaseId, usize>,
}

impl PhaseGraph {
    /// Validate and build a graph. Batch numbers in errors are 1-based.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found, checked batch by batch.
    pub fn new(batches: Vec<Vec<PhaseSpec>>) -> Result<Self, GraphError> {
        if batches.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index = HashMap::new();
        for (i, batch) in batches.iter().enumerate() {
            let batch_no = i + 1;
            if batch.is_empty() {
                return Err(GraphError::EmptyBatch { batch: batch_no });
            }
            if batch.len() > MAX_BATCH_WIDTH {
                return Err(GraphError::BatchTooWide {
                    batch: batch_no,
                    width: batch.len(),
                });
            }
            for spec in batch {
                if index.insert(spec.id(), batch_no).is_some() {
                    return Err(GraphError::DuplicatePhase { phase: spec.id() });
                }
            }
        }

        for (i, batch) in batches.iter().enumerate() {
            let batch_no = i + 1;
            for spec in batch {
                let phase = spec.id();
                for &dependency in &spec.dependencies {
                    if dependency == phase {
                        return Err(GraphError::SelfDependency { phase });
                    }
                    let Some(&dependency_batch) = index.get(&dependency) else {
                        return Err(GraphError::DanglingDependency { phase, dependency });
                    };
                    if dependency_batch >= batch_no {
                        return Err(GraphError::ForwardReference {
                            phase,
                            batch: batch_no,
                            dependency,
                            dependency_batch,
                        });
                    }
                }
            }
        }

        Ok(Self { batches, index })
    }

    #[must_use]
    pub fn batches(&self) -> &[Vec<PhaseSpec>] {
        &self.batches
    }

    #[must_use]
    pub fn spec(&self, phase: PhaseId) -> Option<&PhaseSpec> {
        let batch = self.index.get(&phase)?;
        self.batches[batch - 1].iter().find(|spec| spec.id() == phase)
    }

    /// 1-based batch number of a phase
    #[must_use]
    pub fn batch_of(&self, phase: PhaseId) -> Option<usize> {
        self.index.get(&phase).copied()
    }

    /// Phases in execution order
    pub fn phase_ids(&self) -> impl Iterator<Item = PhaseId> + '_ {
        self.batches.iter().flatten().map(PhaseSpec::id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
