//! Batch orchestration
//!
//! Walks the [`PhaseGraph`] batch by batch. Members of a batch run as
//! concurrent tasks on a `JoinSet`; the next batch starts only after every
//! member of the current one has a recorded result. Once the pipeline
//! deadline has passed, remaining batches are recorded as DEGRADED
//! placeholders without contacting any provider.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use mysterykit_gate::SessionView;
use mysterykit_llm::{FALLBACK_PROVIDER, SyntheticFallback};
use mysterykit_phase_api::{
    GenerationParams, PhaseContext, PhaseGraph, PhaseId, PhaseResult, PhaseSpec, PhaseStatus,
};
use mysterykit_utils::logging::phase_span;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{Instrument, error, info, warn};

use crate::executor::{PhaseExecutor, offset_ms};
use crate::session::{GenerationSession, SessionError, SessionState};

/// Drives a session through every batch of the graph
#[derive(Debug, Clone)]
pub struct Orchestrator {
    executor: Arc<PhaseExecutor>,
    graph: Arc<PhaseGraph>,
    deadline: Duration,
}

impl Orchestrator {
    #[must_use]
    pub fn new(executor: PhaseExecutor, graph: Arc<PhaseGraph>, deadline: Duration) -> Self {
        Self {
            executor: Arc::new(executor),
            graph,
            deadline,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &PhaseGraph {
        &self.graph
    }

    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run every batch and leave the session COMPLETE.
    ///
    /// Total latency is bounded by the deadline plus one phase timeout:
    /// batches starting after the deadline are skipped, and attempts of
    /// phases launched before it stop at `deadline + phase timeout`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session is not PENDING or a result is
    /// recorded twice. Phase failures are never errors.
    pub async fn run(&self, session: &mut GenerationSession) -> Result<(), SessionError> {
        session.transition(SessionState::Running)?;
        let session_id = session.id().to_string();
        let pipeline_start = Instant::now();

        info!(
            session_id = %session_id,
            batches = self.graph.batches().len(),
            deadline_secs = self.deadline.as_secs(),
            "Starting generation"
        );

        for (index, batch) in self.graph.batches().iter().enumerate() {
            let batch_number = index + 1;
            let elapsed = pipeline_start.elapsed();

            let results: Vec<PhaseResult> = if elapsed >= self.deadline {
                warn!(
                    session_id = %session_id,
                    batch = batch_number,
                    elapsed_ms = offset_ms(pipeline_start),
                    "Pipeline deadline exceeded, skipping batch"
                );
                batch
                    .iter()
                    .map(|spec| {
                        self.skipped_result(spec, session.params(), pipeline_start, batch_number)
                    })
                    .collect()
            } else {
                info!(
                    session_id = %session_id,
                    batch = batch_number,
                    phases = batch.len(),
                    elapsed_ms = offset_ms(pipeline_start),
                    "Launching batch"
                );
                self.run_batch(batch, session, &session_id, pipeline_start, batch_number)
                    .await
            };

            for result in results {
                session.record(result)?;
            }

            info!(
                session_id = %session_id,
                batch = batch_number,
                elapsed_ms = offset_ms(pipeline_start),
                "Batch complete"
            );
        }

        session.transition(SessionState::Complete)?;
        info!(
            session_id = %session_id,
            elapsed_ms = offset_ms(pipeline_start),
            "Generation complete"
        );
        Ok(())
    }

    async fn run_batch(
        &self,
        batch: &[PhaseSpec],
        session: &GenerationSession,
        session_id: &str,
        pipeline_start: Instant,
        batch_number: usize,
    ) -> Vec<PhaseResult> {
        let upstream: Arc<BTreeMap<PhaseId, PhaseResult>> =
            Arc::new(session.results().clone());
        let params = Arc::new(session.params().clone());
        let hard_deadline = pipeline_start + self.deadline;

        let mut tasks = JoinSet::new();
        let mut phase_by_task = HashMap::new();

        for spec in batch {
            let executor = Arc::clone(&self.executor);
            let upstream = Arc::clone(&upstream);
            let params = Arc::clone(&params);
            let spec_owned = spec.clone();
            let session_owned = session_id.to_string();
            let span = phase_span(session_id, spec.id().as_str(), batch_number);
            let attempt_deadline = hard_deadline + spec.timeout;

            let handle = tasks.spawn(
                async move {
                    let ctx = PhaseContext::new(&session_owned, &params, &upstream);
                    executor
                        .execute(&spec_owned, &ctx, pipeline_start, Some(attempt_deadline))
                        .await
                }
                .instrument(span),
            );
            phase_by_task.insert(handle.id(), spec.id());
        }

        let mut results = Vec::with_capacity(batch.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, result)) => results.push(result),
                Err(join_error) => {
                    let Some(&phase) = phase_by_task.get(&join_error.id()) else {
                        error!(session_id = %session_id, "Unknown phase task failed: {join_error}");
                        continue;
                    };
                    error!(
                        session_id = %session_id,
                        phase = %phase,
                        "Phase task failed: {join_error}"
                    );
                    if let Some(spec) = batch.iter().find(|s| s.id() == phase) {
                        let content = SyntheticFallback::render(&spec.fallback(&params));
                        let now = offset_ms(pipeline_start);
                        results.push(
                            PhaseResult::new(phase, PhaseStatus::Degraded, content, FALLBACK_PROVIDER)
                                .with_timing(now, now)
                                .with_degraded_reason(format!("phase task failed: {join_error}")),
                        );
                    }
                }
            }
        }

        // join order is completion order; keep the batch's declared order
        results.sort_by_key(|r| batch.iter().position(|s| s.id() == r.phase));
        results
    }

    fn skipped_result(
        &self,
        spec: &PhaseSpec,
        params: &GenerationParams,
        pipeline_start: Instant,
        batch_number: usize,
    ) -> PhaseResult {
        let now = offset_ms(pipeline_start);
        PhaseResult::new(
            spec.id(),
            PhaseStatus::Degraded,
            SyntheticFallback::render(&spec.fallback(params)),
            FALLBACK_PROVIDER,
        )
        .with_timing(now, now)
        .with_degraded_reason(format!(
            "pipeline deadline of {}s reached before batch {batch_number} started",
            self.deadline.as_secs()
        ))
    }
}
