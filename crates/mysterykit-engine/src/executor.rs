//! Single-phase execution
//!
//! Turns a [`PhaseSpec`] plus upstream results into exactly one
//! [`PhaseResult`]. Execution never fails: provider exhaustion yields a
//! FALLBACK result and an unusable upstream yields a DEGRADED one.

use mysterykit_llm::{
    META_MIN_LENGTH, META_SECTIONS, Message, ProviderChain, ProviderRequest,
};
use mysterykit_phase_api::{PhaseContext, PhaseRequest, PhaseResult, PhaseSpec, PhaseStatus};
use serde_json::json;
use tokio::time::Instant;
use tracing::{info, warn};

/// Runs one phase against the provider chain
#[derive(Debug, Clone)]
pub struct PhaseExecutor {
    chain: ProviderChain,
}

impl PhaseExecutor {
    #[must_use]
    pub fn new(chain: ProviderChain) -> Self {
        Self { chain }
    }

    #[must_use]
    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// Execute `spec` and return its result.
    ///
    /// Offsets in the result are measured from `pipeline_start`. Provider
    /// attempts never run past `hard_deadline`.
    pub async fn execute(
        &self,
        spec: &PhaseSpec,
        ctx: &PhaseContext<'_>,
        pipeline_start: Instant,
        hard_deadline: Option<Instant>,
    ) -> PhaseResult {
        let started_ms = offset_ms(pipeline_start);
        let phase = spec.id();

        let (request, degraded_reason) = match spec.phase.build_request(ctx) {
            Ok(request) => (request, None),
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(
                    session_id = %ctx.session_id,
                    phase = %phase,
                    reason = %reason,
                    "Upstream unusable, building minimal request"
                );
                (spec.phase.minimal_request(ctx.params), Some(reason))
            }
        };

        let outcome = self
            .chain
            .run(
                provider_request(ctx.session_id, spec, request),
                hard_deadline,
                &spec.fallback(ctx.params),
            )
            .await;

        let status = match (&degraded_reason, outcome.fallback_used) {
            (Some(_), _) => PhaseStatus::Degraded,
            (None, true) => PhaseStatus::Fallback,
            (None, false) => PhaseStatus::Succeeded,
        };

        let finished_ms = offset_ms(pipeline_start);
        info!(
            session_id = %ctx.session_id,
            phase = %phase,
            provider = %outcome.provider,
            status = %status,
            elapsed_ms = finished_ms,
            "Phase finished"
        );

        let mut result = PhaseResult::new(phase, status, outcome.content, outcome.provider)
            .with_timing(started_ms, finished_ms)
            .with_attempts(outcome.attempts);
        if let Some(reason) = degraded_reason {
            result = result.with_degraded_reason(reason);
        }
        result
    }
}

fn provider_request(session_id: &str, spec: &PhaseSpec, request: PhaseRequest) -> ProviderRequest {
    let messages = vec![Message::system(request.system), Message::user(request.prompt)];
    ProviderRequest::new(session_id, spec.id(), spec.max_tokens, spec.timeout, messages)
        .with_metadata(META_SECTIONS, json!(spec.sections()))
        .with_metadata(META_MIN_LENGTH, json!(spec.min_length))
}

pub(crate) fn offset_ms(pipeline_start: Instant) -> u64 {
    u64::try_from(pipeline_start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysterykit_config::PipelineConfig;
    use mysterykit_llm::scripted::{Behavior, ScriptedProvider};
    use mysterykit_llm::{FALLBACK_PROVIDER, ProviderDescriptor, ProviderError};
    use mysterykit_phase_api::{GenerationParams, PhaseId};
    use mysterykit_phases::configured_spec;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn params() -> GenerationParams {
        GenerationParams::new(6, "Riverboat casino")
    }

    fn chain(providers: Vec<ScriptedProvider>) -> ProviderChain {
        let descriptors = providers
            .into_iter()
            .enumerate()
            .map(|(i, provider)| {
                let name = provider.name().to_string();
                ProviderDescriptor::new(name, i as u32, 4096, Arc::new(provider))
            })
            .collect();
        ProviderChain::new(descriptors).unwrap()
    }

    fn spec(id: PhaseId) -> PhaseSpec {
        configured_spec(id, &PipelineConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_records_provider_and_timing() {
        let provider = ScriptedProvider::new("primary", Behavior::succeed_after(Duration::from_secs(1)));
        let calls = provider.calls_handle();
        let executor = PhaseExecutor::new(chain(vec![provider]));
        let upstream = BTreeMap::new();
        let params = params();
        let ctx = PhaseContext::new("s-1", &params, &upstream);

        let start = Instant::now();
        let result = executor.execute(&spec(PhaseId::Concept), &ctx, start, None).await;

        assert_eq!(result.status, PhaseStatus::Succeeded);
        assert_eq!(result.provider, "primary");
        assert_eq!(result.started_ms, 0);
        assert_eq!(result.finished_ms, 1000);
        assert_eq!(result.duration_ms, 1000);
        assert!(result.content.contains("## Premise"));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].session_id, "s-1");
        assert_eq!(calls[0].max_tokens, 1500);
        assert_eq!(calls[0].min_length(), Some(600));
        assert_eq!(calls[0].expected_sections().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_yields_fallback_status() {
        let provider = ScriptedProvider::new("primary", Behavior::fail(ProviderError::Auth("401".into())));
        let executor = PhaseExecutor::new(chain(vec![provider]));
        let upstream = BTreeMap::new();
        let params = params();
        let ctx = PhaseContext::new("s-1", &params, &upstream);

        let result = executor
            .execute(&spec(PhaseId::Concept), &ctx, Instant::now(), None)
            .await;

        assert_eq!(result.status, PhaseStatus::Fallback);
        assert_eq!(result.provider, FALLBACK_PROVIDER);
        assert!(result.content.contains("## Victim"));
        assert_eq!(result.attempts.len(), 1);
        assert!(result.degraded_reason.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_upstream_degrades_but_still_calls_provider() {
        let provider = ScriptedProvider::new("primary", Behavior::succeed_after(Duration::from_millis(500)));
        let calls = provider.calls_handle();
        let executor = PhaseExecutor::new(chain(vec![provider]));
        let upstream = BTreeMap::new();
        let params = params();
        let ctx = PhaseContext::new("s-1", &params, &upstream);

        let result = executor
            .execute(&spec(PhaseId::CharacterProfiles), &ctx, Instant::now(), None)
            .await;

        assert_eq!(result.status, PhaseStatus::Degraded);
        assert_eq!(result.provider, "primary");
        assert!(result.degraded_reason.as_deref().unwrap().contains("concept"));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_roster_degrades() {
        let provider = ScriptedProvider::new("primary", Behavior::succeed_after(Duration::from_millis(10)));
        let executor = PhaseExecutor::new(chain(vec![provider]));
        let params = params();
        let mut upstream = BTreeMap::new();
        for (phase, content) in [
            (PhaseId::Concept, "## Premise\nA body in the engine room."),
            (PhaseId::CharacterProfiles, "Nobody here has a heading."),
        ] {
            upstream.insert(
                phase,
                PhaseResult::new(phase, PhaseStatus::Succeeded, content, "primary"),
            );
        }
        let ctx = PhaseContext::new("s-1", &params, &upstream);

        let result = executor
            .execute(&spec(PhaseId::EvidenceSet), &ctx, Instant::now(), None)
            .await;

        assert_eq!(result.status, PhaseStatus::Degraded);
        assert!(result.degraded_reason.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_deadline_bounds_attempts() {
        let provider = ScriptedProvider::new("slow", Behavior::Hang);
        let executor = PhaseExecutor::new(chain(vec![provider]));
        let upstream = BTreeMap::new();
        let params = params();
        let ctx = PhaseContext::new("s-1", &params, &upstream);

        let start = Instant::now();
        let result = executor
            .execute(
                &spec(PhaseId::Concept),
                &ctx,
                start,
                Some(start + Duration::from_secs(2)),
            )
            .await;

        assert_eq!(result.status, PhaseStatus::Fallback);
        assert_eq!(result.finished_ms, 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_content_is_passed_through() {
        let provider = ScriptedProvider::new(
            "primary",
            Behavior::succeed_with(Duration::from_secs(1), "plain"),
        );
        let executor = PhaseExecutor::new(chain(vec![provider]));
        let upstream = BTreeMap::new();
        let params = params();
        let ctx = PhaseContext::new("s-1", &params, &upstream);

        let result = executor
            .execute(&spec(PhaseId::Concept), &ctx, Instant::now(), None)
            .await;
        assert_eq!(result.content, "plain");
        assert_eq!(result.status, PhaseStatus::Succeeded);
    }
}
