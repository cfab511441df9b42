//! End-to-end pipeline behavior on tokio's paused clock
//!
//! Scripted providers sleep on the virtual clock, so every offset asserted
//! here is exact.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mysterykit::crates::llm::scripted::{Behavior, ScriptedProvider};
use mysterykit::crates::llm::{AttemptOutcome, ProviderError};
use mysterykit::{
    Config, ExitCode, FALLBACK_PROVIDER, GenerationParams, Pipeline, PipelineError, PhaseId,
    PhaseStatus, ProviderChain, ProviderClient, ProviderDescriptor, ProviderRequest,
    ProviderResponse, QualityGate, ReadinessTier, SessionState, SessionView,
};

fn chain(providers: Vec<ScriptedProvider>) -> ProviderChain {
    let descriptors = providers
        .into_iter()
        .enumerate()
        .map(|(rank, provider)| {
            let name = provider.name().to_string();
            ProviderDescriptor::new(name, rank as u32 + 1, 4096, Arc::new(provider))
        })
        .collect();
    ProviderChain::new(descriptors).unwrap()
}

fn params() -> GenerationParams {
    GenerationParams::new(6, "a snowbound Alpine hotel").with_era("1930s")
}

fn http_500() -> ProviderError {
    ProviderError::Http {
        status: 500,
        message: "internal error".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_all_primary_successes_finish_in_four_seconds() {
    let provider_1 = ScriptedProvider::new("provider-1", Behavior::succeed_after(Duration::from_secs(1)));
    let provider_2 = ScriptedProvider::new("provider-2", Behavior::succeed_after(Duration::from_secs(1)));
    let secondary_calls = provider_2.calls_handle();
    let pipeline =
        Pipeline::with_chain(&Config::default(), chain(vec![provider_1, provider_2])).unwrap();

    let started = tokio::time::Instant::now();
    let outcome = pipeline.generate(params()).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(4));
    assert_eq!(outcome.session.state(), SessionState::Scored);
    assert_eq!(outcome.session.results().len(), 8);
    for result in outcome.session.results().values() {
        assert_eq!(result.status, PhaseStatus::Succeeded, "{}", result.phase);
        assert_eq!(result.provider, "provider-1");
        assert_eq!(result.duration_ms, 1000);
    }
    assert!(secondary_calls.lock().unwrap().is_empty());
    assert_eq!(outcome.report.tier, ReadinessTier::Premium);
}

#[tokio::test(start_paused = true)]
async fn scenario_timeout_advances_to_secondary_provider() {
    let config =
        Config::from_toml_str("[pipeline.phases.characterProfiles]\ntimeout_secs = 5\n").unwrap();
    let provider_1 = ScriptedProvider::new("provider-1", Behavior::succeed_after(Duration::from_secs(1)))
        .with_phase(PhaseId::CharacterProfiles, Behavior::Hang)
        .with_phase(PhaseId::RelationshipMap, Behavior::succeed_after(Duration::from_secs(4)));
    let provider_2 = ScriptedProvider::new("provider-2", Behavior::succeed_after(Duration::from_secs(2)));
    let pipeline = Pipeline::with_chain(&config, chain(vec![provider_1, provider_2])).unwrap();

    let outcome = pipeline.generate(params()).await.unwrap();
    let session = &outcome.session;

    let profiles = session.result(PhaseId::CharacterProfiles).unwrap();
    assert_eq!(profiles.status, PhaseStatus::Succeeded);
    assert_eq!(profiles.provider, "provider-2");
    assert_eq!(profiles.started_ms, 1000);
    assert_eq!(profiles.duration_ms, 7000);
    let outcomes: Vec<AttemptOutcome> = profiles.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(outcomes, vec![AttemptOutcome::Timeout, AttemptOutcome::Success]);
    assert_eq!(profiles.attempts[0].duration_ms, 5000);

    let relationships = session.result(PhaseId::RelationshipMap).unwrap();
    assert_eq!(relationships.provider, "provider-1");
    assert_eq!(relationships.finished_ms, 5000);

    // batch 2 started at +1s and advanced at +7s after it
    for id in [PhaseId::IncidentDetails, PhaseId::EvidenceSet] {
        assert_eq!(session.result(id).unwrap().started_ms, 8000);
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_all_providers_failing_still_completes() {
    let provider_1 = ScriptedProvider::new("provider-1", Behavior::fail(http_500()));
    let provider_2 = ScriptedProvider::new(
        "provider-2",
        Behavior::fail(ProviderError::Auth("invalid key".to_string())),
    );
    let pipeline =
        Pipeline::with_chain(&Config::default(), chain(vec![provider_1, provider_2])).unwrap();

    let outcome = pipeline.generate(params()).await.unwrap();

    assert_eq!(outcome.session.results().len(), 8);
    for result in outcome.session.results().values() {
        assert_eq!(result.status, PhaseStatus::Fallback);
        assert_eq!(result.provider, FALLBACK_PROVIDER);
        assert!(!result.content.trim().is_empty());
        let outcomes: Vec<AttemptOutcome> = result.attempts.iter().map(|a| a.outcome).collect();
        assert_eq!(outcomes, vec![AttemptOutcome::HttpError, AttemptOutcome::AuthError]);
    }
    assert_eq!(outcome.report.tier, ReadinessTier::Insufficient);
}

#[tokio::test(start_paused = true)]
async fn dependencies_finish_before_dependents_start() {
    let provider = ScriptedProvider::new("provider-1", Behavior::succeed_after(Duration::from_millis(700)))
        .with_phase(PhaseId::EvidenceSet, Behavior::succeed_after(Duration::from_secs(3)))
        .with_phase(PhaseId::Concept, Behavior::succeed_after(Duration::from_millis(1500)));
    let pipeline = Pipeline::with_chain(&Config::default(), chain(vec![provider])).unwrap();

    let outcome = pipeline.generate(params()).await.unwrap();

    for spec in pipeline.graph().batches().iter().flatten() {
        let result = outcome.session.result(spec.id()).unwrap();
        for dep in &spec.dependencies {
            let upstream = outcome.session.result(*dep).unwrap();
            assert!(
                result.started_ms >= upstream.finished_ms,
                "{} started before {} finished",
                spec.id(),
                dep
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn total_latency_bounded_by_deadline_plus_one_phase_timeout() {
    let config = Config::from_toml_str(
        "[pipeline]\ndeadline_secs = 10\nphase_timeout_secs = 8\n",
    )
    .unwrap();
    let provider = ScriptedProvider::new("provider-1", Behavior::Hang);
    let calls = provider.calls_handle();
    let pipeline = Pipeline::with_chain(&config, chain(vec![provider])).unwrap();

    let started = tokio::time::Instant::now();
    let outcome = pipeline.generate(params()).await.unwrap();

    // batch 1 times out at 8s and batch 2 at 16s; the deadline has passed
    // by then, so batches 3 and 4 are skipped
    assert!(started.elapsed() <= Duration::from_secs(18));
    assert_eq!(calls.lock().unwrap().len(), 3);
    let skipped: Vec<PhaseId> = outcome
        .session
        .results()
        .values()
        .filter(|r| r.status == PhaseStatus::Degraded)
        .map(|r| r.phase)
        .collect();
    assert_eq!(
        skipped,
        vec![
            PhaseId::IncidentDetails,
            PhaseId::EvidenceSet,
            PhaseId::Timeline,
            PhaseId::Resolution,
            PhaseId::FacilitatorGuide,
        ]
    );
    assert_eq!(outcome.session.state(), SessionState::Scored);
}

#[tokio::test(start_paused = true)]
async fn unusable_upstream_degrades_downstream_phase() {
    // prose without headings leaves no character roster to parse
    let provider = ScriptedProvider::new("provider-1", Behavior::succeed_after(Duration::from_secs(1)))
        .with_phase(
            PhaseId::CharacterProfiles,
            Behavior::succeed_with(Duration::from_secs(1), "Everyone is a suspect, nobody has a name."),
        );
    let pipeline = Pipeline::with_chain(&Config::default(), chain(vec![provider])).unwrap();

    let outcome = pipeline.generate(params()).await.unwrap();
    let session = &outcome.session;

    assert_eq!(
        session.result(PhaseId::CharacterProfiles).unwrap().status,
        PhaseStatus::Succeeded
    );
    for id in [PhaseId::IncidentDetails, PhaseId::EvidenceSet, PhaseId::Timeline] {
        let result = session.result(id).unwrap();
        assert_eq!(result.status, PhaseStatus::Degraded, "{id}");
        assert_eq!(result.provider, "provider-1");
        assert!(result.degraded_reason.is_some());
    }
    assert_eq!(
        session.result(PhaseId::Resolution).unwrap().status,
        PhaseStatus::Succeeded
    );
    assert!(outcome.report.phases[&PhaseId::IncidentDetails].score <= 40.0);
}

#[tokio::test(start_paused = true)]
async fn invalid_parameters_rejected_with_every_violation() {
    let provider = ScriptedProvider::new("provider-1", Behavior::succeed_after(Duration::from_secs(1)));
    let calls = provider.calls_handle();
    let pipeline = Pipeline::with_chain(&Config::default(), chain(vec![provider])).unwrap();

    let err = pipeline
        .generate(GenerationParams::new(25, "   ").with_tone("x".repeat(101)))
        .await
        .unwrap_err();

    match &err {
        PipelineError::InvalidParameters(e) => assert_eq!(e.violations.len(), 3),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), ExitCode::INVALID_PARAMETERS);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scoring_is_deterministic_for_a_session() {
    let provider = ScriptedProvider::new("provider-1", Behavior::succeed_after(Duration::from_secs(1)))
        .with_phase(PhaseId::Timeline, Behavior::fail(http_500()));
    let pipeline = Pipeline::with_chain(&Config::default(), chain(vec![provider])).unwrap();
    let outcome = pipeline.generate(params()).await.unwrap();

    // a scored session cannot be scored again; rebuild a COMPLETE view of it
    struct Completed<'a>(&'a mysterykit::GenerationSession);
    impl SessionView for Completed<'_> {
        fn session_id(&self) -> String {
            self.0.session_id()
        }
        fn is_complete(&self) -> bool {
            true
        }
        fn state_name(&self) -> &'static str {
            "COMPLETE"
        }
        fn results(
            &self,
        ) -> &std::collections::BTreeMap<PhaseId, mysterykit::PhaseResult> {
            self.0.results()
        }
    }

    let gate = QualityGate::default();
    let first = gate.evaluate(&Completed(&outcome.session), pipeline.graph()).unwrap();
    let second = gate.evaluate(&Completed(&outcome.session), pipeline.graph()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, outcome.report);
    assert!(first.phases[&PhaseId::Timeline].score <= 40.0);
    assert!(first.overall < 100.0);
    assert!(
        first
            .suggestions
            .iter()
            .any(|s| s.phase == PhaseId::Timeline && s.metric == "provider")
    );
}

/// Provider whose invocation panics, standing in for a bug in a backend
struct PanickingProvider;

#[async_trait]
impl ProviderClient for PanickingProvider {
    async fn invoke(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        panic!("backend bug");
    }
}

#[tokio::test(start_paused = true)]
async fn panicking_provider_yields_degraded_results() {
    let chain = ProviderChain::new(vec![ProviderDescriptor::new(
        "panicking",
        1,
        4096,
        Arc::new(PanickingProvider),
    )])
    .unwrap();
    let pipeline = Pipeline::with_chain(&Config::default(), chain).unwrap();

    let outcome = pipeline.generate(params()).await.unwrap();

    assert_eq!(outcome.session.results().len(), 8);
    for result in outcome.session.results().values() {
        assert_eq!(result.status, PhaseStatus::Degraded);
        assert_eq!(result.provider, FALLBACK_PROVIDER);
    }
    assert_eq!(outcome.report.tier, ReadinessTier::Insufficient);
}

#[tokio::test(start_paused = true)]
async fn outcome_serializes_for_the_assembler() {
    let provider = ScriptedProvider::new("provider-1", Behavior::succeed_after(Duration::from_secs(1)));
    let pipeline = Pipeline::with_chain(&Config::default(), chain(vec![provider])).unwrap();
    let outcome = pipeline.generate(params()).await.unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["session"]["state"], "SCORED");
    assert_eq!(json["report"]["tier"], "PREMIUM");
    assert_eq!(json["session"]["results"]["characterProfiles"]["status"], "SUCCEEDED");
    assert_eq!(
        json["session"]["results"]["concept"]["attempts"][0]["outcome"],
        "SUCCESS"
    );
}
