//! Quality gate for generated mystery kits
//!
//! Scores each phase of a completed session with pluggable [`Metric`]s,
//! penalizes repeated lines, and maps the overall score onto a
//! [`ReadinessTier`] using the thresholds in [`GatePolicy`].

mod duplicates;
pub mod gate;
pub mod metrics;
pub mod policy;
pub mod types;

pub use gate::QualityGate;
pub use metrics::{LengthAdequacy, Metric, MetricInput, SectionCoverage, WordDiversity};
pub use policy::{GatePolicy, ReadinessTier};
pub use types::{GateError, PhaseScore, QualityReport, SessionView, Suggestion};
