//! Exit code constants for the mysterykit CLI.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Session generated (possibly with degraded phases) |
//! | 1 | `INTERNAL` | Pipeline invariant violated |
//! | 2 | `INVALID_PARAMETERS` | Generation parameters or CLI arguments rejected |
//! | 78 | `CONFIGURATION` | Configuration or phase graph could not be loaded |
//!
//! Phase-level fallback never produces a non-zero exit code.

/// Process exit code.
///
/// The numeric values are part of the public CLI contract.
///
/// ```rust
/// use mysterykit_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(78), ExitCode::CONFIGURATION);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - a session was generated and scored
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal failure - an orchestrator invariant was violated
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// Invalid parameters - rejected before any phase started
    pub const INVALID_PARAMETERS: ExitCode = ExitCode(2);

    /// Configuration failure - the pipeline could not be constructed
    pub const CONFIGURATION: ExitCode = ExitCode(78);

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values_are_stable() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::INVALID_PARAMETERS.as_i32(), 2);
        assert_eq!(ExitCode::CONFIGURATION.as_i32(), 78);
        assert_eq!(i32::from(ExitCode::CONFIGURATION), 78);
    }
}
