//! Foundation utilities shared by every mysterykit crate.

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod types;
