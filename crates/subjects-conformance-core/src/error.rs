// crates/subjects-conformance-core/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Error taxonomy for conformance scenarios.
// Purpose: Keep "API broke", "security degraded" and "network down" distinct.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every scenario returns `Result<(), HarnessError>`. The variant decides how
//! the scenario is reported: [`HarnessError::class`] maps auth, schema and
//! assertion failures to a failed scenario, transport and fixture problems to
//! an errored scenario, and capability gaps to a skip.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::probe::ProtocolVersion;
use crate::subject::SchemaReport;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Scenario-level error.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Token endpoint malfunction or unexpected token type.
    #[error("auth error: {0}")]
    Auth(String),
    /// Collection shape or record validation failed (aggregated).
    #[error("schema error: {0}")]
    Schema(SchemaReport),
    /// Network-level failure distinct from protocol negotiation.
    #[error("transport error: {0}")]
    Transport(String),
    /// The local TLS connector cannot attempt the requested protocol.
    #[error("capability unavailable: {0} cannot be attempted by the local tls connector")]
    CapabilityUnavailable(ProtocolVersion),
    /// Generic expectation mismatch (status code, latency, acceptance).
    #[error("assertion failed: {0}")]
    Assertion(String),
    /// Optional scenario input is not configured.
    #[error("not configured: {0}")]
    NotConfigured(&'static str),
    /// Local fixture (golden snapshot) could not be read.
    #[error("fixture error: {0}")]
    Fixture(String),
}

/// Reporting class of a [`HarnessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Deliberate expectation failure.
    Failure,
    /// The scenario could not run to a verdict.
    Error,
    /// The scenario does not apply to this environment.
    Skip,
}

impl HarnessError {
    /// Returns how this error is reported.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Auth(_) | Self::Schema(_) | Self::Assertion(_) => ErrorClass::Failure,
            Self::Transport(_) | Self::Fixture(_) => ErrorClass::Error,
            Self::CapabilityUnavailable(_) | Self::NotConfigured(_) => ErrorClass::Skip,
        }
    }
}
