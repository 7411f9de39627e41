// crates/subjects-conformance-core/src/lib.rs
// ============================================================================
// Module: Subjects Conformance Core
// Description: Verification engine for the course subjects API harness.
// Purpose: Token memoization, TLS downgrade probing, subject validation and
//          scenario orchestration.
// Dependencies: reqwest, rustls, serde_json, subjects-conformance-config
// ============================================================================

//! ## Overview
//! This crate is the harness's verification engine. It consumes a loaded
//! [`subjects_conformance_config::HarnessConfig`] and exposes pass/fail
//! predicates over the live API:
//! - [`TokenManager`] acquires one bearer credential per suite execution,
//! - [`TlsProbe`] forces a protocol version and reports accept/reject,
//! - [`validate`] and [`check_collection`] check subject resources,
//! - [`SuiteContext`] runs [`ScenarioId`] checks and builds a [`SuiteReport`].
//!
//! Invariants:
//! - Network calls are sequential and blocking; nothing is retried.
//! - Transport failures are reported as errors, never as passes or refusals.
//! - Secrets are redacted from debug output and never logged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod events;
pub mod http;
pub mod probe;
pub mod report;
pub mod scenario;
pub mod subject;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ErrorClass;
pub use error::HarnessError;
pub use events::EventSink;
pub use events::FileEventSink;
pub use events::HarnessEvent;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use http::ApiClient;
pub use http::HttpClientConfig;
pub use http::HttpError;
pub use http::HttpReply;
pub use probe::ProbeConfig;
pub use probe::ProbeError;
pub use probe::ProbeOutcome;
pub use probe::ProbeTarget;
pub use probe::ProtocolVersion;
pub use probe::SystemTlsConnector;
pub use probe::TlsConnector;
pub use probe::TlsProbe;
pub use report::StatusCounts;
pub use report::SuiteReport;
pub use scenario::ScenarioId;
pub use scenario::ScenarioResult;
pub use scenario::ScenarioStatus;
pub use scenario::SuiteContext;
pub use scenario::UnknownScenario;
pub use scenario::first_difference;
pub use subject::RecordViolation;
pub use subject::SchemaReport;
pub use subject::SubjectViolation;
pub use subject::check_collection;
pub use subject::validate;
pub use token::Credential;
pub use token::TokenManager;

#[cfg(test)]
mod tests;
