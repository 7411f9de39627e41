// crates/subjects-conformance-core/src/scenario.rs
// ============================================================================
// Module: Scenario Suite
// Description: Independent conformance checks against the live API.
// Purpose: Orchestrate token, fetch, validator and probe into verdicts.
// Dependencies: serde, serde_json, subjects-conformance-config
// ============================================================================

//! ## Overview
//! Each [`ScenarioId`] is one independent, order-independent check. State the
//! checks share (configuration, HTTP client, memoized credential, probe and
//! event sink) lives in an explicit [`SuiteContext`] passed to every
//! scenario; there are no process-wide singletons.
//!
//! [`SuiteContext::check`] returns `Result<(), HarnessError>`;
//! [`SuiteContext::run`] turns that into a [`ScenarioResult`] whose status is
//! decided by [`HarnessError::class`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use subjects_conformance_config::HarnessConfig;
use thiserror::Error;

use crate::error::ErrorClass;
use crate::error::HarnessError;
use crate::events::EventSink;
use crate::events::HarnessEvent;
use crate::http::ApiClient;
use crate::http::HttpClientConfig;
use crate::http::HttpReply;
use crate::http::JSON_MEDIA_TYPE;
use crate::probe::ProbeConfig;
use crate::probe::ProbeOutcome;
use crate::probe::ProtocolVersion;
use crate::probe::SystemTlsConnector;
use crate::probe::TlsConnector;
use crate::probe::TlsProbe;
use crate::report::SuiteReport;
use crate::subject::SchemaReport;
use crate::subject::check_collection;
use crate::token::TokenManager;

// ============================================================================
// SECTION: Scenario Identifiers
// ============================================================================

/// Stable scenario identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Authorized fetch returns a valid, complete collection.
    AuthorizedFetch,
    /// Unauthenticated fetch is refused with 401.
    UnauthorizedFetch,
    /// Authorized fetch completes within the latency bound.
    LatencyBound,
    /// TLS 1.0 is accepted.
    TlsV1Accepted,
    /// SSLv2 is rejected.
    SslV2Rejected,
    /// SSLv3 is rejected.
    SslV3Rejected,
    /// Authorized fetch matches the golden snapshot.
    GoldenSnapshot,
}

impl ScenarioId {
    /// Every scenario, in execution order.
    pub const ALL: [Self; 7] = [
        Self::AuthorizedFetch,
        Self::UnauthorizedFetch,
        Self::LatencyBound,
        Self::TlsV1Accepted,
        Self::SslV2Rejected,
        Self::SslV3Rejected,
        Self::GoldenSnapshot,
    ];

    /// Returns the stable scenario name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AuthorizedFetch => "authorized_fetch",
            Self::UnauthorizedFetch => "unauthorized_fetch",
            Self::LatencyBound => "latency_bound",
            Self::TlsV1Accepted => "tls_v1_accepted",
            Self::SslV2Rejected => "ssl_v2_rejected",
            Self::SslV3Rejected => "ssl_v3_rejected",
            Self::GoldenSnapshot => "golden_snapshot",
        }
    }

    /// Returns a one-line description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthorizedFetch => "an authorized request returns 200 and valid subjects",
            Self::UnauthorizedFetch => "an unauthenticated request returns a 401",
            Self::LatencyBound => "the API responds within the latency bound",
            Self::TlsV1Accepted => "a call using TLSv1 is successful",
            Self::SslV2Rejected => "a call using SSLv2 fails",
            Self::SslV3Rejected => "a call using SSLv3 fails",
            Self::GoldenSnapshot => "the collection matches the golden snapshot",
        }
    }

    /// Looks up a scenario by exact name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scenario| scenario.name() == name)
    }

    /// Selects scenarios by exact name or substring; no filters selects all.
    ///
    /// The result is deduplicated and kept in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownScenario`] for a filter that matches nothing.
    pub fn select(filters: &[String]) -> Result<Vec<Self>, UnknownScenario> {
        if filters.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        let mut selected = BTreeSet::new();
        for filter in filters {
            if let Some(scenario) = Self::from_name(filter) {
                selected.insert(scenario);
                continue;
            }
            let matches: Vec<Self> = Self::ALL
                .into_iter()
                .filter(|scenario| scenario.name().contains(filter.as_str()))
                .collect();
            if matches.is_empty() {
                return Err(UnknownScenario(filter.clone()));
            }
            selected.extend(matches);
        }
        Ok(selected.into_iter().collect())
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scenario filter that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no scenario matches {0:?}")]
pub struct UnknownScenario(pub String);

// ============================================================================
// SECTION: Results
// ============================================================================

/// Final status of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Every expectation held.
    Passed,
    /// An expectation was violated.
    Failed,
    /// The scenario could not reach a verdict.
    Errored,
    /// The scenario does not apply here.
    Skipped,
}

impl ScenarioStatus {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
        }
    }
}

impl From<ErrorClass> for ScenarioStatus {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Failure => Self::Failed,
            ErrorClass::Error => Self::Errored,
            ErrorClass::Skip => Self::Skipped,
        }
    }
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioResult {
    /// Scenario that ran.
    pub scenario: ScenarioId,
    /// Final status.
    pub status: ScenarioStatus,
    /// Failure, error or skip message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured schema findings for schema failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaReport>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
}

// ============================================================================
// SECTION: Suite Context
// ============================================================================

/// Explicit state shared by scenarios for one suite execution.
pub struct SuiteContext<'a, C = SystemTlsConnector> {
    /// Loaded configuration.
    config: &'a HarnessConfig,
    /// HTTP client for the API under test.
    client: ApiClient,
    /// Memoized credential holder.
    tokens: TokenManager,
    /// TLS downgrade probe.
    probe: TlsProbe<C>,
    /// Event sink for harness logs.
    events: &'a dyn EventSink,
}

impl<'a> SuiteContext<'a, SystemTlsConnector> {
    /// Creates a context using the system TLS connector.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &'a HarnessConfig, events: &'a dyn EventSink) -> Result<Self, HarnessError> {
        Self::with_connector(config, events, SystemTlsConnector)
    }
}

impl<'a, C: TlsConnector> SuiteContext<'a, C> {
    /// Creates a context with a custom TLS connector.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when the HTTP client cannot be built.
    pub fn with_connector(
        config: &'a HarnessConfig,
        events: &'a dyn EventSink,
        connector: C,
    ) -> Result<Self, HarnessError> {
        let client = ApiClient::new(HttpClientConfig::from_harness(config))?;
        Ok(Self {
            config,
            client,
            tokens: TokenManager::new(config),
            probe: TlsProbe::with_connector(connector, ProbeConfig::from_harness(config)),
            events,
        })
    }

    /// Returns the token manager.
    #[must_use]
    pub const fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Runs every scenario in `scenarios` and summarizes the results.
    pub fn run_all(&mut self, scenarios: &[ScenarioId]) -> SuiteReport {
        self.events.record(
            &HarnessEvent::new("suite_started")
                .url(self.config.resource_url())
                .detail(format!("{} scenario(s)", scenarios.len())),
        );
        let results = scenarios.iter().map(|scenario| self.run(*scenario)).collect();
        let report = SuiteReport::from_results(results);
        self.events.record(
            &HarnessEvent::new("suite_finished")
                .outcome(if report.success() { "passed" } else { "failed" })
                .detail(report.summary_line()),
        );
        report
    }

    /// Runs one scenario and classifies its result.
    pub fn run(&mut self, scenario: ScenarioId) -> ScenarioResult {
        let started = Instant::now();
        let outcome = self.check(scenario);
        let elapsed = started.elapsed();
        let (status, message, schema) = match outcome {
            Ok(()) => (ScenarioStatus::Passed, None, None),
            Err(err) => {
                let status = ScenarioStatus::from(err.class());
                let message = err.to_string();
                let schema = match err {
                    HarnessError::Schema(report) => Some(report),
                    _ => None,
                };
                (status, Some(message), schema)
            }
        };
        let mut event = HarnessEvent::new("scenario_finished")
            .scenario(scenario.name())
            .outcome(status.label())
            .elapsed(elapsed);
        if let Some(message) = &message {
            event = event.detail(message.clone());
        }
        self.events.record(&event);
        ScenarioResult {
            scenario,
            status,
            message,
            schema,
            duration_ms: elapsed.as_millis(),
        }
    }

    /// Runs one scenario and returns its raw verdict.
    ///
    /// # Errors
    ///
    /// Returns the [`HarnessError`] describing why the scenario did not pass.
    pub fn check(&mut self, scenario: ScenarioId) -> Result<(), HarnessError> {
        match scenario {
            ScenarioId::AuthorizedFetch => self.authorized_fetch(),
            ScenarioId::UnauthorizedFetch => self.unauthorized_fetch(),
            ScenarioId::LatencyBound => self.latency_bound(),
            ScenarioId::TlsV1Accepted => self.expect_probe(scenario, ProtocolVersion::Tls1_0, true),
            ScenarioId::SslV2Rejected => self.expect_probe(scenario, ProtocolVersion::Ssl2, false),
            ScenarioId::SslV3Rejected => self.expect_probe(scenario, ProtocolVersion::Ssl3, false),
            ScenarioId::GoldenSnapshot => self.golden_snapshot(),
        }
    }

    // ------------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------------

    /// Authorized GET: 200, JSON, exact key set, valid records, known coverage.
    fn authorized_fetch(&mut self) -> Result<(), HarnessError> {
        let reply = self.fetch(ScenarioId::AuthorizedFetch, true)?;
        expect_json_ok(&reply)?;
        let body = reply.json().map_err(|err| {
            HarnessError::Schema(SchemaReport {
                top_level: Some(format!("response body is not valid json: {err}")),
                ..SchemaReport::default()
            })
        })?;
        let report = check_collection(&body, &self.config.known_subjects);
        if report.is_clean() { Ok(()) } else { Err(HarnessError::Schema(report)) }
    }

    /// Unauthenticated GET must be refused with 401.
    fn unauthorized_fetch(&mut self) -> Result<(), HarnessError> {
        let reply = self.fetch(ScenarioId::UnauthorizedFetch, false)?;
        if reply.status != 401 {
            return Err(HarnessError::Assertion(format!(
                "expected status 401 without credentials, got {}",
                reply.status
            )));
        }
        Ok(())
    }

    /// Authorized GET must finish strictly inside the latency bound.
    fn latency_bound(&mut self) -> Result<(), HarnessError> {
        let reply = self.fetch(ScenarioId::LatencyBound, true)?;
        let elapsed_ms = reply.elapsed.as_millis();
        let bound_ms = u128::from(self.config.latency_bound_ms);
        if elapsed_ms >= bound_ms {
            return Err(HarnessError::Assertion(format!(
                "authorized fetch took {elapsed_ms} ms, bound is {bound_ms} ms"
            )));
        }
        Ok(())
    }

    /// Authorized GET body must equal the golden snapshot.
    fn golden_snapshot(&mut self) -> Result<(), HarnessError> {
        let Some(path) = self.config.golden_path.clone() else {
            return Err(HarnessError::NotConfigured("golden_path is not set"));
        };
        let golden = read_golden(&path)?;
        let reply = self.fetch(ScenarioId::GoldenSnapshot, true)?;
        expect_json_ok(&reply)?;
        let body = reply.json().map_err(|err| {
            HarnessError::Assertion(format!("response body is not valid json: {err}"))
        })?;
        match first_difference(&golden, &body) {
            None => Ok(()),
            Some(location) => Err(HarnessError::Assertion(format!(
                "response differs from golden snapshot {} at {location}",
                path.display()
            ))),
        }
    }

    /// Probes the resource URL and compares acceptance with `expect_accept`.
    fn expect_probe(
        &self,
        scenario: ScenarioId,
        version: ProtocolVersion,
        expect_accept: bool,
    ) -> Result<(), HarnessError> {
        let url = self.config.resource_url();
        let outcome = self.probe.probe_outcome(version, &url);
        let label = match &outcome {
            Ok(ProbeOutcome::Accepted) => "accepted",
            Ok(ProbeOutcome::Rejected { .. }) => "rejected",
            Err(_) => "error",
        };
        self.events.record(
            &HarnessEvent::new("tls_probe")
                .scenario(scenario.name())
                .url(url)
                .outcome(label)
                .detail(version.label()),
        );
        match (expect_accept, outcome?) {
            (true, ProbeOutcome::Accepted) | (false, ProbeOutcome::Rejected { .. }) => Ok(()),
            (true, ProbeOutcome::Rejected { reason }) => Err(HarnessError::Assertion(format!(
                "expected {version} to be accepted, but it was rejected: {reason}"
            ))),
            (false, ProbeOutcome::Accepted) => Err(HarnessError::Assertion(format!(
                "expected {version} to be rejected, but the server accepted it"
            ))),
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Fetches the collection, with or without authorization, and logs it.
    fn fetch(&mut self, scenario: ScenarioId, authorized: bool) -> Result<HttpReply, HarnessError> {
        let header = if authorized {
            Some(self.tokens.authorization_header(&self.client, self.events)?)
        } else {
            None
        };
        let url = self.config.resource_url();
        let event = HarnessEvent::new("http_request").scenario(scenario.name()).url(url.clone());
        match self.client.get(&url, header.as_deref()) {
            Ok(reply) => {
                self.events.record(&event.status(reply.status).elapsed(reply.elapsed));
                Ok(reply)
            }
            Err(err) => {
                self.events.record(&event.outcome("transport_error").detail(err.to_string()));
                Err(err.into())
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Requires a 200 reply with a JSON content type.
fn expect_json_ok(reply: &HttpReply) -> Result<(), HarnessError> {
    if reply.status != 200 {
        return Err(HarnessError::Assertion(format!(
            "expected status 200, got {}",
            reply.status
        )));
    }
    if !reply.is_json() {
        return Err(HarnessError::Assertion(format!(
            "expected content type {JSON_MEDIA_TYPE}, got {}",
            reply.content_type_label()
        )));
    }
    Ok(())
}

/// Reads and parses the golden snapshot file.
fn read_golden(path: &Path) -> Result<Value, HarnessError> {
    let bytes = fs::read(path)
        .map_err(|err| HarnessError::Fixture(format!("{}: {err}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| HarnessError::Fixture(format!("{}: {err}", path.display())))
}

/// Returns the path of the first difference between two JSON values.
///
/// Paths use `$` for the root, `.key` for members and `[n]` for elements.
#[must_use]
pub fn first_difference(expected: &Value, actual: &Value) -> Option<String> {
    difference_at(expected, actual, "$")
}

/// Recursive worker for [`first_difference`].
fn difference_at(expected: &Value, actual: &Value, path: &str) -> Option<String> {
    match (expected, actual) {
        (Value::Object(left), Value::Object(right)) => {
            let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
            keys.into_iter().find_map(|key| {
                let child = format!("{path}.{key}");
                match (left.get(key), right.get(key)) {
                    (Some(left), Some(right)) => difference_at(left, right, &child),
                    _ => Some(child),
                }
            })
        }
        (Value::Array(left), Value::Array(right)) => left
            .iter()
            .zip(right)
            .enumerate()
            .find_map(|(index, (left, right))| {
                difference_at(left, right, &format!("{path}[{index}]"))
            })
            .or_else(|| {
                (left.len() != right.len())
                    .then(|| format!("{path}[{}]", left.len().min(right.len())))
            }),
        _ => (expected != actual).then(|| path.to_string()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
