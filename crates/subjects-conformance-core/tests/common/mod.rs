// crates/subjects-conformance-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Stub subjects API, collection builders and recording sinks.
// Purpose: Provide reusable local infrastructure for engine integration tests.
// Dependencies: subjects-conformance-core, tiny_http, serde_json
// ============================================================================

//! ## Overview
//! [`StubApi`] is a `tiny_http` server that plays both the token endpoint and
//! the subject collection endpoint, counting hits so memoization can be
//! asserted. Responses are built with `Response::from_data` so the content
//! type is exactly what the test sets (or absent).

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared test helpers may be unused in some cases."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use subjects_conformance_config::ConfigFormat;
use subjects_conformance_config::DEFAULT_KNOWN_SUBJECTS;
use subjects_conformance_config::HarnessConfig;
use subjects_conformance_core::EventSink;
use subjects_conformance_core::HarnessEvent;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Access token issued by the stub.
pub const STUB_TOKEN: &str = "tok-123";
/// Client secret used by test configurations.
pub const STUB_SECRET: &str = "s3cret-value";
/// Resource path of the stub collection.
pub const RESOURCE_PATH: &str = "/v1/course/subjects";
/// Token endpoint path of the stub.
pub const TOKEN_PATH: &str = "/v1/oauth/token";

// ============================================================================
// SECTION: Collection Builders
// ============================================================================

/// Builds one valid subject record.
pub fn subject(code: &str) -> Value {
    json!({
        "id": code,
        "type": "subjects",
        "attributes": {"abbreviation": code, "title": format!("{code} title")}
    })
}

/// Builds a collection of valid records for `codes` plus `extra` records.
pub fn collection(codes: &[&str], extra: Vec<Value>) -> Value {
    let mut data: Vec<Value> = codes.iter().map(|code| subject(code)).collect();
    data.extend(extra);
    json!({"data": data, "links": {"self": "/v1/course/subjects"}})
}

/// Builds a complete collection covering every default known subject.
pub fn complete_collection() -> Value {
    collection(DEFAULT_KNOWN_SUBJECTS, Vec::new())
}

// ============================================================================
// SECTION: Stub API
// ============================================================================

/// Behavior of the stub endpoints.
#[derive(Clone)]
pub struct StubBehavior {
    /// Token endpoint status.
    pub token_status: u16,
    /// Token endpoint content type (`None` omits the header).
    pub token_content_type: Option<&'static str>,
    /// Token endpoint body.
    pub token_body: String,
    /// Collection body for authorized requests.
    pub resource_body: String,
    /// Collection content type (`None` omits the header).
    pub resource_content_type: Option<&'static str>,
    /// Status returned for requests without a valid `Authorization`.
    pub unauthorized_status: u16,
    /// Delay before answering authorized collection requests.
    pub resource_delay: Duration,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            token_status: 200,
            token_content_type: Some("application/json"),
            token_body: json!({
                "token_type": "BearerToken",
                "access_token": STUB_TOKEN,
                "expires_in": 3600
            })
            .to_string(),
            resource_body: complete_collection().to_string(),
            resource_content_type: Some("application/json"),
            unauthorized_status: 401,
            resource_delay: Duration::ZERO,
        }
    }
}

/// Local stub of the subjects API.
pub struct StubApi {
    /// Bound address.
    addr: SocketAddr,
    /// Shared server handle for shutdown.
    server: Arc<Server>,
    /// Worker thread.
    handle: Option<thread::JoinHandle<()>>,
    /// Token endpoint hit count.
    token_hits: Arc<AtomicUsize>,
    /// Collection endpoint hit count.
    resource_hits: Arc<AtomicUsize>,
    /// Last token request body.
    token_form: Arc<Mutex<Option<String>>>,
    /// Authorization headers seen on collection requests.
    authorizations: Arc<Mutex<Vec<Option<String>>>>,
}

impl StubApi {
    /// Starts a stub with default (conforming) behavior.
    pub fn start() -> Self {
        Self::with_behavior(StubBehavior::default())
    }

    /// Starts a stub with custom behavior.
    pub fn with_behavior(behavior: StubBehavior) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let token_hits = Arc::new(AtomicUsize::new(0));
        let resource_hits = Arc::new(AtomicUsize::new(0));
        let token_form = Arc::new(Mutex::new(None));
        let authorizations = Arc::new(Mutex::new(Vec::new()));
        let handle = {
            let server = Arc::clone(&server);
            let token_hits = Arc::clone(&token_hits);
            let resource_hits = Arc::clone(&resource_hits);
            let token_form = Arc::clone(&token_form);
            let authorizations = Arc::clone(&authorizations);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let url = request.url().to_string();
                    let response = if url == TOKEN_PATH {
                        token_hits.fetch_add(1, Ordering::SeqCst);
                        let mut body = String::new();
                        let _ = request.as_reader().read_to_string(&mut body);
                        *token_form.lock().unwrap() = Some(body);
                        reply(
                            behavior.token_status,
                            behavior.token_content_type,
                            &behavior.token_body,
                        )
                    } else if url == RESOURCE_PATH {
                        resource_hits.fetch_add(1, Ordering::SeqCst);
                        let authorization = request
                            .headers()
                            .iter()
                            .find(|header| header.field.equiv("Authorization"))
                            .map(|header| header.value.as_str().to_string());
                        let authorized =
                            authorization.as_deref() == Some(&format!("Bearer {STUB_TOKEN}"));
                        authorizations.lock().unwrap().push(authorization);
                        if authorized {
                            thread::sleep(behavior.resource_delay);
                            reply(200, behavior.resource_content_type, &behavior.resource_body)
                        } else {
                            reply(
                                behavior.unauthorized_status,
                                Some("application/json"),
                                r#"{"error":"unauthorized"}"#,
                            )
                        }
                    } else {
                        reply(404, None, "")
                    };
                    let _ = request.respond(response);
                }
            })
        };
        Self {
            addr,
            server,
            handle: Some(handle),
            token_hits,
            resource_hits,
            token_form,
            authorizations,
        }
    }

    /// Returns the base URL (`http://127.0.0.1:port/`).
    pub fn hostname(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Returns the number of token endpoint requests served.
    pub fn token_hits(&self) -> usize {
        self.token_hits.load(Ordering::SeqCst)
    }

    /// Returns the number of collection requests served.
    pub fn resource_hits(&self) -> usize {
        self.resource_hits.load(Ordering::SeqCst)
    }

    /// Returns the last token request body.
    pub fn token_form(&self) -> Option<String> {
        self.token_form.lock().unwrap().clone()
    }

    /// Returns every `Authorization` header seen on collection requests.
    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.authorizations.lock().unwrap().clone()
    }

    /// Returns a validated configuration pointing at this stub.
    pub fn config(&self) -> HarnessConfig {
        config_for(&self.hostname(), &[])
    }

    /// Returns a configuration with extra JSON fields merged in.
    pub fn config_with(&self, extra: &[(&str, Value)]) -> HarnessConfig {
        config_for(&self.hostname(), extra)
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Builds a response with an exact (or absent) content type.
fn reply(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_data(body.as_bytes().to_vec()).with_status_code(status);
    if let Some(content_type) = content_type {
        response = response
            .with_header(Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()).unwrap());
    }
    response
}

// ============================================================================
// SECTION: Configuration Helpers
// ============================================================================

/// Builds a validated configuration for `hostname` with extra fields.
pub fn config_for(hostname: &str, extra: &[(&str, Value)]) -> HarnessConfig {
    let mut object = json!({
        "hostname": hostname,
        "version": "v1",
        "api": "/course/subjects",
        "token_endpoint": "/oauth/token",
        "client_id": "harness",
        "client_secret": STUB_SECRET,
        "request_timeout_ms": 5_000,
        "probe_timeout_ms": 2_000
    });
    for (key, value) in extra {
        object[*key] = value.clone();
    }
    HarnessConfig::parse(&object.to_string(), ConfigFormat::Json).unwrap()
}

/// Returns a hostname on a local port nothing listens on.
pub fn closed_hostname() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

// ============================================================================
// SECTION: Event Sinks
// ============================================================================

/// Sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    /// Recorded events.
    events: Mutex<Vec<HarnessEvent>>,
}

impl RecordingSink {
    /// Returns the recorded events.
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns every recorded event serialized as one JSON line each.
    pub fn json_lines(&self) -> String {
        self.events()
            .iter()
            .map(|event| serde_json::to_string(event).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &HarnessEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
