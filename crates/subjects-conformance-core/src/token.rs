// crates/subjects-conformance-core/src/token.rs
// ============================================================================
// Module: Token Manager
// Description: Client-credentials token acquisition and memoization.
// Purpose: Fetch one bearer credential per suite execution and reuse it.
// Dependencies: serde_json, subjects-conformance-config
// ============================================================================

//! ## Overview
//! [`TokenManager`] performs the client-credentials grant the first time a
//! scenario needs authorization and caches the resulting [`Credential`] for
//! the rest of the suite execution. The credential is never refreshed. A
//! failed acquisition is not cached, so the next scenario that needs
//! authorization issues its own single request.
//!
//! The token type the endpoint must return is configuration data
//! (`expected_token_type`, default `BearerToken`), compared verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use subjects_conformance_config::HarnessConfig;

use crate::error::HarnessError;
use crate::events::EventSink;
use crate::events::HarnessEvent;
use crate::http::ApiClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// OAuth grant type used for the token request.
pub const GRANT_TYPE: &str = "client_credentials";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Bearer credential returned by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque access token.
    pub access_token: String,
    /// Token type literal reported by the server.
    pub token_type: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Token request parameters derived from configuration.
#[derive(Clone, PartialEq, Eq)]
struct TokenRequest {
    /// Token endpoint URL.
    token_url: String,
    /// Client identifier.
    client_id: String,
    /// Client secret.
    client_secret: String,
    /// Token type literal the endpoint must return.
    expected_token_type: String,
    /// Scheme word for the `Authorization` header.
    authorization_scheme: String,
}

/// Memoizing token manager for one suite execution.
///
/// # Invariants
/// - At most one successful token request is made per manager.
/// - Once cached, the credential is reused for every authorized call.
pub struct TokenManager {
    /// Request parameters.
    request: TokenRequest,
    /// Cached credential, once acquired.
    credential: Option<Credential>,
    /// Number of token endpoint requests issued.
    requests_issued: usize,
}

impl TokenManager {
    /// Creates a manager for the configured token endpoint.
    #[must_use]
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            request: TokenRequest {
                token_url: config.token_url(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                expected_token_type: config.expected_token_type.clone(),
                authorization_scheme: config.authorization_scheme.clone(),
            },
            credential: None,
            requests_issued: 0,
        }
    }

    /// Returns the cached credential, if any.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Returns the number of token endpoint requests issued so far.
    #[must_use]
    pub const fn requests_issued(&self) -> usize {
        self.requests_issued
    }

    /// Returns the `Authorization` header value, acquiring a token on first use.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Auth`] when the token endpoint misbehaves and
    /// [`HarnessError::Transport`] when it cannot be reached.
    pub fn authorization_header(
        &mut self,
        client: &ApiClient,
        events: &dyn EventSink,
    ) -> Result<String, HarnessError> {
        if let Some(credential) = &self.credential {
            return Ok(self.header_for(credential));
        }
        self.requests_issued += 1;
        let credential = self.request_credential(client, events)?;
        let header = self.header_for(&credential);
        self.credential = Some(credential);
        Ok(header)
    }

    /// Formats the header value for a credential.
    fn header_for(&self, credential: &Credential) -> String {
        format!("{} {}", self.request.authorization_scheme, credential.access_token)
    }

    /// Performs the client-credentials grant.
    fn request_credential(
        &self,
        client: &ApiClient,
        events: &dyn EventSink,
    ) -> Result<Credential, HarnessError> {
        let fields = [
            ("client_id", self.request.client_id.as_str()),
            ("client_secret", self.request.client_secret.as_str()),
            ("grant_type", GRANT_TYPE),
        ];
        let reply = match client.post_form(&self.request.token_url, &fields) {
            Ok(reply) => reply,
            Err(err) => {
                events.record(
                    &HarnessEvent::new("token_request")
                        .url(self.request.token_url.clone())
                        .outcome("transport_error")
                        .detail(err.to_string()),
                );
                return Err(err.into());
            }
        };
        let event = HarnessEvent::new("token_request")
            .url(self.request.token_url.clone())
            .status(reply.status)
            .elapsed(reply.elapsed);
        if reply.status != 200 {
            events.record(&event.outcome("rejected"));
            return Err(HarnessError::Auth(format!(
                "token endpoint returned status {}, expected 200",
                reply.status
            )));
        }
        if !reply.is_json() {
            events.record(&event.outcome("rejected"));
            return Err(HarnessError::Auth(format!(
                "token endpoint returned content type {}, expected application/json",
                reply.content_type_label()
            )));
        }
        let body = reply.json().map_err(|err| {
            HarnessError::Auth(format!("token endpoint returned invalid json: {err}"))
        })?;
        match parse_credential(&body, &self.request.expected_token_type) {
            Ok(credential) => {
                events.record(&event.outcome("issued").detail(credential.token_type.clone()));
                Ok(credential)
            }
            Err(err) => {
                events.record(&event.outcome("rejected"));
                Err(err)
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts and checks the credential fields of a token response.
fn parse_credential(body: &Value, expected_token_type: &str) -> Result<Credential, HarnessError> {
    let Value::Object(map) = body else {
        return Err(HarnessError::Auth("token response must be a json object".to_string()));
    };
    let Some(Value::String(token_type)) = map.get("token_type") else {
        return Err(HarnessError::Auth("token response is missing string token_type".to_string()));
    };
    if token_type != expected_token_type {
        return Err(HarnessError::Auth(format!(
            "token endpoint returned token_type {token_type:?}, expected {expected_token_type:?}"
        )));
    }
    let Some(Value::String(access_token)) = map.get("access_token") else {
        return Err(HarnessError::Auth(
            "token response is missing string access_token".to_string(),
        ));
    };
    if access_token.is_empty() {
        return Err(HarnessError::Auth("token endpoint returned an empty access_token".to_string()));
    }
    Ok(Credential {
        access_token: access_token.clone(),
        token_type: token_type.clone(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
