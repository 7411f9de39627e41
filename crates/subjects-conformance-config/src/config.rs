// crates/subjects-conformance-config/src/config.rs
// ============================================================================
// Module: Subjects Conformance Configuration
// Description: Configuration loading and validation for the harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, serde_json, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a JSON (or TOML) file with strict size and path
//! limits. The loaded [`HarnessConfig`] is immutable for the duration of a
//! suite execution and is handed to the verification engine as-is.
//! Security posture: config inputs are untrusted and carry credentials; the
//! client secret is redacted from debug output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "subjects-conformance.json";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SUBJECTS_CONFORMANCE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of known subject codes.
pub(crate) const MAX_KNOWN_SUBJECTS: usize = 4096;
/// Maximum length of a single known subject code.
pub(crate) const MAX_SUBJECT_CODE_LENGTH: usize = 64;
/// Token type literal returned by the observed server.
///
/// The server reports `BearerToken` rather than the RFC 6750 `Bearer` scheme.
/// The harness asserts the literal the server is known to emit.
pub const DEFAULT_EXPECTED_TOKEN_TYPE: &str = "BearerToken";
/// Scheme word used in the `Authorization` header.
pub const DEFAULT_AUTHORIZATION_SCHEME: &str = "Bearer";
/// Default latency bound for an authorized fetch in milliseconds.
pub const DEFAULT_LATENCY_BOUND_MS: u64 = 5_000;
/// Maximum configurable latency bound in milliseconds.
pub(crate) const MAX_LATENCY_BOUND_MS: u64 = 600_000;
/// Default TLS probe socket timeout in milliseconds.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;
/// Minimum TLS probe timeout in milliseconds.
pub(crate) const MIN_PROBE_TIMEOUT_MS: u64 = 100;
/// Maximum TLS probe timeout in milliseconds.
pub(crate) const MAX_PROBE_TIMEOUT_MS: u64 = 120_000;
/// Minimum request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;
/// Default maximum response body size in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
/// Minimum configurable response body limit in bytes.
pub(crate) const MIN_MAX_RESPONSE_BYTES: usize = 1024;
/// Maximum configurable response body limit in bytes.
pub(crate) const MAX_MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// Reference subject codes expected in any complete collection.
///
/// Taken as observed from the live catalog. Entries may carry data-entry
/// errors the API owner has not confirmed; they are compared verbatim and
/// never split or corrected. Override the list with `known_subjects`.
pub const DEFAULT_KNOWN_SUBJECTS: &[&str] = &[
    "ACCT", "AMST", "ANTH", "ARTH", "ASTR", "BIOL", "CHEM", "CS", "ECON", "ENGL", "HIST", "MATH",
    "ME", "PHIL", "PHYS", "PSYC", "SOC",
];

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// On-disk format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON object (the canonical format).
    Json,
    /// TOML table with the same keys.
    Toml,
}

impl ConfigFormat {
    /// Selects the format from the file extension, defaulting to JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Harness configuration for one suite execution.
///
/// # Invariants
/// - `hostname` is an absolute `http` or `https` URL.
/// - `hostname + version + api` and `hostname + version + token_endpoint`
///   form valid URLs.
/// - Credentials and literals are non-empty.
/// - Numeric limits are within the documented bounds.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Base URL of the API host, for example `https://api.example.edu/`.
    pub hostname: String,
    /// API version path segment, for example `v1`.
    pub version: String,
    /// Resource path of the subject collection.
    #[serde(rename = "api")]
    pub api_path: String,
    /// Path of the OAuth token endpoint.
    pub token_endpoint: String,
    /// Client identifier for the client-credentials grant.
    pub client_id: String,
    /// Client secret for the client-credentials grant.
    pub client_secret: String,
    /// Token type literal the token endpoint must return.
    #[serde(default = "default_expected_token_type")]
    pub expected_token_type: String,
    /// Scheme word prefixed to the access token in `Authorization`.
    #[serde(default = "default_authorization_scheme")]
    pub authorization_scheme: String,
    /// Subject codes that must be present in the collection.
    #[serde(default = "default_known_subjects")]
    pub known_subjects: Vec<String>,
    /// Strict upper bound for an authorized fetch, in milliseconds.
    #[serde(default = "default_latency_bound_ms")]
    pub latency_bound_ms: u64,
    /// Optional whole-request timeout; absent uses the transport default.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Socket timeout for TLS probes, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Verify server certificates during TLS probes.
    #[serde(default)]
    pub verify_probe_certificates: bool,
    /// Hard upper bound on response body size.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Optional golden snapshot of the subject collection.
    #[serde(default)]
    pub golden_path: Option<PathBuf>,
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("hostname", &self.hostname)
            .field("version", &self.version)
            .field("api_path", &self.api_path)
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("expected_token_type", &self.expected_token_type)
            .field("authorization_scheme", &self.authorization_scheme)
            .field("known_subjects", &self.known_subjects)
            .field("latency_bound_ms", &self.latency_bound_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("probe_timeout_ms", &self.probe_timeout_ms)
            .field("verify_probe_certificates", &self.verify_probe_certificates)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("golden_path", &self.golden_path)
            .finish()
    }
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then [`CONFIG_ENV_VAR`], then
    /// `subjects-conformance.json` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| {
            ConfigError::Io(format!("{}: {err}", resolved.display()))
        })?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::parse(content, ConfigFormat::from_path(&resolved))?;
        if let Some(golden) = &config.golden_path
            && golden.is_relative()
            && let Some(parent) = resolved.parent()
        {
            config.golden_path = Some(parent.join(golden));
        }
        Ok(config)
    }

    /// Parses and validates configuration text in the given format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_hostname(&self.hostname)?;
        require_non_empty("api", &self.api_path)?;
        require_non_empty("token_endpoint", &self.token_endpoint)?;
        require_non_empty("client_id", &self.client_id)?;
        require_non_empty("client_secret", &self.client_secret)?;
        require_non_empty("expected_token_type", &self.expected_token_type)?;
        require_non_empty("authorization_scheme", &self.authorization_scheme)?;
        if self.authorization_scheme.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "authorization_scheme must not contain whitespace".to_string(),
            ));
        }
        Url::parse(&self.resource_url())
            .map_err(|err| ConfigError::Invalid(format!("resource url is invalid: {err}")))?;
        Url::parse(&self.token_url())
            .map_err(|err| ConfigError::Invalid(format!("token url is invalid: {err}")))?;
        validate_known_subjects(&self.known_subjects)?;
        if self.latency_bound_ms == 0 || self.latency_bound_ms > MAX_LATENCY_BOUND_MS {
            return Err(ConfigError::Invalid(format!(
                "latency_bound_ms must be between 1 and {MAX_LATENCY_BOUND_MS}"
            )));
        }
        if let Some(timeout) = self.request_timeout_ms
            && !(MIN_REQUEST_TIMEOUT_MS ..= MAX_REQUEST_TIMEOUT_MS).contains(&timeout)
        {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if !(MIN_PROBE_TIMEOUT_MS ..= MAX_PROBE_TIMEOUT_MS).contains(&self.probe_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "probe_timeout_ms must be between {MIN_PROBE_TIMEOUT_MS} and \
                 {MAX_PROBE_TIMEOUT_MS}"
            )));
        }
        if !(MIN_MAX_RESPONSE_BYTES ..= MAX_MAX_RESPONSE_BYTES).contains(&self.max_response_bytes)
        {
            return Err(ConfigError::Invalid(format!(
                "max_response_bytes must be between {MIN_MAX_RESPONSE_BYTES} and \
                 {MAX_MAX_RESPONSE_BYTES}"
            )));
        }
        if let Some(golden) = &self.golden_path {
            validate_path(golden)?;
        }
        Ok(())
    }

    /// Returns the subject collection URL (`hostname + version + api`).
    #[must_use]
    pub fn resource_url(&self) -> String {
        format!("{}{}{}", self.hostname, self.version, self.api_path)
    }

    /// Returns the token endpoint URL (`hostname + version + token_endpoint`).
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{}{}", self.hostname, self.version, self.token_endpoint)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// JSON or TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Serde default for `expected_token_type`.
fn default_expected_token_type() -> String {
    DEFAULT_EXPECTED_TOKEN_TYPE.to_string()
}

/// Serde default for `authorization_scheme`.
fn default_authorization_scheme() -> String {
    DEFAULT_AUTHORIZATION_SCHEME.to_string()
}

/// Serde default for `known_subjects`.
fn default_known_subjects() -> Vec<String> {
    DEFAULT_KNOWN_SUBJECTS.iter().map(|code| (*code).to_string()).collect()
}

/// Serde default for `latency_bound_ms`.
const fn default_latency_bound_ms() -> u64 {
    DEFAULT_LATENCY_BOUND_MS
}

/// Serde default for `probe_timeout_ms`.
const fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

/// Serde default for `max_response_bytes`.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid("config path must be non-empty".to_string()));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Rejects empty or whitespace-only values.
fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Validates the API host URL.
fn validate_hostname(hostname: &str) -> Result<(), ConfigError> {
    require_non_empty("hostname", hostname)?;
    let url = Url::parse(hostname)
        .map_err(|err| ConfigError::Invalid(format!("hostname is not a valid url: {err}")))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::Invalid(format!("unsupported hostname scheme: {other}")));
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid("hostname must include a host".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::Invalid("hostname must not embed credentials".to_string()));
    }
    Ok(())
}

/// Validates the known subject code list.
///
/// Entries are compared verbatim against returned ids; nothing is rewritten.
fn validate_known_subjects(codes: &[String]) -> Result<(), ConfigError> {
    if codes.len() > MAX_KNOWN_SUBJECTS {
        return Err(ConfigError::Invalid(format!(
            "known_subjects exceeds {MAX_KNOWN_SUBJECTS} entries"
        )));
    }
    for (index, code) in codes.iter().enumerate() {
        if code.is_empty() {
            return Err(ConfigError::Invalid(format!("known_subjects[{index}] must be non-empty")));
        }
        if code.len() > MAX_SUBJECT_CODE_LENGTH {
            return Err(ConfigError::Invalid(format!("known_subjects[{index}] is too long")));
        }
        if codes[.. index].contains(code) {
            return Err(ConfigError::Invalid(format!("known_subjects contains duplicate {code}")));
        }
    }
    Ok(())
}
