// crates/subjects-conformance-core/src/probe/mod.rs
// ============================================================================
// Module: TLS Downgrade Probe
// Description: Forced-version TLS/SSL connection attempts against a URL.
// Purpose: Report whether a server accepts a specific protocol version.
// Dependencies: rustls, rustls-pki-types, url
// ============================================================================

//! ## Overview
//! A probe opens a bare TCP connection to the host of an `https` URL and
//! negotiates exactly one protocol version. The answer is a boolean:
//! `true` when the server completes negotiation at that version, `false` when
//! it refuses on protocol grounds (version or handshake-failure alerts, an
//! answer at a different version, or dropping the connection mid-handshake).
//! Everything else (resolution failures, refused connections, timeouts,
//! non-TLS peers, certificate problems) is an error, never `false`.
//!
//! The raw connect primitive sits behind [`TlsConnector`]. The
//! [`SystemTlsConnector`] runs full rustls handshakes for TLS 1.2 and 1.3, a
//! raw ClientHello exchange for SSLv3, TLS 1.0 and TLS 1.1, and an SSLv2
//! CLIENT-HELLO for SSLv2. Connectors that cannot attempt a version report
//! [`ProbeError::Unsupported`].
//!
//! Certificate verification is an explicit per-probe flag
//! ([`ProbeConfig::verify_certificates`]); nothing is suppressed globally.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod legacy;
mod modern;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io;
use std::net::IpAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::time::Duration;

use rustls_pki_types::ServerName;
use subjects_conformance_config::HarnessConfig;
use thiserror::Error;
use url::Url;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Protocol Versions
// ============================================================================

/// Transport-security protocol version a probe can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    /// SSL 2.0.
    Ssl2,
    /// SSL 3.0.
    Ssl3,
    /// TLS 1.0.
    Tls1_0,
    /// TLS 1.1.
    Tls1_1,
    /// TLS 1.2.
    Tls1_2,
    /// TLS 1.3.
    Tls1_3,
}

impl ProtocolVersion {
    /// Every version, oldest first.
    pub const ALL: [Self; 6] =
        [Self::Ssl2, Self::Ssl3, Self::Tls1_0, Self::Tls1_1, Self::Tls1_2, Self::Tls1_3];

    /// Returns the conventional label (`SSLv3`, `TLSv1`, `TLSv1.2`, ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ssl2 => "SSLv2",
            Self::Ssl3 => "SSLv3",
            Self::Tls1_0 => "TLSv1",
            Self::Tls1_1 => "TLSv1.1",
            Self::Tls1_2 => "TLSv1.2",
            Self::Tls1_3 => "TLSv1.3",
        }
    }

    /// Parses a label produced by [`ProtocolVersion::label`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|version| version.label() == label)
    }

    /// Returns the two-byte version field used on the wire.
    #[must_use]
    pub const fn wire(self) -> [u8; 2] {
        match self {
            Self::Ssl2 => [0x00, 0x02],
            Self::Ssl3 => [0x03, 0x00],
            Self::Tls1_0 => [0x03, 0x01],
            Self::Tls1_1 => [0x03, 0x02],
            Self::Tls1_2 => [0x03, 0x03],
            Self::Tls1_3 => [0x03, 0x04],
        }
    }

    /// Maps a wire version field back to a version.
    #[must_use]
    pub fn from_wire(bytes: [u8; 2]) -> Option<Self> {
        Self::ALL.into_iter().find(|version| version.wire() == bytes)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Probe transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Verify the server certificate chain and name during full handshakes.
    pub verify_certificates: bool,
    /// Connect, read and write timeout for probe sockets.
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            verify_certificates: false,
            timeout: Duration::from_millis(subjects_conformance_config::DEFAULT_PROBE_TIMEOUT_MS),
        }
    }
}

impl ProbeConfig {
    /// Derives probe settings from the harness configuration.
    #[must_use]
    pub const fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            verify_certificates: config.verify_probe_certificates,
            timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }
}

// ============================================================================
// SECTION: Targets and Outcomes
// ============================================================================

/// Host and port a probe connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// Host name or IP literal (IPv6 without brackets).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ProbeTarget {
    /// Extracts the probe target from an `https` URL.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidTarget`] for unparsable URLs, non-`https`
    /// schemes, or URLs without a host.
    pub fn from_url(url: &str) -> Result<Self, ProbeError> {
        let parsed = Url::parse(url)
            .map_err(|err| ProbeError::InvalidTarget(format!("{url}: {err}")))?;
        if parsed.scheme() != "https" {
            return Err(ProbeError::InvalidTarget(format!(
                "{url}: probes require an https url"
            )));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| ProbeError::InvalidTarget(format!("{url}: missing host")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
        let port = parsed.port_or_known_default().unwrap_or(443);
        Ok(Self {
            host,
            port,
        })
    }

    /// Returns true when the host is an IP literal rather than a DNS name.
    #[must_use]
    pub fn is_ip_literal(&self) -> bool {
        self.host.parse::<IpAddr>().is_ok()
    }

    /// Returns the rustls server name for the host.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidTarget`] when the host is not a valid name.
    pub fn server_name(&self) -> Result<ServerName<'static>, ProbeError> {
        ServerName::try_from(self.host.clone())
            .map_err(|err| ProbeError::InvalidTarget(format!("{}: {err}", self.host)))
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Result of a completed probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server negotiated the requested version.
    Accepted,
    /// The server refused the requested version.
    Rejected {
        /// Human-readable refusal detail.
        reason: String,
    },
}

impl ProbeOutcome {
    /// Returns true for [`ProbeOutcome::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Probe failures that are not a protocol-level refusal.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The connector cannot attempt this version at all.
    #[error("{0} cannot be attempted by the local tls connector")]
    Unsupported(ProtocolVersion),
    /// The URL cannot be probed.
    #[error("invalid probe target: {0}")]
    InvalidTarget(String),
    /// Resolution, connection, timeout or socket failure.
    #[error("probe transport failure: {0}")]
    Transport(String),
    /// The peer answered, but not with a usable TLS negotiation.
    #[error("tls handshake error: {0}")]
    Handshake(String),
}

impl From<ProbeError> for HarnessError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Unsupported(version) => Self::CapabilityUnavailable(version),
            other => Self::Transport(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Connector Trait
// ============================================================================

/// Raw TLS-connect primitive used by [`TlsProbe`].
pub trait TlsConnector {
    /// Returns true when this connector can attempt `version`.
    fn supports(&self, version: ProtocolVersion) -> bool;

    /// Attempts a handshake at exactly `version`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] for anything other than an accept or a
    /// protocol-level refusal.
    fn connect(
        &self,
        version: ProtocolVersion,
        target: &ProbeTarget,
        config: &ProbeConfig,
    ) -> Result<ProbeOutcome, ProbeError>;
}

/// Socket-level connector built on rustls and hand-assembled legacy hellos.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTlsConnector;

impl TlsConnector for SystemTlsConnector {
    fn supports(&self, _version: ProtocolVersion) -> bool {
        true
    }

    fn connect(
        &self,
        version: ProtocolVersion,
        target: &ProbeTarget,
        config: &ProbeConfig,
    ) -> Result<ProbeOutcome, ProbeError> {
        match version {
            ProtocolVersion::Tls1_2 | ProtocolVersion::Tls1_3 => {
                modern::handshake(version, target, config)
            }
            ProtocolVersion::Ssl2
            | ProtocolVersion::Ssl3
            | ProtocolVersion::Tls1_0
            | ProtocolVersion::Tls1_1 => legacy::exchange(version, target, config),
        }
    }
}

// ============================================================================
// SECTION: Probe
// ============================================================================

/// Forced-version TLS probe.
pub struct TlsProbe<C = SystemTlsConnector> {
    /// Connect primitive.
    connector: C,
    /// Socket and verification settings.
    config: ProbeConfig,
}

impl TlsProbe<SystemTlsConnector> {
    /// Creates a probe backed by the system connector.
    #[must_use]
    pub const fn new(config: ProbeConfig) -> Self {
        Self {
            connector: SystemTlsConnector,
            config,
        }
    }
}

impl<C: TlsConnector> TlsProbe<C> {
    /// Creates a probe backed by a custom connector.
    #[must_use]
    pub const fn with_connector(connector: C, config: ProbeConfig) -> Self {
        Self {
            connector,
            config,
        }
    }

    /// Returns the probe settings.
    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probes `url` at `version` and returns the detailed outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Unsupported`] when the connector cannot attempt
    /// the version, and other [`ProbeError`] variants for non-protocol failures.
    pub fn probe_outcome(
        &self,
        version: ProtocolVersion,
        url: &str,
    ) -> Result<ProbeOutcome, ProbeError> {
        if !self.connector.supports(version) {
            return Err(ProbeError::Unsupported(version));
        }
        let target = ProbeTarget::from_url(url)?;
        self.connector.connect(version, &target, &self.config)
    }

    /// Returns true when the server at `url` negotiates exactly `version`.
    ///
    /// # Errors
    ///
    /// See [`TlsProbe::probe_outcome`].
    pub fn probe(&self, version: ProtocolVersion, url: &str) -> Result<bool, ProbeError> {
        self.probe_outcome(version, url).map(|outcome| outcome.is_accepted())
    }
}

// ============================================================================
// SECTION: Socket Helpers
// ============================================================================

/// Connects to the first reachable address of `target` with timeouts applied.
fn connect_tcp(target: &ProbeTarget, timeout: Duration) -> Result<TcpStream, ProbeError> {
    let addrs = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|err| ProbeError::Transport(format!("failed to resolve {target}: {err}")))?;
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(timeout))
                    .and_then(|()| stream.set_write_timeout(Some(timeout)))
                    .and_then(|()| stream.set_nodelay(true))
                    .map_err(|err| ProbeError::Transport(err.to_string()))?;
                return Ok(stream);
            }
            Err(err) => last_error = Some(err),
        }
    }
    Err(ProbeError::Transport(match last_error {
        Some(err) => format!("failed to connect to {target}: {err}"),
        None => format!("{target} resolved to no addresses"),
    }))
}

/// Classifies a socket failure that happened after the hello was sent.
///
/// A peer that drops the connection mid-handshake is refusing the version;
/// timeouts and other socket errors are transport failures.
fn classify_io_failure(
    version: ProtocolVersion,
    err: &io::Error,
) -> Result<ProbeOutcome, ProbeError> {
    match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => Ok(ProbeOutcome::Rejected {
            reason: format!("server closed the connection during the {version} handshake"),
        }),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Err(ProbeError::Transport(
            format!("{version} handshake timed out"),
        )),
        _ => Err(ProbeError::Transport(err.to_string())),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
