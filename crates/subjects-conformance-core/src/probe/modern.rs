// crates/subjects-conformance-core/src/probe/modern.rs
// ============================================================================
// Module: Full-Handshake Probe
// Description: rustls handshakes pinned to TLS 1.2 or TLS 1.3.
// Purpose: Decide acceptance of modern versions with a real negotiation.
// Dependencies: rustls, rustls-pki-types, webpki-roots
// ============================================================================

//! ## Overview
//! The client configuration enables exactly one protocol version. Acceptance
//! means the handshake completed; refusal means the server alerted on version
//! or handshake grounds, rustls found the peer incompatible, or the peer hung
//! up before finishing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;

use rustls::AlertDescription;
use rustls::ClientConfig;
use rustls::ClientConnection;
use rustls::DigitallySignedStruct;
use rustls::RootCertStore;
use rustls::SignatureScheme;
use rustls::SupportedProtocolVersion;
use rustls::client::danger::HandshakeSignatureValid;
use rustls::client::danger::ServerCertVerified;
use rustls::client::danger::ServerCertVerifier;
use rustls::crypto::CryptoProvider;
use rustls::crypto::aws_lc_rs;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::ServerName;
use rustls_pki_types::UnixTime;

use super::ProbeConfig;
use super::ProbeError;
use super::ProbeOutcome;
use super::ProbeTarget;
use super::ProtocolVersion;
use super::classify_io_failure;
use super::connect_tcp;

// ============================================================================
// SECTION: Handshake
// ============================================================================

/// Runs a full handshake at `version` against `target`.
pub(super) fn handshake(
    version: ProtocolVersion,
    target: &ProbeTarget,
    config: &ProbeConfig,
) -> Result<ProbeOutcome, ProbeError> {
    let client_config = client_config(version, config.verify_certificates)?;
    let server_name = target.server_name()?;
    let mut conn = ClientConnection::new(Arc::new(client_config), server_name)
        .map_err(|err| ProbeError::Handshake(err.to_string()))?;
    let mut tcp = connect_tcp(target, config.timeout)?;
    while conn.is_handshaking() {
        if let Err(err) = conn.complete_io(&mut tcp) {
            return classify_handshake_failure(version, &err);
        }
    }
    let negotiated = conn.protocol_version();
    conn.send_close_notify();
    let _ = conn.complete_io(&mut tcp);
    match negotiated {
        Some(found) if found == rustls_version(version) => Ok(ProbeOutcome::Accepted),
        Some(found) => Ok(ProbeOutcome::Rejected {
            reason: format!("server negotiated {found:?} instead of {version}"),
        }),
        None => Err(ProbeError::Handshake("handshake finished without a version".to_string())),
    }
}

/// Builds a client configuration restricted to `version`.
fn client_config(
    version: ProtocolVersion,
    verify_certificates: bool,
) -> Result<ClientConfig, ProbeError> {
    let supported = supported_version(version)?;
    let provider = Arc::new(aws_lc_rs::default_provider());
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(&[supported])
        .map_err(|err| ProbeError::Handshake(err.to_string()))?;
    let config = if verify_certificates {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert {
                provider,
            }))
            .with_no_client_auth()
    };
    Ok(config)
}

/// Maps a modern version to its rustls definition.
fn supported_version(
    version: ProtocolVersion,
) -> Result<&'static SupportedProtocolVersion, ProbeError> {
    match version {
        ProtocolVersion::Tls1_2 => Ok(&rustls::version::TLS12),
        ProtocolVersion::Tls1_3 => Ok(&rustls::version::TLS13),
        other => Err(ProbeError::Unsupported(other)),
    }
}

/// Maps a version to the rustls wire enum.
const fn rustls_version(version: ProtocolVersion) -> rustls::ProtocolVersion {
    match version {
        ProtocolVersion::Ssl2 => rustls::ProtocolVersion::SSLv2,
        ProtocolVersion::Ssl3 => rustls::ProtocolVersion::SSLv3,
        ProtocolVersion::Tls1_0 => rustls::ProtocolVersion::TLSv1_0,
        ProtocolVersion::Tls1_1 => rustls::ProtocolVersion::TLSv1_1,
        ProtocolVersion::Tls1_2 => rustls::ProtocolVersion::TLSv1_2,
        ProtocolVersion::Tls1_3 => rustls::ProtocolVersion::TLSv1_3,
    }
}

/// Classifies a handshake I/O failure.
fn classify_handshake_failure(
    version: ProtocolVersion,
    err: &io::Error,
) -> Result<ProbeOutcome, ProbeError> {
    let Some(tls_error) = err.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>())
    else {
        return classify_io_failure(version, err);
    };
    match tls_error {
        rustls::Error::AlertReceived(
            alert @ (AlertDescription::ProtocolVersion
            | AlertDescription::HandshakeFailure
            | AlertDescription::InsufficientSecurity),
        ) => Ok(ProbeOutcome::Rejected {
            reason: format!("server sent {alert:?} alert for {version}"),
        }),
        rustls::Error::PeerIncompatible(detail) => Ok(ProbeOutcome::Rejected {
            reason: format!("server is incompatible with {version}: {detail:?}"),
        }),
        other => Err(ProbeError::Handshake(other.to_string())),
    }
}

// ============================================================================
// SECTION: Certificate Verification
// ============================================================================

/// Verifier used when certificate verification is disabled for probing.
///
/// Handshake signatures are still checked so the negotiation is genuine.
#[derive(Debug)]
struct AcceptAnyServerCert {
    /// Provider supplying signature verification algorithms.
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
