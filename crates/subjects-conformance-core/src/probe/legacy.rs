// crates/subjects-conformance-core/src/probe/legacy.rs
// ============================================================================
// Module: Legacy Hello Probe
// Description: Raw hello exchange for SSLv2, SSLv3, TLS 1.0 and TLS 1.1.
// Purpose: Probe versions rustls refuses to speak.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! rustls does not implement versions older than TLS 1.2, so acceptance of
//! SSLv3, TLS 1.0 and TLS 1.1 is decided from the server's first record in
//! answer to a hand-assembled ClientHello:
//! - a ServerHello at the requested version means accepted,
//! - an alert, a hang-up, or a ServerHello at another version means refused,
//! - anything that is not a TLS record is a handshake error.
//!
//! SSLv2 uses its own two-byte-header CLIENT-HELLO. An SSLv2 SERVER-HELLO
//! means accepted; an SSLv2 ERROR message, a TLS alert, a TLS ServerHello or
//! a hang-up means refused.
//!
//! The exchange stops after the server's hello, so certificates are never
//! inspected on this path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::io::Write;

use rand::RngCore;

use super::ProbeConfig;
use super::ProbeError;
use super::ProbeOutcome;
use super::ProbeTarget;
use super::ProtocolVersion;
use super::classify_io_failure;
use super::connect_tcp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Record content type: alert.
const CONTENT_ALERT: u8 = 0x15;
/// Record content type: handshake.
const CONTENT_HANDSHAKE: u8 = 0x16;
/// Handshake message type: ClientHello.
const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
/// Handshake message type: ServerHello.
const HANDSHAKE_SERVER_HELLO: u8 = 0x02;
/// Maximum record payload accepted from the server (2^14 plus expansion).
const MAX_RECORD_LEN: usize = 16_384 + 2_048;
/// Record header length.
const RECORD_HEADER_LEN: usize = 5;

/// Cipher suites offered in the legacy hello.
const CIPHER_SUITES: [u16; 8] = [
    0xC014, // ECDHE-RSA-AES256-SHA
    0xC013, // ECDHE-RSA-AES128-SHA
    0xC00A, // ECDHE-ECDSA-AES256-SHA
    0xC009, // ECDHE-ECDSA-AES128-SHA
    0x0035, // RSA-AES256-SHA
    0x002F, // RSA-AES128-SHA
    0x000A, // RSA-3DES-EDE-CBC-SHA
    0x00FF, // renegotiation SCSV
];

/// Extension type: server_name.
const EXT_SERVER_NAME: u16 = 0x0000;
/// Extension type: supported_groups.
const EXT_SUPPORTED_GROUPS: u16 = 0x000A;
/// Extension type: ec_point_formats.
const EXT_EC_POINT_FORMATS: u16 = 0x000B;
/// Named groups: secp256r1, secp384r1, x25519.
const SUPPORTED_GROUPS: [u16; 3] = [0x0017, 0x0018, 0x001D];

/// SSLv2 message type: ERROR.
const SSL2_ERROR: u8 = 0x00;
/// SSLv2 message type: CLIENT-HELLO.
const SSL2_CLIENT_HELLO: u8 = 0x01;
/// SSLv2 message type: SERVER-HELLO.
const SSL2_SERVER_HELLO: u8 = 0x04;
/// High bit of a two-byte SSLv2 record header.
const SSL2_HEADER_FLAG: u8 = 0x80;
/// Largest length a two-byte SSLv2 header can carry.
const SSL2_MAX_RECORD_LEN: usize = 0x7FFF;
/// Challenge length sent in the SSLv2 hello.
pub(super) const SSL2_CHALLENGE_LEN: usize = 16;

/// Cipher kinds offered in the SSLv2 hello.
const SSL2_CIPHER_SPECS: [[u8; 3]; 7] = [
    [0x01, 0x00, 0x80], // RC4-128-MD5
    [0x02, 0x00, 0x80], // RC4-128-EXPORT40-MD5
    [0x03, 0x00, 0x80], // RC2-128-CBC-MD5
    [0x04, 0x00, 0x80], // RC2-128-CBC-EXPORT40-MD5
    [0x05, 0x00, 0x80], // IDEA-128-CBC-MD5
    [0x06, 0x00, 0x40], // DES-64-CBC-MD5
    [0x07, 0x00, 0xC0], // DES-192-EDE3-CBC-MD5
];

// ============================================================================
// SECTION: Exchange
// ============================================================================

/// Sends a legacy hello and classifies the first server message.
pub(super) fn exchange(
    version: ProtocolVersion,
    target: &ProbeTarget,
    config: &ProbeConfig,
) -> Result<ProbeOutcome, ProbeError> {
    let hello = if version == ProtocolVersion::Ssl2 {
        let mut challenge = [0_u8; SSL2_CHALLENGE_LEN];
        rand::thread_rng().fill_bytes(&mut challenge);
        ssl2_client_hello(challenge)?
    } else {
        let server_name = (!target.is_ip_literal()).then_some(target.host.as_str());
        let mut random = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut random);
        client_hello(version, server_name, random)?
    };

    let mut tcp = connect_tcp(target, config.timeout)?;
    if let Err(err) = tcp.write_all(&hello).and_then(|()| tcp.flush()) {
        return classify_io_failure(version, &err);
    }
    let mut lead = [0_u8; 2];
    if let Err(err) = tcp.read_exact(&mut lead) {
        return classify_io_failure(version, &err);
    }

    if version == ProtocolVersion::Ssl2 && lead[0] & SSL2_HEADER_FLAG != 0 {
        let length = usize::from(u16::from_be_bytes([lead[0] & !SSL2_HEADER_FLAG, lead[1]]));
        if length == 0 {
            return Err(ProbeError::Handshake("empty SSLv2 record".to_string()));
        }
        let mut body = vec![0_u8; length];
        if let Err(err) = tcp.read_exact(&mut body) {
            return classify_io_failure(version, &err);
        }
        return classify_ssl2_message(&body);
    }

    if !matches!(lead[0], CONTENT_ALERT | CONTENT_HANDSHAKE) {
        return Err(ProbeError::Handshake(format!(
            "peer at {target} did not answer with a tls record (first byte 0x{:02x})",
            lead[0]
        )));
    }
    let mut header = [0_u8; RECORD_HEADER_LEN];
    header[.. 2].copy_from_slice(&lead);
    if let Err(err) = tcp.read_exact(&mut header[2 ..]) {
        return classify_io_failure(version, &err);
    }
    let length = usize::from(u16::from_be_bytes([header[3], header[4]]));
    if length == 0 || length > MAX_RECORD_LEN {
        return Err(ProbeError::Handshake(format!("invalid record length {length}")));
    }
    let mut payload = vec![0_u8; length];
    if let Err(err) = tcp.read_exact(&mut payload) {
        return classify_io_failure(version, &err);
    }
    classify_first_record(version, header[0], &payload)
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Assembles a ClientHello record offering exactly `version`.
///
/// SSLv3 hellos carry no extensions; TLS 1.0 and 1.1 hellos carry SNI (for
/// DNS names), supported groups and point formats.
pub(super) fn client_hello(
    version: ProtocolVersion,
    server_name: Option<&str>,
    random: [u8; 32],
) -> Result<Vec<u8>, ProbeError> {
    let wire = version.wire();
    let mut body = Vec::with_capacity(128);
    body.extend_from_slice(&wire);
    body.extend_from_slice(&random);
    body.push(0);
    push_u16(&mut body, CIPHER_SUITES.len() * 2)?;
    for suite in CIPHER_SUITES {
        body.extend_from_slice(&suite.to_be_bytes());
    }
    body.extend_from_slice(&[1, 0]);

    if version != ProtocolVersion::Ssl3 {
        let extensions = extensions(server_name)?;
        push_u16(&mut body, extensions.len())?;
        body.extend_from_slice(&extensions);
    }

    let mut handshake = Vec::with_capacity(body.len() + 4);
    handshake.push(HANDSHAKE_CLIENT_HELLO);
    push_u24(&mut handshake, body.len())?;
    handshake.extend_from_slice(&body);

    let mut record = Vec::with_capacity(handshake.len() + RECORD_HEADER_LEN);
    record.push(CONTENT_HANDSHAKE);
    record.extend_from_slice(&wire);
    push_u16(&mut record, handshake.len())?;
    record.extend_from_slice(&handshake);
    Ok(record)
}

/// Assembles an SSLv2 CLIENT-HELLO with a two-byte record header.
pub(super) fn ssl2_client_hello(
    challenge: [u8; SSL2_CHALLENGE_LEN],
) -> Result<Vec<u8>, ProbeError> {
    let mut body = Vec::with_capacity(9 + SSL2_CIPHER_SPECS.len() * 3 + SSL2_CHALLENGE_LEN);
    body.push(SSL2_CLIENT_HELLO);
    body.extend_from_slice(&ProtocolVersion::Ssl2.wire());
    push_u16(&mut body, SSL2_CIPHER_SPECS.len() * 3)?;
    push_u16(&mut body, 0)?;
    push_u16(&mut body, SSL2_CHALLENGE_LEN)?;
    for spec in SSL2_CIPHER_SPECS {
        body.extend_from_slice(&spec);
    }
    body.extend_from_slice(&challenge);

    if body.len() > SSL2_MAX_RECORD_LEN {
        return Err(ProbeError::InvalidTarget(format!("hello too long ({} bytes)", body.len())));
    }
    let mut record = Vec::with_capacity(body.len() + 2);
    push_u16(&mut record, body.len())?;
    if let Some(first) = record.first_mut() {
        *first |= SSL2_HEADER_FLAG;
    }
    record.extend_from_slice(&body);
    Ok(record)
}

/// Encodes the hello extensions block (without its length prefix).
fn extensions(server_name: Option<&str>) -> Result<Vec<u8>, ProbeError> {
    let mut out = Vec::new();
    if let Some(name) = server_name {
        let mut entry = Vec::with_capacity(name.len() + 5);
        push_u16(&mut entry, name.len() + 3)?;
        entry.push(0);
        push_u16(&mut entry, name.len())?;
        entry.extend_from_slice(name.as_bytes());
        push_extension(&mut out, EXT_SERVER_NAME, &entry)?;
    }
    let mut groups = Vec::with_capacity(SUPPORTED_GROUPS.len() * 2 + 2);
    push_u16(&mut groups, SUPPORTED_GROUPS.len() * 2)?;
    for group in SUPPORTED_GROUPS {
        groups.extend_from_slice(&group.to_be_bytes());
    }
    push_extension(&mut out, EXT_SUPPORTED_GROUPS, &groups)?;
    push_extension(&mut out, EXT_EC_POINT_FORMATS, &[1, 0])?;
    Ok(out)
}

/// Appends one extension with its type and length.
fn push_extension(out: &mut Vec<u8>, kind: u16, data: &[u8]) -> Result<(), ProbeError> {
    out.extend_from_slice(&kind.to_be_bytes());
    push_u16(out, data.len())?;
    out.extend_from_slice(data);
    Ok(())
}

/// Appends a big-endian u16 length.
fn push_u16(out: &mut Vec<u8>, value: usize) -> Result<(), ProbeError> {
    let value = u16::try_from(value)
        .map_err(|_| ProbeError::InvalidTarget(format!("hello field too long ({value} bytes)")))?;
    out.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Appends a big-endian u24 length.
fn push_u24(out: &mut Vec<u8>, value: usize) -> Result<(), ProbeError> {
    let value = u32::try_from(value)
        .ok()
        .filter(|value| *value < 1 << 24)
        .ok_or_else(|| ProbeError::InvalidTarget(format!("hello too long ({value} bytes)")))?;
    out.extend_from_slice(&value.to_be_bytes()[1 ..]);
    Ok(())
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Classifies the first record the server sent back.
pub(super) fn classify_first_record(
    version: ProtocolVersion,
    content_type: u8,
    payload: &[u8],
) -> Result<ProbeOutcome, ProbeError> {
    match content_type {
        CONTENT_ALERT => {
            let description = payload.get(1).copied().unwrap_or_default();
            Ok(ProbeOutcome::Rejected {
                reason: format!("server sent alert {description} for {version}"),
            })
        }
        CONTENT_HANDSHAKE => {
            let Some(&kind) = payload.first() else {
                return Err(ProbeError::Handshake("empty handshake record".to_string()));
            };
            if kind != HANDSHAKE_SERVER_HELLO {
                return Err(ProbeError::Handshake(format!(
                    "expected ServerHello, got handshake type {kind}"
                )));
            }
            let Some(&[major, minor]) = payload.get(4 .. 6) else {
                return Err(ProbeError::Handshake("truncated ServerHello".to_string()));
            };
            if [major, minor] == version.wire() {
                return Ok(ProbeOutcome::Accepted);
            }
            let answered = ProtocolVersion::from_wire([major, minor])
                .map_or_else(|| format!("0x{major:02x}{minor:02x}"), |found| found.to_string());
            Ok(ProbeOutcome::Rejected {
                reason: format!("server answered {version} hello with {answered}"),
            })
        }
        other => Err(ProbeError::Handshake(format!("unexpected record type {other}"))),
    }
}

/// Classifies the body of the first SSLv2 record the server sent back.
pub(super) fn classify_ssl2_message(body: &[u8]) -> Result<ProbeOutcome, ProbeError> {
    match body.first() {
        Some(&SSL2_SERVER_HELLO) => Ok(ProbeOutcome::Accepted),
        Some(&SSL2_ERROR) => {
            let code = body
                .get(1 .. 3)
                .and_then(|code| <[u8; 2]>::try_from(code).ok())
                .map_or(0, u16::from_be_bytes);
            Ok(ProbeOutcome::Rejected {
                reason: format!("server sent SSLv2 error 0x{code:04x}"),
            })
        }
        Some(kind) => Err(ProbeError::Handshake(format!(
            "expected SSLv2 SERVER-HELLO, got message type {kind}"
        ))),
        None => Err(ProbeError::Handshake("empty SSLv2 record".to_string())),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
