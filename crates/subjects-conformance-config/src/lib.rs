// crates/subjects-conformance-config/src/lib.rs
// ============================================================================
// Module: Subjects Conformance Config Library
// Description: Canonical harness configuration model and validation.
// Purpose: Single source of truth for harness config file semantics.
// Dependencies: serde, serde_json, toml, url
// ============================================================================

//! ## Overview
//! `subjects-conformance-config` defines the configuration consumed by the
//! conformance engine: endpoint URLs, client credentials, and harness policy
//! (latency bound, token type literal, known subject codes, probe settings).
//! Validation is strict and fail-closed.
//!
//! Security posture: config inputs are untrusted and contain secrets.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
