// crates/subjects-conformance-cli/src/lib.rs
// ============================================================================
// Module: Subjects Conformance CLI Library
// Description: Shared helpers for the `subjects-conformance` binary.
// Purpose: Expose the message catalog to the binary and its tests.
// Dependencies: Standard library only.
// ============================================================================

//! ## Overview
//! The binary routes every user-facing string through [`i18n`]. The module
//! lives in the library target so integration tests can exercise the catalog
//! without spawning the binary.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod i18n;
