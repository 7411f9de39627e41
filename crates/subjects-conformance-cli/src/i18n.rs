// crates/subjects-conformance-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for localized output.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The conformance CLI stores user-facing strings in a small translation
//! catalog to keep messaging consistent across English and Catalan output.
//! All runtime output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let normalized = value.to_ascii_lowercase();
        let lang = normalized.split(['-', '_', '.']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "ca" => Some(Self::Ca),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "subjects-conformance {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("list.header", "Available scenarios:"),
    ("list.entry", "  {name}: {description}"),
    ("select.unknown", "No scenario matches '{filter}'. Use --list to see the available scenarios."),
    ("config.load_failed", "Failed to load configuration: {error}"),
    ("events.open_failed", "Failed to open event log at {path}: {error}"),
    ("suite.init_failed", "Failed to initialize the conformance suite: {error}"),
    ("suite.target", "Checking {url} ({count} scenario(s))"),
    ("suite.summary", "Summary: {summary}"),
    ("suite.verdict.passed", "Conformance suite passed."),
    ("suite.verdict.failed", "Conformance suite failed."),
    ("scenario.result", "[{status}] {scenario} ({duration_ms} ms)"),
    ("scenario.detail", "    {message}"),
    ("scenario.schema.top_level", "    collection: {message}"),
    ("scenario.schema.record", "    record {index}: {reason}"),
    ("scenario.schema.missing", "    missing known subjects: {codes}"),
    ("status.passed", "PASS"),
    ("status.failed", "FAIL"),
    ("status.errored", "ERROR"),
    ("status.skipped", "SKIP"),
    ("report.written", "Report written to {path}"),
    ("report.write_failed", "Failed to write report to {path}: {error}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected one of {expected}."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Static Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "subjects-conformance {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("list.header", "Escenaris disponibles:"),
    ("list.entry", "  {name}: {description}"),
    (
        "select.unknown",
        "Cap escenari coincideix amb '{filter}'. Utilitzeu --list per veure els escenaris \
         disponibles.",
    ),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("events.open_failed", "No s'ha pogut obrir el registre d'esdeveniments a {path}: {error}"),
    ("suite.init_failed", "No s'ha pogut inicialitzar el conjunt de conformitat: {error}"),
    ("suite.target", "Comprovant {url} ({count} escenari(s))"),
    ("suite.summary", "Resum: {summary}"),
    ("suite.verdict.passed", "El conjunt de conformitat ha superat les comprovacions."),
    ("suite.verdict.failed", "El conjunt de conformitat ha fallat."),
    ("scenario.result", "[{status}] {scenario} ({duration_ms} ms)"),
    ("scenario.detail", "    {message}"),
    ("scenario.schema.top_level", "    col·lecció: {message}"),
    ("scenario.schema.record", "    registre {index}: {reason}"),
    ("scenario.schema.missing", "    assignatures conegudes absents: {codes}"),
    ("status.passed", "SUPERAT"),
    ("status.failed", "FALLAT"),
    ("status.errored", "ERROR"),
    ("status.skipped", "OMÈS"),
    ("report.written", "Informe escrit a {path}"),
    ("report.write_failed", "No s'ha pogut escriure l'informe a {path}: {error}"),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava un de {expected}."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    translate_in(current_locale(), key, args)
}

/// Translates `key` in an explicit locale while substituting `args`.
#[must_use]
pub fn translate_in(locale: Locale, key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::CATALOG_CA;
    use super::CATALOG_EN;
    use super::Locale;
    use super::catalog_for;

    #[test]
    fn catalogs_cover_the_same_keys() {
        let mut english: Vec<&str> = CATALOG_EN.iter().map(|(key, _)| *key).collect();
        let mut catalan: Vec<&str> = CATALOG_CA.iter().map(|(key, _)| *key).collect();
        english.sort_unstable();
        catalan.sort_unstable();
        assert_eq!(english, catalan);
        assert_eq!(catalog_for(Locale::En).len(), CATALOG_EN.len());
    }

    #[test]
    fn locale_parse_accepts_region_and_encoding_tags() {
        assert_eq!(Locale::parse("ca_ES.UTF-8"), Some(Locale::Ca));
        assert_eq!(Locale::parse(" EN-us "), Some(Locale::En));
        assert_eq!(Locale::parse("fr"), None);
        assert_eq!(Locale::parse(""), None);
    }
}
