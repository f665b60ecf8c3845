// crates/phasebench-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings so every command reports alike.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The phasebench CLI stores user-facing strings in a small translation
//! catalog. All runtime output is routed through the [`t!`](crate::t) macro.
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
    ("main.version", "phasebench {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.override_failed", "Configuration overrides rejected: {error}"),
    ("schema.load_failed", "Failed to load {kind} schema: {error}"),
    ("schema.kind.metrics", "metrics"),
    ("schema.kind.extended", "extended metrics"),
    ("plan.failed", "Failed to plan phases: {error}"),
    ("plan.header", "Scenario {scenario}: profile {profile}, tolerance {tolerance}"),
    ("plan.target", "Target {url} with {threads} threads and {connections} connections"),
    ("plan.phases", "{count} phases, {duration}s total:"),
    ("plan.phase", "  [{index}] {label}: {rate} req/s for {duration}s"),
    ("plan.output", "Results directory: {dir}"),
    ("plan.profiling", "Profiling phase: {phase}"),
    ("plan.profiling.last", "last"),
    ("run.event_log_failed", "Failed to open event log {path}: {error}"),
    ("run.output_dir_failed", "Failed to create {path}: {error}"),
    ("run.failed", "Run aborted ({kind}): {error}"),
    ("run.serialize_failed", "Failed to serialize {kind}: {error}"),
    ("run.write_failed", "Failed to write {path}: {error}"),
    ("run.written", "Wrote {path}"),
    (
        "run.summary",
        "Run {outcome}: {requests} requests at {rps} req/s, p99 {p99}, error rate {error_rate}",
    ),
    ("run.recording_failed", "{path} failed validation with {count} violations:"),
    ("run.measurement_failed", "Run marked failed:"),
    ("run.reason", "  - {reason}"),
    ("validate.none_found", "No metrics documents found under {path}"),
    ("validate.pass", "PASS {path}"),
    ("validate.fail", "FAIL {path}"),
    ("validate.issue", "  - {message}"),
    ("validate.summary", "{passed} passed, {failed} failed"),
    ("compare.threshold_failed", "Failed to load thresholds: {error}"),
    ("compare.input_failed", "Failed to load {side} results: {error}"),
    ("compare.side.base", "base"),
    ("compare.side.new", "new"),
    ("compare.duplicate", "Warning: ignoring {path}; scenario {scenario} is already loaded"),
    ("compare.scenario", "{scenario}: {status}"),
    ("compare.metric", "  {metric}: {delta} ({status})"),
    ("compare.new_failed", "  new run status is failed"),
    ("compare.delta.unavailable", "n/a"),
    ("compare.only_base", "Only in base: {scenarios}"),
    ("compare.only_new", "Only in new: {scenarios}"),
    ("compare.outcome.success", "No regression detected."),
    ("compare.outcome.no_comparable", "No comparable results: base and new share no scenario."),
    ("compare.outcome.regression", "Regression detected."),
    ("compare.render_failed", "Failed to render comparison: {error}"),
    ("merge.failed", "Failed to merge side-channel documents: {error}"),
    ("merge.warning", "Warning: {message}"),
    ("merge.write_failed", "Failed to write {path}: {error}"),
    ("merge.summary", "Merged {accepted} of {total} documents into {path}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Static Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "phasebench {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.override_failed", "S'han rebutjat les substitucions de configuració: {error}"),
    ("schema.load_failed", "No s'ha pogut carregar l'esquema {kind}: {error}"),
    ("schema.kind.metrics", "de mètriques"),
    ("schema.kind.extended", "de mètriques ampliades"),
    ("plan.failed", "No s'han pogut planificar les fases: {error}"),
    ("plan.header", "Escenari {scenario}: perfil {profile}, tolerància {tolerance}"),
    ("plan.target", "Destí {url} amb {threads} fils i {connections} connexions"),
    ("plan.phases", "{count} fases, {duration}s en total:"),
    ("plan.phase", "  [{index}] {label}: {rate} pet/s durant {duration}s"),
    ("plan.output", "Directori de resultats: {dir}"),
    ("plan.profiling", "Fase perfilada: {phase}"),
    ("plan.profiling.last", "l'última"),
    ("run.event_log_failed", "No s'ha pogut obrir el registre d'esdeveniments {path}: {error}"),
    ("run.output_dir_failed", "No s'ha pogut crear {path}: {error}"),
    ("run.failed", "Execució avortada ({kind}): {error}"),
    ("run.serialize_failed", "No s'ha pogut serialitzar {kind}: {error}"),
    ("run.write_failed", "No s'ha pogut escriure {path}: {error}"),
    ("run.written", "S'ha escrit {path}"),
    (
        "run.summary",
        "Execució {outcome}: {requests} peticions a {rps} pet/s, p99 {p99}, taxa d'errors \
         {error_rate}",
    ),
    ("run.recording_failed", "{path} ha fallat la validació amb {count} infraccions:"),
    ("run.measurement_failed", "Execució marcada com a fallida:"),
    ("run.reason", "  - {reason}"),
    ("validate.none_found", "No s'han trobat documents de mètriques a {path}"),
    ("validate.pass", "CORRECTE {path}"),
    ("validate.fail", "ERROR {path}"),
    ("validate.issue", "  - {message}"),
    ("validate.summary", "{passed} correctes, {failed} amb errors"),
    ("compare.threshold_failed", "No s'han pogut carregar els llindars: {error}"),
    ("compare.input_failed", "No s'han pogut carregar els resultats {side}: {error}"),
    ("compare.side.base", "de base"),
    ("compare.side.new", "nous"),
    (
        "compare.duplicate",
        "Avís: s'ignora {path}; l'escenari {scenario} ja s'ha carregat",
    ),
    ("compare.scenario", "{scenario}: {status}"),
    ("compare.metric", "  {metric}: {delta} ({status})"),
    ("compare.new_failed", "  l'estat de l'execució nova és fallida"),
    ("compare.delta.unavailable", "n/d"),
    ("compare.only_base", "Només a la base: {scenarios}"),
    ("compare.only_new", "Només als nous: {scenarios}"),
    ("compare.outcome.success", "No s'ha detectat cap regressió."),
    (
        "compare.outcome.no_comparable",
        "No hi ha resultats comparables: la base i els nous no comparteixen cap escenari.",
    ),
    ("compare.outcome.regression", "S'ha detectat una regressió."),
    ("compare.render_failed", "No s'ha pogut mostrar la comparació: {error}"),
    ("merge.failed", "No s'han pogut fusionar els documents de canal lateral: {error}"),
    ("merge.warning", "Avís: {message}"),
    ("merge.write_failed", "No s'ha pogut escriure {path}: {error}"),
    ("merge.summary", "S'han fusionat {accepted} de {total} documents a {path}"),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'."),
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
    let locale = current_locale();
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
/// Named arguments are substituted into `{placeholder}` positions.
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
