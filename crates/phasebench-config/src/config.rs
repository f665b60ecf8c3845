// crates/phasebench-config/src/config.rs
// ============================================================================
// Module: Phasebench Configuration
// Description: Run configuration loading and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: phasebench-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded once from a TOML file with strict size and path
//! limits, validated section by section, and converted into the immutable
//! [`RunSettings`] value the engine consumes. Validation dry-plans the load
//! profile so every configuration error surfaces before a phase executes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use phasebench_core::Concurrency;
use phasebench_core::LoadProfile;
use phasebench_core::ProfileParams;
use phasebench_core::ProfileTarget;
use phasebench_core::RunSettings;
use phasebench_core::ScenarioContract;
use phasebench_core::ScenarioInfo;
use phasebench_core::TargetSpec;
use phasebench_core::ToleranceMode;
use phasebench_core::runtime::plan_phases;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "phasebench.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PHASEBENCH_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum scenario name length.
const MAX_SCENARIO_NAME_LENGTH: usize = 128;
/// Maximum generator threads.
const MAX_THREADS: u32 = 1_024;
/// Maximum generator connections.
const MAX_CONNECTIONS: u32 = 100_000;
/// Maximum phase grace period in seconds.
const MAX_GRACE_SECONDS: u64 = 3_600;
/// Maximum profiler sampling frequency in hertz.
const MAX_PROFILE_FREQUENCY: u32 = 10_000;
/// Duration applied by quick mode, in seconds.
pub const QUICK_DURATION_SECONDS: u64 = 5;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Phasebench run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    /// Scenario identity.
    pub scenario: ScenarioConfig,
    /// Target under test.
    pub target: TargetConfig,
    /// Load profile and concurrency.
    pub load: LoadConfig,
    /// Rate verification policy.
    #[serde(default)]
    pub verification: VerificationConfig,
    /// External generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Result output settings.
    #[serde(default)]
    pub output: OutputConfig,
    /// Optional profiler capture.
    #[serde(default)]
    pub profiling: ProfilingConfig,
}

/// Scenario identity recorded in every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario name; also the results subdirectory name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Endpoint identity under test (for example `PUT /items/{id}`).
    pub endpoint: String,
    /// Optional protocol contract checked by the invariant validator.
    #[serde(default)]
    pub contract: Option<ScenarioContract>,
}

/// Target under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Base URL.
    pub url: String,
    /// Optional generator request script.
    #[serde(default)]
    pub script: Option<PathBuf>,
}

/// Load profile, rates, durations, and concurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    /// Load profile.
    #[serde(default)]
    pub profile: LoadProfile,
    /// Peak or steady target rate in requests per second.
    pub target_rate: u64,
    /// Floor rate in requests per second.
    #[serde(default = "default_min_rate")]
    pub min_rate: u64,
    /// Total run duration in seconds.
    pub duration_seconds: u64,
    /// Step-up step count.
    #[serde(default = "default_step_count")]
    pub step_count: u32,
    /// Ramp-up length in seconds.
    #[serde(default = "default_ramp_seconds")]
    pub ramp_up_seconds: u64,
    /// Ramp-down length in seconds.
    #[serde(default = "default_ramp_seconds")]
    pub ramp_down_seconds: u64,
    /// Burst cycle length in seconds.
    #[serde(default = "default_burst_interval")]
    pub burst_interval: u64,
    /// Burst length per cycle in seconds.
    #[serde(default = "default_burst_duration")]
    pub burst_duration: u64,
    /// Burst rate over base rate.
    #[serde(default = "default_burst_multiplier")]
    pub burst_multiplier: f64,
    /// Generator threads.
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Open connections.
    #[serde(default = "default_connections")]
    pub connections: u32,
}

/// Rate verification policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerificationConfig {
    /// Strict aborts on the first failed rate check; warn continues.
    #[serde(default)]
    pub tolerance: ToleranceMode,
}

/// External generator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Generator binary name or path.
    #[serde(default = "default_generator_binary")]
    pub binary: String,
    /// Seconds allowed beyond the phase duration before the process is killed.
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u64,
    /// Rate substituted when a phase has no target rate.
    #[serde(default = "default_floor_rate")]
    pub floor_rate: u64,
    /// Whether the request script writes a structured side-channel document.
    #[serde(default = "default_true")]
    pub side_channel: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            binary: default_generator_binary(),
            grace_seconds: default_grace_seconds(),
            floor_rate: default_floor_rate(),
            side_channel: true,
        }
    }
}

/// Result output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Results root; each scenario writes into its own subdirectory.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Optional JSON-lines event log; events go to stderr when unset.
    #[serde(default)]
    pub event_log: Option<PathBuf>,
    /// Host label recorded in the environment fingerprint.
    #[serde(default = "default_host_label")]
    pub host_label: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            event_log: None,
            host_label: default_host_label(),
        }
    }
}

/// Profiler capture settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilingConfig {
    /// Enables profiling of one phase.
    #[serde(default)]
    pub enabled: bool,
    /// Phase label to profile; the last phase when unset.
    #[serde(default)]
    pub phase: Option<String>,
    /// Profiler binary.
    #[serde(default = "default_profiler_binary")]
    pub binary: String,
    /// Sampling frequency in hertz.
    #[serde(default = "default_profile_frequency")]
    pub frequency: u32,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            phase: None,
            binary: default_profiler_binary(),
            frequency: default_profile_frequency(),
        }
    }
}

/// Entry-boundary overrides applied on top of the file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigOverrides {
    /// Replace the duration with [`QUICK_DURATION_SECONDS`].
    pub quick: bool,
    /// Replace the tolerance mode.
    pub tolerance: Option<ToleranceMode>,
    /// Replace the results root.
    pub output_dir: Option<PathBuf>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl BenchConfig {
    /// Loads configuration from disk using the default resolution rules.
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
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scenario.validate()?;
        self.target.validate()?;
        self.load.validate()?;
        self.generator.validate()?;
        self.output.validate()?;
        self.profiling.validate()?;
        plan_phases(self.load.profile, &self.load.profile_params())
            .map_err(|err| ConfigError::Invalid(format!("load: {err}")))?;
        Ok(())
    }

    /// Returns a validated copy with entry-boundary overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the overridden configuration is invalid.
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        if overrides.quick {
            config.load.duration_seconds = QUICK_DURATION_SECONDS;
        }
        if let Some(tolerance) = overrides.tolerance {
            config.verification.tolerance = tolerance;
        }
        if let Some(dir) = &overrides.output_dir {
            config.output.dir.clone_from(dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Converts the configuration into engine run settings.
    #[must_use]
    pub fn to_run_settings(&self) -> RunSettings {
        let profile_phase = self.profiling.enabled.then(|| {
            self.profiling
                .phase
                .as_ref()
                .map_or(ProfileTarget::LastPhase, |label| ProfileTarget::Label(label.clone()))
        });
        RunSettings {
            scenario: ScenarioInfo {
                name: self.scenario.name.clone(),
                description: self.scenario.description.clone(),
                endpoint: self.scenario.endpoint.clone(),
                profile: self.load.profile,
                contract: self.scenario.contract,
            },
            profile: self.load.profile,
            params: self.load.profile_params(),
            tolerance: self.verification.tolerance,
            target: TargetSpec {
                url: self.target.url.clone(),
                script: self.target.script.as_ref().map(|path| path.display().to_string()),
            },
            concurrency: Concurrency {
                threads: self.load.threads,
                connections: self.load.connections,
            },
            profile_phase,
            host_label: self.output.host_label.clone(),
        }
    }

    /// Returns the results directory for this scenario.
    #[must_use]
    pub fn scenario_dir(&self) -> PathBuf {
        self.output.dir.join(&self.scenario.name)
    }
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

impl ScenarioConfig {
    /// Validates the scenario section.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("scenario.name must be non-empty".to_string()));
        }
        if name.len() > MAX_SCENARIO_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "scenario.name exceeds {MAX_SCENARIO_NAME_LENGTH} characters"
            )));
        }
        if name.starts_with('.')
            || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        {
            return Err(ConfigError::Invalid(format!(
                "scenario.name `{name}` must use only [A-Za-z0-9._-] and not start with '.'"
            )));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("scenario.endpoint must be non-empty".to_string()));
        }
        Ok(())
    }
}

impl TargetConfig {
    /// Validates the target section.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(
                "target.url must include http:// or https://".to_string(),
            ));
        }
        if url.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("target.url exceeds max length".to_string()));
        }
        if let Some(script) = &self.script {
            validate_path_string("target.script", &script.to_string_lossy())?;
        }
        Ok(())
    }
}

impl LoadConfig {
    /// Validates the load section apart from profile planning.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_seconds == 0 {
            return Err(ConfigError::Invalid("load.duration_seconds must be > 0".to_string()));
        }
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(ConfigError::Invalid(format!(
                "load.threads must be between 1 and {MAX_THREADS}"
            )));
        }
        if self.connections < self.threads || self.connections > MAX_CONNECTIONS {
            return Err(ConfigError::Invalid(format!(
                "load.connections must be between load.threads ({}) and {MAX_CONNECTIONS}",
                self.threads
            )));
        }
        Ok(())
    }

    /// Returns the planner parameters for this section.
    #[must_use]
    pub fn profile_params(&self) -> ProfileParams {
        ProfileParams {
            target_rate: self.target_rate,
            min_rate: self.min_rate,
            total_duration: self.duration_seconds,
            step_count: self.step_count,
            ramp_up_seconds: self.ramp_up_seconds,
            ramp_down_seconds: self.ramp_down_seconds,
            burst_interval: self.burst_interval,
            burst_duration: self.burst_duration,
            burst_multiplier: self.burst_multiplier,
        }
    }
}

impl GeneratorConfig {
    /// Validates the generator section.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.binary.trim().is_empty() {
            return Err(ConfigError::Invalid("generator.binary must be non-empty".to_string()));
        }
        if self.grace_seconds > MAX_GRACE_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "generator.grace_seconds must be <= {MAX_GRACE_SECONDS}"
            )));
        }
        if self.floor_rate == 0 {
            return Err(ConfigError::Invalid("generator.floor_rate must be > 0".to_string()));
        }
        Ok(())
    }
}

impl OutputConfig {
    /// Validates the output section.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("output.dir", &self.dir.to_string_lossy())?;
        if let Some(log) = &self.event_log {
            validate_path_string("output.event_log", &log.to_string_lossy())?;
        }
        if self.host_label.trim().is_empty() {
            return Err(ConfigError::Invalid("output.host_label must be non-empty".to_string()));
        }
        Ok(())
    }
}

impl ProfilingConfig {
    /// Validates the profiling section.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.binary.trim().is_empty() {
            return Err(ConfigError::Invalid("profiling.binary must be non-empty".to_string()));
        }
        if self.frequency == 0 || self.frequency > MAX_PROFILE_FREQUENCY {
            return Err(ConfigError::Invalid(format!(
                "profiling.frequency must be between 1 and {MAX_PROFILE_FREQUENCY}"
            )));
        }
        if self.phase.as_ref().is_some_and(|phase| phase.trim().is_empty()) {
            return Err(ConfigError::Invalid("profiling.phase must be non-empty".to_string()));
        }
        Ok(())
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
    /// TOML or JSON parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default floor rate.
const fn default_min_rate() -> u64 {
    10
}

/// Default step-up step count.
const fn default_step_count() -> u32 {
    4
}

/// Default ramp length.
const fn default_ramp_seconds() -> u64 {
    10
}

/// Default burst cycle length.
const fn default_burst_interval() -> u64 {
    20
}

/// Default burst length.
const fn default_burst_duration() -> u64 {
    5
}

/// Default burst multiplier.
const fn default_burst_multiplier() -> f64 {
    3.0
}

/// Default generator thread count.
const fn default_threads() -> u32 {
    2
}

/// Default connection count.
const fn default_connections() -> u32 {
    10
}

/// Default generator binary.
fn default_generator_binary() -> String {
    "wrk2".to_string()
}

/// Default grace period.
const fn default_grace_seconds() -> u64 {
    30
}

/// Default floor rate for phases without a target.
const fn default_floor_rate() -> u64 {
    100
}

/// Serde default helper.
const fn default_true() -> bool {
    true
}

/// Default results root.
fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Default host label.
fn default_host_label() -> String {
    "local".to_string()
}

/// Default profiler binary.
fn default_profiler_binary() -> String {
    "perf".to_string()
}

/// Default profiler frequency.
const fn default_profile_frequency() -> u32 {
    99
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

/// Validates a resolved path against length limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
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

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
