//! Configuration loading.
//!
//! Two TOML documents drive a running engine: an [`EngineConfig`] with pacing,
//! tracing and logging settings, and a rule set of goals compiled through
//! [`DeclarationCompiler`]. A rule set that fails validation is rejected as a
//! whole, so invalid rules are never registered.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use autarch_engine::{DeclarationCompiler, Goal, RuleSetDecl, TraceMode};
use autarch_foundation::{Error, ErrorContext, ErrorKind, Result};

/// Default engine configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "autarch.toml";

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Minimum host time between two executed actions, in milliseconds.
    pub action_delay_ms: u64,
    /// Build failure explanations for every decision.
    pub trace: bool,
    /// Directory for decision records. No records are written when unset.
    pub diagnostics_dir: Option<PathBuf>,
    /// `tracing-subscriber` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_delay_ms: 500,
            trace: false,
            diagnostics_dir: None,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read and `Configuration` if it does
    /// not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| e.with_context(file_context(path)))
    }

    /// Loads configuration from `path` if it exists, otherwise defaults.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no engine config, using defaults");
            Ok(Self::default())
        }
    }

    /// Parses configuration from TOML source.
    ///
    /// # Errors
    /// Returns `Configuration` if the source does not parse.
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| Error::configuration(e.to_string()))
    }

    /// Sets the action delay.
    #[must_use]
    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enables or disables tracing.
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Sets the diagnostics directory.
    #[must_use]
    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    /// The action delay as a duration.
    #[must_use]
    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    /// The trace mode for rule evaluation.
    #[must_use]
    pub fn trace_mode(&self) -> TraceMode {
        if self.trace { TraceMode::On } else { TraceMode::Off }
    }
}

// =============================================================================
// Rule Sets
// =============================================================================

/// Loads and compiles a rule set from a TOML file.
///
/// # Errors
/// Returns `Io` if the file cannot be read and `Configuration` if it does not
/// parse or fails validation.
pub fn load_rule_set(path: impl AsRef<Path>) -> Result<Vec<Goal>> {
    let path = path.as_ref();
    let content = read_to_string(path)?;
    parse_rule_set(&content).map_err(|e| {
        let context = e.context.clone().unwrap_or_default();
        e.with_context(context.with_frame(format!("file {}", path.display())))
    })
}

/// Parses and compiles a rule set from TOML source.
///
/// # Errors
/// Returns `Configuration` if the source does not parse or fails validation.
pub fn parse_rule_set(source: &str) -> Result<Vec<Goal>> {
    let decl: RuleSetDecl = toml::from_str(source).map_err(|e| Error::configuration(e.to_string()))?;
    let goals = DeclarationCompiler::compile_rule_set(&decl)?;
    tracing::debug!(
        goals = goals.len(),
        rules = goals.iter().map(|g| g.rules.len()).sum::<usize>(),
        "rule set compiled"
    );
    Ok(goals)
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        Error::new(ErrorKind::Io(format!(
            "failed to read file '{}': {e}",
            path.display()
        )))
    })
}

fn file_context(path: &Path) -> ErrorContext {
    ErrorContext::new().with_frame(format!("file {}", path.display()))
}
