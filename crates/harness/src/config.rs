//! Harness configuration (`vigil.toml`).
//!
//! Every field has a default matching the formatter smoke suite, so an empty
//! file is a valid configuration:
//!
//! ```toml
//! test-timeout-ms = 30000
//! strategy = "save"        # "save" | "log" | "file"
//!
//! [activation]
//! timeout-ms = 30000
//! interval-ms = 100
//!
//! [[extensions]]
//! id = "ms-python.python"
//! activate = true
//!
//! [[extensions]]
//! id = "ms-python.black-formatter"
//!
//! [log]
//! channel = "Black"
//! success = "FOUND black=="
//! failure = "Python interpreter missing"
//!
//! [fixture]
//! before = "test_data/project/myscript.unformatted"
//! after = "test_data/project/myscript.formatted"
//! target = "test_data/project/myscript.py"
//! ```
//!
//! Relative fixture paths resolve against the directory holding the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::activation::ActivationPolicy;
use crate::signal::WatchStrategy;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading the configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// TOML syntax or schema error.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// Values parse but cannot drive a run.
	#[error("invalid configuration: {0}")]
	Invalid(String),
}

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct HarnessConfig {
	/// Per-test bound enforced by the suite.
	pub test_timeout_ms: u64,
	/// Completion-detection strategy.
	pub strategy: WatchStrategy,
	pub activation: ActivationConfig,
	/// Extensions ensured active, in order, before the target is saved.
	pub extensions: Vec<ExtensionConfig>,
	pub log: LogMarkerConfig,
	pub fixture: FixtureConfig,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			test_timeout_ms: 30_000,
			strategy: WatchStrategy::default(),
			activation: ActivationConfig::default(),
			extensions: vec![
				ExtensionConfig {
					id: "ms-python.python".to_owned(),
					activate: true,
				},
				ExtensionConfig {
					id: "ms-python.black-formatter".to_owned(),
					activate: false,
				},
			],
			log: LogMarkerConfig::default(),
			fixture: FixtureConfig::default(),
		}
	}
}

/// Activation poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ActivationConfig {
	pub timeout_ms: u64,
	pub interval_ms: u64,
}

impl Default for ActivationConfig {
	fn default() -> Self {
		Self {
			timeout_ms: 30_000,
			interval_ms: 100,
		}
	}
}

impl ActivationConfig {
	/// Poll policy for one extension.
	pub fn policy(&self, activate: bool) -> ActivationPolicy {
		ActivationPolicy {
			timeout: Duration::from_millis(self.timeout_ms),
			interval: Duration::from_millis(self.interval_ms),
			activate,
		}
	}
}

/// One extension the run depends on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExtensionConfig {
	pub id: String,
	/// Call activate explicitly instead of only polling.
	#[serde(default)]
	pub activate: bool,
}

/// Markers scanned by the log strategy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LogMarkerConfig {
	/// Substring of the diagnostic channel's document path.
	pub channel: String,
	pub success: String,
	pub failure: String,
}

impl Default for LogMarkerConfig {
	fn default() -> Self {
		Self {
			channel: "Black".to_owned(),
			success: "FOUND black==".to_owned(),
			failure: "Python interpreter missing".to_owned(),
		}
	}
}

/// Golden file locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FixtureConfig {
	pub before: PathBuf,
	pub after: PathBuf,
	pub target: PathBuf,
}

impl Default for FixtureConfig {
	fn default() -> Self {
		let dir = Path::new("test_data").join("project");
		Self {
			before: dir.join("myscript.unformatted"),
			after: dir.join("myscript.formatted"),
			target: dir.join("myscript.py"),
		}
	}
}

impl HarnessConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads a configuration file, resolving fixture paths against its directory.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let mut config = Self::from_toml_str(&text)?;
		if let Some(dir) = path.parent() {
			config.resolve_relative_to(dir);
		}
		Ok(config)
	}

	/// Makes relative fixture paths relative to `base`.
	pub fn resolve_relative_to(&mut self, base: &Path) {
		for path in [&mut self.fixture.before, &mut self.fixture.after, &mut self.fixture.target] {
			if path.is_relative() {
				*path = base.join(&*path);
			}
		}
	}

	/// Per-test timeout as a duration.
	pub fn test_timeout(&self) -> Duration {
		Duration::from_millis(self.test_timeout_ms)
	}

	/// Rejects values that cannot drive a run.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.test_timeout_ms == 0 {
			return Err(ConfigError::Invalid("test-timeout-ms must be > 0".to_owned()));
		}
		if self.activation.interval_ms == 0 {
			return Err(ConfigError::Invalid("activation.interval-ms must be > 0".to_owned()));
		}
		if self.extensions.iter().any(|ext| ext.id.is_empty()) {
			return Err(ConfigError::Invalid("extension id must not be empty".to_owned()));
		}
		let log = &self.log;
		if log.channel.is_empty() || log.success.is_empty() || log.failure.is_empty() {
			return Err(ConfigError::Invalid("log channel and markers must not be empty".to_owned()));
		}
		if log.success == log.failure {
			return Err(ConfigError::Invalid("log success and failure markers must differ".to_owned()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = HarnessConfig::from_toml_str("").unwrap();
		assert_eq!(config, HarnessConfig::default());
		assert_eq!(config.test_timeout(), Duration::from_secs(30));
		assert_eq!(config.activation.policy(true).interval, Duration::from_millis(100));
	}

	#[test]
	fn overrides_parse() {
		let config = HarnessConfig::from_toml_str(
			r#"
			test-timeout-ms = 100000
			strategy = "file"

			[activation]
			interval-ms = 50

			[[extensions]]
			id = "acme.fmt"
			activate = true

			[log]
			channel = "Acme"
			"#,
		)
		.unwrap();

		assert_eq!(config.test_timeout_ms, 100_000);
		assert_eq!(config.strategy, WatchStrategy::File);
		assert_eq!(config.activation.timeout_ms, 30_000);
		assert_eq!(config.activation.interval_ms, 50);
		assert_eq!(config.extensions, vec![ExtensionConfig {
			id: "acme.fmt".to_owned(),
			activate: true,
		}]);
		assert_eq!(config.log.channel, "Acme");
		assert_eq!(config.log.success, "FOUND black==");
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(matches!(HarnessConfig::from_toml_str("timeout = 5"), Err(ConfigError::Parse(_))));
	}

	#[test]
	fn identical_markers_are_invalid() {
		let err = HarnessConfig::from_toml_str("[log]\nsuccess = \"x\"\nfailure = \"x\"\n").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
	}

	#[test]
	fn zero_interval_is_invalid() {
		assert!(matches!(
			HarnessConfig::from_toml_str("[activation]\ninterval-ms = 0\n"),
			Err(ConfigError::Invalid(_))
		));
	}

	#[test]
	fn load_resolves_fixture_paths() {
		let tmp = tempfile::tempdir().unwrap();
		let path = tmp.path().join("vigil.toml");
		std::fs::write(&path, "[fixture]\ntarget = \"/abs/target.py\"\n").unwrap();

		let config = HarnessConfig::load(&path).unwrap();
		assert_eq!(config.fixture.target, PathBuf::from("/abs/target.py"));
		assert_eq!(config.fixture.before, tmp.path().join("test_data/project/myscript.unformatted"));
	}

	#[test]
	fn load_reports_missing_file() {
		let err = HarnessConfig::load(Path::new("/nonexistent/vigil.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}
}
