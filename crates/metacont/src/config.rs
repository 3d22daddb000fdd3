//! Configuration for the container registry and diagnostics.
//!
//! ```toml
//! [registry]
//! duplicate_policy = "last-wins"   # or "first-wins", "panic"
//!
//! [list]
//! max_sources = 16
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::registry::DuplicatePolicy;

/// Environment variable overriding [`RegistryConfig::duplicate_policy`].
pub const DUPLICATE_POLICY_ENV: &str = "METACONT_DUPLICATE_POLICY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub registry: RegistryConfig,
	pub list: ListConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
	pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListConfig {
	/// Cap on sources printed per container. Unlimited when absent.
	pub max_sources: Option<usize>,
}

impl Config {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Reads a TOML file and applies environment overrides.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		let mut config = Self::from_toml_str(&text)?;
		config.apply_env()?;
		Ok(config)
	}

	/// Applies [`DUPLICATE_POLICY_ENV`] if set.
	pub fn apply_env(&mut self) -> Result<(), ConfigError> {
		self.apply_overrides(|var| std::env::var(var).ok())
	}

	fn apply_overrides(&mut self, var: impl Fn(&'static str) -> Option<String>) -> Result<(), ConfigError> {
		if let Some(value) = var(DUPLICATE_POLICY_ENV) {
			self.registry.duplicate_policy = value.parse().map_err(|_| ConfigError::InvalidEnv {
				var: DUPLICATE_POLICY_ENV,
				value,
			})?;
		}
		Ok(())
	}

	/// Effective source cap for listings.
	pub fn max_sources(&self) -> usize {
		self.list.max_sources.unwrap_or(usize::MAX)
	}
}
