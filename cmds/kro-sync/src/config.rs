//! Configuration file support for kro-sync
//!
//! Supports `.kro-sync.yaml` files placed anywhere in the directory hierarchy.
//! kro-sync searches from the working directory upward to the filesystem root,
//! unless a file is given explicitly with `--config`.

use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

/// The name of the config file kro-sync looks for
pub const CONFIG_FILE_NAME: &str = ".kro-sync.yaml";

/// Root configuration structure for .kro-sync.yaml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SyncConfig {
	#[serde(default)]
	pub control_plane: ControlPlaneConfig,
}

/// How the AWS control plane is reached
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ControlPlaneConfig {
	/// AWS CLI binary to invoke, `aws` from `PATH` if unset
	#[serde(default)]
	pub aws_cli: Option<PathBuf>,

	/// Named profile passed as `--profile`
	#[serde(default)]
	pub profile: Option<String>,

	/// Limit for a single control-plane call
	#[serde(default)]
	pub timeout_seconds: Option<u64>,
}

impl ControlPlaneConfig {
	pub fn timeout(&self) -> Option<Duration> {
		self.timeout_seconds.map(Duration::from_secs)
	}
}

impl SyncConfig {
	/// Load config by searching from the given directory upward
	pub fn load_from_directory(start_dir: &Path) -> Result<Option<Self>> {
		if let Some(config_path) = find_config_file(start_dir) {
			let config = Self::load_from_file(&config_path)?;
			Ok(Some(config))
		} else {
			Ok(None)
		}
	}

	/// Load config from a specific file path
	pub fn load_from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file: {}", path.display()))?;
		let config: SyncConfig = serde_yaml_with_quirks::from_str(&content)
			.with_context(|| format!("failed to parse config file: {}", path.display()))?;
		Ok(config)
	}

	/// Explicit file if given, otherwise the nearest one above `start_dir`,
	/// otherwise defaults.
	pub fn resolve(explicit: Option<&Path>, start_dir: &Path) -> Result<Self> {
		match explicit {
			Some(path) => Self::load_from_file(path),
			None => Ok(Self::load_from_directory(start_dir)?.unwrap_or_default()),
		}
	}
}

/// Search for a config file starting from `start_dir` and walking up to the filesystem root
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	let mut current = start_dir.to_path_buf();

	// Canonicalize if possible to handle relative paths
	if let Ok(canonical) = current.canonicalize() {
		current = canonical;
	}

	loop {
		let config_path = current.join(CONFIG_FILE_NAME);
		if config_path.is_file() {
			return Some(config_path);
		}
		if !current.pop() {
			return None;
		}
	}
}
