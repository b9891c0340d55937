//! Configuration loading for the harness.
//!
//! A configuration file describes one network: endpoint, submission and
//! load-test settings, the lifecycle scenario and where the account book
//! lives. `${VAR_NAME}` placeholders are replaced from the environment before
//! parsing, and a handful of `HARNESS_*` variables override parsed values.

use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

pub mod types;

pub use types::*;

/// Decimal precision accepted for scenario tokens.
pub const MAX_TOKEN_DECIMALS: u8 = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

fn placeholder_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder pattern"))
}

/// Replaces `${VAR_NAME}` placeholders with environment values.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let mut result = content.to_string();

	for cap in placeholder_pattern().captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "HARNESS_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<HarnessConfig, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;

		let mut config = self.load_from_file(file_path).await?;

		self.apply_env_overrides(&mut config)?;

		// Relative account book paths follow the configuration file.
		if config.accounts.path.is_relative() {
			if let Some(parent) = file_path.parent() {
				config.accounts.path = parent.join(&config.accounts.path);
			}
		}

		validate_config(&config)?;

		info!(
			"Loaded configuration for {} from {}",
			config.network.name,
			file_path.display()
		);
		Ok(config)
	}

	async fn load_from_file(&self, file_path: &Path) -> Result<HarnessConfig, ConfigError> {
		let content = read_file(file_path).await?;
		let substituted = substitute_env_vars(&content)?;

		match file_path.extension().and_then(|s| s.to_str()) {
			Some("toml") | None => from_toml(&substituted),
			Some("json") => serde_json::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {}", e))),
			Some("yaml") | Some("yml") => serde_yaml::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(format!("Failed to parse YAML: {}", e))),
			Some(other) => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				other
			))),
		}
	}

	fn apply_env_overrides(&self, config: &mut HarnessConfig) -> Result<(), ConfigError> {
		if let Ok(url) = env::var(format!("{}RPC_URL", self.env_prefix)) {
			debug!("Overriding RPC URL from environment");
			config.network.rpc_url = Some(url);
		}

		if let Ok(max_retries) = env::var(format!("{}MAX_RETRIES", self.env_prefix)) {
			config.submission.max_retries = max_retries
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid max retries: {}", e)))?;
		}

		if let Ok(directory) = env::var(format!("{}REPORTS_DIR", self.env_prefix)) {
			config.reports.directory = PathBuf::from(directory);
		}

		Ok(())
	}

	/// Loads the account book referenced by a configuration.
	pub async fn load_accounts(path: &Path) -> Result<AccountBookConfig, ConfigError> {
		let content = read_file(path).await?;
		let substituted = substitute_env_vars(&content)?;
		let book: AccountBookConfig = toml::from_str(&substituted)
			.map_err(|e| ConfigError::ParseError(format!("Failed to parse account book: {}", e)))?;

		if book.roles.is_empty() {
			return Err(ConfigError::ValidationError(format!(
				"Account book {} defines no roles",
				path.display()
			)));
		}

		debug!("Loaded {} account roles", book.roles.len());
		Ok(book)
	}
}

async fn read_file(path: &Path) -> Result<String, ConfigError> {
	match tokio::fs::read_to_string(path).await {
		Ok(content) => Ok(content),
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			Err(ConfigError::FileNotFound(path.display().to_string()))
		}
		Err(e) => Err(ConfigError::IoError(e)),
	}
}

/// Parses a TOML configuration without validating it.
pub fn from_toml(contents: &str) -> Result<HarnessConfig, ConfigError> {
	toml::from_str(contents)
		.map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))
}

/// Checks cross-field constraints that serde cannot express.
pub fn validate_config(config: &HarnessConfig) -> Result<(), ConfigError> {
	let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

	let url = config.network.rpc_url();
	if !(url.starts_with("http://") || url.starts_with("https://")) {
		return invalid(format!("RPC URL must start with http:// or https://: {}", url));
	}

	if config.submission.max_retries == 0 {
		return invalid("submission.max_retries must be at least 1".to_string());
	}

	if config.submission.last_ledger_offset == 0 {
		return invalid("submission.last_ledger_offset must be at least 1".to_string());
	}

	if config.load_test.concurrency == 0 {
		return invalid("load_test.concurrency must be at least 1".to_string());
	}

	if !(0.0..=1.0).contains(&config.load_test.max_failure_rate) {
		return invalid(format!(
			"load_test.max_failure_rate must be between 0 and 1, got {}",
			config.load_test.max_failure_rate
		));
	}

	if config.scenario.decimals > MAX_TOKEN_DECIMALS {
		return invalid(format!(
			"scenario.decimals must be at most {}, got {}",
			MAX_TOKEN_DECIMALS, config.scenario.decimals
		));
	}

	if config.scenario.holders.is_empty() {
		return invalid("scenario.holders must name at least one account role".to_string());
	}

	Ok(())
}
