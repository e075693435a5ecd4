//! Configuration for the vault service.
//!
//! Configuration is TOML. Values may reference environment variables as
//! `${VAR}` or `${VAR:-default}`, and a file may pull in others with
//! `include = ["a.toml", "b.toml"]` as long as every top-level section is
//! defined exactly once across all files.

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use vault_types::Address;

pub use loader::ConfigLoader;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub vault: VaultConfig,
	#[serde(default)]
	pub registry: RegistryConfig,
	pub storage: StorageConfig,
	pub account: AccountConfig,
	pub api: Option<ApiConfig>,
}

/// Identity of the vault deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
	/// Name used in logs.
	pub id: String,
	/// Chain identifier bound into every authorization message.
	pub chain_id: u64,
	/// Explicit vault address. Derived from the deployer when absent.
	pub address: Option<Address>,
}

/// Authorization registry deployment parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RegistryConfig {
	/// Explicit registry address. Derived from the deployer when absent.
	pub address: Option<Address>,
	/// Controller identity. Defaults to the deployer.
	pub controller: Option<Address>,
	/// Initially authorized signers. Defaults to the deployer alone.
	pub signers: Option<Vec<Address>>,
}

/// Storage backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Account selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// HTTP API server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Replaces `${VAR}` and `${VAR:-default}` with environment values.
///
/// Input is capped at 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads a configuration file, following `include` directives.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path
			.parent()
			.filter(|p| !p.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."));
		let file_name = path
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path.display())))?;

		let mut loader = ConfigLoader::new(base_dir);
		loader.load_config(file_name).await
	}

	/// Configuration table of the primary storage implementation.
	pub fn primary_storage(&self) -> Option<&toml::Value> {
		self.storage.implementations.get(&self.storage.primary)
	}

	/// Configuration table of the primary account implementation.
	pub fn primary_account(&self) -> Option<&toml::Value> {
		self.account.implementations.get(&self.account.primary)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.vault.id.trim().is_empty() {
			return Err(ConfigError::Validation("Vault ID cannot be empty".into()));
		}
		if self.vault.chain_id == 0 {
			return Err(ConfigError::Validation(
				"vault.chain_id must be greater than 0".into(),
			));
		}
		if self.vault.address == Some(Address::ZERO) {
			return Err(ConfigError::Validation(
				"vault.address cannot be the zero address".into(),
			));
		}

		self.validate_registry()?;

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.primary_storage().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if self.account.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one account implementation must be configured".into(),
			));
		}
		if self.primary_account().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary account '{}' not found in implementations",
				self.account.primary
			)));
		}

		if let Some(api) = self.api.as_ref().filter(|api| api.enabled) {
			if api.port == 0 {
				return Err(ConfigError::Validation("api.port cannot be 0".into()));
			}
			if api.host.trim().is_empty() {
				return Err(ConfigError::Validation("api.host cannot be empty".into()));
			}
		}

		Ok(())
	}

	fn validate_registry(&self) -> Result<(), ConfigError> {
		let registry = &self.registry;
		if registry.controller == Some(Address::ZERO) {
			return Err(ConfigError::Validation(
				"registry.controller cannot be the zero address".into(),
			));
		}
		if registry.address.is_some() && registry.address == self.vault.address {
			return Err(ConfigError::Validation(
				"registry.address and vault.address must differ".into(),
			));
		}
		if let Some(signers) = &registry.signers {
			let mut seen = HashSet::new();
			for signer in signers {
				if signer.is_zero() {
					return Err(ConfigError::Validation(
						"registry.signers cannot contain the zero address".into(),
					));
				}
				if !seen.insert(signer) {
					return Err(ConfigError::Validation(format!(
						"registry.signers lists {} more than once",
						signer
					)));
				}
			}
		}
		Ok(())
	}
}

/// Parses a configuration string: resolves environment variables, then
/// deserializes and validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_resolved(&resolve_env_vars(s)?)
	}
}

impl Config {
	/// Deserializes and validates text whose variables are already resolved.
	///
	/// Resolution happens exactly once, so an environment value that itself
	/// contains `${...}` is kept literally.
	pub(crate) fn from_resolved(resolved: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[vault]
id = "local-vault"
chain_id = 31337

[storage]
primary = "memory"
[storage.implementations.memory]

[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	#[test]
	fn test_minimal_config_defaults() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.vault.chain_id, 31337);
		assert!(config.vault.address.is_none());
		assert!(config.registry.controller.is_none());
		assert!(config.registry.signers.is_none());
		assert!(config.api.is_none());
		assert!(config.primary_account().is_some());
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("VAULT_TEST_HOST", "localhost");
		std::env::set_var("VAULT_TEST_PORT", "8545");

		let result = resolve_env_vars("url = \"${VAULT_TEST_HOST}:${VAULT_TEST_PORT}\"").unwrap();
		assert_eq!(result, "url = \"localhost:8545\"");

		std::env::remove_var("VAULT_TEST_HOST");
		std::env::remove_var("VAULT_TEST_PORT");
	}

	#[test]
	fn test_env_var_default_and_missing() {
		let result = resolve_env_vars("key = \"${VAULT_MISSING_VAR:-fallback}\"").unwrap();
		assert_eq!(result, "key = \"fallback\"");

		let err = resolve_env_vars("key = \"${VAULT_MISSING_VAR}\"").unwrap_err();
		assert!(err.to_string().contains("VAULT_MISSING_VAR"));
	}

	#[test]
	fn test_registry_and_api_sections() {
		let config_str = format!(
			r#"{}
[registry]
controller = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
signers = [
	"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
	"0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
]

[api]
enabled = true
port = 8080
"#,
			BASE
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.registry.signers.as_ref().map(Vec::len), Some(2));
		let api = config.api.unwrap();
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);
	}

	#[test]
	fn test_zero_chain_id_rejected() {
		let err = BASE
			.replace("chain_id = 31337", "chain_id = 0")
			.parse::<Config>()
			.unwrap_err();
		assert!(err.to_string().contains("chain_id"));
	}

	#[test]
	fn test_unknown_primary_storage_rejected() {
		let err = BASE
			.replace("primary = \"memory\"", "primary = \"file\"")
			.parse::<Config>()
			.unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'file' not found"));
	}

	#[test]
	fn test_duplicate_signer_rejected() {
		let config_str = format!(
			r#"{}
[registry]
signers = [
	"0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
	"0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
]
"#,
			BASE
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("more than once"));
	}

	#[test]
	fn test_zero_controller_rejected() {
		let config_str = format!(
			"{}\n[registry]\ncontroller = \"0x0000000000000000000000000000000000000000\"\n",
			BASE
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("zero address"));
	}
}
