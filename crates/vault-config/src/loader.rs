//! Multi-file configuration loading.
//!
//! The entry file may name other files through `include`. Included files are
//! merged at the top level; a section defined in two files is an error, as is
//! including a file twice (which also catches include cycles). Only the entry
//! file may include others.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub struct ConfigLoader {
	base_path: PathBuf,
	loaded_files: HashSet<PathBuf>,
	/// Which file each top-level section came from.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads `config_path` (relative to the base path) and its includes.
	pub async fn load_config(&mut self, config_path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let config_path = self.resolve_path(config_path)?;
		let content = self.load_file(&config_path).await?;
		let mut root: toml::Value = toml::from_str(&content)?;

		let includes = Self::take_includes(&mut root)?;
		if includes.is_empty() {
			return Config::from_resolved(&content);
		}

		self.record_sections(&root, &config_path)?;
		for include in includes {
			let include_path = self.resolve_path(&include)?;
			let include_content = self.load_file(&include_path).await?;
			let include_root: toml::Value = toml::from_str(&include_content)?;
			if include_root.get("include").is_some() {
				return Err(ConfigError::Validation(format!(
					"Nested include in {}: only the entry file may include others",
					include_path.display()
				)));
			}
			self.record_sections(&include_root, &include_path)?;

			if let (Some(target), toml::Value::Table(source)) = (root.as_table_mut(), include_root) {
				target.extend(source);
			}
		}

		let combined = toml::to_string(&root).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		Config::from_resolved(&combined)
	}

	/// Reads a file once and resolves environment variables in it.
	async fn load_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical_path = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical_path.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical_path.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	/// Removes the `include` key from `root` and returns the paths it listed.
	fn take_includes(root: &mut toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
		let Some(include) = root.as_table_mut().and_then(|t| t.remove("include")) else {
			return Ok(Vec::new());
		};

		match include {
			toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
			toml::Value::Array(items) => items
				.into_iter()
				.map(|item| match item {
					toml::Value::String(path) => Ok(PathBuf::from(path)),
					_ => Err(ConfigError::Validation(
						"Include array must contain only strings".into(),
					)),
				})
				.collect(),
			_ => Err(ConfigError::Validation(
				"Include must be a string or array of strings".into(),
			)),
		}
	}

	fn record_sections(&mut self, value: &toml::Value, source: &Path) -> Result<(), ConfigError> {
		let Some(table) = value.as_table() else {
			return Ok(());
		};
		for key in table.keys() {
			if let Some(existing) = self.section_sources.get(key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					existing.display(),
					source.display()
				)));
			}
			self.section_sources.insert(key.clone(), source.to_path_buf());
		}
		Ok(())
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const VAULT_SECTION: &str = r#"
[vault]
id = "local-vault"
chain_id = 31337
"#;

	const REST: &str = r#"
[storage]
primary = "memory"
[storage.implementations.memory]

[account]
primary = "local"
[account.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	#[tokio::test]
	async fn test_single_file_config() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("config.toml"), format!("{}{}", VAULT_SECTION, REST)).unwrap();

		let config = Config::from_file(dir.path().join("config.toml")).await.unwrap();
		assert_eq!(config.vault.id, "local-vault");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = [\"backends.toml\"]\n{}", VAULT_SECTION),
		)
		.unwrap();
		fs::write(dir.path().join("backends.toml"), REST).unwrap();

		let mut loader = ConfigLoader::new(dir.path());
		let config = loader.load_config("main.toml").await.unwrap();
		assert_eq!(config.vault.chain_id, 31337);
		assert_eq!(config.storage.primary, "memory");
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = \"dup.toml\"\n{}", VAULT_SECTION),
		)
		.unwrap();
		fs::write(dir.path().join("dup.toml"), VAULT_SECTION).unwrap();

		let mut loader = ConfigLoader::new(dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Duplicate section 'vault'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("self.toml"),
			format!("include = [\"self.toml\"]\n{}", VAULT_SECTION),
		)
		.unwrap();

		let mut loader = ConfigLoader::new(dir.path());
		let err = loader.load_config("self.toml").await.unwrap_err();
		assert!(err.to_string().contains("already loaded"));
	}

	#[tokio::test]
	async fn test_nested_include_rejected() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = [\"backends.toml\"]\n{}", VAULT_SECTION),
		)
		.unwrap();
		fs::write(
			dir.path().join("backends.toml"),
			format!("include = [\"more.toml\"]\n{}", REST),
		)
		.unwrap();
		fs::write(dir.path().join("more.toml"), "[api]\nenabled = false\n").unwrap();

		let mut loader = ConfigLoader::new(dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Nested include"));
	}

	#[tokio::test]
	async fn test_env_values_resolved_once() {
		std::env::set_var("VAULT_LOADER_ID", "${VAULT_LOADER_UNSET}");
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!(
				"[vault]\nid = \"${{VAULT_LOADER_ID}}\"\nchain_id = 31337\n{}",
				REST
			),
		)
		.unwrap();
		fs::write(
			dir.path().join("split.toml"),
			"include = [\"rest.toml\"]\n[vault]\nid = \"${VAULT_LOADER_ID}\"\nchain_id = 31337\n",
		)
		.unwrap();
		fs::write(dir.path().join("rest.toml"), REST).unwrap();

		let single = ConfigLoader::new(dir.path()).load_config("main.toml").await.unwrap();
		let merged = ConfigLoader::new(dir.path()).load_config("split.toml").await.unwrap();
		std::env::remove_var("VAULT_LOADER_ID");

		assert_eq!(single.vault.id, "${VAULT_LOADER_UNSET}");
		assert_eq!(merged.vault.id, "${VAULT_LOADER_UNSET}");
	}

	#[tokio::test]
	async fn test_missing_include_reported() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("main.toml"),
			format!("include = [\"absent.toml\"]\n{}", VAULT_SECTION),
		)
		.unwrap();

		let mut loader = ConfigLoader::new(dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("not found"));
	}
}
