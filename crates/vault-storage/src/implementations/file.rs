//! File-backed storage.
//!
//! Each key maps to one `.json` file under the configured directory. Writes go
//! to a temporary file that is then renamed over the target, so a crash never
//! leaves a half-written nonce ledger behind.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use vault_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};

const DEFAULT_STORAGE_PATH: &str = "./data/vault";

pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a key such as `vault:0xabc` to `<base>/vault_0xabc.json`.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', '\\', ':'], "_");
		self.base_path.join(format!("{}.json", safe_key))
	}
}

fn backend_error(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.get_file_path(key)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(backend_error(e)),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(backend_error)?;

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value).await.map_err(backend_error)?;
		fs::rename(&temp_path, &path).await.map_err(backend_error)?;

		tracing::trace!(key = %key, path = %path.display(), "Wrote storage entry");
		Ok(())
	}
}

pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if !path.trim().is_empty() => Ok(()),
						_ => Err("storage_path cannot be empty".to_string()),
					}
				}),
			],
		);
		schema.validate(config)
	}
}

/// Creates a file backend.
///
/// Configuration parameters:
/// - `storage_path`: directory for the state files (default: "./data/vault")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
