//! In-memory storage backend.
//!
//! Nothing survives a restart, so this backend suits tests and throwaway
//! development nodes only.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use vault_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};

#[derive(Default)]
pub struct MemoryStorage {
	store: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.store.write().await.insert(key.to_string(), value);
		Ok(())
	}
}

/// The memory backend takes no options.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		storage.set_bytes("vault:a", b"one".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes("vault:a").await.unwrap(), b"one".to_vec());

		storage.set_bytes("vault:a", b"two".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes("vault:a").await.unwrap(), b"two".to_vec());

		assert!(matches!(
			storage.get_bytes("vault:b").await,
			Err(StorageError::NotFound)
		));
	}

	#[test]
	fn test_factory_rejects_non_table() {
		assert!(create_storage(&toml::Value::String("x".into())).is_err());
	}
}
