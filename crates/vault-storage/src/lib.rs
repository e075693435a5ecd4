//! Persistence for the vault's append-only state.
//!
//! The vault engine stores its balance, the used-nonce ledger, the registry's
//! signer set and recipient credits through this crate. Backends are plain
//! key/value stores; [`StorageService`] adds typed JSON access on top.
//! Entries never expire: a nonce that is forgotten could be replayed.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use vault_types::{ImplementationRegistry, StorageKey};

/// Built-in backends.
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The key has never been written.
	#[error("Not found")]
	NotFound,
	/// A stored value could not be encoded or decoded as JSON.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The backend failed to read or write, e.g. an I/O error.
	#[error("Backend error: {0}")]
	Backend(String),
	/// The backend's configuration table failed validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level byte store implemented by each backend.
///
/// Keys are opaque strings; [`StorageService`] builds them as
/// `<namespace>:<id>`. A successful `set_bytes` must be durable for
/// backends that claim to survive restarts.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	///
	/// # Errors
	///
	/// Returns [`StorageError::NotFound`] if the key was never written and
	/// [`StorageError::Backend`] if the backend cannot be read.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Creates or replaces the value stored under `key`.
	///
	/// # Errors
	///
	/// Returns [`StorageError::Backend`] if the write did not complete. The
	/// previous value, if any, is then still in place.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
}

/// Type alias for storage factory functions.
///
/// Every backend provides one; it validates the backend's configuration
/// table and builds the backend.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns `(name, factory)` for every built-in backend. The service builds
/// its factory map from this list.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Typed storage on top of a backend.
///
/// Values are JSON-encoded and addressed by `<namespace>:<id>`.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: StorageKey, id: &str) -> String {
		format!("{}:{}", namespace.as_str(), id)
	}

	/// Creates or overwrites a value.
	///
	/// # Arguments
	///
	/// * `namespace` - Which kind of record this is
	/// * `id` - Record identifier within the namespace, usually an address
	/// * `data` - Value to serialize as JSON
	///
	/// # Errors
	///
	/// Returns [`StorageError::Serialization`] if `data` cannot be encoded,
	/// or the backend's error if the write fails.
	pub async fn store<T: Serialize>(
		&self,
		namespace: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Retrieves and deserializes a value.
	///
	/// # Errors
	///
	/// Returns [`StorageError::NotFound`] if nothing is stored under the key
	/// and [`StorageError::Serialization`] if the stored bytes are not a
	/// valid `T`.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: StorageKey,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Like [`retrieve`](Self::retrieve) but maps `NotFound` to `None`.
	pub async fn retrieve_optional<T: DeserializeOwned>(
		&self,
		namespace: StorageKey,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Snapshot {
		balance: String,
		nonces: Vec<String>,
	}

	#[tokio::test]
	async fn test_store_and_retrieve_typed_value() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let snapshot = Snapshot {
			balance: "9".into(),
			nonces: vec!["0xab".into()],
		};

		service
			.store(StorageKey::Vault, "0xvault", &snapshot)
			.await
			.unwrap();
		let loaded: Snapshot = service.retrieve(StorageKey::Vault, "0xvault").await.unwrap();
		assert_eq!(loaded, snapshot);
		// Namespaces do not collide.
		let other: Option<Snapshot> = service
			.retrieve_optional(StorageKey::Registry, "0xvault")
			.await
			.unwrap();
		assert!(other.is_none());
	}

	#[tokio::test]
	async fn test_retrieve_optional_maps_not_found() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let missing: Option<Snapshot> = service
			.retrieve_optional(StorageKey::Ledger, "nothing")
			.await
			.unwrap();
		assert!(missing.is_none());
	}

	#[tokio::test]
	async fn test_corrupt_value_is_serialization_error() {
		let backend = MemoryStorage::new();
		backend
			.set_bytes("vault:0xvault", b"not json".to_vec())
			.await
			.unwrap();
		let service = StorageService::new(Box::new(backend));
		let result: Result<Snapshot, _> = service.retrieve(StorageKey::Vault, "0xvault").await;
		assert!(matches!(result, Err(StorageError::Serialization(_))));
	}
}
