//! Local private-key account.

use crate::{AccountError, AccountFactory, AccountInterface, AccountRegistry};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use vault_types::{
	validate_private_key, Address, Bytes, ConfigSchema, Field, FieldType, ImplementationRegistry,
	Schema, SecretString, ValidationError,
};

/// Account backed by a private key held in process memory.
pub struct LocalAccount {
	signer: PrivateKeySigner,
}

impl LocalAccount {
	/// Builds an account from a hex private key, with or without `0x`.
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer = private_key.with_exposed(|key| {
			key.trim()
				.parse::<PrivateKeySigner>()
				.map_err(|e| AccountError::InvalidKey(e.to_string()))
		})?;
		Ok(Self { signer })
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Bytes, AccountError> {
		let signature = self
			.signer
			.sign_message(message)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(Bytes::copy_from_slice(&signature.as_bytes()))
	}
}

pub struct LocalAccountSchema;

impl ConfigSchema for LocalAccountSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(validate_private_key)],
			vec![],
		);
		schema.validate(config)
	}
}

/// Creates a local account.
///
/// Configuration parameters:
/// - `private_key`: hex private key (required)
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalAccountSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".into()))?;

	Ok(Box::new(LocalAccount::new(&private_key)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl AccountRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, U256};
	use vault_types::{AuthorizationMessage, Nonce};

	// Well-known development key #0.
	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn config(key: &str) -> toml::Value {
		toml::from_str(&format!("private_key = \"{}\"", key)).unwrap()
	}

	#[tokio::test]
	async fn test_address_from_key() {
		let account = create_account(&config(DEV_KEY)).unwrap();
		assert_eq!(
			account.address().await.unwrap(),
			address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
		);
	}

	#[tokio::test]
	async fn test_key_without_prefix_accepted() {
		let bare = create_account(&config(&DEV_KEY[2..])).unwrap();
		let prefixed = create_account(&config(DEV_KEY)).unwrap();
		assert_eq!(
			bare.address().await.unwrap(),
			prefixed.address().await.unwrap()
		);
	}

	#[test]
	fn test_invalid_key_rejected() {
		assert!(matches!(
			create_account(&config("0x1234")),
			Err(AccountError::InvalidKey(_))
		));
	}

	#[tokio::test]
	async fn test_authorization_signature_shape() {
		let account = LocalAccount::new(&SecretString::from(DEV_KEY)).unwrap();
		let message = AuthorizationMessage::new(
			31337,
			address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
			address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
			U256::from(1u64),
			Nonce::new([7u8; 32]),
		);

		let signature = account.sign_authorization(&message).await.unwrap();
		assert_eq!(signature.len(), 65);
		assert!(signature[64] == 27 || signature[64] == 28);

		// Same bytes as signing the digest as a personal message.
		let direct = account
			.sign_message(message.digest().as_slice())
			.await
			.unwrap();
		assert_eq!(signature, direct);
	}
}
