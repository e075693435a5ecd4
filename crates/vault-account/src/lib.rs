//! Signing accounts for the vault.
//!
//! Withdrawal authorizations are produced off the vault's mutating path by an
//! account holding an authorized signer's key. This crate defines the account
//! interface and a local private-key implementation. The deployment engine
//! also uses the account's address as the deployer identity.

use async_trait::async_trait;
use thiserror::Error;
use vault_types::{Address, AuthorizationMessage, Bytes, ImplementationRegistry};

/// Built-in account implementations.
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The signer refused or failed to produce a signature.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The configured key is missing, malformed or not a valid scalar.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Any other failure inside an implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for account implementations.
///
/// An account owns one secp256k1 key. The vault never calls into an account
/// while mutating state; accounts only sign authorizations and report the
/// deployer address.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Address of the key held by this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs `message` with the EIP-191 personal-message prefix and returns the
	/// 65-byte `r || s || v` signature with `v` in {27, 28}.
	///
	/// # Errors
	///
	/// Returns [`AccountError::SigningFailed`] if the signer cannot sign.
	async fn sign_message(&self, message: &[u8]) -> Result<Bytes, AccountError>;

	/// Signs the digest of a withdrawal authorization.
	///
	/// The 32-byte digest itself is the personal message, which is what
	/// `signMessage(getBytes(hash))` produces in common wallet tooling.
	async fn sign_authorization(
		&self,
		message: &AuthorizationMessage,
	) -> Result<Bytes, AccountError> {
		self.sign_message(message.digest().as_slice()).await
	}
}

/// Type alias for account factory functions.
///
/// Every implementation provides one; it validates the implementation's
/// configuration table and builds the account.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations.
///
/// Returns `(name, factory)` for every built-in account implementation. The
/// service builds its factory map from this list.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Wraps the configured account implementation.
pub struct AccountService {
	/// The underlying account implementation.
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Retrieves the address of the configured account.
	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a withdrawal authorization with the configured account.
	///
	/// # Arguments
	///
	/// * `message` - The authorization tuple bound to one vault and chain
	///
	/// # Errors
	///
	/// Returns [`AccountError::SigningFailed`] if the implementation cannot
	/// sign.
	pub async fn sign_authorization(
		&self,
		message: &AuthorizationMessage,
	) -> Result<Bytes, AccountError> {
		self.implementation.sign_authorization(message).await
	}
}
