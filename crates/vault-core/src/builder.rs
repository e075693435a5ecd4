//! Builds a [`VaultEngine`] from configuration.
//!
//! Storage and account implementations are created through factory maps.
//! The configured account is the deployer: unless addresses are given in
//! the configuration, the registry lives at the deployer's first contract
//! address and the vault at its second, and the deployer becomes both
//! controller and sole signer. When state for those addresses already
//! exists in storage the engine resumes from it.

use crate::engine::{load_state, EngineError, VaultEngine};
use crate::event_bus::EventBus;
use crate::registry::AuthorizationRegistry;
use crate::transfer::CreditLedger;
use crate::vault::Vault;
use alloy_primitives::Address;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use vault_account::{AccountError, AccountInterface, AccountService};
use vault_config::Config;
use vault_storage::{StorageError, StorageInterface, StorageService};

/// Capacity of the engine's event bus.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	#[error("Account error: {0}")]
	Account(#[from] AccountError),
	#[error(transparent)]
	Engine(#[from] EngineError),
}

/// Factory functions for the pluggable components, keyed by implementation name.
pub struct VaultFactories<SF, AF> {
	pub storage_factories: HashMap<String, SF>,
	pub account_factories: HashMap<String, AF>,
}

/// Resolved deployment parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
	pub deployer: Address,
	pub chain_id: u64,
	pub registry: Address,
	pub vault: Address,
	pub controller: Address,
	pub signers: Vec<Address>,
}

impl Deployment {
	/// Fills in everything `config` leaves open from the deployer identity.
	pub fn resolve(config: &Config, deployer: Address) -> Self {
		let registry = config.registry.address.unwrap_or_else(|| deployer.create(0));
		let vault = config.vault.address.unwrap_or_else(|| deployer.create(1));
		let controller = config.registry.controller.unwrap_or(deployer);
		let signers = config
			.registry
			.signers
			.clone()
			.unwrap_or_else(|| vec![deployer]);

		Self {
			deployer,
			chain_id: config.vault.chain_id,
			registry,
			vault,
			controller,
			signers,
		}
	}

	pub fn log_summary(&self, signers: &[Address]) {
		tracing::info!(
			chain_id = self.chain_id,
			vault = %self.vault,
			registry = %self.registry,
			controller = %self.controller,
			"Deployment summary"
		);
		for signer in signers {
			tracing::info!(signer = %signer, "Authorized signer");
		}
	}
}

/// Builder for a [`VaultEngine`].
pub struct VaultBuilder {
	config: Config,
}

impl VaultBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Creates the primary account service.
	pub fn account<AF>(&self, account_factories: &HashMap<String, AF>) -> Result<AccountService, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
	{
		let primary = &self.config.account.primary;
		let config = self.config.primary_account().ok_or_else(|| {
			BuilderError::Config(format!("Primary account '{}' is not configured", primary))
		})?;
		let factory = account_factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown account implementation '{}'", primary))
		})?;

		match factory(config) {
			Ok(implementation) => {
				tracing::info!(component = "account", implementation = %primary, "Loaded");
				Ok(AccountService::new(implementation))
			},
			Err(e) => {
				tracing::error!(
					component = "account",
					implementation = %primary,
					error = %e,
					"Failed to create account implementation"
				);
				Err(e.into())
			},
		}
	}

	/// Resolves the deployment for the configured account.
	pub async fn deployment(&self, account: &AccountService) -> Result<Deployment, BuilderError> {
		let deployer = account.get_address().await.inspect_err(|e| {
			tracing::error!(component = "account", error = %e, "Failed to get deployer address");
		})?;
		Ok(Deployment::resolve(&self.config, deployer))
	}

	/// Builds the engine, resuming from storage when state exists.
	pub async fn build<SF, AF>(self, factories: VaultFactories<SF, AF>) -> Result<VaultEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>,
	{
		let storage = Arc::new(self.storage(&factories.storage_factories)?);
		let account = self.account(&factories.account_factories)?;
		let deployment = self.deployment(&account).await?;

		let (state, snapshot, ledger_entries) =
			load_state(&storage, deployment.vault, deployment.registry).await?;

		let registry = match snapshot {
			Some(snapshot) => {
				if snapshot.controller != deployment.controller {
					if self.config.registry.controller.is_some() {
						return Err(BuilderError::Config(format!(
							"Registry at {} is controlled by {}, not the configured {}",
							deployment.registry, snapshot.controller, deployment.controller
						)));
					}
					tracing::warn!(
						component = "registry",
						controller = %snapshot.controller,
						"Persisted controller differs from the deployer; keeping persisted controller"
					);
				}
				tracing::debug!(
					component = "registry",
					signers = snapshot.signers.len(),
					"Restored signer set"
				);
				AuthorizationRegistry::from_snapshot(deployment.registry, snapshot)
			},
			None => AuthorizationRegistry::with_signers(
				deployment.registry,
				deployment.controller,
				deployment.signers.iter().copied(),
			),
		};
		let registry = Arc::new(registry);
		let ledger = Arc::new(CreditLedger::from_entries(ledger_entries));

		let mut vault = Vault::new(
			deployment.chain_id,
			deployment.vault,
			registry.clone(),
			ledger.clone(),
		);
		let fresh = state.is_none();
		if let Some(state) = state {
			tracing::info!(
				component = "vault",
				balance = %state.balance,
				used_nonces = state.used_nonces.len(),
				"Restored vault state"
			);
			vault.restore(state);
		}

		let signers = registry.signers();
		let engine = VaultEngine::new(
			self.config,
			vault,
			registry,
			ledger,
			storage,
			EventBus::new(EVENT_BUS_CAPACITY),
		);
		if fresh {
			engine.persist_all().await?;
			tracing::info!(component = "vault", "Deployed");
		}

		deployment.log_summary(&signers);
		Ok(engine)
	}

	fn storage<SF>(&self, storage_factories: &HashMap<String, SF>) -> Result<StorageService, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let primary = &self.config.storage.primary;
		let config = self.config.primary_storage().ok_or_else(|| {
			BuilderError::Config(format!("Primary storage '{}' is not configured", primary))
		})?;
		let factory = storage_factories.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("Unknown storage implementation '{}'", primary))
		})?;

		match factory(config) {
			Ok(backend) => {
				tracing::info!(component = "storage", implementation = %primary, "Loaded");
				Ok(StorageService::new(backend))
			},
			Err(e) => {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Failed to create storage implementation"
				);
				Err(e.into())
			},
		}
	}
}
