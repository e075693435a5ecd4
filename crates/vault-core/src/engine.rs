//! Async front of the vault.
//!
//! [`VaultEngine`] owns the [`Vault`] behind a single async mutex, which puts
//! every state-changing call from every caller into one total order. Each
//! committed change is written to storage while the lock is still held and
//! only then acknowledged and published on the event bus. If the write
//! fails, the in-memory change is undone and the caller gets the storage
//! error.

use crate::event_bus::EventBus;
use crate::registry::{AuthorizationRegistry, RegistryError, RegistrySnapshot, SignerRegistry};
use crate::transfer::{CreditLedger, LedgerEntry};
use crate::vault::{Vault, VaultError, VaultState};
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use vault_config::Config;
use vault_storage::{StorageError, StorageService};
use vault_types::{
	truncate_id, AuthorizationMessage, Nonce, StorageKey, VaultEvent, WithdrawReceipt,
	WithdrawRequest,
};

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error(transparent)]
	Vault(#[from] VaultError),
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Serialized, persistent access to one vault and its registry.
pub struct VaultEngine {
	config: Config,
	vault: Mutex<Vault>,
	registry: Arc<AuthorizationRegistry>,
	ledger: Arc<CreditLedger>,
	storage: Arc<StorageService>,
	event_bus: EventBus,
}

impl VaultEngine {
	/// Wraps an already wired vault.
	///
	/// `vault` must have been constructed over `registry` and `ledger`.
	pub fn new(
		config: Config,
		vault: Vault,
		registry: Arc<AuthorizationRegistry>,
		ledger: Arc<CreditLedger>,
		storage: Arc<StorageService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			config,
			vault: Mutex::new(vault),
			registry,
			ledger,
			storage,
			event_bus,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn registry(&self) -> &AuthorizationRegistry {
		&self.registry
	}

	pub async fn chain_id(&self) -> u64 {
		self.vault.lock().await.chain_id()
	}

	pub async fn vault_address(&self) -> Address {
		self.vault.lock().await.address()
	}

	pub async fn balance(&self) -> U256 {
		self.vault.lock().await.balance()
	}

	pub async fn is_nonce_used(&self, nonce: &Nonce) -> bool {
		self.vault.lock().await.is_nonce_used(nonce)
	}

	pub async fn events(&self) -> Vec<VaultEvent> {
		self.vault.lock().await.events().to_vec()
	}

	pub fn is_authorized(&self, identity: &Address) -> bool {
		self.registry.is_authorized(identity)
	}

	/// Funds released to `account` so far.
	pub fn credited_balance(&self, account: &Address) -> U256 {
		self.ledger.balance_of(account)
	}

	/// The message a signer must sign for this vault.
	pub async fn authorization_message(
		&self,
		recipient: Address,
		amount: U256,
		nonce: Nonce,
	) -> AuthorizationMessage {
		self.vault
			.lock()
			.await
			.authorization_message(recipient, amount, nonce)
	}

	/// Deposits `amount` from `from` and returns the new balance.
	pub async fn deposit(&self, from: Address, amount: U256) -> Result<U256, EngineError> {
		let mut vault = self.vault.lock().await;
		let checkpoint = vault.checkpoint();
		let events_before = vault.events().len();

		let balance = vault.deposit(from, amount).inspect_err(|e| {
			tracing::warn!(component = "engine", error = %e, "Deposit rejected");
		})?;

		if let Err(e) = self.store_vault(vault.state(), vault.address()).await {
			vault.revert_to(checkpoint);
			tracing::error!(component = "engine", error = %e, "Failed to persist deposit, reverted");
			return Err(e.into());
		}

		tracing::info!(
			component = "engine",
			from = %truncate_id(&from.to_string()),
			amount = %amount,
			balance = %balance,
			"Deposited"
		);
		self.publish_since(&vault, events_before);
		Ok(balance)
	}

	/// Executes a signed withdrawal.
	pub async fn withdraw(&self, request: WithdrawRequest) -> Result<WithdrawReceipt, EngineError> {
		let mut vault = self.vault.lock().await;
		let checkpoint = vault.checkpoint();
		let events_before = vault.events().len();
		let ledger_before = self.ledger.entries();

		let receipt = match vault.withdraw(&request) {
			Ok(receipt) => receipt,
			Err(e) => {
				tracing::warn!(
					component = "engine",
					kind = %e.kind(),
					nonce = %truncate_id(&request.nonce.to_string()),
					recipient = %truncate_id(&request.recipient.to_string()),
					error = %e,
					"Withdrawal rejected"
				);
				return Err(e.into());
			},
		};

		// Nonces go to storage before credits: a crash in between can lose a
		// credit but never re-enable a spent authorization.
		let address = vault.address();
		let persisted = match self.store_vault(vault.state(), address).await {
			Ok(()) => self.store_ledger(address).await,
			Err(e) => Err(e),
		};
		if let Err(e) = persisted {
			vault.revert_to(checkpoint);
			self.ledger.restore(ledger_before);
			tracing::error!(
				component = "engine",
				nonce = %truncate_id(&request.nonce.to_string()),
				error = %e,
				"Failed to persist withdrawal, reverted"
			);
			if let Err(rewrite) = self.store_vault(vault.state(), address).await {
				tracing::error!(component = "engine", error = %rewrite, "Failed to rewrite vault state after revert");
			}
			return Err(e.into());
		}

		tracing::info!(
			component = "engine",
			recipient = %truncate_id(&receipt.recipient.to_string()),
			signer = %truncate_id(&receipt.signer.to_string()),
			nonce = %truncate_id(&receipt.nonce.to_string()),
			amount = %receipt.amount,
			remaining = %receipt.remaining_balance,
			"Withdrawn"
		);
		self.publish_since(&vault, events_before);
		Ok(receipt)
	}

	/// Authorizes `signer` on behalf of `caller`. Returns whether the set changed.
	pub async fn add_signer(&self, caller: Address, signer: Address) -> Result<bool, EngineError> {
		self.update_signers(caller, signer, true).await
	}

	/// Revokes `signer` on behalf of `caller`. Returns whether the set changed.
	pub async fn remove_signer(&self, caller: Address, signer: Address) -> Result<bool, EngineError> {
		self.update_signers(caller, signer, false).await
	}

	async fn update_signers(
		&self,
		caller: Address,
		signer: Address,
		add: bool,
	) -> Result<bool, EngineError> {
		// Registry changes share the vault's total order.
		let _vault = self.vault.lock().await;
		let before = self.registry.signers();

		let result = if add {
			self.registry.add_signer(caller, signer)
		} else {
			self.registry.remove_signer(caller, signer)
		};
		let changed = result.inspect_err(|e| {
			tracing::warn!(
				component = "engine",
				caller = %truncate_id(&caller.to_string()),
				error = %e,
				"Registry update rejected"
			);
		})?;
		if !changed {
			return Ok(false);
		}

		if let Err(e) = self.store_registry().await {
			self.registry.restore(before);
			tracing::error!(component = "engine", error = %e, "Failed to persist registry, reverted");
			return Err(e.into());
		}

		let event = if add {
			VaultEvent::SignerAdded { signer }
		} else {
			VaultEvent::SignerRemoved { signer }
		};
		tracing::info!(
			component = "engine",
			event = event.name(),
			signer = %truncate_id(&signer.to_string()),
			"Registry updated"
		);
		self.event_bus.publish(event);
		Ok(true)
	}

	/// Writes the full current state. Used once after deployment.
	pub async fn persist_all(&self) -> Result<(), EngineError> {
		let vault = self.vault.lock().await;
		self.store_vault(vault.state(), vault.address()).await?;
		self.store_ledger(vault.address()).await?;
		self.store_registry().await?;
		Ok(())
	}

	async fn store_vault(&self, state: &VaultState, address: Address) -> Result<(), StorageError> {
		self.storage
			.store(StorageKey::Vault, &address.to_string(), state)
			.await
	}

	async fn store_ledger(&self, vault: Address) -> Result<(), StorageError> {
		self.storage
			.store(StorageKey::Ledger, &vault.to_string(), &self.ledger.entries())
			.await
	}

	async fn store_registry(&self) -> Result<(), StorageError> {
		let snapshot: RegistrySnapshot = self.registry.snapshot();
		self.storage
			.store(StorageKey::Registry, &self.registry.address().to_string(), &snapshot)
			.await
	}

	fn publish_since(&self, vault: &Vault, from: usize) {
		for event in vault.events().iter().skip(from) {
			self.event_bus.publish(event.clone());
		}
	}
}

/// Loads persisted state for a vault at `vault` bound to `registry`.
pub(crate) async fn load_state(
	storage: &StorageService,
	vault: Address,
	registry: Address,
) -> Result<(Option<VaultState>, Option<RegistrySnapshot>, Vec<LedgerEntry>), StorageError> {
	let state = storage
		.retrieve_optional(StorageKey::Vault, &vault.to_string())
		.await?;
	let snapshot = storage
		.retrieve_optional(StorageKey::Registry, &registry.to_string())
		.await?;
	let ledger = storage
		.retrieve_optional(StorageKey::Ledger, &vault.to_string())
		.await?
		.unwrap_or_default();
	Ok((state, snapshot, ledger))
}
