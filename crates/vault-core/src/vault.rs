//! The vault: pooled funds released only against signed authorizations.
//!
//! A withdrawal is honored when, in this order:
//!
//! 1. the amount is positive and covered by the balance,
//! 2. its nonce has never been consumed by this vault,
//! 3. the signature is well formed and recovers an identity,
//! 4. that identity is authorized in the bound registry at this moment.
//!
//! On success the nonce is consumed and the balance debited *before* funds
//! are handed to the [`ValueTransfer`], so a recipient calling back in sees
//! the withdrawal as already applied. If the transfer fails, every effect of
//! the call, nested ones included, is reverted.

use crate::registry::SignerRegistry;
use crate::signature::{recover_signer, SignatureError};
use crate::transfer::ValueTransfer;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use vault_types::{
	truncate_id, u256_serde, AuthorizationMessage, Nonce, VaultEvent, WithdrawReceipt,
	WithdrawRequest,
};

/// Coarse classification of a failed withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalErrorKind {
	InsufficientFunds,
	ReplayedAuthorization,
	MalformedSignature,
	UnauthorizedSigner,
	TransferFailed,
	BalanceOverflow,
}

impl fmt::Display for WithdrawalErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			WithdrawalErrorKind::InsufficientFunds => "InsufficientFunds",
			WithdrawalErrorKind::ReplayedAuthorization => "ReplayedAuthorization",
			WithdrawalErrorKind::MalformedSignature => "MalformedSignature",
			WithdrawalErrorKind::UnauthorizedSigner => "UnauthorizedSigner",
			WithdrawalErrorKind::TransferFailed => "TransferFailed",
			WithdrawalErrorKind::BalanceOverflow => "BalanceOverflow",
		};
		f.write_str(name)
	}
}

/// Errors returned by vault operations. A failed call leaves no trace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
	#[error("Insufficient vault balance")]
	InsufficientFunds { requested: U256, available: U256 },
	#[error("Authorization already used")]
	ReplayedAuthorization { nonce: Nonce },
	#[error("Invalid signature: {0}")]
	MalformedSignature(#[from] SignatureError),
	#[error("Unauthorized signer")]
	UnauthorizedSigner { signer: Address },
	#[error("Transfer failed: {0}")]
	TransferFailed(String),
	#[error("Vault balance overflow")]
	BalanceOverflow,
}

impl VaultError {
	pub fn kind(&self) -> WithdrawalErrorKind {
		match self {
			VaultError::InsufficientFunds { .. } => WithdrawalErrorKind::InsufficientFunds,
			VaultError::ReplayedAuthorization { .. } => WithdrawalErrorKind::ReplayedAuthorization,
			VaultError::MalformedSignature(_) => WithdrawalErrorKind::MalformedSignature,
			VaultError::UnauthorizedSigner { .. } => WithdrawalErrorKind::UnauthorizedSigner,
			VaultError::TransferFailed(_) => WithdrawalErrorKind::TransferFailed,
			VaultError::BalanceOverflow => WithdrawalErrorKind::BalanceOverflow,
		}
	}
}

/// Persistable vault state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
	#[serde(with = "u256_serde")]
	pub balance: U256,
	/// Consumed nonces in consumption order.
	pub used_nonces: Vec<Nonce>,
	/// Vault event log in call order.
	pub events: Vec<VaultEvent>,
}

/// Position in the vault's history that a later call can be rolled back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
	balance: U256,
	used_nonces: usize,
	events: usize,
}

/// Handle to the vault passed to a [`ValueTransfer`] while funds move.
pub trait VaultEntry {
	fn deposit(&mut self, from: Address, amount: U256) -> Result<U256, VaultError>;
	fn withdraw(&mut self, request: &WithdrawRequest) -> Result<WithdrawReceipt, VaultError>;
	fn balance(&self) -> U256;
}

pub struct Vault {
	chain_id: u64,
	address: Address,
	registry: Arc<dyn SignerRegistry>,
	transfer: Arc<dyn ValueTransfer>,
	state: VaultState,
	used: HashSet<Nonce>,
}

impl Vault {
	/// Creates an empty vault bound to `registry` for its whole lifetime.
	pub fn new(
		chain_id: u64,
		address: Address,
		registry: Arc<dyn SignerRegistry>,
		transfer: Arc<dyn ValueTransfer>,
	) -> Self {
		Self {
			chain_id,
			address,
			registry,
			transfer,
			state: VaultState::default(),
			used: HashSet::new(),
		}
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	pub fn address(&self) -> Address {
		self.address
	}

	/// The registry this vault was bound to at construction.
	pub fn registry(&self) -> &Arc<dyn SignerRegistry> {
		&self.registry
	}

	pub fn balance(&self) -> U256 {
		self.state.balance
	}

	pub fn is_nonce_used(&self, nonce: &Nonce) -> bool {
		self.used.contains(nonce)
	}

	pub fn events(&self) -> &[VaultEvent] {
		&self.state.events
	}

	pub fn state(&self) -> &VaultState {
		&self.state
	}

	/// Replaces the vault's state, e.g. with one recovered from storage.
	pub fn restore(&mut self, state: VaultState) {
		self.used = state.used_nonces.iter().copied().collect();
		self.state = state;
	}

	/// The message a signer must sign to release `amount` to `recipient`.
	pub fn authorization_message(&self, recipient: Address, amount: U256, nonce: Nonce) -> AuthorizationMessage {
		AuthorizationMessage::new(self.chain_id, self.address, recipient, amount, nonce)
	}

	/// Adds `amount` from `from` to the pool and returns the new balance.
	///
	/// Zero deposits are accepted and logged.
	pub fn deposit(&mut self, from: Address, amount: U256) -> Result<U256, VaultError> {
		let balance = self
			.state
			.balance
			.checked_add(amount)
			.ok_or(VaultError::BalanceOverflow)?;
		self.state.balance = balance;
		self.state.events.push(VaultEvent::Deposited { from, amount });

		tracing::debug!(
			component = "vault",
			from = %truncate_id(&from.to_string()),
			amount = %amount,
			balance = %balance,
			"Deposit accepted"
		);
		Ok(balance)
	}

	/// Releases funds against a signed authorization.
	pub fn withdraw(&mut self, request: &WithdrawRequest) -> Result<WithdrawReceipt, VaultError> {
		let WithdrawRequest {
			recipient,
			amount,
			nonce,
			signature,
		} = request;

		if amount.is_zero() || *amount > self.state.balance {
			return Err(VaultError::InsufficientFunds {
				requested: *amount,
				available: self.state.balance,
			});
		}
		if self.used.contains(nonce) {
			return Err(VaultError::ReplayedAuthorization { nonce: *nonce });
		}

		let message = self.authorization_message(*recipient, *amount, *nonce);
		let signer = recover_signer(&message, signature)?;
		if !self.registry.is_authorized(&signer) {
			return Err(VaultError::UnauthorizedSigner { signer });
		}

		let checkpoint = self.checkpoint();
		self.used.insert(*nonce);
		self.state.used_nonces.push(*nonce);
		self.state.balance -= *amount;

		let transfer = Arc::clone(&self.transfer);
		if let Err(e) = transfer.transfer(*recipient, *amount, self) {
			self.revert_to(checkpoint);
			tracing::warn!(
				component = "vault",
				nonce = %truncate_id(&nonce.to_string()),
				error = %e,
				"Transfer failed, withdrawal reverted"
			);
			return Err(VaultError::TransferFailed(e.to_string()));
		}

		self.state.events.push(VaultEvent::Withdrawn {
			recipient: *recipient,
			amount: *amount,
			nonce: *nonce,
		});

		tracing::debug!(
			component = "vault",
			recipient = %truncate_id(&recipient.to_string()),
			signer = %truncate_id(&signer.to_string()),
			nonce = %truncate_id(&nonce.to_string()),
			amount = %amount,
			"Withdrawal released"
		);

		Ok(WithdrawReceipt {
			recipient: *recipient,
			amount: *amount,
			nonce: *nonce,
			signer,
			digest: message.digest(),
			remaining_balance: self.state.balance,
		})
	}

	pub fn checkpoint(&self) -> Checkpoint {
		Checkpoint {
			balance: self.state.balance,
			used_nonces: self.state.used_nonces.len(),
			events: self.state.events.len(),
		}
	}

	/// Undoes everything recorded after `checkpoint`.
	///
	/// Only valid for a checkpoint taken from the current history, i.e. not
	/// across a [`Vault::restore`].
	pub fn revert_to(&mut self, checkpoint: Checkpoint) {
		for nonce in self.state.used_nonces.drain(checkpoint.used_nonces..) {
			self.used.remove(&nonce);
		}
		self.state.events.truncate(checkpoint.events);
		self.state.balance = checkpoint.balance;
	}
}

impl VaultEntry for Vault {
	fn deposit(&mut self, from: Address, amount: U256) -> Result<U256, VaultError> {
		Vault::deposit(self, from, amount)
	}

	fn withdraw(&mut self, request: &WithdrawRequest) -> Result<WithdrawReceipt, VaultError> {
		Vault::withdraw(self, request)
	}

	fn balance(&self) -> U256 {
		Vault::balance(self)
	}
}

impl fmt::Debug for Vault {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Vault")
			.field("chain_id", &self.chain_id)
			.field("address", &self.address)
			.field("balance", &self.state.balance)
			.field("used_nonces", &self.state.used_nonces.len())
			.finish()
	}
}
