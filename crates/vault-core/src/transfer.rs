//! Value transfer seam between the vault and whatever receives released funds.
//!
//! The vault debits itself and consumes the nonce before calling
//! [`ValueTransfer::transfer`]. The transfer gets a [`VaultEntry`] handle to
//! the vault so that a recipient may call back in while the transfer is in
//! flight; the vault's checks already reflect the in-flight withdrawal.

use crate::vault::VaultEntry;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use vault_types::u256_serde;

/// Errors raised while delivering released funds.
#[derive(Debug, Error)]
pub enum TransferError {
	#[error("Recipient rejected the transfer: {0}")]
	Rejected(String),
	#[error("Recipient balance overflow")]
	Overflow,
}

/// Delivers released funds to a recipient.
pub trait ValueTransfer: Send + Sync {
	/// Moves `amount` to `recipient`.
	///
	/// An error undoes the whole withdrawal, including anything done through
	/// `vault` during the call.
	fn transfer(
		&self,
		recipient: Address,
		amount: U256,
		vault: &mut dyn VaultEntry,
	) -> Result<(), TransferError>;
}

/// One recipient's accumulated credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
	pub account: Address,
	#[serde(with = "u256_serde")]
	pub amount: U256,
}

/// Records released funds as per-recipient credit.
///
/// Never calls back into the vault.
#[derive(Debug, Default)]
pub struct CreditLedger {
	credits: RwLock<HashMap<Address, U256>>,
}

impl CreditLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
		Self {
			credits: RwLock::new(entries.into_iter().map(|e| (e.account, e.amount)).collect()),
		}
	}

	/// Total credited to `account` so far.
	pub fn balance_of(&self, account: &Address) -> U256 {
		self.credits
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(account)
			.copied()
			.unwrap_or_default()
	}

	/// Entries in account order.
	pub fn entries(&self) -> Vec<LedgerEntry> {
		let mut entries: Vec<LedgerEntry> = self
			.credits
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.map(|(account, amount)| LedgerEntry {
				account: *account,
				amount: *amount,
			})
			.collect();
		entries.sort_by_key(|e| e.account);
		entries
	}

	/// Replaces all credits with `entries`.
	pub fn restore(&self, entries: Vec<LedgerEntry>) {
		*self.credits.write().unwrap_or_else(PoisonError::into_inner) =
			entries.into_iter().map(|e| (e.account, e.amount)).collect();
	}
}

impl ValueTransfer for CreditLedger {
	fn transfer(
		&self,
		recipient: Address,
		amount: U256,
		_vault: &mut dyn VaultEntry,
	) -> Result<(), TransferError> {
		let mut credits = self.credits.write().unwrap_or_else(PoisonError::into_inner);
		let balance = credits.entry(recipient).or_default();
		*balance = balance.checked_add(amount).ok_or(TransferError::Overflow)?;
		Ok(())
	}
}
