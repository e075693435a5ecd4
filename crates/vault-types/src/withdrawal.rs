//! Withdrawal requests and receipts.

use crate::{Address, Bytes, Nonce, B256, U256};
use serde::{Deserialize, Serialize};

/// A request to release funds, carrying the authorization signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
	pub recipient: Address,
	#[serde(with = "crate::u256_serde")]
	pub amount: U256,
	pub nonce: Nonce,
	/// 65-byte `r || s || v` signature over the authorization message.
	pub signature: Bytes,
}

impl WithdrawRequest {
	pub fn new(recipient: Address, amount: U256, nonce: Nonce, signature: impl Into<Bytes>) -> Self {
		Self {
			recipient,
			amount,
			nonce,
			signature: signature.into(),
		}
	}
}

/// Proof that a withdrawal committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
	pub recipient: Address,
	#[serde(with = "crate::u256_serde")]
	pub amount: U256,
	pub nonce: Nonce,
	/// Identity recovered from the signature.
	pub signer: Address,
	/// Digest of the authorization message the signature covered.
	pub digest: B256,
	/// Vault balance after the withdrawal.
	#[serde(with = "crate::u256_serde")]
	pub remaining_balance: U256,
}
