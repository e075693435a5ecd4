//! Canonical withdrawal authorization message.
//!
//! A withdrawal is authorized by a signature over the keccak-256 hash of the
//! ABI encoding of `(uint256 chainId, address vault, address recipient,
//! uint256 amount, bytes32 nonce)`. Every field is a static type, so the
//! encoding is five 32-byte words. Signers apply the EIP-191 personal-message
//! prefix to that hash before signing; see [`AuthorizationMessage::signing_hash`].

use crate::Nonce;
use alloy_primitives::{eip191_hash_message, keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

/// The five values a withdrawal signature is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationMessage {
	/// Chain the vault lives on.
	pub chain_id: u64,
	/// Address of the vault instance that may honor the authorization.
	pub vault: Address,
	/// Address that receives the funds.
	pub recipient: Address,
	/// Exact amount to release.
	#[serde(with = "crate::u256_serde")]
	pub amount: U256,
	/// Single-use token.
	pub nonce: Nonce,
}

impl AuthorizationMessage {
	/// Length of the encoded message in bytes.
	pub const ENCODED_LEN: usize = 5 * 32;

	pub fn new(chain_id: u64, vault: Address, recipient: Address, amount: U256, nonce: Nonce) -> Self {
		Self {
			chain_id,
			vault,
			recipient,
			amount,
			nonce,
		}
	}

	/// Returns the ABI encoding of the message fields in their fixed order.
	pub fn encode(&self) -> Vec<u8> {
		let mut enc = AuthorizationEncoder::with_capacity(Self::ENCODED_LEN);
		enc.push_u256(U256::from(self.chain_id));
		enc.push_address(&self.vault);
		enc.push_address(&self.recipient);
		enc.push_u256(self.amount);
		enc.push_b256(self.nonce.as_b256());
		enc.finish()
	}

	/// keccak256 of the encoded message. This is the value handed to the signer.
	pub fn digest(&self) -> B256 {
		keccak256(self.encode())
	}

	/// The hash that is actually signed:
	/// `keccak256("\x19Ethereum Signed Message:\n32" || digest)`.
	pub fn signing_hash(&self) -> B256 {
		eip191_hash_message(self.digest())
	}
}

/// Minimal ABI encoder for the static word types used by the message.
pub struct AuthorizationEncoder {
	buf: Vec<u8>,
}

impl Default for AuthorizationEncoder {
	fn default() -> Self {
		Self::with_capacity(AuthorizationMessage::ENCODED_LEN)
	}
}

impl AuthorizationEncoder {
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			buf: Vec::with_capacity(capacity),
		}
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	/// Addresses are left-padded with 12 zero bytes.
	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}
