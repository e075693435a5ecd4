//! Events emitted by the vault and the authorization registry.
//!
//! Vault events are kept in the vault's own ordered log (call order) and are
//! part of its persisted state. All events are also published on the engine's
//! event bus once the operation that produced them has committed.

use crate::{Address, Nonce, U256};
use serde::{Deserialize, Serialize};

/// Records produced by state-changing vault and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
	/// Value was added to the vault.
	Deposited {
		from: Address,
		#[serde(with = "crate::u256_serde")]
		amount: U256,
	},
	/// An authorized withdrawal released funds.
	Withdrawn {
		recipient: Address,
		#[serde(with = "crate::u256_serde")]
		amount: U256,
		nonce: Nonce,
	},
	/// The controller authorized a new signer.
	SignerAdded { signer: Address },
	/// The controller revoked a signer.
	SignerRemoved { signer: Address },
}

impl VaultEvent {
	/// Short name used in logs.
	pub fn name(&self) -> &'static str {
		match self {
			VaultEvent::Deposited { .. } => "Deposited",
			VaultEvent::Withdrawn { .. } => "Withdrawn",
			VaultEvent::SignerAdded { .. } => "SignerAdded",
			VaultEvent::SignerRemoved { .. } => "SignerRemoved",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_withdrawn_serializes_with_tag_and_decimal_amount() {
		let event = VaultEvent::Withdrawn {
			recipient: Address::repeat_byte(0x01),
			amount: U256::from(1_000u64),
			nonce: Nonce::new([0x02; 32]),
		};
		let json = serde_json::to_value(&event).unwrap();
		assert_eq!(json["event"], "withdrawn");
		assert_eq!(json["amount"], "1000");
	}
}
