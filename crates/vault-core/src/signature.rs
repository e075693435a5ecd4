//! Signer recovery for withdrawal authorizations.
//!
//! Signatures are 65 bytes, `r || s || v`, over the EIP-191 personal-message
//! hash of the authorization digest. Only the canonical low-s form is
//! accepted, so each authorization has exactly one valid encoding.

use alloy_primitives::{uint, Address, PrimitiveSignature, U256};
use thiserror::Error;
use vault_types::AuthorizationMessage;

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Half the secp256k1 group order. Larger s-values are malleated duplicates.
pub const SECP256K1N_HALF: U256 =
	uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Reasons a signature cannot yield a signer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
	#[error("Expected {SIGNATURE_LEN}-byte signature, got {0} bytes")]
	InvalidLength(usize),
	#[error("Invalid recovery id {0}")]
	InvalidRecoveryId(u8),
	#[error("Non-canonical signature: s is in the upper half of the curve order")]
	HighS,
	#[error("Signature recovery failed: {0}")]
	Recovery(String),
	#[error("Signature recovers to the zero address")]
	ZeroAddress,
}

/// Recovers the identity that signed `message`.
///
/// Recovery id `v` may be given as 0/1 or 27/28.
pub fn recover_signer(message: &AuthorizationMessage, signature: &[u8]) -> Result<Address, SignatureError> {
	if signature.len() != SIGNATURE_LEN {
		return Err(SignatureError::InvalidLength(signature.len()));
	}

	let y_parity = match signature[64] {
		0 | 27 => false,
		1 | 28 => true,
		v => return Err(SignatureError::InvalidRecoveryId(v)),
	};
	let r = U256::from_be_slice(&signature[..32]);
	let s = U256::from_be_slice(&signature[32..64]);
	if s > SECP256K1N_HALF {
		return Err(SignatureError::HighS);
	}

	let signer = PrimitiveSignature::new(r, s, y_parity)
		.recover_address_from_prehash(&message.signing_hash())
		.map_err(|e| SignatureError::Recovery(e.to_string()))?;
	if signer.is_zero() {
		return Err(SignatureError::ZeroAddress);
	}
	Ok(signer)
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use vault_types::Nonce;

	/// secp256k1 group order.
	const SECP256K1N: U256 =
		uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

	fn signer() -> PrivateKeySigner {
		"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
			.parse()
			.unwrap()
	}

	fn message() -> AuthorizationMessage {
		AuthorizationMessage::new(
			31337,
			address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
			address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
			U256::from(1_000_000_000_000_000_000u128),
			Nonce::new([0x11; 32]),
		)
	}

	fn sign(message: &AuthorizationMessage) -> Vec<u8> {
		let sig = signer().sign_message_sync(message.digest().as_slice()).unwrap();
		sig.as_bytes().to_vec()
	}

	#[test]
	fn test_recovers_signer() {
		let sig = sign(&message());
		assert_eq!(
			recover_signer(&message(), &sig).unwrap(),
			address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
		);
	}

	#[test]
	fn test_accepts_both_recovery_id_forms() {
		let mut sig = sign(&message());
		let expected = recover_signer(&message(), &sig).unwrap();
		// as_bytes emits 27/28; 0/1 must recover the same identity.
		sig[64] -= 27;
		assert_eq!(recover_signer(&message(), &sig).unwrap(), expected);
	}

	#[test]
	fn test_different_message_recovers_different_identity() {
		let sig = sign(&message());
		let mut other = message();
		other.amount += U256::from(1);
		let recovered = recover_signer(&other, &sig);
		assert_ne!(recovered, Ok(signer().address()));
	}

	#[test]
	fn test_rejects_wrong_length() {
		let sig = sign(&message());
		assert_eq!(
			recover_signer(&message(), &sig[..64]),
			Err(SignatureError::InvalidLength(64))
		);
		assert_eq!(recover_signer(&message(), &[]), Err(SignatureError::InvalidLength(0)));
	}

	#[test]
	fn test_rejects_bad_recovery_id() {
		let mut sig = sign(&message());
		sig[64] = 2;
		assert_eq!(
			recover_signer(&message(), &sig),
			Err(SignatureError::InvalidRecoveryId(2))
		);
	}

	#[test]
	fn test_rejects_malleated_high_s() {
		let mut sig = sign(&message());
		let s = U256::from_be_slice(&sig[32..64]);
		let flipped = SECP256K1N - s;
		sig[32..64].copy_from_slice(&flipped.to_be_bytes::<32>());
		sig[64] = if sig[64] == 27 { 28 } else { 27 };
		assert_eq!(recover_signer(&message(), &sig), Err(SignatureError::HighS));
	}

	#[test]
	fn test_rejects_zeroed_signature() {
		let sig = [0u8; 65];
		assert!(matches!(
			recover_signer(&message(), &sig),
			Err(SignatureError::Recovery(_))
		));
	}
}
