//! Single-use withdrawal nonces.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A caller-chosen 32-byte token that binds one withdrawal intent.
///
/// Serialized as a `0x`-prefixed hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(B256);

/// Error returned when a nonce string is not 32 bytes of hex.
#[derive(Debug, Error)]
#[error("Invalid nonce '{0}': expected 32 bytes of hex")]
pub struct NonceParseError(pub String);

impl Nonce {
	pub const fn new(bytes: [u8; 32]) -> Self {
		Self(B256::new(bytes))
	}

	/// Draws a fresh nonce from the operating system's RNG.
	pub fn random() -> Self {
		Self(B256::random())
	}

	pub fn as_b256(&self) -> &B256 {
		&self.0
	}
}

impl From<B256> for Nonce {
	fn from(value: B256) -> Self {
		Self(value)
	}
}

impl From<Nonce> for B256 {
	fn from(value: Nonce) -> Self {
		value.0
	}
}

impl fmt::Display for Nonce {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for Nonce {
	type Err = NonceParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.trim()
			.parse::<B256>()
			.map(Self)
			.map_err(|_| NonceParseError(s.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_and_parse() {
		let nonce = Nonce::new([0x42; 32]);
		let text = nonce.to_string();
		assert!(text.starts_with("0x"));
		assert_eq!(text.len(), 66);
		assert_eq!(text.parse::<Nonce>().unwrap(), nonce);
	}

	#[test]
	fn test_parse_rejects_wrong_length() {
		assert!("0x1234".parse::<Nonce>().is_err());
	}

	#[test]
	fn test_random_nonces_differ() {
		assert_ne!(Nonce::random(), Nonce::random());
	}

	#[test]
	fn test_serde_is_hex_string() {
		let nonce = Nonce::new([0x01; 32]);
		let json = serde_json::to_string(&nonce).unwrap();
		assert_eq!(json, format!("\"{}\"", nonce));
	}
}
