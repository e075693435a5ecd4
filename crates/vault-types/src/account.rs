//! Identity and value primitives.
//!
//! Identities (controller, signers, recipients, the vault itself) are 20-byte
//! EVM addresses. Amounts and balances are unsigned 256-bit integers.

pub use alloy_primitives::{Address, Bytes, B256, U256};

/// Parses a `0x`-prefixed or bare hex address.
pub fn parse_address(value: &str) -> Result<Address, String> {
	value
		.trim()
		.parse::<Address>()
		.map_err(|e| format!("invalid address '{}': {}", value, e))
}
