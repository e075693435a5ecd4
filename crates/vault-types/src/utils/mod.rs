//! Formatting and serde helpers shared across the vault crates.

pub mod formatting;

pub use formatting::{truncate_id, without_0x_prefix};

/// Serde module for decimal-string U256 values.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(s.trim(), 10).map_err(D::Error::custom)
	}
}
