//! String formatting helpers for logs and hex values.

/// Shortens an identifier for log output: first 10 characters then "..".
///
/// Ten characters keeps the `0x` prefix plus four bytes of a hex value.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Strips a leading "0x"/"0X" if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}
