//! Request handlers for the vault API.
//!
//! Handlers translate engine errors into [`APIError`]s with the status
//! codes clients key on: 403 when authority is missing, 409 for a consumed
//! nonce, 422 for requests the vault declines and 400 for malformed input.

pub mod signers;
pub mod vault;
pub mod withdrawal;

use axum::extract::rejection::JsonRejection;
use vault_core::{EngineError, RegistryError, VaultError};
use vault_types::{parse_address, APIError, Address, Bytes};

/// Maps an engine failure to its API error.
pub fn engine_error(error: EngineError) -> APIError {
	let message = error.to_string();
	match error {
		EngineError::Vault(e) => match e {
			VaultError::InsufficientFunds { .. } => APIError::UnprocessableEntity {
				error_type: "INSUFFICIENT_FUNDS".into(),
				message,
			},
			VaultError::MalformedSignature(_) => APIError::UnprocessableEntity {
				error_type: "MALFORMED_SIGNATURE".into(),
				message,
			},
			VaultError::ReplayedAuthorization { .. } => APIError::Conflict {
				error_type: "REPLAYED_AUTHORIZATION".into(),
				message,
			},
			VaultError::UnauthorizedSigner { .. } => APIError::Forbidden {
				error_type: "UNAUTHORIZED_SIGNER".into(),
				message,
			},
			VaultError::TransferFailed(_) => APIError::InternalServerError {
				error_type: "TRANSFER_FAILED".into(),
				message,
			},
			VaultError::BalanceOverflow => APIError::InternalServerError {
				error_type: "BALANCE_OVERFLOW".into(),
				message,
			},
		},
		EngineError::Registry(RegistryError::AccessDenied { .. }) => APIError::Forbidden {
			error_type: "ACCESS_DENIED".into(),
			message,
		},
		EngineError::Storage(_) => APIError::InternalServerError {
			error_type: "STORAGE_ERROR".into(),
			message,
		},
	}
}

/// Maps a rejected JSON body to a 400.
pub fn json_error(rejection: JsonRejection) -> APIError {
	APIError::BadRequest {
		error_type: "INVALID_REQUEST".into(),
		message: rejection.body_text(),
	}
}

/// Decodes a hex signature from a request body.
///
/// Undecodable input is reported the same way the vault reports a signature
/// it cannot parse.
pub fn signature_param(value: &str) -> Result<Bytes, APIError> {
	alloy_primitives::hex::decode(value.trim())
		.map(Bytes::from)
		.map_err(|e| APIError::UnprocessableEntity {
			error_type: "MALFORMED_SIGNATURE".into(),
			message: format!("Invalid signature: {}", e),
		})
}

/// Parses an address path segment.
pub fn address_param(value: &str) -> Result<Address, APIError> {
	parse_address(value).map_err(|message| APIError::BadRequest {
		error_type: "INVALID_ADDRESS".into(),
		message,
	})
}
