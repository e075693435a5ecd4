//! API types for the vault HTTP surface.
//!
//! Amounts are carried as decimal strings so clients in any language can
//! represent the full 256-bit range.

use crate::{Address, Nonce, VaultEvent, WithdrawReceipt, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/deposits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
	pub from: Address,
	#[serde(with = "crate::u256_serde")]
	pub amount: U256,
}

/// Body of `POST /api/withdrawals`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
	pub recipient: Address,
	#[serde(with = "crate::u256_serde")]
	pub amount: U256,
	pub nonce: Nonce,
	/// Hex `r || s || v`. Kept as text so that an undecodable signature is
	/// reported as a malformed signature rather than a malformed request.
	pub signature: String,
}

/// Body of `POST /api/signers` and `DELETE /api/signers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerUpdateRequest {
	/// Identity performing the change; must be the registry controller.
	pub caller: Address,
	pub signer: Address,
}

/// Response of `GET /api/vault`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultInfoResponse {
	#[serde(rename = "chainId")]
	pub chain_id: u64,
	pub vault: Address,
	pub registry: Address,
	pub controller: Address,
	pub signers: Vec<Address>,
	#[serde(with = "crate::u256_serde")]
	pub balance: U256,
}

/// Response of deposit requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositResponse {
	#[serde(with = "crate::u256_serde")]
	pub balance: U256,
}

/// Response of `POST /api/withdrawals`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalResponse {
	pub receipt: WithdrawReceipt,
}

/// Response of `GET /api/nonces/{nonce}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceStatusResponse {
	pub nonce: Nonce,
	pub used: bool,
}

/// Response of signer queries and updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerStatusResponse {
	pub signer: Address,
	pub authorized: bool,
}

/// Response of `GET /api/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
	pub events: Vec<VaultEvent>,
}

/// Response of `GET /api/accounts/{address}/balance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalanceResponse {
	pub address: Address,
	#[serde(with = "crate::u256_serde")]
	pub balance: U256,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error kind.
	pub error: String,
	/// Human-readable reason.
	pub message: String,
}

/// Structured API error with its HTTP status.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request (400).
	BadRequest { error_type: String, message: String },
	/// Caller or signer lacks the required authority (403).
	Forbidden { error_type: String, message: String },
	/// Request conflicts with consumed state, e.g. a replayed nonce (409).
	Conflict { error_type: String, message: String },
	/// Well-formed request the vault declines (422).
	UnprocessableEntity { error_type: String, message: String },
	/// Unexpected failure (500).
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Forbidden { .. } => 403,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message) = self.parts();
		ErrorResponse {
			error: error_type.to_string(),
			message: message.to_string(),
		}
	}

	fn parts(&self) -> (&str, &str) {
		match self {
			APIError::BadRequest { error_type, message }
			| APIError::Forbidden { error_type, message }
			| APIError::Conflict { error_type, message }
			| APIError::UnprocessableEntity { error_type, message }
			| APIError::InternalServerError { error_type, message } => {
				(error_type.as_str(), message.as_str())
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (error_type, message) = self.parts();
		write!(f, "{} ({}): {}", error_type, self.status_code(), message)
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
