//! Signed withdrawals and nonce status.

use crate::apis::{engine_error, json_error, signature_param};
use crate::server::AppState;
use axum::extract::{rejection::JsonRejection, Path, State};
use axum::response::Json;
use vault_types::{
	APIError, Nonce, NonceStatusResponse, WithdrawRequest, WithdrawalRequest, WithdrawalResponse,
};

/// Handles POST /api/withdrawals.
pub async fn post_withdrawal(
	State(state): State<AppState>,
	body: Result<Json<WithdrawalRequest>, JsonRejection>,
) -> Result<Json<WithdrawalResponse>, APIError> {
	let Json(request) = body.map_err(json_error)?;
	let signature = signature_param(&request.signature)?;
	let request = WithdrawRequest::new(request.recipient, request.amount, request.nonce, signature);

	match state.vault.withdraw(request).await {
		Ok(receipt) => Ok(Json(WithdrawalResponse { receipt })),
		Err(e) => {
			tracing::warn!("Withdrawal request failed: {}", e);
			Err(engine_error(e))
		},
	}
}

/// Handles GET /api/nonces/{nonce}.
pub async fn get_nonce(
	State(state): State<AppState>,
	Path(nonce): Path<String>,
) -> Result<Json<NonceStatusResponse>, APIError> {
	let nonce: Nonce = nonce.parse().map_err(|e: vault_types::NonceParseError| APIError::BadRequest {
		error_type: "INVALID_NONCE".into(),
		message: e.to_string(),
	})?;
	Ok(Json(NonceStatusResponse {
		nonce,
		used: state.vault.is_nonce_used(&nonce).await,
	}))
}
