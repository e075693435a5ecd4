//! Authorization registry administration.
//!
//! The caller identity is asserted in the request body, the way a
//! development node accepts calls from unlocked accounts.

use crate::apis::{address_param, engine_error, json_error};
use crate::server::AppState;
use axum::extract::{rejection::JsonRejection, Path, State};
use axum::response::Json;
use vault_types::{APIError, SignerStatusResponse, SignerUpdateRequest};

/// Handles GET /api/signers/{address}.
pub async fn get_signer(
	State(state): State<AppState>,
	Path(address): Path<String>,
) -> Result<Json<SignerStatusResponse>, APIError> {
	let signer = address_param(&address)?;
	Ok(Json(SignerStatusResponse {
		signer,
		authorized: state.vault.is_authorized(&signer),
	}))
}

/// Handles POST /api/signers.
pub async fn post_signer(
	State(state): State<AppState>,
	body: Result<Json<SignerUpdateRequest>, JsonRejection>,
) -> Result<Json<SignerStatusResponse>, APIError> {
	let Json(request) = body.map_err(json_error)?;
	state
		.vault
		.add_signer(request.caller, request.signer)
		.await
		.map_err(engine_error)?;
	Ok(Json(SignerStatusResponse {
		signer: request.signer,
		authorized: state.vault.is_authorized(&request.signer),
	}))
}

/// Handles DELETE /api/signers.
pub async fn delete_signer(
	State(state): State<AppState>,
	body: Result<Json<SignerUpdateRequest>, JsonRejection>,
) -> Result<Json<SignerStatusResponse>, APIError> {
	let Json(request) = body.map_err(json_error)?;
	state
		.vault
		.remove_signer(request.caller, request.signer)
		.await
		.map_err(engine_error)?;
	Ok(Json(SignerStatusResponse {
		signer: request.signer,
		authorized: state.vault.is_authorized(&request.signer),
	}))
}
