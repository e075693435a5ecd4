//! Vault state, deposits and the event log.

use crate::apis::{address_param, engine_error, json_error};
use crate::server::AppState;
use axum::extract::{rejection::JsonRejection, Path, State};
use axum::response::Json;
use vault_types::{
	APIError, AccountBalanceResponse, DepositRequest, DepositResponse, EventsResponse,
	VaultInfoResponse,
};

/// Handles GET /api/vault.
pub async fn get_vault(State(state): State<AppState>) -> Json<VaultInfoResponse> {
	let registry = state.vault.registry();
	Json(VaultInfoResponse {
		chain_id: state.vault.chain_id().await,
		vault: state.vault.vault_address().await,
		registry: registry.address(),
		controller: registry.controller(),
		signers: registry.signers(),
		balance: state.vault.balance().await,
	})
}

/// Handles POST /api/deposits.
///
/// Any caller may deposit; `from` is recorded in the event log only.
pub async fn post_deposit(
	State(state): State<AppState>,
	body: Result<Json<DepositRequest>, JsonRejection>,
) -> Result<Json<DepositResponse>, APIError> {
	let Json(request) = body.map_err(json_error)?;
	let balance = state
		.vault
		.deposit(request.from, request.amount)
		.await
		.map_err(engine_error)?;
	Ok(Json(DepositResponse { balance }))
}

/// Handles GET /api/events.
pub async fn get_events(State(state): State<AppState>) -> Json<EventsResponse> {
	Json(EventsResponse {
		events: state.vault.events().await,
	})
}

/// Handles GET /api/accounts/{address}/balance.
pub async fn get_account_balance(
	State(state): State<AppState>,
	Path(address): Path<String>,
) -> Result<Json<AccountBalanceResponse>, APIError> {
	let address = address_param(&address)?;
	Ok(Json(AccountBalanceResponse {
		address,
		balance: state.vault.credited_balance(&address),
	}))
}
