//! HTTP server for the vault API.

use crate::apis;
use axum::{
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use vault_config::ApiConfig;
use vault_core::VaultEngine;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub vault: Arc<VaultEngine>,
}

/// Builds the router with every route under `/api`.
pub fn router(vault: Arc<VaultEngine>) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/vault", get(apis::vault::get_vault))
				.route("/deposits", post(apis::vault::post_deposit))
				.route("/events", get(apis::vault::get_events))
				.route("/withdrawals", post(apis::withdrawal::post_withdrawal))
				.route("/nonces/{nonce}", get(apis::withdrawal::get_nonce))
				.route(
					"/signers",
					post(apis::signers::post_signer).delete(apis::signers::delete_signer),
				)
				.route("/signers/{address}", get(apis::signers::get_signer))
				.route(
					"/accounts/{address}/balance",
					get(apis::vault::get_account_balance),
				),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { vault })
}

/// Serves the API until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	vault: Arc<VaultEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(vault);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Vault API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::{Method, Request, StatusCode};
	use serde_json::{json, Value};
	use tower::ServiceExt;
	use vault_account::implementations::local::LocalAccount;
	use vault_account::AccountService;
	use vault_config::Config;
	use vault_core::{VaultBuilder, VaultFactories};
	use vault_types::{Address, Nonce, U256};

	const DEPLOYER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const OTHER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const DEPLOYER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
	const OTHER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

	async fn app() -> (Router, Arc<VaultEngine>) {
		let config: Config = format!(
			r#"
[vault]
id = "api-test"
chain_id = 31337

[storage]
primary = "memory"
[storage.implementations.memory]

[account]
primary = "local"
[account.implementations.local]
private_key = "{DEPLOYER_KEY}"
"#
		)
		.parse()
		.unwrap();
		let factories = VaultFactories {
			storage_factories: crate::storage_factories(),
			account_factories: crate::account_factories(),
		};
		let engine = Arc::new(VaultBuilder::new(config).build(factories).await.unwrap());
		(router(engine.clone()), engine)
	}

	fn account(key: &str) -> AccountService {
		AccountService::new(Box::new(LocalAccount::new(&key.into()).unwrap()))
	}

	async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
		let builder = Request::builder().method(method).uri(uri);
		let request = match body {
			Some(body) => builder
				.header("content-type", "application/json")
				.body(Body::from(body.to_string()))
				.unwrap(),
			None => builder.body(Body::empty()).unwrap(),
		};
		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	async fn withdrawal_body(
		engine: &VaultEngine,
		signer: &AccountService,
		recipient: &str,
		amount: u64,
		nonce: Nonce,
	) -> Value {
		let recipient: Address = recipient.parse().unwrap();
		let message = engine
			.authorization_message(recipient, U256::from(amount), nonce)
			.await;
		let signature = signer.sign_authorization(&message).await.unwrap();
		json!({
			"recipient": recipient,
			"amount": amount.to_string(),
			"nonce": nonce,
			"signature": signature,
		})
	}

	#[tokio::test]
	async fn test_vault_info() {
		let (app, _) = app().await;
		let (status, body) = send(&app, Method::GET, "/api/vault", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["chainId"], 31337);
		assert_eq!(body["balance"], "0");
		assert_eq!(
			body["vault"].as_str().unwrap().to_lowercase(),
			"0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"
		);
		assert_eq!(body["signers"].as_array().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_deposit_withdraw_replay() {
		let (app, engine) = app().await;
		let deployer = account(DEPLOYER_KEY);

		let (status, body) = send(
			&app,
			Method::POST,
			"/api/deposits",
			Some(json!({ "from": OTHER, "amount": "10" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["balance"], "10");

		let nonce = Nonce::new([7; 32]);
		let request = withdrawal_body(&engine, &deployer, OTHER, 1, nonce).await;

		let (status, body) = send(&app, Method::POST, "/api/withdrawals", Some(request.clone())).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["receipt"]["remaining_balance"], "9");

		let (status, body) = send(&app, Method::POST, "/api/withdrawals", Some(request)).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(body["error"], "REPLAYED_AUTHORIZATION");
		assert_eq!(body["message"], "Authorization already used");

		let (_, body) = send(&app, Method::GET, &format!("/api/nonces/{}", nonce), None).await;
		assert_eq!(body["used"], true);

		let (_, body) = send(&app, Method::GET, &format!("/api/accounts/{}/balance", OTHER), None).await;
		assert_eq!(body["balance"], "1");

		let (_, body) = send(&app, Method::GET, "/api/events", None).await;
		let events = body["events"].as_array().unwrap();
		assert_eq!(events.len(), 2);
		assert_eq!(events[1]["event"], "withdrawn");
	}

	#[tokio::test]
	async fn test_withdrawal_rejections() {
		let (app, engine) = app().await;
		engine.deposit(DEPLOYER.parse().unwrap(), U256::from(5)).await.unwrap();

		let by_other = withdrawal_body(&engine, &account(OTHER_KEY), OTHER, 1, Nonce::new([1; 32])).await;
		let (status, body) = send(&app, Method::POST, "/api/withdrawals", Some(by_other)).await;
		assert_eq!(status, StatusCode::FORBIDDEN);
		assert_eq!(body["message"], "Unauthorized signer");

		let too_much = withdrawal_body(&engine, &account(DEPLOYER_KEY), OTHER, 6, Nonce::new([2; 32])).await;
		let (status, body) = send(&app, Method::POST, "/api/withdrawals", Some(too_much)).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["message"], "Insufficient vault balance");

		let mut truncated = withdrawal_body(&engine, &account(DEPLOYER_KEY), OTHER, 1, Nonce::new([3; 32])).await;
		truncated["signature"] = json!("0x1234");
		let (status, body) = send(&app, Method::POST, "/api/withdrawals", Some(truncated)).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "MALFORMED_SIGNATURE");

		// Signatures that are not even hex are malformed signatures too.
		for undecodable in ["0xnothex", "0x123"] {
			let mut bad = withdrawal_body(&engine, &account(DEPLOYER_KEY), OTHER, 1, Nonce::new([4; 32])).await;
			bad["signature"] = json!(undecodable);
			let (status, body) = send(&app, Method::POST, "/api/withdrawals", Some(bad)).await;
			assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
			assert_eq!(body["error"], "MALFORMED_SIGNATURE");
		}
		assert!(!engine.is_nonce_used(&Nonce::new([4; 32])).await);

		let (status, _) = send(
			&app,
			Method::POST,
			"/api/withdrawals",
			Some(json!({ "recipient": OTHER, "amount": "one" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);

		assert_eq!(engine.balance().await, U256::from(5));
	}

	#[tokio::test]
	async fn test_signer_management() {
		let (app, _) = app().await;

		let (status, body) = send(
			&app,
			Method::POST,
			"/api/signers",
			Some(json!({ "caller": OTHER, "signer": OTHER })),
		)
		.await;
		assert_eq!(status, StatusCode::FORBIDDEN);
		assert_eq!(body["message"], "Caller is not the controller");

		let (status, body) = send(
			&app,
			Method::POST,
			"/api/signers",
			Some(json!({ "caller": DEPLOYER, "signer": OTHER })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["authorized"], true);

		let (_, body) = send(&app, Method::GET, &format!("/api/signers/{}", OTHER), None).await;
		assert_eq!(body["authorized"], true);

		let (status, body) = send(
			&app,
			Method::DELETE,
			"/api/signers",
			Some(json!({ "caller": DEPLOYER, "signer": OTHER })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["authorized"], false);
	}

	#[tokio::test]
	async fn test_bad_path_parameters() {
		let (app, _) = app().await;
		let (status, body) = send(&app, Method::GET, "/api/nonces/0x1234", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_NONCE");

		let (status, body) = send(&app, Method::GET, "/api/signers/not-an-address", None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_ADDRESS");
	}
}
