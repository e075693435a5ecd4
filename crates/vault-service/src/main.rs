//! Entry point for the vault service.
//!
//! `vault run` deploys the registry and vault (or resumes them from storage)
//! and serves the HTTP API when enabled. `vault sign` produces a withdrawal
//! authorization with the configured account for the configured vault.

use alloy_primitives::{Address, U256};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use vault_account::AccountFactory;
use vault_config::Config;
use vault_core::{VaultBuilder, VaultEngine, VaultFactories};
use vault_storage::StorageFactory;
use vault_types::{parse_address, AuthorizationMessage, Nonce};

mod apis;
mod server;

/// Command-line arguments for the vault service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, global = true, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, global = true, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Deploy or resume the vault and serve the API (default)
	Run,
	/// Sign a withdrawal authorization with the configured account
	Sign {
		/// Address that receives the funds
		#[arg(long, value_parser = parse_address)]
		recipient: Address,

		/// Amount in wei (decimal or 0x-prefixed hex)
		#[arg(long, value_parser = parse_amount)]
		amount: U256,

		/// 32-byte hex nonce; random when omitted
		#[arg(long)]
		nonce: Option<Nonce>,
	},
}

fn parse_amount(value: &str) -> Result<U256, String> {
	value
		.parse::<U256>()
		.map_err(|e| format!("Invalid amount '{}': {}", value, e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	// RUST_LOG wins over --log-level
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.vault.id);

	match args.command.unwrap_or(Command::Run) {
		Command::Run => run(config).await,
		Command::Sign {
			recipient,
			amount,
			nonce,
		} => sign(config, recipient, amount, nonce.unwrap_or_else(Nonce::random)).await,
	}
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
	let engine = Arc::new(build_vault(config.clone()).await?);

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			tokio::select! {
				result = server::start_server(api_config, Arc::clone(&engine)) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Received shutdown signal");
				}
			}
		},
		None => {
			tracing::info!("API disabled; vault state is persisted, waiting for shutdown");
			tokio::signal::ctrl_c().await?;
		},
	}

	tracing::info!("Stopped vault");
	Ok(())
}

/// Prints the authorization the configured account signs for `recipient`.
async fn sign(
	config: Config,
	recipient: Address,
	amount: U256,
	nonce: Nonce,
) -> Result<(), Box<dyn std::error::Error>> {
	let builder = VaultBuilder::new(config);
	let account = builder.account(&account_factories())?;
	let deployment = builder.deployment(&account).await?;

	let message = AuthorizationMessage::new(
		deployment.chain_id,
		deployment.vault,
		recipient,
		amount,
		nonce,
	);
	let signature = account.sign_authorization(&message).await?;

	let output = serde_json::json!({
		"chainId": deployment.chain_id,
		"vault": deployment.vault,
		"signer": deployment.deployer,
		"recipient": recipient,
		"amount": amount.to_string(),
		"nonce": nonce,
		"digest": message.digest(),
		"signature": signature,
	});
	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}

/// Collects registered `(name, factory)` pairs into a lookup map.
fn factory_map<F>(kind: &str, implementations: Vec<(&'static str, F)>) -> HashMap<String, F> {
	implementations
		.into_iter()
		.map(|(name, factory)| {
			tracing::debug!("Registering {} implementation: {}", kind, name);
			(name.to_string(), factory)
		})
		.collect()
}

fn account_factories() -> HashMap<String, AccountFactory> {
	factory_map("account", vault_account::get_all_implementations())
}

fn storage_factories() -> HashMap<String, StorageFactory> {
	factory_map("storage", vault_storage::get_all_implementations())
}

/// Builds the vault engine with all available implementations.
async fn build_vault(config: Config) -> Result<VaultEngine, Box<dyn std::error::Error>> {
	let factories = VaultFactories {
		storage_factories: storage_factories(),
		account_factories: account_factories(),
	};

	Ok(VaultBuilder::new(config).build(factories).await?)
}
