//! Common types for the signed-withdrawal vault.
//!
//! This crate defines the data shared by every vault component: identities,
//! nonces, the canonical authorization message, events and receipts, storage
//! keys, configuration schemas and the HTTP API payloads.

/// Identity and value primitives.
pub mod account;
/// API request/response types for the HTTP surface.
pub mod api;
/// Canonical withdrawal authorization message and its digest.
pub mod authorization;
/// Events emitted by the vault and the authorization registry.
pub mod events;
/// Single-use withdrawal nonces.
pub mod nonce;
/// Self-registration trait for pluggable implementations.
pub mod registry;
/// Redacting wrapper for private keys.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// Helpers for formatting and serde.
pub mod utils;
/// Configuration schema validation.
pub mod validation;
/// Withdrawal requests and receipts.
pub mod withdrawal;

pub use account::*;
pub use api::*;
pub use authorization::{AuthorizationEncoder, AuthorizationMessage};
pub use events::*;
pub use nonce::{Nonce, NonceParseError};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{truncate_id, u256_serde, without_0x_prefix};
pub use validation::*;
pub use withdrawal::*;
