//! Core of the signed-withdrawal vault.
//!
//! Funds leave the [`Vault`] only against a signature, produced off the
//! record-keeping path by a signer the [`AuthorizationRegistry`] currently
//! trusts, over a message binding chain, vault, recipient, amount and a
//! single-use nonce. [`VaultEngine`] serializes callers, persists every
//! committed change and publishes events; [`VaultBuilder`] wires everything
//! from configuration.

pub mod builder;
pub mod engine;
pub mod event_bus;
pub mod registry;
pub mod signature;
pub mod transfer;
pub mod vault;

pub use builder::{BuilderError, Deployment, VaultBuilder, VaultFactories};
pub use engine::{EngineError, VaultEngine};
pub use event_bus::EventBus;
pub use registry::{AuthorizationRegistry, RegistryError, RegistrySnapshot, SignerRegistry};
pub use signature::{recover_signer, SignatureError};
pub use transfer::{CreditLedger, LedgerEntry, TransferError, ValueTransfer};
pub use vault::{Checkpoint, Vault, VaultEntry, VaultError, VaultState, WithdrawalErrorKind};
