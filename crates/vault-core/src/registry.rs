//! Authorization registry: the set of identities allowed to sign withdrawals.
//!
//! The registry is administered by a controller fixed at construction. The
//! vault only ever sees it through [`SignerRegistry`], which exposes the
//! membership query and nothing else.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use vault_types::{truncate_id, Address};

/// Errors returned by registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	#[error("Caller is not the controller")]
	AccessDenied { caller: Address },
}

/// Read-only view of the registry held by the vault.
#[cfg_attr(test, mockall::automock)]
pub trait SignerRegistry: Send + Sync {
	/// Returns whether `identity` may currently sign withdrawal authorizations.
	fn is_authorized(&self, identity: &Address) -> bool;
}

/// Persistable form of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
	pub controller: Address,
	pub signers: Vec<Address>,
}

/// Controller-administered set of authorized signers.
#[derive(Debug)]
pub struct AuthorizationRegistry {
	address: Address,
	controller: Address,
	signers: RwLock<HashSet<Address>>,
}

impl AuthorizationRegistry {
	/// Creates a registry with an empty signer set.
	pub fn new(address: Address, controller: Address) -> Self {
		Self::with_signers(address, controller, [])
	}

	/// Creates a registry seeded with `signers`.
	pub fn with_signers(
		address: Address,
		controller: Address,
		signers: impl IntoIterator<Item = Address>,
	) -> Self {
		Self {
			address,
			controller,
			signers: RwLock::new(signers.into_iter().collect()),
		}
	}

	pub fn from_snapshot(address: Address, snapshot: RegistrySnapshot) -> Self {
		Self::with_signers(address, snapshot.controller, snapshot.signers)
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn controller(&self) -> Address {
		self.controller
	}

	/// Authorizes `identity`. Returns `false` if it already was.
	pub fn add_signer(&self, caller: Address, identity: Address) -> Result<bool, RegistryError> {
		self.ensure_controller(caller)?;
		let added = self
			.signers
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(identity);
		if added {
			tracing::info!(
				component = "registry",
				signer = %truncate_id(&identity.to_string()),
				"Signer added"
			);
		}
		Ok(added)
	}

	/// Revokes `identity`. Returns `false` if it was not authorized.
	pub fn remove_signer(&self, caller: Address, identity: Address) -> Result<bool, RegistryError> {
		self.ensure_controller(caller)?;
		let removed = self
			.signers
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&identity);
		if removed {
			tracing::info!(
				component = "registry",
				signer = %truncate_id(&identity.to_string()),
				"Signer removed"
			);
		}
		Ok(removed)
	}

	/// Authorized signers in address order.
	pub fn signers(&self) -> Vec<Address> {
		let mut signers: Vec<Address> = self
			.signers
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.copied()
			.collect();
		signers.sort();
		signers
	}

	pub fn snapshot(&self) -> RegistrySnapshot {
		RegistrySnapshot {
			controller: self.controller,
			signers: self.signers(),
		}
	}

	/// Replaces the signer set, e.g. to undo a mutation that failed to persist.
	pub fn restore(&self, signers: impl IntoIterator<Item = Address>) {
		*self.signers.write().unwrap_or_else(PoisonError::into_inner) = signers.into_iter().collect();
	}

	fn ensure_controller(&self, caller: Address) -> Result<(), RegistryError> {
		if caller != self.controller {
			tracing::warn!(
				component = "registry",
				caller = %truncate_id(&caller.to_string()),
				"Rejected registry mutation from non-controller"
			);
			return Err(RegistryError::AccessDenied { caller });
		}
		Ok(())
	}
}

impl SignerRegistry for AuthorizationRegistry {
	fn is_authorized(&self, identity: &Address) -> bool {
		self.signers
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.contains(identity)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const REGISTRY: Address = Address::repeat_byte(0xaa);
	const CONTROLLER: Address = Address::repeat_byte(0x01);
	const ALICE: Address = Address::repeat_byte(0x02);
	const BOB: Address = Address::repeat_byte(0x03);

	#[test]
	fn test_controller_seeded_as_sole_signer() {
		let registry = AuthorizationRegistry::with_signers(REGISTRY, CONTROLLER, [CONTROLLER]);
		assert!(registry.is_authorized(&CONTROLLER));
		assert!(!registry.is_authorized(&ALICE));
		assert_eq!(registry.signers(), vec![CONTROLLER]);
	}

	#[test]
	fn test_add_and_remove_are_idempotent() {
		let registry = AuthorizationRegistry::new(REGISTRY, CONTROLLER);

		assert_eq!(registry.add_signer(CONTROLLER, ALICE), Ok(true));
		assert_eq!(registry.add_signer(CONTROLLER, ALICE), Ok(false));
		assert!(registry.is_authorized(&ALICE));

		assert_eq!(registry.remove_signer(CONTROLLER, ALICE), Ok(true));
		assert_eq!(registry.remove_signer(CONTROLLER, ALICE), Ok(false));
		assert!(!registry.is_authorized(&ALICE));
	}

	#[test]
	fn test_non_controller_cannot_mutate() {
		let registry = AuthorizationRegistry::with_signers(REGISTRY, CONTROLLER, [ALICE]);

		assert_eq!(
			registry.add_signer(ALICE, BOB),
			Err(RegistryError::AccessDenied { caller: ALICE })
		);
		assert_eq!(
			registry.remove_signer(BOB, ALICE),
			Err(RegistryError::AccessDenied { caller: BOB })
		);
		assert!(!registry.is_authorized(&BOB));
		assert!(registry.is_authorized(&ALICE));
		assert_eq!(
			RegistryError::AccessDenied { caller: BOB }.to_string(),
			"Caller is not the controller"
		);
	}

	#[test]
	fn test_multiple_signers_active_at_once() {
		let registry = AuthorizationRegistry::new(REGISTRY, CONTROLLER);
		registry.add_signer(CONTROLLER, BOB).unwrap();
		registry.add_signer(CONTROLLER, ALICE).unwrap();

		assert!(registry.is_authorized(&ALICE));
		assert!(registry.is_authorized(&BOB));
		assert_eq!(registry.signers(), vec![ALICE, BOB]);
	}

	#[test]
	fn test_controller_can_revoke_itself_explicitly() {
		let registry = AuthorizationRegistry::with_signers(REGISTRY, CONTROLLER, [CONTROLLER]);
		registry.add_signer(CONTROLLER, ALICE).unwrap();
		assert!(registry.is_authorized(&CONTROLLER));

		registry.remove_signer(CONTROLLER, CONTROLLER).unwrap();
		assert!(!registry.is_authorized(&CONTROLLER));
		// Still the controller.
		assert_eq!(registry.add_signer(CONTROLLER, BOB), Ok(true));
	}

	#[test]
	fn test_snapshot_round_trip() {
		let registry = AuthorizationRegistry::with_signers(REGISTRY, CONTROLLER, [BOB, ALICE]);
		let snapshot = registry.snapshot();
		let restored = AuthorizationRegistry::from_snapshot(REGISTRY, snapshot.clone());
		assert_eq!(restored.controller(), CONTROLLER);
		assert_eq!(restored.signers(), vec![ALICE, BOB]);

		restored.remove_signer(CONTROLLER, ALICE).unwrap();
		restored.restore(snapshot.signers);
		assert!(restored.is_authorized(&ALICE));
	}
}
