//! Storage namespaces used by the vault engine.

/// Namespaces for persisted state.
///
/// Keys are formed as `<namespace>:<id>`, where the id is the address of the
/// component that owns the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Vault balance, used nonces and event log.
	Vault,
	/// Registry controller and signer set.
	Registry,
	/// Funds credited to recipients by the vault.
	Ledger,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Vault => "vault",
			StorageKey::Registry => "registry",
			StorageKey::Ledger => "ledger",
		}
	}
}
