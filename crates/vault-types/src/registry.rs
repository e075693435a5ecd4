//! Self-registration of pluggable implementations.

/// Implemented by every storage and account implementation so the service can
/// look it up by the name used in configuration.
///
/// For example `memory` selects `[storage.implementations.memory]` and
/// `local` selects `[account.implementations.local]`.
pub trait ImplementationRegistry {
	/// Configuration name of the implementation.
	const NAME: &'static str;

	/// Factory signature of the component family.
	type Factory;

	fn factory() -> Self::Factory;
}
