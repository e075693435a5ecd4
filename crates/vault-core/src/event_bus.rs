//! Broadcast channel for committed vault and registry events.

use tokio::sync::broadcast;
use vault_types::VaultEvent;

/// Fan-out of [`VaultEvent`]s to any number of subscribers.
///
/// Publishing never waits on subscribers. A subscriber that falls more than
/// `capacity` events behind sees `RecvError::Lagged` and skips ahead.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<VaultEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
		self.sender.subscribe()
	}

	/// Publishes `event` and returns how many subscribers received it.
	pub fn publish(&self, event: VaultEvent) -> usize {
		match self.sender.send(event) {
			Ok(receivers) => receivers,
			// No subscribers: nothing to deliver.
			Err(_) => 0,
		}
	}
}
