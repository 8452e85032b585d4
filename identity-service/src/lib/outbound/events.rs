use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::events::AuthenticationEvent;
use crate::domain::events::EventPublisher;
use crate::domain::events::EventPublisherError;

/// In-process event bus on a broadcast channel.
///
/// Publishing never waits for subscribers. A subscriber that falls more than
/// `capacity` events behind loses the oldest ones.
pub struct BroadcastEventBus {
    sender: broadcast::Sender<AuthenticationEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthenticationEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventBus {
    async fn publish(&self, event: &AuthenticationEvent) -> Result<(), EventPublisherError> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                tracing::debug!(
                    event_id = %event.event_id,
                    event_type = event.event_type(),
                    receivers,
                    "Authentication event published"
                );
            }
            Err(_) => {
                tracing::trace!(event_type = event.event_type(), "No subscribers for authentication event");
            }
        }

        Ok(())
    }
}
