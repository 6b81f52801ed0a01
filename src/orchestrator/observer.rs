//! Delivery notification hooks

use std::sync::Mutex;

use uuid::Uuid;

use crate::message::OutboundMessage;

/// Receives delivery notifications.
///
/// For each attempt exactly one of `on_sent`/`on_failed` fires, then
/// `on_completed`.
///
/// Callbacks run inline on the dispatching task and must not panic: a panic
/// unwinds out of `dispatch` and skips the remaining notifications,
/// `on_completed` included.
pub trait DeliveryObserver: Send + Sync {
    fn on_sent(&self, _message: &OutboundMessage, _server_response: &str) {}

    fn on_failed(&self, _message: &OutboundMessage, _reason: &str) {}

    fn on_completed(&self, _message: &OutboundMessage) {}
}

/// A notification as seen by [`EventLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    Sent {
        message_id: Uuid,
        server_response: String,
    },
    Failed {
        message_id: Uuid,
        reason: String,
    },
    Completed {
        message_id: Uuid,
    },
}

/// Observer that keeps every notification in order
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<DeliveryEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<DeliveryEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    fn record(&self, event: DeliveryEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl DeliveryObserver for EventLog {
    fn on_sent(&self, message: &OutboundMessage, server_response: &str) {
        self.record(DeliveryEvent::Sent {
            message_id: message.message_id(),
            server_response: server_response.to_string(),
        });
    }

    fn on_failed(&self, message: &OutboundMessage, reason: &str) {
        self.record(DeliveryEvent::Failed {
            message_id: message.message_id(),
            reason: reason.to_string(),
        });
    }

    fn on_completed(&self, message: &OutboundMessage) {
        self.record(DeliveryEvent::Completed {
            message_id: message.message_id(),
        });
    }
}
