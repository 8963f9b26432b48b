use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::json;

use crate::config::LoggerConfig;
use crate::events::{EmitReport, Event, EventBus, SubscriptionId};

/// Event raised by [`Logger::log`]
pub const MESSAGE_LOGGED: &str = "messageLogged";

/// Producer that records messages and announces each one on the bus.
///
/// Holds the bus as a collaborator; anything that can reach the same
/// `Arc<EventBus>` can listen for `messageLogged`.
#[derive(Debug)]
pub struct Logger {
    bus: Arc<EventBus>,
    endpoint: String,
    next_id: AtomicU64,
}

impl Logger {
    pub fn new(bus: Arc<EventBus>, endpoint: impl Into<String>) -> Self {
        Self {
            bus,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(bus: Arc<EventBus>, config: &LoggerConfig) -> Self {
        Self::new(bus, config.endpoint.clone())
    }

    /// Record `message`, then emit `messageLogged` with `{id, url}`.
    ///
    /// Ids start at 1 and increase by one per call.
    pub fn log(&self, message: &str) -> EmitReport {
        log::info!("{}", message);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.bus.emit(
            MESSAGE_LOGGED,
            json!({
                "id": id,
                "url": self.endpoint,
            }),
        )
    }

    pub fn on_message_logged<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.bus.subscribe(MESSAGE_LOGGED, listener)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::Mutex;

    #[test]
    fn test_log_emits_incrementing_ids() {
        let bus = Arc::new(EventBus::new());
        let logger = Logger::new(bus.clone(), "some url here");

        let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        logger.on_message_logged(move |event| {
            seen_clone.lock().unwrap().push(event.payload.clone());
        });

        assert_eq!(logger.log("HTML CSS JS").invoked, 1);
        logger.log("again");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], json!({"id": 1, "url": "some url here"}));
        assert_eq!(seen[1], json!({"id": 2, "url": "some url here"}));
    }

    #[test]
    fn test_log_without_listeners() {
        let logger = Logger::new(Arc::new(EventBus::new()), "u");
        assert!(logger.log("nobody hears this").is_unhandled());
        assert_eq!(logger.bus().stats().unhandled_events, 1);
    }

    #[test]
    fn test_listener_on_shared_bus_hears_logger() {
        let bus = Arc::new(EventBus::new());
        let heard = Arc::new(Mutex::new(None));
        let heard_clone = heard.clone();
        bus.subscribe(MESSAGE_LOGGED, move |event| {
            *heard_clone.lock().unwrap() = Some(event.payload["url"].clone());
        });

        let logger = Logger::from_config(bus, &LoggerConfig::default());
        logger.log("hello");
        assert_eq!(*heard.lock().unwrap(), Some(json!("some url here")));
        assert_eq!(logger.endpoint(), "some url here");
    }
}
