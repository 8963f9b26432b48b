// Relay: hand events off to an async consumer
//
// The bus never awaits. A listener with long-running work registers a relay
// and drains the receiving half on its own task.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::error::ListenerError;
use super::event_bus::EventBus;
use super::event_types::{Event, SubscriptionId};

/// Forward every `event_name` emission into `sender`.
///
/// Once the receiver is dropped each emission reports `ListenerError::Disconnected`
/// through the bus error path; unsubscribe the returned id to stop that.
pub fn relay(
    bus: &EventBus,
    event_name: impl Into<String>,
    sender: UnboundedSender<Event>,
) -> SubscriptionId {
    let event_name = event_name.into();
    let target = event_name.clone();
    bus.try_subscribe(event_name, move |event| {
        sender
            .send(event.clone())
            .map_err(|_| ListenerError::Disconnected(target.clone()))
    })
}

/// Create an unbounded channel and relay `event_name` into it.
pub fn relay_channel(
    bus: &EventBus,
    event_name: impl Into<String>,
) -> (SubscriptionId, UnboundedReceiver<Event>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let id = relay(bus, event_name, sender);
    (id, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_relay_delivers_to_async_consumer() {
        let bus = EventBus::new();
        let (_id, mut rx) = relay_channel(&bus, "job");

        let report = bus.emit("job", json!({"n": 1}));
        assert!(report.is_ok());
        bus.emit("job", json!({"n": 2}));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.payload["n"], 1);
        assert_eq!(second.payload["n"], 2);
        assert_eq!(first.name, "job");
    }

    #[tokio::test]
    async fn test_relay_reports_disconnect() {
        let bus = EventBus::new();
        let (id, rx) = relay_channel(&bus, "job");
        drop(rx);

        let report = bus.emit("job", json!(null));
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            ListenerError::Disconnected(ref name) if name == "job"
        ));

        assert!(bus.unsubscribe("job", id));
        assert!(bus.emit("job", json!(null)).is_unhandled());
    }

    #[tokio::test]
    async fn test_relay_runs_alongside_sync_listeners() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe("job", |_| {});
        relay(&bus, "job", tx);

        let report = bus.emit("job", json!("payload"));
        assert_eq!(report.invoked, 2);

        let handle = tokio::spawn(async move { rx.recv().await });
        let event = handle.await.unwrap().unwrap();
        assert_eq!(event.payload, json!("payload"));
    }
}
